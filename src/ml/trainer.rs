// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One train + validation loop for every objective, driven through
// the ContrastiveModel trait:
//
//   Unsup       → UnsupSimCse     (batches of [batch, 2, seq])
//   Sup         → SupSimCse       (batches of [batch, 3, seq])
//   SelfGuided  → SelfGuidedModel (batches of [batch, 1, seq])
//
// Key Burn insight:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on the inner backend, so
//     dropout is off and no graph is recorded during validation
//   - Frozen parameters (no_grad) receive no gradient, so Adam
//     leaves them untouched
//
// Per epoch: mean train loss, mean validation loss, validation
// alignment, one metrics.csv row, one full checkpoint. The encoder
// of the best epoch is saved separately for inference.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{ContrastBatch, ContrastBatcher},
    dataset::ContrastDataset,
};
use crate::domain::objective::Objective;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    contrastive::ContrastiveModel,
    encoder::SentenceEncoder,
    loss::total::TotalLossConfig,
    params::ParamCollector,
    self_guided::SelfGuidedModelConfig,
    simcse::SimCseConfig,
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// What a finished run reports back to the CLI.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub epochs:     usize,
    pub best_epoch: usize,
    pub best_loss:  f64,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: ContrastDataset,
    val_dataset:   ContrastDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_objective::<MyBackend>(cfg, train_dataset, val_dataset, ckpt_manager, &device)
}

/// Build the model for `cfg.objective` on backend `B` and train it.
pub(crate) fn train_objective<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: ContrastDataset,
    val_dataset:   ContrastDataset,
    ckpt_manager:  &CheckpointManager,
    device:        &B::Device,
) -> Result<TrainSummary> {
    let encoder = initial_encoder::<B>(cfg, device)?;
    tracing::info!(
        "Model ready: {:?}, {} layers, d_model={}",
        cfg.objective,
        cfg.num_layers,
        cfg.d_model
    );

    match cfg.objective {
        Objective::Unsup => {
            let model = simcse_config(cfg).unsup_from(encoder);
            train_loop(cfg, model, train_dataset, val_dataset, ckpt_manager, device)
        }
        Objective::Sup => {
            let model = simcse_config(cfg).sup_from(encoder);
            train_loop(cfg, model, train_dataset, val_dataset, ckpt_manager, device)
        }
        Objective::SelfGuided => {
            let loss = TotalLossConfig::new(cfg.sg_variant, cfg.sampler)
                .with_layer_weights(cfg.layer_weights.clone())
                .with_temperature(cfg.temperature)
                .with_lambda(cfg.lambda);
            let model = SelfGuidedModelConfig::new(cfg.encoder_config(), loss)
                .with_proj_dim(cfg.proj_dim)
                .with_pooling(cfg.pooling)
                .with_skip_embeddings(cfg.skip_embeddings)
                .init_with_encoder(encoder, device)?;
            train_loop(cfg, model, train_dataset, val_dataset, ckpt_manager, device)
        }
    }
}

fn simcse_config(cfg: &TrainConfig) -> SimCseConfig {
    SimCseConfig::new(cfg.encoder_config()).with_temperature(cfg.temperature)
}

/// Fresh encoder, or the saved encoder of `cfg.init_from`.
fn initial_encoder<B: Backend>(cfg: &TrainConfig, device: &B::Device) -> Result<SentenceEncoder<B>> {
    let encoder = cfg.encoder_config().init::<B>(device);
    match &cfg.init_from {
        Some(dir) => {
            tracing::info!("Initialising encoder from '{}'", dir);
            CheckpointManager::new(dir)?.load_encoder(encoder, device)
        }
        None => Ok(encoder),
    }
}

/// One optimiser step. A non-finite loss skips the step and leaves the
/// parameters untouched; the returned loss is then `None`.
fn train_step<B, M, O>(model: M, optim: &mut O, batch: ContrastBatch<B>, lr: f64) -> Result<(M, Option<f64>)>
where
    B: AutodiffBackend,
    M: ContrastiveModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    let loss = model.batch_loss(batch)?;
    let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
    if !loss_val.is_finite() {
        return Ok((model, None));
    }

    let grads = GradientsParams::from_grads(loss.backward(), &model);
    Ok((optim.step(lr, model, grads), Some(loss_val)))
}

fn train_loop<B, M>(
    cfg:           &TrainConfig,
    mut model:     M,
    train_dataset: ContrastDataset,
    val_dataset:   ContrastDataset,
    ckpt_manager:  &CheckpointManager,
    device:        &B::Device,
) -> Result<TrainSummary>
where
    B: AutodiffBackend,
    M: ContrastiveModel<B> + AutodiffModule<B>,
    M::InnerModule: ContrastiveModel<B::InnerBackend>,
{
    tracing::info!("Model has {} parameters", ParamCollector::<B>::collect(&model).num_params());

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init::<B, M>();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = ContrastBatcher::<B>::new(device.clone());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend, no autodiff overhead) ──────────
    let val_batcher = ContrastBatcher::<B::InnerBackend>::new(device.clone());
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let metrics_logger = MetricsLogger::new(ckpt_manager.dir())?;
    let mut best_loss  = f64::INFINITY;
    let mut best_epoch = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;
        let mut skipped        = 0usize;

        for (index, batch) in train_loader.iter().enumerate() {
            let (next, loss_val) = train_step(model, &mut optim, batch, cfg.lr)?;
            model = next;

            match loss_val {
                Some(loss_val) => {
                    train_loss_sum += loss_val;
                    train_batches  += 1;
                }
                None => {
                    skipped += 1;
                    tracing::warn!("Non-finite training loss at epoch {} batch {}, step skipped", epoch, index + 1);
                }
            }
        }
        if skipped > 0 {
            tracing::warn!("Epoch {}: skipped {} of {} batches", epoch, skipped, skipped + train_batches);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum  = 0.0f64;
        let mut val_batches   = 0usize;
        let mut align_sum     = 0.0f64;
        let mut align_batches = 0usize;

        for batch in val_loader.iter() {
            val_loss_sum += model_valid.batch_loss(batch.clone())?.into_scalar().elem::<f64>();
            val_batches  += 1;

            if let Some(alignment) = model_valid.alignment(batch)? {
                align_sum     += alignment;
                align_batches += 1;
            }
        }

        let avg_val_loss  = if val_batches > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let val_alignment = (align_batches > 0).then(|| align_sum / align_batches as f64);

        let metrics = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, val_alignment);
        metrics_logger.log(&metrics)?;

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_alignment={}",
            epoch,
            cfg.epochs,
            avg_train_loss,
            avg_val_loss,
            val_alignment.map(|a| format!("{a:.4}")).unwrap_or_else(|| "-".to_string()),
        );

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);

        if metrics.is_improvement(best_loss) {
            best_loss  = metrics.tracked_loss();
            best_epoch = epoch;
            ckpt_manager.save_encoder(model.encoder())?;
            tracing::info!("New best encoder at epoch {} (loss {:.4})", epoch, best_loss);
        }
    }

    // Every epoch was non-finite: keep the last encoder rather than none
    if best_epoch == 0 {
        ckpt_manager.save_encoder(model.encoder())?;
        best_epoch = cfg.epochs;
    }

    tracing::info!("Training complete! Metrics in '{}'", metrics_logger.csv_path().display());
    Ok(TrainSummary { epochs: cfg.epochs, best_epoch, best_loss })
}
