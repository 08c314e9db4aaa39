// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 0: Adopt a pretrained run      (Layer 6 - infra, --init-from only)
//   Step 1: Load the corpus             (Layer 4 - data)
//   Step 2: Clean and build view texts  (Layer 4 - data)
//   Step 3: Resolve the tokenizer       (Layer 6 - infra)
//   Step 4: Encode every view           (Layer 4 - data)
//   Step 5: Split train/validation      (Layer 4 - data)
//   Step 6: Build datasets              (Layer 4 - data)
//   Step 7: Save config                 (Layer 6 - infra)
//   Step 8: Run training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::data::{
    dataset::{ContrastDataset, ContrastSample},
    encoding::SequenceEncoder,
    loader::CorpusLoader,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::{
    objective::{Objective, PoolingStrategy, SamplerKind, SelfGuidedVariant},
    sentence::ViewTexts,
    traits::CorpusSource,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::{required_vocab_size, TokenizerStore},
};
use crate::ml::encoder::SentenceEncoderConfig;
use crate::ml::trainer::{run_training, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved as train_config.json
// so the embedder can rebuild the encoder; fields missing from an
// older file fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub objective:       Objective,
    pub data_path:       String,
    pub checkpoint_dir:  String,
    /// Existing HuggingFace tokenizer.json; a word-level one is built otherwise
    pub tokenizer_path:  Option<String>,
    /// Checkpoint dir whose encoder initialises this run
    pub init_from:       Option<String>,

    pub max_seq_len:     usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub val_fraction:    f64,
    pub seed:            u64,
    pub min_chars:       usize,

    pub temperature:     f64,

    // self-guided only
    pub sg_variant:      SelfGuidedVariant,
    pub lambda:          f64,
    pub sampler:         SamplerKind,
    pub layer_weights:   Vec<f32>,
    pub pooling:         PoolingStrategy,
    pub skip_embeddings: bool,
    pub proj_dim:        usize,

    // encoder architecture
    pub vocab_size:      usize,
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub d_ff:            usize,
    pub dropout:         f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            objective:       Objective::Unsup,
            data_path:       "data/wiki1m.txt".to_string(),
            checkpoint_dir:  "checkpoints".to_string(),
            tokenizer_path:  None,
            init_from:       None,
            max_seq_len:     32,
            batch_size:      64,
            epochs:          1,
            lr:              5e-5,
            val_fraction:    0.1,
            seed:            42,
            min_chars:       1,
            temperature:     0.05,
            sg_variant:      SelfGuidedVariant::Opt3,
            lambda:          0.1,
            sampler:         SamplerKind::Uniform,
            layer_weights:   Vec::new(),
            pooling:         PoolingStrategy::Mean,
            skip_embeddings: true,
            proj_dim:        4096,
            vocab_size:      30522,
            d_model:         256,
            num_heads:       8,
            num_layers:      6,
            d_ff:            1024,
            dropout:         0.1,
        }
    }
}

impl TrainConfig {
    pub fn encoder_config(&self) -> SentenceEncoderConfig {
        SentenceEncoderConfig::new(
            self.vocab_size,
            self.max_seq_len,
            self.d_model,
            self.num_heads,
            self.num_layers,
            self.d_ff,
        )
        .with_dropout(self.dropout)
    }

    /// Number of layers the self-guided losses see.
    pub fn sampled_layers(&self) -> usize {
        self.num_layers + usize::from(!self.skip_embeddings)
    }

    fn architecture(&self) -> [usize; 6] {
        [self.vocab_size, self.max_seq_len, self.d_model, self.num_heads, self.num_layers, self.d_ff]
    }

    /// Take the encoder shape of a saved run so its weights fit.
    pub fn adopt_architecture(&mut self, source: &TrainConfig) {
        if self.architecture() != source.architecture() {
            tracing::warn!(
                "Using the pretrained encoder shape {:?} instead of {:?} \
                 (vocab, seq, d_model, heads, layers, d_ff)",
                source.architecture(),
                self.architecture()
            );
        }
        self.vocab_size  = source.vocab_size;
        self.max_seq_len = source.max_seq_len;
        self.d_model     = source.d_model;
        self.num_heads   = source.num_heads;
        self.num_layers  = source.num_layers;
        self.d_ff        = source.d_ff;
    }

    /// Reject settings that would only fail deep inside training.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.epochs > 0, "epochs must be positive");
        ensure!(self.max_seq_len >= 2, "max_seq_len must leave room for [CLS] and [SEP]");
        ensure!(self.num_layers > 0, "num_layers must be positive");
        ensure!(
            self.num_heads > 0 && self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model,
            self.num_heads
        );
        ensure!(self.temperature > 0.0, "temperature must be positive, got {}", self.temperature);
        ensure!(
            (0.0..1.0).contains(&self.val_fraction),
            "val_fraction must be in [0, 1), got {}",
            self.val_fraction
        );
        ensure!((0.0..1.0).contains(&self.dropout), "dropout must be in [0, 1)");

        let weighted_opt2 = self.objective == Objective::SelfGuided
            && self.sg_variant.uses_sampler()
            && self.sampler == SamplerKind::Weighted;
        if weighted_opt2 && self.layer_weights.len() != self.sampled_layers() {
            bail!(
                "weighted sampler needs one weight per layer: got {}, model has {}",
                self.layer_weights.len(),
                self.sampled_layers()
            );
        }
        Ok(())
    }
}

// ─── Sample building ─────────────────────────────────────────────────────────

/// Read the corpus and turn every usable example into its view texts.
pub fn build_view_texts(
    source:       &impl CorpusSource,
    objective:    Objective,
    preprocessor: &Preprocessor,
) -> Result<Vec<ViewTexts>> {
    let texts: Vec<ViewTexts> = match objective {
        Objective::Unsup | Objective::SelfGuided => source
            .sentences()?
            .iter()
            .filter_map(|s| preprocessor.accept(s))
            .map(|s| ViewTexts::repeated(&s, objective.views()))
            .collect(),
        Objective::Sup => source
            .triplets()?
            .iter()
            .filter_map(|t| {
                let views = t
                    .views()
                    .iter()
                    .map(|v| preprocessor.accept(v))
                    .collect::<Option<Vec<String>>>()?;
                Some(ViewTexts(views))
            })
            .collect(),
    };
    Ok(texts)
}

pub fn encode_samples(
    texts:     &[ViewTexts],
    tokenizer: &Tokenizer,
    encoder:   &SequenceEncoder,
) -> Result<Vec<ContrastSample>> {
    texts
        .iter()
        .map(|t| ContrastSample::encode(t, tokenizer, encoder))
        .collect()
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
/// Everything the training loop needs, after Steps 0–7.
pub struct PreparedRun {
    pub config:        TrainConfig,
    pub train_dataset: ContrastDataset,
    pub val_dataset:   ContrastDataset,
    pub checkpoint:    CheckpointManager,
}

pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let run = self.prepare()?;

        // ── Step 8: Train ─────────────────────────────────────────────────────
        run_training(&run.config, run.train_dataset, run.val_dataset, &run.checkpoint)
    }

    /// Steps 0–7: everything up to the training loop.
    pub fn prepare(&self) -> Result<PreparedRun> {
        let mut cfg = self.config.clone();

        // ── Step 0: Pretrained run ────────────────────────────────────────────
        // The encoder's embedding rows only mean something under the
        // tokenizer it was trained with, so both come from the same run.
        let pretrained_tokenizer = match cfg.init_from.clone() {
            Some(dir) => {
                let source = CheckpointManager::new(&dir)?
                    .load_config()
                    .with_context(|| format!("Cannot continue from '{dir}'"))?;
                cfg.adopt_architecture(&source);
                if let Some(ignored) = cfg.tokenizer_path.take() {
                    tracing::warn!("Ignoring tokenizer '{}': continuing from '{}' keeps its tokenizer", ignored, dir);
                }
                Some(TokenizerStore::new(&dir).path())
            }
            None => None,
        };
        cfg.validate()?;

        // ── Step 1–2: Corpus → view texts ─────────────────────────────────────
        tracing::info!("Loading {:?} corpus from '{}'", cfg.objective, cfg.data_path);
        let loader       = CorpusLoader::new(&cfg.data_path);
        let preprocessor = Preprocessor::new(cfg.min_chars);
        let texts        = build_view_texts(&loader, cfg.objective, &preprocessor)?;
        ensure!(!texts.is_empty(), "no usable training examples in '{}'", cfg.data_path);
        tracing::info!("Built {} examples with {} views each", texts.len(), cfg.objective.views());

        // ── Step 3: Tokenizer ─────────────────────────────────────────────────
        let flat: Vec<String> = texts.iter().flat_map(|t| t.0.iter().cloned()).collect();
        let provided = pretrained_tokenizer
            .as_deref()
            .or_else(|| cfg.tokenizer_path.as_deref().map(Path::new));
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir).resolve(provided, &flat, cfg.vocab_size)?;

        let required = required_vocab_size(&tokenizer);
        if required > cfg.vocab_size {
            ensure!(
                cfg.init_from.is_none(),
                "pretrained tokenizer needs vocab_size {} but the pretrained encoder has {}",
                required,
                cfg.vocab_size
            );
            tracing::warn!(
                "Tokenizer uses ids up to {}, raising vocab_size from {} to {}",
                required - 1,
                cfg.vocab_size,
                required
            );
            cfg.vocab_size = required;
        }

        // ── Step 4: Encode ────────────────────────────────────────────────────
        let sequence = SequenceEncoder::for_tokenizer(&tokenizer, cfg.max_seq_len)?;
        let samples  = encode_samples(&texts, &tokenizer, &sequence)?;
        let encoded_views = samples.iter().flat_map(|s| &s.views);
        let total_tokens: usize = encoded_views.clone().map(|v| v.real_len()).sum();
        tracing::info!(
            "Encoded {} samples, mean length {:.1} tokens",
            samples.len(),
            total_tokens as f64 / encoded_views.count().max(1) as f64
        );

        // ── Step 5–6: Split and wrap ──────────────────────────────────────────
        let (train_samples, val_samples) = split_train_val(samples, cfg.val_fraction, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train_samples.len(), val_samples.len());

        let train_dataset = ContrastDataset::new(train_samples)?;
        let val_dataset   = ContrastDataset::new(val_samples)?;

        // ── Step 7: Save config for inference ─────────────────────────────────
        let checkpoint = CheckpointManager::new(&cfg.checkpoint_dir)?;
        checkpoint.save_config(&cfg)?;

        Ok(PreparedRun { config: cfg, train_dataset, val_dataset, checkpoint })
    }
}
