// ============================================================
// Layer 5 — Self-Guided Contrastive Model
// ============================================================
// Two copies of the same encoder:
//
//   bert_t — trained; its first block stays frozen
//   bert_f — fully frozen; supplies per-layer "views" of each
//            sentence as the contrastive targets
//
// Forward pass:
//   cls     = proj( bert_t(x).pooler_output )          [B, H]
//   hiddens = proj( pool_each_layer( bert_f(x) ) )     [B, L, H]
//   loss    = TotalLoss(cls, hiddens, bert_t, bert_f)
//
// proj = Linear(H, P) → GELU → Linear(P, H) → GELU, shared by
// both branches.
//
// Reference: Kim et al. (2021) Self-Guided Contrastive Learning, §3

use anyhow::{ensure, Result};
use burn::{
    module::Ignored,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::gelu,
};

use crate::data::batcher::ContrastBatch;
use crate::domain::objective::PoolingStrategy;
use crate::ml::{
    contrastive::ContrastiveModel,
    encoder::{SentenceEncoder, SentenceEncoderConfig},
    loss::total::{TotalLoss, TotalLossConfig},
    params::copy_weights,
    pooling::stack_layers,
};

#[derive(Config, Debug)]
pub struct SelfGuidedModelConfig {
    pub encoder: SentenceEncoderConfig,
    pub loss:    TotalLossConfig,
    #[config(default = 4096)]
    pub proj_dim: usize,
    #[config(default = "PoolingStrategy::Mean")]
    pub pooling: PoolingStrategy,
    #[config(default = true)]
    pub skip_embeddings: bool,
}

impl SelfGuidedModelConfig {
    /// Fresh encoder; bert_f starts as an exact copy of bert_t.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<SelfGuidedModel<B>> {
        self.init_with_encoder(self.encoder.init(device), device)
    }

    /// Start both copies from an already trained encoder.
    pub fn init_with_encoder<B: Backend>(
        &self,
        encoder: SentenceEncoder<B>,
        device:  &B::Device,
    ) -> Result<SelfGuidedModel<B>> {
        let bert_f = copy_weights(&encoder, self.encoder.init(device))?;
        let proj = ProjectionHead {
            linear1: LinearConfig::new(self.encoder.d_model, self.proj_dim).init(device),
            linear2: LinearConfig::new(self.proj_dim, self.encoder.d_model).init(device),
        };

        let model = SelfGuidedModel {
            bert_t: encoder,
            bert_f,
            proj,
            loss: Ignored(self.loss.init()?),
            pooling: Ignored(self.pooling),
            skip_embeddings: self.skip_embeddings,
        };
        Ok(model.freeze())
    }
}

#[derive(Module, Debug)]
pub struct ProjectionHead<B: Backend> {
    pub linear1: Linear<B>,
    pub linear2: Linear<B>,
}

impl<B: Backend> ProjectionHead<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        gelu(self.linear2.forward(gelu(self.linear1.forward(x))))
    }
}

#[derive(Module, Debug)]
pub struct SelfGuidedModel<B: Backend> {
    pub bert_t:          SentenceEncoder<B>,
    pub bert_f:          SentenceEncoder<B>,
    pub proj:            ProjectionHead<B>,
    pub loss:            Ignored<TotalLoss>,
    pub pooling:         Ignored<PoolingStrategy>,
    pub skip_embeddings: bool,
}

impl<B: Backend> SelfGuidedModel<B> {
    /// Stop gradients into bert_f and into bert_t's first block.
    pub fn freeze(mut self) -> Self {
        self.bert_f = self.bert_f.no_grad();
        if let Some(first) = self.bert_t.layers.first_mut() {
            *first = first.clone().no_grad();
        }
        self
    }

    /// input_ids, attention_mask, token_type_ids: [batch, seq] → loss [1]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        token_type_ids: Option<Tensor<B, 2, Int>>,
    ) -> Result<Tensor<B, 1>> {
        let [batch, seq] = input_ids.dims();
        ensure!(batch > 0, "empty batch");
        ensure!(
            attention_mask.dims() == input_ids.dims(),
            "attention_mask {:?} does not match input_ids {:?}",
            attention_mask.dims(),
            input_ids.dims()
        );
        self.bert_t.check_seq_len(seq)?;

        let trained = self.bert_t.forward(input_ids.clone(), attention_mask.clone(), token_type_ids.clone());
        let cls = self.proj.forward(trained.pooler_output);

        let frozen = self.bert_f.forward(input_ids, attention_mask.clone(), token_type_ids);
        let layers = stack_layers(&frozen.hidden_states, attention_mask, self.pooling.0, self.skip_embeddings)?;
        let hiddens = self.proj.forward(layers);

        self.loss.0.forward(cls, hiddens, &self.bert_t, &self.bert_f)
    }
}

impl<B: Backend> ContrastiveModel<B> for SelfGuidedModel<B> {
    fn batch_loss(&self, batch: ContrastBatch<B>) -> Result<Tensor<B, 1>> {
        let [batch_size, views, seq] = batch.input_ids.dims();
        ensure!(views == 1, "self-guided batches carry one view per sentence, got {views}");

        let flat = [batch_size, seq];
        self.forward(
            batch.input_ids.reshape(flat),
            batch.attention_mask.reshape(flat),
            Some(batch.token_type_ids.reshape(flat)),
        )
    }

    fn encoder(&self) -> &SentenceEncoder<B> {
        &self.bert_t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::objective::{SamplerKind, SelfGuidedVariant};
    use crate::ml::encoder::tests::tiny_config;
    use crate::ml::loss::regularizer::RegLoss;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn config(variant: SelfGuidedVariant) -> SelfGuidedModelConfig {
        SelfGuidedModelConfig::new(tiny_config(), TotalLossConfig::new(variant, SamplerKind::Uniform))
            .with_proj_dim(16)
    }

    fn inputs<B: Backend>() -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
        let device = Default::default();
        let ids = Tensor::<B, 2, Int>::from_data(
            TensorData::from([[1_i32, 5, 6, 2], [1, 7, 2, 0], [1, 9, 3, 2]]),
            &device,
        );
        let mask = ids.clone().not_equal_elem(0).int();
        (ids, mask)
    }

    #[test]
    fn test_copies_start_identical() {
        let model = config(SelfGuidedVariant::Opt3).init::<TestBackend>(&Default::default()).unwrap();
        let distance = RegLoss.forward(&model.bert_t, &model.bert_f).unwrap();
        assert!(distance.into_scalar().elem::<f32>() < 1e-4);
    }

    #[test]
    fn test_every_variant_produces_finite_loss() {
        for variant in [SelfGuidedVariant::Opt2, SelfGuidedVariant::Opt3, SelfGuidedVariant::Opt3Simplified] {
            let model = config(variant).init::<TestBackend>(&Default::default()).unwrap();
            let (ids, mask) = inputs::<TestBackend>();
            let loss = model.forward(ids, mask, None).unwrap();
            assert!(loss.into_scalar().elem::<f32>().is_finite(), "{variant:?}");
        }
    }

    #[test]
    fn test_weighted_sampler_must_match_block_count() {
        let loss = TotalLossConfig::new(SelfGuidedVariant::Opt2, SamplerKind::Weighted)
            .with_layer_weights(vec![1.0, 2.0, 3.0]);
        let model = SelfGuidedModelConfig::new(tiny_config(), loss)
            .with_proj_dim(16)
            .init::<TestBackend>(&Default::default())
            .unwrap();

        // tiny_config has 2 blocks
        let (ids, mask) = inputs::<TestBackend>();
        assert!(model.forward(ids, mask, None).is_err());
    }

    #[test]
    fn test_frozen_parameters_receive_no_gradient() {
        let model = config(SelfGuidedVariant::Opt3)
            .init::<TestAutodiffBackend>(&Default::default())
            .unwrap();
        let (ids, mask) = inputs::<TestAutodiffBackend>();

        let grads = model.forward(ids, mask, None).unwrap().backward();

        assert!(model.bert_t.token_embedding.weight.val().grad(&grads).is_some());
        assert!(model.bert_t.layers[1].ffn_linear1.weight.val().grad(&grads).is_some());
        assert!(model.bert_t.layers[0].ffn_linear1.weight.val().grad(&grads).is_none());
        assert!(model.bert_f.token_embedding.weight.val().grad(&grads).is_none());
        assert!(model.proj.linear1.weight.val().grad(&grads).is_some());
    }

    #[test]
    fn test_batch_loss_requires_single_view() {
        let model = config(SelfGuidedVariant::Opt2).init::<TestBackend>(&Default::default()).unwrap();
        let device = Default::default();
        let ids = Tensor::<TestBackend, 3, Int>::ones([2, 2, 4], &device);
        let batch = ContrastBatch {
            input_ids: ids.clone(),
            attention_mask: ids.clone(),
            token_type_ids: ids.zeros_like(),
        };
        assert!(model.batch_loss(batch).is_err());
    }
}
