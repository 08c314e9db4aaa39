// ============================================================
// Layer 5 — SimCSE Model Wrappers
// ============================================================
// Encoder + contrastive loss, one forward pass per batch.
//
//   UnsupSimCse: input [batch, 2, seq]  — each sentence twice;
//                the two dropout masks are the augmentation.
//   SupSimCse:   input [batch, 3, seq]  — premise, entailment,
//                contradiction.
//
// Views are flattened to [batch * views, seq] for a single
// encoder call, then the pooler output is folded back to
// [batch, views, hidden] and split per view.
//
// Reference: Gao et al. (2021) SimCSE, §3 and §4

use anyhow::Result;
use burn::prelude::*;

use crate::data::batcher::ContrastBatch;
use crate::ml::{
    contrastive::{encode_views, view, ContrastiveModel},
    encoder::{SentenceEncoder, SentenceEncoderConfig},
    loss::simcse::{SupContrastiveLoss, UnsupContrastiveLoss},
    similarity::rowwise_cosine,
};

#[derive(Config, Debug)]
pub struct SimCseConfig {
    pub encoder: SentenceEncoderConfig,
    #[config(default = 0.05)]
    pub temperature: f64,
}

impl SimCseConfig {
    pub fn init_unsup<B: Backend>(&self, device: &B::Device) -> UnsupSimCse<B> {
        self.unsup_from(self.encoder.init(device))
    }

    pub fn init_sup<B: Backend>(&self, device: &B::Device) -> SupSimCse<B> {
        self.sup_from(self.encoder.init(device))
    }

    /// Wrap an existing (e.g. pretrained) encoder.
    pub fn unsup_from<B: Backend>(&self, encoder: SentenceEncoder<B>) -> UnsupSimCse<B> {
        UnsupSimCse { encoder, temperature: self.temperature }
    }

    pub fn sup_from<B: Backend>(&self, encoder: SentenceEncoder<B>) -> SupSimCse<B> {
        SupSimCse { encoder, temperature: self.temperature }
    }
}

fn mean_alignment<B: Backend>(anchor: Tensor<B, 2>, positive: Tensor<B, 2>) -> f64 {
    rowwise_cosine(anchor, positive).mean().into_scalar().elem::<f64>()
}

/// Unsupervised SimCSE.
#[derive(Module, Debug)]
pub struct UnsupSimCse<B: Backend> {
    pub encoder:     SentenceEncoder<B>,
    pub temperature: f64,
}

impl<B: Backend> UnsupSimCse<B> {
    fn loss(&self) -> UnsupContrastiveLoss {
        UnsupContrastiveLoss { temperature: self.temperature }
    }

    /// (input_ids, attention_mask, token_type_ids): [batch, 2, seq] → (loss, sim [batch, batch])
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 3, Int>,
        attention_mask: Tensor<B, 3, Int>,
        token_type_ids: Option<Tensor<B, 3, Int>>,
    ) -> Result<(Tensor<B, 1>, Tensor<B, 2>)> {
        let pooled = encode_views(&self.encoder, input_ids, attention_mask, token_type_ids, 2)?;
        self.loss().forward(view(&pooled, 0), view(&pooled, 1))
    }
}

impl<B: Backend> ContrastiveModel<B> for UnsupSimCse<B> {
    fn batch_loss(&self, batch: ContrastBatch<B>) -> Result<Tensor<B, 1>> {
        let (loss, _) = self.forward(batch.input_ids, batch.attention_mask, Some(batch.token_type_ids))?;
        Ok(loss)
    }

    fn alignment(&self, batch: ContrastBatch<B>) -> Result<Option<f64>> {
        let pooled = encode_views(&self.encoder, batch.input_ids, batch.attention_mask, Some(batch.token_type_ids), 2)?;
        Ok(Some(mean_alignment(view(&pooled, 0), view(&pooled, 1))))
    }

    fn encoder(&self) -> &SentenceEncoder<B> {
        &self.encoder
    }
}

/// Supervised SimCSE with hard negatives.
#[derive(Module, Debug)]
pub struct SupSimCse<B: Backend> {
    pub encoder:     SentenceEncoder<B>,
    pub temperature: f64,
}

impl<B: Backend> SupSimCse<B> {
    fn loss(&self) -> SupContrastiveLoss {
        SupContrastiveLoss { temperature: self.temperature }
    }

    /// (input_ids, attention_mask, token_type_ids): [batch, 3, seq] → (loss, sim [batch, 2*batch])
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 3, Int>,
        attention_mask: Tensor<B, 3, Int>,
        token_type_ids: Option<Tensor<B, 3, Int>>,
    ) -> Result<(Tensor<B, 1>, Tensor<B, 2>)> {
        let pooled = encode_views(&self.encoder, input_ids, attention_mask, token_type_ids, 3)?;
        self.loss().forward(view(&pooled, 0), view(&pooled, 1), view(&pooled, 2))
    }
}

impl<B: Backend> ContrastiveModel<B> for SupSimCse<B> {
    fn batch_loss(&self, batch: ContrastBatch<B>) -> Result<Tensor<B, 1>> {
        let (loss, _) = self.forward(batch.input_ids, batch.attention_mask, Some(batch.token_type_ids))?;
        Ok(loss)
    }

    fn alignment(&self, batch: ContrastBatch<B>) -> Result<Option<f64>> {
        let pooled = encode_views(&self.encoder, batch.input_ids, batch.attention_mask, Some(batch.token_type_ids), 3)?;
        Ok(Some(mean_alignment(view(&pooled, 0), view(&pooled, 1))))
    }

    fn encoder(&self) -> &SentenceEncoder<B> {
        &self.encoder
    }
}
