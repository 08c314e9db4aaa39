// ============================================================
// Layer 5 — Contrastive Model Seam
// ============================================================
// The trainer and the embedder only see this trait, so one
// training loop drives unsupervised SimCSE, supervised SimCSE
// and the self-guided model alike.

use anyhow::{ensure, Result};
use burn::prelude::*;

use crate::data::batcher::ContrastBatch;
use crate::ml::encoder::SentenceEncoder;

pub trait ContrastiveModel<B: Backend>: Module<B> {
    /// Scalar training loss for one batch.
    fn batch_loss(&self, batch: ContrastBatch<B>) -> Result<Tensor<B, 1>>;

    /// Mean cosine between each anchor and its positive, when the
    /// objective has explicit positive views.
    fn alignment(&self, _batch: ContrastBatch<B>) -> Result<Option<f64>> {
        Ok(None)
    }

    /// The encoder whose pooler output is the sentence embedding.
    fn encoder(&self) -> &SentenceEncoder<B>;

    /// Sentence embeddings [batch, hidden] for [batch, seq] inputs.
    fn embed(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        token_type_ids: Option<Tensor<B, 2, Int>>,
    ) -> Result<Tensor<B, 2>> {
        self.encoder().embed(input_ids, attention_mask, token_type_ids)
    }
}

/// Encode a [batch, views, seq] batch into pooler outputs [batch, views, hidden].
pub(crate) fn encode_views<B: Backend>(
    encoder:        &SentenceEncoder<B>,
    input_ids:      Tensor<B, 3, Int>,
    attention_mask: Tensor<B, 3, Int>,
    token_type_ids: Option<Tensor<B, 3, Int>>,
    expected_views: usize,
) -> Result<Tensor<B, 3>> {
    let [batch, views, seq] = input_ids.dims();
    ensure!(
        views == expected_views,
        "input dimension should be [batch_size, {expected_views}, seq_len], got {:?}",
        input_ids.dims()
    );
    ensure!(batch > 0, "empty batch");
    ensure!(
        attention_mask.dims() == input_ids.dims(),
        "attention_mask {:?} does not match input_ids {:?}",
        attention_mask.dims(),
        input_ids.dims()
    );
    if let Some(types) = &token_type_ids {
        ensure!(
            types.dims() == input_ids.dims(),
            "token_type_ids {:?} does not match input_ids {:?}",
            types.dims(),
            input_ids.dims()
        );
    }
    encoder.check_seq_len(seq)?;

    let flat = [batch * views, seq];
    let pooled = encoder
        .forward(
            input_ids.reshape(flat),
            attention_mask.reshape(flat),
            token_type_ids.map(|t| t.reshape(flat)),
        )
        .pooler_output;

    let [_, hidden] = pooled.dims();
    Ok(pooled.reshape([batch, views, hidden]))
}

/// View `index` of a [batch, views, hidden] tensor as [batch, hidden].
pub(crate) fn view<B: Backend>(pooled: &Tensor<B, 3>, index: usize) -> Tensor<B, 2> {
    let [batch, _, hidden] = pooled.dims();
    pooled
        .clone()
        .slice([0..batch, index..index + 1, 0..hidden])
        .reshape([batch, hidden])
}
