// ============================================================
// Layer 5 — Contrastive Losses
// ============================================================
// Stateless loss functions over sentence embeddings. Each loss
// is configured by a Burn Config (temperature, lambda, ...) and
// returns a scalar loss tensor of shape [1]; the SimCSE-style
// losses also return the scaled similarity matrix they built.
//
//   simcse.rs      — unsupervised / supervised SimCSE losses
//   self_guided.rs — SG-BERT objectives opt2, opt3, simplified opt3
//   regularizer.rs — Euclidean distance between hidden states
//                    or between two modules' parameters
//   total.rs       — self-guided loss + lambda * regulariser
//
// Reference: Gao et al. (2021) SimCSE
//            Kim et al. (2021) Self-Guided Contrastive Learning

pub mod simcse;

pub mod self_guided;

pub mod regularizer;

pub mod total;

use anyhow::{ensure, Result};
use burn::prelude::*;

/// Cross-entropy of a similarity matrix against the diagonal:
/// row i's positive sits in column i.
pub(crate) fn diagonal_cross_entropy<B: Backend>(sim: Tensor<B, 2>) -> Tensor<B, 1> {
    let [rows, _] = sim.dims();
    let device = sim.device();
    let labels = Tensor::<B, 1, Int>::arange(0..rows as i64, &device);
    burn::nn::loss::CrossEntropyLossConfig::new()
        .init(&device)
        .forward(sim, labels)
}

/// Both embeddings must be [batch, hidden] with identical shape and batch > 0.
pub(crate) fn ensure_same_shape<B: Backend>(
    what:  &str,
    left:  &Tensor<B, 2>,
    right: &Tensor<B, 2>,
) -> Result<()> {
    ensure!(
        left.dims() == right.dims(),
        "{what}: shape mismatch {:?} vs {:?}",
        left.dims(),
        right.dims()
    );
    ensure!(left.dims()[0] > 0, "{what}: empty batch");
    Ok(())
}
