// ============================================================
// Layer 5 — Token Pooling
// ============================================================
// Reduces token-level hidden states [batch, seq, hidden] to one
// vector per sentence [batch, hidden]. Padding positions
// (attention_mask == 0) never contribute to Mean or Max.
//
// stack_layers() applies the same pooling to every encoder layer
// and stacks the results into [batch, layers, hidden], which is
// the input shape expected by the self-guided losses and samplers.

use anyhow::{ensure, Result};
use burn::prelude::*;

use crate::domain::objective::PoolingStrategy;

const MASK_FLOOR: f64 = 1e-9;
const NEG_FILL: f64 = 1e9;

/// Pool one hidden-state tensor into sentence vectors.
pub fn pool<B: Backend>(
    hidden:         Tensor<B, 3>,
    attention_mask: Tensor<B, 2, Int>,
    strategy:       PoolingStrategy,
) -> Tensor<B, 2> {
    let [batch, _, dim] = hidden.dims();

    match strategy {
        PoolingStrategy::Cls => hidden.slice([0..batch, 0..1, 0..dim]).reshape([batch, dim]),
        PoolingStrategy::Mean => {
            let mask = attention_mask.float().unsqueeze_dim::<3>(2); // [batch, seq, 1]
            let summed = (hidden * mask.clone()).sum_dim(1); // [batch, 1, dim]
            let counts = mask.sum_dim(1).clamp_min(MASK_FLOOR); // [batch, 1, 1]
            (summed / counts).reshape([batch, dim])
        }
        PoolingStrategy::Max => {
            // 0 for real tokens, -1e9 for padding
            let offset = (attention_mask.float().unsqueeze_dim::<3>(2) - 1.0) * NEG_FILL;
            (hidden + offset).max_dim(1).reshape([batch, dim])
        }
    }
}

/// Pool every layer and stack along a new layer axis → [batch, layers, hidden].
///
/// `hidden_states[0]` is the embedding output; it is dropped when
/// `skip_embeddings` is set so only transformer blocks remain.
pub fn stack_layers<B: Backend>(
    hidden_states:   &[Tensor<B, 3>],
    attention_mask:  Tensor<B, 2, Int>,
    strategy:        PoolingStrategy,
    skip_embeddings: bool,
) -> Result<Tensor<B, 3>> {
    let layers = if skip_embeddings {
        hidden_states.get(1..).unwrap_or(&[])
    } else {
        hidden_states
    };
    ensure!(!layers.is_empty(), "no hidden states to stack (got {})", hidden_states.len());

    let pooled: Vec<Tensor<B, 2>> = layers
        .iter()
        .map(|h| pool(h.clone(), attention_mask.clone(), strategy))
        .collect();

    Ok(Tensor::stack(pooled, 1))
}
