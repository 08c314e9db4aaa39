// ============================================================
// Layer 5 — SimCSE Losses
// ============================================================
// Unsupervised:
//   sim[i, j] = cos(first_i, second_j) / τ          [B, B]
//   loss      = CE(sim, labels = 0..B)
// The second view of sentence i is its positive; every other
// sentence in the batch is an in-batch negative.
//
// Supervised (NLI):
//   sim = [ cos(premise, entail) / τ | cos(premise, contra) / τ ]
//                                                   [B, 2B]
//   loss = CE(sim, labels = 0..B)
// Contradictions act as hard negatives alongside the in-batch
// entailments of the other premises.
//
// Reference: Gao et al. (2021) SimCSE, eq. (1) and (5)

use anyhow::Result;
use burn::prelude::*;

use super::{diagonal_cross_entropy, ensure_same_shape};
use crate::ml::similarity::pairwise_cosine;

#[derive(Config, Debug)]
pub struct UnsupContrastiveLossConfig {
    #[config(default = 0.05)]
    pub temperature: f64,
}

impl UnsupContrastiveLossConfig {
    pub fn init(&self) -> UnsupContrastiveLoss {
        UnsupContrastiveLoss { temperature: self.temperature }
    }
}

#[derive(Debug, Clone)]
pub struct UnsupContrastiveLoss {
    pub temperature: f64,
}

impl UnsupContrastiveLoss {
    /// first, second: [batch, hidden] → (loss [1], sim [batch, batch])
    pub fn forward<B: Backend>(
        &self,
        first:  Tensor<B, 2>,
        second: Tensor<B, 2>,
    ) -> Result<(Tensor<B, 1>, Tensor<B, 2>)> {
        ensure_same_shape("unsupervised contrastive loss", &first, &second)?;

        let sim = pairwise_cosine(first, second) / self.temperature;
        Ok((diagonal_cross_entropy(sim.clone()), sim))
    }
}

#[derive(Config, Debug)]
pub struct SupContrastiveLossConfig {
    #[config(default = 0.05)]
    pub temperature: f64,
}

impl SupContrastiveLossConfig {
    pub fn init(&self) -> SupContrastiveLoss {
        SupContrastiveLoss { temperature: self.temperature }
    }
}

#[derive(Debug, Clone)]
pub struct SupContrastiveLoss {
    pub temperature: f64,
}

impl SupContrastiveLoss {
    /// premise, entail, contra: [batch, hidden] → (loss [1], sim [batch, 2*batch])
    pub fn forward<B: Backend>(
        &self,
        premise: Tensor<B, 2>,
        entail:  Tensor<B, 2>,
        contra:  Tensor<B, 2>,
    ) -> Result<(Tensor<B, 1>, Tensor<B, 2>)> {
        ensure_same_shape("supervised contrastive loss (entailment)", &premise, &entail)?;
        ensure_same_shape("supervised contrastive loss (contradiction)", &premise, &contra)?;

        let sim_entail = pairwise_cosine(premise.clone(), entail) / self.temperature;
        let sim_contra = pairwise_cosine(premise, contra) / self.temperature;
        let sim = Tensor::cat(vec![sim_entail, sim_contra], 1);

        Ok((diagonal_cross_entropy(sim.clone()), sim))
    }
}
