// ============================================================
// Layer 3 — Training Objective Choices
// ============================================================
// Plain enums naming which contrastive objective to train and
// how its pieces are configured. They are serialised into
// train_config.json so the embedder can rebuild the same model.
//
// Reference: Gao et al. (2021) SimCSE
//            Kim et al. (2021) Self-Guided Contrastive Learning

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which model wrapper / loss pairing a run trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
    /// Same sentence encoded twice, dropout is the only augmentation
    Unsup,
    /// NLI triplets: premise, entailment (positive), contradiction (hard negative)
    Sup,
    /// Trainable encoder contrasted against a frozen copy's layers
    SelfGuided,
}

impl Objective {
    /// Number of encoded views per training example.
    pub fn views(&self) -> usize {
        match self {
            Objective::Unsup      => 2,
            Objective::Sup        => 3,
            Objective::SelfGuided => 1,
        }
    }
}

/// Self-guided loss variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SelfGuidedVariant {
    /// SimCSE-style loss between [CLS] and a sampled layer summary
    Opt2,
    /// SG-OPT: every layer of every other sentence is a negative
    Opt3,
    /// Opt3 with the denominator summed over all sentences and layers
    Opt3Simplified,
}

impl SelfGuidedVariant {
    /// Opt2 consumes [batch, hidden]; the others consume the full layer stack.
    pub fn uses_sampler(&self) -> bool {
        matches!(self, SelfGuidedVariant::Opt2)
    }
}

/// How per-layer sentence vectors are reduced to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SamplerKind {
    Uniform,
    Weighted,
}

/// How token states are reduced to a sentence vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PoolingStrategy {
    /// First ([CLS]) token
    Cls,
    /// Mask-aware average over tokens
    #[default]
    Mean,
    /// Mask-aware max over tokens
    Max,
}
