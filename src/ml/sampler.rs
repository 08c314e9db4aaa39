// ============================================================
// Layer 5 — Layer Samplers
// ============================================================
// Collapse the per-layer sentence vectors of the frozen encoder
// [batch, layers, hidden] into one summary vector [batch, hidden].
//
//   UniformSampler  — plain average over layers
//   WeightedSampler — convex combination, weights renormalised
//                     to sum to 1 before use
//
// Only the opt2 self-guided objective consumes a sampler.
//
// Reference: Kim et al. (2021) Self-Guided Contrastive Learning, §3

use anyhow::{bail, ensure, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::domain::objective::SamplerKind;

/// Averages hidden states over the layer axis.
#[derive(Debug, Clone, Default)]
pub struct UniformSampler;

impl UniformSampler {
    pub fn forward<B: Backend>(&self, hidden: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, _, dim] = hidden.dims();
        hidden.mean_dim(1).reshape([batch, dim])
    }
}

/// Weighted average over the layer axis.
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    weights: Vec<f32>,
}

impl WeightedSampler {
    pub fn new(weights: Vec<f32>) -> Result<Self> {
        validate_weights(&weights)?;
        Ok(Self { weights })
    }

    /// `override_weights`, when given, replace the stored weights for this call.
    pub fn forward<B: Backend>(
        &self,
        hidden:           Tensor<B, 3>,
        override_weights: Option<&[f32]>,
    ) -> Result<Tensor<B, 2>> {
        let w = match override_weights {
            Some(w) => {
                validate_weights(w)?;
                w
            }
            None => self.weights.as_slice(),
        };

        let [batch, layers, dim] = hidden.dims();
        ensure!(
            layers == w.len(),
            "layer count {} does not match {} sampler weights",
            layers,
            w.len()
        );

        let total: f32 = w.iter().sum();
        let normalised: Vec<f32> = w.iter().map(|x| x / total).collect();
        let w = Tensor::<B, 1>::from_data(TensorData::new(normalised, [layers]), &hidden.device())
            .reshape([1, layers, 1]);

        Ok((hidden * w).sum_dim(1).reshape([batch, dim]))
    }
}

fn validate_weights(weights: &[f32]) -> Result<()> {
    ensure!(!weights.is_empty(), "sampler weights must not be empty");
    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        bail!("sampler weights must be finite and non-negative, got {bad}");
    }
    let total: f32 = weights.iter().sum();
    ensure!(total > 0.0, "sampler weights sum to zero");
    Ok(())
}

#[derive(Debug, Clone)]
pub enum LayerSampler {
    Uniform(UniformSampler),
    Weighted(WeightedSampler),
}

impl LayerSampler {
    pub fn from_kind(kind: SamplerKind, weights: &[f32]) -> Result<Self> {
        match kind {
            SamplerKind::Uniform  => Ok(LayerSampler::Uniform(UniformSampler)),
            SamplerKind::Weighted => Ok(LayerSampler::Weighted(WeightedSampler::new(weights.to_vec())?)),
        }
    }

    pub fn forward<B: Backend>(&self, hidden: Tensor<B, 3>) -> Result<Tensor<B, 2>> {
        match self {
            LayerSampler::Uniform(s)  => Ok(s.forward(hidden)),
            LayerSampler::Weighted(s) => s.forward(hidden, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    // batch 1, 2 layers, hidden 2
    fn layers() -> Tensor<TestBackend, 3> {
        Tensor::from_data(TensorData::from([[[1.0_f32, 2.0], [3.0, 4.0]]]), &Default::default())
    }

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_uniform_averages_layers() {
        let out = UniformSampler.forward(layers());
        assert_eq!(out.dims(), [1, 2]);
        assert_eq!(values(out), vec![2.0, 3.0]);
    }

    #[test]
    fn test_weighted_normalises_weights() {
        let sampler = WeightedSampler::new(vec![1.0, 3.0]).unwrap();
        let out = values(sampler.forward(layers(), None).unwrap());
        assert!((out[0] - 2.5).abs() < 1e-6);
        assert!((out[1] - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_override_weights_take_precedence() {
        let sampler = WeightedSampler::new(vec![1.0, 1.0]).unwrap();
        let out = values(sampler.forward(layers(), Some(&[0.0, 2.0])).unwrap());
        assert_eq!(out, vec![3.0, 4.0]);
    }

    #[test]
    fn test_weight_count_mismatch_is_an_error() {
        let sampler = WeightedSampler::new(vec![1.0, 1.0, 1.0]).unwrap();
        assert!(sampler.forward(layers(), None).is_err());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        assert!(WeightedSampler::new(vec![]).is_err());
        assert!(WeightedSampler::new(vec![0.0, 0.0]).is_err());
        assert!(WeightedSampler::new(vec![1.0, -0.5]).is_err());
    }

    #[test]
    fn test_non_finite_weights_rejected() {
        assert!(WeightedSampler::new(vec![1.0, f32::NAN]).is_err());
        assert!(WeightedSampler::new(vec![f32::INFINITY, 1.0]).is_err());

        let sampler = WeightedSampler::new(vec![1.0, 1.0]).unwrap();
        assert!(sampler.forward(layers(), Some(&[f32::NAN, 1.0])).is_err());
    }

    #[test]
    fn test_layer_sampler_dispatch() {
        let uniform = LayerSampler::from_kind(SamplerKind::Uniform, &[]).unwrap();
        assert_eq!(values(uniform.forward(layers()).unwrap()), vec![2.0, 3.0]);

        assert!(LayerSampler::from_kind(SamplerKind::Weighted, &[]).is_err());
    }
}
