// ============================================================
// Layer 5 — Total Self-Guided Loss
// ============================================================
//   loss = L_sg(cls, sampler?(hiddens)) + λ · RegLoss(θ_T, θ_F)
//
// The sampler only runs for objectives that compare against a
// single [batch, hidden] summary (opt2); opt3 and its simplified
// form consume the full [batch, layers, hidden] stack.
//
// Reference: Kim et al. (2021) Self-Guided Contrastive Learning, eq. (5)

use anyhow::Result;
use burn::prelude::*;

use super::{
    regularizer::RegLoss,
    self_guided::SelfGuidedLoss,
};
use crate::domain::objective::{SamplerKind, SelfGuidedVariant};
use crate::ml::sampler::LayerSampler;

#[derive(Config, Debug)]
pub struct TotalLossConfig {
    pub variant: SelfGuidedVariant,
    pub sampler: SamplerKind,
    #[config(default = "Vec::new()")]
    pub layer_weights: Vec<f32>,
    #[config(default = 0.05)]
    pub temperature: f64,
    #[config(default = 0.1)]
    pub lambda: f64,
}

impl TotalLossConfig {
    pub fn init(&self) -> Result<TotalLoss> {
        let sampler = if self.variant.uses_sampler() {
            Some(LayerSampler::from_kind(self.sampler, &self.layer_weights)?)
        } else {
            None
        };
        Ok(TotalLoss {
            objective: SelfGuidedLoss::new(self.variant, self.temperature),
            sampler,
            regularizer: RegLoss,
            lambda: self.lambda,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TotalLoss {
    pub objective:   SelfGuidedLoss,
    pub sampler:     Option<LayerSampler>,
    pub regularizer: RegLoss,
    pub lambda:      f64,
}

impl TotalLoss {
    /// cls: [batch, hidden]; hiddens: [batch, layers, hidden];
    /// `trainable` and `frozen` must share one architecture.
    pub fn forward<B: Backend, M: Module<B>>(
        &self,
        cls:       Tensor<B, 2>,
        hiddens:   Tensor<B, 3>,
        trainable: &M,
        frozen:    &M,
    ) -> Result<Tensor<B, 1>> {
        let sg = self.contrastive(cls, hiddens)?;
        let reg = self.regularizer.forward(trainable, frozen)?;
        Ok(sg + reg * self.lambda)
    }

    /// The self-guided term alone.
    pub fn contrastive<B: Backend>(&self, cls: Tensor<B, 2>, hiddens: Tensor<B, 3>) -> Result<Tensor<B, 1>> {
        match &self.objective {
            SelfGuidedLoss::Opt2(loss) => {
                let sampled = match &self.sampler {
                    Some(sampler) => sampler.forward(hiddens)?,
                    None => LayerSampler::Uniform(Default::default()).forward(hiddens)?,
                };
                Ok(loss.forward(cls, sampled)?.0)
            }
            SelfGuidedLoss::Opt3(loss) => loss.forward(cls, hiddens),
            SelfGuidedLoss::Opt3Simplified(loss) => loss.forward(cls, hiddens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::loss::self_guided::{SgLossOpt2, SgLossOpt3};
    use crate::ml::params::copy_weights;
    use burn::backend::NdArray;
    use burn::nn::LinearConfig;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    fn inputs() -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 3>) {
        let device = Default::default();
        let cls = Tensor::from_data(TensorData::from([[1.0_f32, 0.2], [0.1, 0.8]]), &device);
        let hiddens = Tensor::from_data(
            TensorData::from([[[0.9_f32, 0.1], [0.7, 0.3]], [[0.2, 1.0], [0.0, 0.6]]]),
            &device,
        );
        (cls, hiddens)
    }

    #[test]
    fn test_opt3_skips_sampler() {
        let loss = TotalLossConfig::new(SelfGuidedVariant::Opt3, SamplerKind::Weighted)
            .init()
            .unwrap();
        assert!(loss.sampler.is_none());

        let (cls, hiddens) = inputs();
        let direct = SgLossOpt3::new(0.05).forward(cls.clone(), hiddens.clone()).unwrap();
        let via_total = loss.contrastive(cls, hiddens).unwrap();
        assert!((scalar(direct) - scalar(via_total)).abs() < 1e-5);
    }

    #[test]
    fn test_opt2_requires_matching_weights() {
        let config = TotalLossConfig::new(SelfGuidedVariant::Opt2, SamplerKind::Weighted)
            .with_layer_weights(vec![1.0, 1.0, 1.0]);
        let loss = config.init().unwrap();

        let (cls, hiddens) = inputs();
        assert!(loss.contrastive(cls, hiddens).is_err());
    }

    #[test]
    fn test_opt2_weighted_sampler_picks_layers() {
        let loss = TotalLossConfig::new(SelfGuidedVariant::Opt2, SamplerKind::Weighted)
            .with_layer_weights(vec![0.0, 3.0])
            .init()
            .unwrap();
        assert!(matches!(loss.sampler, Some(LayerSampler::Weighted(_))));

        // all weight on layer 1: the same as opt2 against that layer directly
        let (cls, hiddens) = inputs();
        let second_layer = Tensor::<TestBackend, 2>::from_data(
            TensorData::from([[0.7_f32, 0.3], [0.0, 0.6]]),
            &Default::default(),
        );
        let (direct, _) = SgLossOpt2::new(0.05).forward(cls.clone(), second_layer).unwrap();
        let via_total = loss.contrastive(cls, hiddens).unwrap();
        assert!((scalar(direct) - scalar(via_total)).abs() < 1e-5);
    }

    #[test]
    fn test_lambda_scales_regulariser() {
        let device = Default::default();
        let trainable = LinearConfig::new(2, 2).init::<TestBackend>(&device);
        let frozen = LinearConfig::new(2, 2).init::<TestBackend>(&device);
        let same = copy_weights(&trainable, LinearConfig::new(2, 2).init(&device)).unwrap();

        let config = TotalLossConfig::new(SelfGuidedVariant::Opt2, SamplerKind::Uniform).with_lambda(2.0);
        let loss = config.init().unwrap();
        let (cls, hiddens) = inputs();

        let sg = scalar(loss.contrastive(cls.clone(), hiddens.clone()).unwrap());
        let reg = scalar(RegLoss.forward(&trainable, &frozen).unwrap());

        let total = scalar(loss.forward(cls.clone(), hiddens.clone(), &trainable, &frozen).unwrap());
        assert!((total - (sg + 2.0 * reg)).abs() < 1e-4);

        let unchanged = scalar(loss.forward(cls, hiddens, &trainable, &same).unwrap());
        assert!((unchanged - sg).abs() < 1e-4);
    }
}
