// ============================================================
// Layer 5 — Self-Guided Contrastive Losses
// ============================================================
// c_i    = [CLS] vector of sentence i from the trainable encoder
// h_{m,n}= pooled layer n of sentence m from the frozen encoder
// s(i, m, n) = cos(c_i, h_{m,n}) / τ
//
// opt2  — SimCSE loss between c and a sampled layer summary
//         (input already reduced to [batch, hidden]).
//
// opt3  — SG-OPT. For every sentence i and layer k:
//           ℓ_ik = -log  e^{s(i,i,k)}
//                       ───────────────────────────────────────
//                       e^{s(i,i,k)} + Σ_{m≠i} Σ_n e^{s(i,m,n)}
//         loss = mean over (i, k).
//
// opt3 simplified — numerator summed in log space over all (i,k),
//         denominator summed over every sentence (including i)
//         and every layer:
//           loss = -Σ_{i,k} s(i,i,k) + Σ_i log Σ_{m,n} e^{s(i,m,n)}
//
// All three are computed with matrix ops over [B, B·L]; column
// m·L + n holds layer n of sentence m.
//
// Reference: Kim et al. (2021) Self-Guided Contrastive Learning
//            for BERT Sentence Representations, §3.2

use anyhow::{ensure, Result};
use burn::{prelude::*, tensor::TensorData};

use super::simcse::UnsupContrastiveLoss;
use crate::domain::objective::SelfGuidedVariant;
use crate::ml::similarity::l2_normalize;

/// opt2: identical formula to the unsupervised SimCSE loss.
#[derive(Debug, Clone)]
pub struct SgLossOpt2 {
    inner: UnsupContrastiveLoss,
}

impl SgLossOpt2 {
    pub fn new(temperature: f64) -> Self {
        Self { inner: UnsupContrastiveLoss { temperature } }
    }

    /// cls, sampled: [batch, hidden] → (loss [1], sim [batch, batch])
    pub fn forward<B: Backend>(
        &self,
        cls:     Tensor<B, 2>,
        sampled: Tensor<B, 2>,
    ) -> Result<(Tensor<B, 1>, Tensor<B, 2>)> {
        self.inner.forward(cls, sampled)
    }
}

/// Similarities shared by both opt3 variants, already divided by τ.
struct LayerSimilarities<B: Backend> {
    /// s(i, i, k): [batch, layers]
    own:   Tensor<B, 2>,
    /// s(i, m, n): [batch, batch * layers]
    all:   Tensor<B, 2>,
    batch:  usize,
    layers: usize,
}

fn layer_similarities<B: Backend>(
    cls:         Tensor<B, 2>,
    hidden:      Tensor<B, 3>,
    temperature: f64,
) -> Result<LayerSimilarities<B>> {
    let [batch, layers, dim] = hidden.dims();
    let [cls_batch, cls_dim] = cls.dims();
    ensure!(batch > 0 && layers > 0, "self-guided loss: empty input {:?}", hidden.dims());
    ensure!(
        cls_batch == batch && cls_dim == dim,
        "self-guided loss: cls {:?} does not match hidden {:?}",
        cls.dims(),
        hidden.dims()
    );

    let c = l2_normalize(cls, 1); // [B, H]
    let h = l2_normalize(hidden, 2); // [B, L, H]

    let own = (c.clone().unsqueeze_dim::<3>(1) * h.clone())
        .sum_dim(2)
        .reshape([batch, layers])
        / temperature;
    let all = c.matmul(h.reshape([batch * layers, dim]).transpose()) / temperature;

    Ok(LayerSimilarities { own, all, batch, layers })
}

/// 1.0 where column m·L + n belongs to a different sentence than row i.
fn other_sentence_mask<B: Backend>(batch: usize, layers: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut mask = Vec::with_capacity(batch * batch * layers);
    for i in 0..batch {
        for m in 0..batch {
            let v = if m == i { 0.0_f32 } else { 1.0 };
            mask.extend(std::iter::repeat(v).take(layers));
        }
    }
    Tensor::from_data(TensorData::new(mask, [batch, batch * layers]), device)
}

/// Stand-in for -∞ that stays finite under f32 arithmetic.
const MASKED_OUT: f32 = -1.0e30;

/// Row-wise log Σ_j e^{x_ij} with the row max subtracted before `exp`.
/// x: [rows, cols] → [rows, 1]
fn log_sum_exp<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let shift = x.clone().max_dim(1).detach();
    (x - shift.clone()).exp().sum_dim(1).log() + shift
}

/// opt3 (SG-OPT), sampler not used.
#[derive(Debug, Clone)]
pub struct SgLossOpt3 {
    pub temperature: f64,
}

impl SgLossOpt3 {
    pub fn new(temperature: f64) -> Self {
        Self { temperature }
    }

    /// cls: [batch, hidden], hidden: [batch, layers, hidden] → loss [1]
    pub fn forward<B: Backend>(&self, cls: Tensor<B, 2>, hidden: Tensor<B, 3>) -> Result<Tensor<B, 1>> {
        let device = cls.device();
        let sims = layer_similarities(cls, hidden, self.temperature)?;
        let (batch, layers) = (sims.batch, sims.layers);

        // Own-sentence columns are pushed to MASKED_OUT so they never win the max
        // and vanish under exp.
        let mask = other_sentence_mask::<B>(batch, layers, &device);
        let negatives = sims.all * mask.clone() + (mask - 1.0) * (-MASKED_OUT);
        let neg_max = negatives.clone().max_dim(1).detach(); // [B, 1]
        let neg_sum = (negatives - neg_max.clone()).exp().sum_dim(1); // [B, 1]

        // shift_ik = max(s(i,i,k), max negative of row i)
        let neg_max = neg_max.expand([batch, layers]);
        let own = sims.own;
        let shift = own
            .clone()
            .mask_where(own.clone().lower(neg_max.clone()), neg_max.clone())
            .detach();

        // -log(e^s / (e^s + Σ e^neg)) = -s + shift + log(e^{s-shift} + e^{max-shift} Σ e^{neg-max})
        let positive = (own.clone() - shift.clone()).exp();
        let rest = (neg_max - shift.clone()).exp() * neg_sum.expand([batch, layers]);
        let denominator = (positive + rest).log() + shift;
        Ok((denominator - own).mean())
    }
}

/// Simplified opt3: summed rather than averaged.
#[derive(Debug, Clone)]
pub struct SgLossOpt3Simplified {
    pub temperature: f64,
}

impl SgLossOpt3Simplified {
    pub fn new(temperature: f64) -> Self {
        Self { temperature }
    }

    /// cls: [batch, hidden], hidden: [batch, layers, hidden] → loss [1]
    pub fn forward<B: Backend>(&self, cls: Tensor<B, 2>, hidden: Tensor<B, 3>) -> Result<Tensor<B, 1>> {
        let sims = layer_similarities(cls, hidden, self.temperature)?;

        let numerator = sims.own.sum().neg();
        let denominator = log_sum_exp(sims.all).sum();
        Ok(numerator + denominator)
    }
}

/// One of the three self-guided objectives.
#[derive(Debug, Clone)]
pub enum SelfGuidedLoss {
    Opt2(SgLossOpt2),
    Opt3(SgLossOpt3),
    Opt3Simplified(SgLossOpt3Simplified),
}

impl SelfGuidedLoss {
    pub fn new(variant: SelfGuidedVariant, temperature: f64) -> Self {
        match variant {
            SelfGuidedVariant::Opt2           => SelfGuidedLoss::Opt2(SgLossOpt2::new(temperature)),
            SelfGuidedVariant::Opt3           => SelfGuidedLoss::Opt3(SgLossOpt3::new(temperature)),
            SelfGuidedVariant::Opt3Simplified => SelfGuidedLoss::Opt3Simplified(SgLossOpt3Simplified::new(temperature)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::loss::simcse::UnsupContrastiveLossConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    fn cls() -> Tensor<TestBackend, 2> {
        Tensor::from_data(
            TensorData::from([[0.8_f32, -0.3, 0.5], [0.1, 0.9, -0.4], [-0.6, 0.2, 0.7]]),
            &Default::default(),
        )
    }

    fn single_layer() -> Tensor<TestBackend, 3> {
        Tensor::from_data(
            TensorData::from([[[0.7_f32, -0.1, 0.4]], [[0.3, 1.0, -0.2]], [[-0.5, 0.4, 0.9]]]),
            &Default::default(),
        )
    }

    #[test]
    fn test_opt3_with_one_layer_equals_simcse() {
        // With L = 1 the SG-OPT denominator is exactly the CE softmax denominator
        let tau = 0.5;
        let opt3 = SgLossOpt3::new(tau).forward(cls(), single_layer()).unwrap();

        let [b, _, h] = single_layer().dims();
        let (simcse, _) = UnsupContrastiveLossConfig::new()
            .with_temperature(tau)
            .init()
            .forward(cls(), single_layer().reshape([b, h]))
            .unwrap();

        assert!((scalar(opt3) - scalar(simcse)).abs() < 1e-4);
    }

    #[test]
    fn test_opt3_single_sentence_has_no_negatives() {
        let c = Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 0.0]]), &Default::default());
        let h = Tensor::<TestBackend, 3>::from_data(
            TensorData::from([[[0.5_f32, 0.5], [1.0, -2.0]]]),
            &Default::default(),
        );
        let loss = SgLossOpt3::new(1.0).forward(c, h).unwrap();
        assert!(scalar(loss).abs() < 1e-5);
    }

    #[test]
    fn test_opt3_mask_excludes_own_layers_only() {
        // B = 2, L = 2: sentence 0's own layers must not appear as negatives
        let c = Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 0.0], [0.0, 1.0]]), &Default::default());
        let h = Tensor::<TestBackend, 3>::from_data(
            TensorData::from([[[1.0_f32, 0.0], [1.0, 0.0]], [[0.0, 1.0], [0.0, 1.0]]]),
            &Default::default(),
        );
        // s(i,i,k) = 1, every negative has s = 0 → ℓ = -1 + ln(e + 2)
        let loss = SgLossOpt3::new(1.0).forward(c, h).unwrap();
        let expected = -1.0 + (std::f32::consts::E + 2.0).ln();
        assert!((scalar(loss) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_simplified_sums_over_sentences() {
        // own = 1 for both rows; each row's full denominator is e + 1
        let c = Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 0.0], [0.0, 1.0]]), &Default::default());
        let h = Tensor::<TestBackend, 3>::from_data(TensorData::from([[[1.0_f32, 0.0]], [[0.0, 1.0]]]), &Default::default());

        let loss = SgLossOpt3Simplified::new(1.0).forward(c, h).unwrap();
        let expected = 2.0 * ((std::f32::consts::E + 1.0).ln() - 1.0);
        assert!((scalar(loss) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_simplified_single_element_is_zero() {
        let c = Tensor::<TestBackend, 2>::from_data(TensorData::from([[0.3_f32, 0.4]]), &Default::default());
        let h = Tensor::<TestBackend, 3>::from_data(TensorData::from([[[0.6_f32, 0.8]]]), &Default::default());
        let loss = SgLossOpt3Simplified::new(0.05).forward(c, h).unwrap();
        assert!(scalar(loss).abs() < 1e-3);
    }

    #[test]
    fn test_mismatched_shapes_are_errors() {
        let c = Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 0.0]]), &Default::default());
        assert!(SgLossOpt3::new(1.0).forward(c.clone(), single_layer()).is_err());
        assert!(SgLossOpt3Simplified::new(1.0).forward(c, single_layer()).is_err());
    }

    #[test]
    fn test_low_temperature_stays_finite() {
        // τ = 0.01 puts every logit at 100; e^100 overflows f32
        let c = Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 0.0], [1.0, 0.0]]), &Default::default());
        let h = Tensor::<TestBackend, 3>::from_data(TensorData::from([[[1.0_f32, 0.0]], [[1.0, 0.0]]]), &Default::default());

        // positive and negative tie → ℓ = ln 2 per row
        let opt3 = scalar(SgLossOpt3::new(0.01).forward(c.clone(), h.clone()).unwrap());
        assert!((opt3 - std::f32::consts::LN_2).abs() < 1e-4, "opt3 = {opt3}");

        let simplified = scalar(SgLossOpt3Simplified::new(0.01).forward(c, h).unwrap());
        assert!((simplified - 2.0 * std::f32::consts::LN_2).abs() < 1e-3, "simplified = {simplified}");
    }

    #[test]
    fn test_low_temperature_single_sentence() {
        let c = Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 0.0]]), &Default::default());
        let h = Tensor::<TestBackend, 3>::from_data(
            TensorData::from([[[1.0_f32, 0.0], [-1.0, 0.0]]]),
            &Default::default(),
        );
        let loss = scalar(SgLossOpt3::new(0.005).forward(c, h).unwrap());
        assert!(loss.is_finite() && loss.abs() < 1e-5, "loss = {loss}");
    }

    #[test]
    fn test_low_temperature_gradients_are_finite() {
        use burn::backend::Autodiff;
        type Ad = Autodiff<NdArray<f32>>;

        let device = Default::default();
        let c = Tensor::<Ad, 2>::from_data(
            TensorData::from([[0.9_f32, 0.1, 0.0], [0.0, 1.0, 0.2], [-0.3, 0.0, 1.0]]),
            &device,
        )
        .require_grad();
        let h = Tensor::<Ad, 3>::from_data(
            TensorData::from([
                [[0.9_f32, 0.1, 0.0], [-0.9, 0.0, 0.1]],
                [[0.1, 1.0, 0.2], [0.0, -1.0, 0.0]],
                [[-0.3, 0.1, 1.0], [0.3, 0.0, -1.0]],
            ]),
            &device,
        );

        for loss in [
            SgLossOpt3::new(0.01).forward(c.clone(), h.clone()).unwrap(),
            SgLossOpt3Simplified::new(0.01).forward(c.clone(), h.clone()).unwrap(),
        ] {
            assert!(loss.clone().into_scalar().elem::<f32>().is_finite());
            let grads = loss.backward();
            let grad = c.grad(&grads).unwrap().into_data().to_vec::<f32>().unwrap();
            assert!(grad.iter().all(|g| g.is_finite()), "grad = {grad:?}");
        }
    }
}
