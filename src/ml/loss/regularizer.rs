// ============================================================
// Layer 5 — Distance Regularisers
// ============================================================
// Keep the trainable encoder close to where it started:
//
//   RegHiddenLoss: sqrt( Σ_k || h1_k − h2_k ||² )   over hidden states
//   RegLoss:       sqrt( Σ_p || θ1_p − θ2_p ||² )   over parameters
//
// A tiny constant is added under the square root: at θ1 == θ2
// the derivative of sqrt is unbounded and would turn the
// (zero) gradient into NaN.
//
// Reference: Kim et al. (2021) Self-Guided Contrastive Learning, eq. (4)

use anyhow::{ensure, Result};
use burn::prelude::*;

use crate::ml::params::ParamCollector;

const SQRT_EPS: f64 = 1e-12;

fn euclidean<B: Backend>(squared: Vec<Tensor<B, 1>>) -> Tensor<B, 1> {
    Tensor::cat(squared, 0).sum().add_scalar(SQRT_EPS).sqrt()
}

/// Distance between two lists of hidden-state tensors.
#[derive(Debug, Clone, Default)]
pub struct RegHiddenLoss;

impl RegHiddenLoss {
    pub fn forward<B: Backend, const D: usize>(
        &self,
        hidden1: &[Tensor<B, D>],
        hidden2: &[Tensor<B, D>],
    ) -> Result<Tensor<B, 1>> {
        ensure!(
            hidden1.len() == hidden2.len(),
            "hidden-state lists differ in length: {} vs {}",
            hidden1.len(),
            hidden2.len()
        );
        ensure!(!hidden1.is_empty(), "no hidden states to compare");

        let mut squared = Vec::with_capacity(hidden1.len());
        for (h1, h2) in hidden1.iter().zip(hidden2) {
            ensure!(h1.dims() == h2.dims(), "hidden-state shapes differ: {:?} vs {:?}", h1.dims(), h2.dims());
            squared.push((h1.clone() - h2.clone()).powf_scalar(2.0).sum());
        }
        Ok(euclidean(squared))
    }
}

/// Distance between the parameters of two modules of the same architecture.
#[derive(Debug, Clone, Default)]
pub struct RegLoss;

impl RegLoss {
    pub fn forward<B: Backend, M: Module<B>>(&self, model1: &M, model2: &M) -> Result<Tensor<B, 1>> {
        let p1 = ParamCollector::collect(model1);
        let p2 = ParamCollector::collect(model2);

        ensure!(
            p1.tensors.len() == p2.tensors.len(),
            "modules differ in parameter count: {} vs {}",
            p1.tensors.len(),
            p2.tensors.len()
        );
        ensure!(!p1.tensors.is_empty(), "module has no parameters");
        ensure!(p1.shapes == p2.shapes, "modules differ in parameter shapes");

        let squared = p1
            .tensors
            .into_iter()
            .zip(p2.tensors)
            .map(|(a, b)| (a - b).powf_scalar(2.0).sum())
            .collect();
        Ok(euclidean(squared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::params::copy_weights;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::{ModuleMapper, ParamId};
    use burn::nn::LinearConfig;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    struct AddOne;

    impl<B: Backend> ModuleMapper<B> for AddOne {
        fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
            tensor.add_scalar(1.0)
        }
    }

    fn scalar<B: Backend>(t: Tensor<B, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    #[test]
    fn test_reg_hidden_distance() {
        let device = Default::default();
        let h1 = vec![
            Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 2.0]]), &device),
            Tensor::<TestBackend, 2>::from_data(TensorData::from([[3.0_f32, 0.0]]), &device),
        ];
        let h2 = vec![
            Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 0.0]]), &device),
            Tensor::<TestBackend, 2>::from_data(TensorData::from([[0.0_f32, 0.0]]), &device),
        ];
        // sqrt(2² + 3²)
        let loss = RegHiddenLoss.forward(&h1, &h2).unwrap();
        assert!((scalar(loss) - 13.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_reg_hidden_length_mismatch() {
        let device = Default::default();
        let h = vec![Tensor::<TestBackend, 1>::from_data(TensorData::from([1.0_f32]), &device)];
        assert!(RegHiddenLoss.forward(&h, &[]).is_err());
    }

    #[test]
    fn test_reg_hidden_shape_mismatch() {
        let device = Default::default();
        let h1 = vec![Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 2.0]]), &device)];
        let h2 = vec![Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32], [2.0]]), &device)];

        let err = RegHiddenLoss.forward(&h1, &h2).unwrap_err();
        assert!(err.to_string().contains("shapes differ"), "{err}");
    }

    #[test]
    fn test_reg_loss_identical_modules_is_zero() {
        let device = Default::default();
        let a = LinearConfig::new(2, 3).init::<TestBackend>(&device);
        let b = copy_weights(&a, LinearConfig::new(2, 3).init::<TestBackend>(&device)).unwrap();
        assert!(scalar(RegLoss.forward(&a, &b).unwrap()) < 1e-4);
    }

    #[test]
    fn test_reg_loss_counts_every_parameter() {
        let device = Default::default();
        let a = LinearConfig::new(2, 3).init::<TestBackend>(&device);
        let b = a.clone().map(&mut AddOne);
        // 9 parameters, each off by one
        assert!((scalar(RegLoss.forward(&a, &b).unwrap()) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_reg_loss_gradient_is_finite_at_zero_distance() {
        let device = Default::default();
        let trainable = LinearConfig::new(2, 3).init::<TestAutodiffBackend>(&device);
        let frozen = copy_weights(&trainable, LinearConfig::new(2, 3).init(&device))
            .unwrap()
            .no_grad();

        let grads = RegLoss.forward(&trainable, &frozen).unwrap().backward();
        let grad = trainable.weight.val().grad(&grads).expect("trainable weight has a gradient");
        let values: Vec<f32> = grad.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }
}
