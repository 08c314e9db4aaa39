// ============================================================
// Layer 5 — Cosine Similarity
// ============================================================
// Batched cosine similarity used by every contrastive loss.
//
//   pairwise_cosine(a [n, h], b [m, h]) → [n, m]
//   rowwise_cosine (a [n, h], b [n, h]) → [n]
//
// Each squared norm is clamped at COSINE_EPS² before the sqrt,
// so an all-zero row yields similarity 0 instead of NaN.
//
// Reference: Gao et al. (2021) SimCSE, §2

use burn::prelude::*;

pub const COSINE_EPS: f64 = 1e-8;

/// Divide each slice along `dim` by its L2 norm.
pub fn l2_normalize<B: Backend, const D: usize>(x: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
    let norm = x
        .clone()
        .powf_scalar(2.0)
        .sum_dim(dim)
        .clamp_min(COSINE_EPS * COSINE_EPS)
        .sqrt();
    x / norm
}

/// Cosine similarity of every row of `a` against every row of `b`.
pub fn pairwise_cosine<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 2> {
    let a = l2_normalize(a, 1);
    let b = l2_normalize(b, 1);
    a.matmul(b.transpose())
}

/// Cosine similarity of row i of `a` with row i of `b`.
pub fn rowwise_cosine<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 1> {
    let [n, _] = a.dims();
    let a = l2_normalize(a, 1);
    let b = l2_normalize(b, 1);
    (a * b).sum_dim(1).reshape([n])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    fn tensor2(data: [[f32; 2]; 2]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::from(data), &Default::default())
    }

    #[test]
    fn test_pairwise_cosine_orthogonal_and_parallel() {
        let a = tensor2([[1.0, 0.0], [0.0, 2.0]]);
        let b = tensor2([[3.0, 0.0], [1.0, 1.0]]);

        let sim: Vec<f32> = pairwise_cosine(a, b).into_data().to_vec().unwrap();
        let half_sqrt2 = std::f32::consts::FRAC_1_SQRT_2;

        assert!((sim[0] - 1.0).abs() < 1e-5);
        assert!((sim[1] - half_sqrt2).abs() < 1e-5);
        assert!(sim[2].abs() < 1e-5);
        assert!((sim[3] - half_sqrt2).abs() < 1e-5);
    }

    #[test]
    fn test_rowwise_matches_pairwise_diagonal() {
        let a = tensor2([[0.3, -1.2], [2.0, 0.5]]);
        let b = tensor2([[1.1, 0.4], [-0.7, 0.9]]);

        let pair: Vec<f32> = pairwise_cosine(a.clone(), b.clone()).into_data().to_vec().unwrap();
        let row: Vec<f32> = rowwise_cosine(a, b).into_data().to_vec().unwrap();

        assert!((row[0] - pair[0]).abs() < 1e-5);
        assert!((row[1] - pair[3]).abs() < 1e-5);
    }

    #[test]
    fn test_zero_vector_gives_zero_similarity() {
        let a = tensor2([[0.0, 0.0], [1.0, 0.0]]);
        let b = tensor2([[1.0, 0.0], [1.0, 0.0]]);

        let row: Vec<f32> = rowwise_cosine(a, b).into_data().to_vec().unwrap();
        assert!(row[0].is_finite());
        assert!(row[0].abs() < 1e-5);
        assert!((row[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_vector_has_finite_gradient() {
        use burn::backend::Autodiff;
        type Ad = Autodiff<NdArray<f32>>;

        let a = Tensor::<Ad, 2>::from_data(TensorData::from([[0.0_f32, 0.0], [1.0, 2.0]]), &Default::default())
            .require_grad();
        let b = Tensor::<Ad, 2>::from_data(TensorData::from([[1.0_f32, 0.0], [0.5, 0.5]]), &Default::default());

        let grads = pairwise_cosine(a.clone(), b).sum().backward();
        let grad: Vec<f32> = a.grad(&grads).unwrap().into_data().to_vec().unwrap();
        assert!(grad.iter().all(|g| g.is_finite()), "grad = {grad:?}");
    }
}
