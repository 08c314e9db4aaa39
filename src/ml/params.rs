// ============================================================
// Layer 5 — Parameter Walking
// ============================================================
// Burn modules expose their parameters through the visitor /
// mapper pattern. Two walkers are needed here:
//
//   ParamCollector — flattens every float parameter, in
//                    declaration order, into a Vec<[numel]>
//   copy_weights   — overwrites a module's parameters with those
//                    of another module of identical architecture,
//                    keeping the target's own ParamIds so the two
//                    never alias in the optimiser or gradients
//
// Reference: Burn Book §3 (Module visitor and mapper)

use anyhow::{bail, Result};
use burn::{
    module::{ModuleMapper, ModuleVisitor, ParamId},
    prelude::*,
};

/// Collects every float parameter of a module, flattened.
pub struct ParamCollector<B: Backend> {
    pub tensors: Vec<Tensor<B, 1>>,
    pub shapes:  Vec<Vec<usize>>,
}

impl<B: Backend> ParamCollector<B> {
    pub fn collect<M: Module<B>>(module: &M) -> Self {
        let mut collector = Self { tensors: Vec::new(), shapes: Vec::new() };
        module.visit(&mut collector);
        collector
    }

    pub fn num_params(&self) -> usize {
        self.shapes.iter().map(|s| s.iter().product::<usize>()).sum()
    }
}

impl<B: Backend> ModuleVisitor<B> for ParamCollector<B> {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        let shape = tensor.dims().to_vec();
        let numel = shape.iter().product::<usize>();
        self.tensors.push(tensor.clone().reshape([numel]));
        self.shapes.push(shape);
    }
}

struct WeightCopier<B: Backend> {
    source:   std::vec::IntoIter<(Tensor<B, 1>, Vec<usize>)>,
    mismatch: Option<String>,
}

impl<B: Backend> ModuleMapper<B> for WeightCopier<B> {
    fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        let dims = tensor.dims();
        match self.source.next() {
            Some((src, shape)) if shape == dims.to_vec() => src.detach().reshape(dims),
            Some((_, shape)) => {
                self.mismatch
                    .get_or_insert_with(|| format!("parameter shape {:?} vs {:?}", shape, dims));
                tensor
            }
            None => {
                self.mismatch.get_or_insert_with(|| "source has fewer parameters".to_string());
                tensor
            }
        }
    }
}

/// Return `target` with every float parameter replaced by the matching one of `source`.
pub fn copy_weights<B: Backend, M: Module<B>>(source: &M, target: M) -> Result<M> {
    let collected = ParamCollector::collect(source);
    let pairs: Vec<_> = collected.tensors.into_iter().zip(collected.shapes).collect();
    let expected = pairs.len();

    let mut copier = WeightCopier { source: pairs.into_iter(), mismatch: None };
    let target = target.map(&mut copier);

    if let Some(reason) = copier.mismatch {
        bail!("cannot copy weights: {reason}");
    }
    if copier.source.len() > 0 {
        bail!(
            "cannot copy weights: target has {} parameters, source has {}",
            expected - copier.source.len(),
            expected
        );
    }
    Ok(target)
}
