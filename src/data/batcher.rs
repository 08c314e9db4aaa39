// ============================================================
// Layer 4 — Contrastive Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<ContrastSample>
// into [batch, views, seq_len] tensors.
//
//   Input:  N samples × V views × S tokens (all pre-padded)
//   Output: ContrastBatch with three Int tensors [N, V, S]
//
// The flat order is sample-major, then view, then token, so a
// plain reshape recovers the 3-D layout and a later reshape to
// [N·V, S] keeps each sample's views adjacent.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ContrastSample;

/// A batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ContrastBatch<B: Backend> {
    /// [batch, views, seq_len]
    pub input_ids: Tensor<B, 3, Int>,

    /// [batch, views, seq_len], 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 3, Int>,

    /// [batch, views, seq_len]
    pub token_type_ids: Tensor<B, 3, Int>,
}

#[derive(Clone, Debug)]
pub struct ContrastBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ContrastBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack(
        &self,
        items: &[ContrastSample],
        field: impl Fn(&crate::data::encoding::EncodedText) -> &Vec<u32>,
        shape: [usize; 3],
    ) -> Tensor<B, 3, Int> {
        let flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.views.iter())
            .flat_map(|v| field(v).iter().map(|&x| x as i32))
            .collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape(shape)
    }
}

impl<B: Backend> Batcher<ContrastSample, ContrastBatch<B>> for ContrastBatcher<B> {
    fn batch(&self, items: Vec<ContrastSample>) -> ContrastBatch<B> {
        let batch_size = items.len();
        let views      = items.first().map(|s| s.num_views()).unwrap_or(0);
        let seq_len    = items.first().map(|s| s.seq_len()).unwrap_or(0);
        let shape      = [batch_size, views, seq_len];

        ContrastBatch {
            input_ids:      self.stack(&items, |v| &v.input_ids, shape),
            attention_mask: self.stack(&items, |v| &v.attention_mask, shape),
            token_type_ids: self.stack(&items, |v| &v.token_type_ids, shape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoding::SequenceEncoder;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_batch_layout() {
        let enc = SequenceEncoder::new(4, 101, 102, 0).unwrap();
        let items = vec![
            ContrastSample { views: vec![enc.from_ids(&[5]), enc.from_ids(&[6, 7])] },
            ContrastSample { views: vec![enc.from_ids(&[8]), enc.from_ids(&[])] },
        ];

        let batch = ContrastBatcher::<TestBackend>::new(Default::default()).batch(items);
        assert_eq!(batch.input_ids.dims(), [2, 2, 4]);

        let ids: Vec<i64> = batch.input_ids.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(
            ids,
            vec![101, 5, 102, 0, 101, 6, 7, 102, 101, 8, 102, 0, 101, 102, 0, 0]
        );

        let mask: Vec<i64> = batch.attention_mask.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(&mask[12..], &[1, 1, 0, 0]);
    }
}
