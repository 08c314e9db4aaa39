use anyhow::{ensure, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::encoding::{EncodedText, SequenceEncoder};
use crate::domain::sentence::ViewTexts;

/// One training example: every view tokenised and padded to the same length.
/// Unsupervised = 2 views, supervised = 3, self-guided = 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContrastSample {
    pub views: Vec<EncodedText>,
}

impl ContrastSample {
    pub fn encode(texts: &ViewTexts, tokenizer: &Tokenizer, encoder: &SequenceEncoder) -> Result<Self> {
        let views = texts
            .0
            .iter()
            .map(|t| encoder.encode(tokenizer, t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { views })
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    pub fn seq_len(&self) -> usize {
        self.views.first().map(|v| v.input_ids.len()).unwrap_or(0)
    }
}

pub struct ContrastDataset {
    samples: Vec<ContrastSample>,
}

impl ContrastDataset {
    /// All samples must share one view count and one sequence length.
    pub fn new(samples: Vec<ContrastSample>) -> Result<Self> {
        if let Some(first) = samples.first() {
            let (views, seq) = (first.num_views(), first.seq_len());
            ensure!(views > 0, "samples must carry at least one view");
            for (i, s) in samples.iter().enumerate() {
                ensure!(
                    s.num_views() == views && s.views.iter().all(|v| v.input_ids.len() == seq),
                    "sample {i} has shape ({}, {}), expected ({views}, {seq})",
                    s.num_views(),
                    s.seq_len()
                );
            }
        }
        Ok(Self { samples })
    }
}

impl Dataset<ContrastSample> for ContrastDataset {
    fn get(&self, index: usize) -> Option<ContrastSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(views: usize, seq: usize) -> ContrastSample {
        let encoder = SequenceEncoder::new(seq, 101, 102, 0).unwrap();
        ContrastSample { views: (0..views).map(|_| encoder.from_ids(&[5])).collect() }
    }

    #[test]
    fn test_dataset_get_and_len() {
        let ds = ContrastDataset::new(vec![sample(2, 4), sample(2, 4)]).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().num_views(), 2);
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_dataset_rejects_ragged_samples() {
        assert!(ContrastDataset::new(vec![sample(2, 4), sample(3, 4)]).is_err());
        assert!(ContrastDataset::new(vec![sample(2, 4), sample(2, 5)]).is_err());
    }

    #[test]
    fn test_empty_dataset_is_allowed() {
        assert_eq!(ContrastDataset::new(Vec::new()).unwrap().len(), 0);
    }
}
