// ============================================================
// Layer 4 — Sequence Encoding
// ============================================================
// Turns a sentence into fixed-length model input:
//
//   [CLS] tokens... [SEP] [PAD] [PAD] ...      length = max_seq_len
//     1     1...      1     0     0            attention_mask
//     0     0...      0     0     0            token_type_ids
//
// Sentences longer than max_seq_len - 2 tokens are truncated
// before [SEP] is appended, so every sequence still ends in
// [SEP]. Special-token ids are looked up in the tokenizer's
// vocabulary and fall back to the BERT convention.
//
// Reference: Devlin et al. (2019) BERT, §3 (input representation)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

pub const DEFAULT_PAD_ID: u32 = 0;
pub const DEFAULT_CLS_ID: u32 = 101;
pub const DEFAULT_SEP_ID: u32 = 102;

/// One encoded sentence, padded to max_seq_len.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedText {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub token_type_ids: Vec<u32>,
}

impl EncodedText {
    /// Number of real (non-padding) tokens.
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

#[derive(Debug, Clone)]
pub struct SequenceEncoder {
    max_seq_len: usize,
    cls_id:      u32,
    sep_id:      u32,
    pad_id:      u32,
}

impl SequenceEncoder {
    pub fn new(max_seq_len: usize, cls_id: u32, sep_id: u32, pad_id: u32) -> Result<Self> {
        ensure!(max_seq_len >= 2, "max_seq_len must leave room for [CLS] and [SEP], got {max_seq_len}");
        Ok(Self { max_seq_len, cls_id, sep_id, pad_id })
    }

    /// Read special-token ids from the tokenizer vocabulary.
    pub fn for_tokenizer(tokenizer: &Tokenizer, max_seq_len: usize) -> Result<Self> {
        let id = |token: &str, fallback: u32| tokenizer.token_to_id(token).unwrap_or(fallback);
        Self::new(
            max_seq_len,
            id("[CLS]", DEFAULT_CLS_ID),
            id("[SEP]", DEFAULT_SEP_ID),
            id("[PAD]", DEFAULT_PAD_ID),
        )
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    /// Wrap already-tokenised ids with [CLS]/[SEP], truncate and pad.
    pub fn from_ids(&self, ids: &[u32]) -> EncodedText {
        let body = ids.len().min(self.max_seq_len - 2);

        let mut input_ids = Vec::with_capacity(self.max_seq_len);
        input_ids.push(self.cls_id);
        input_ids.extend_from_slice(&ids[..body]);
        input_ids.push(self.sep_id);

        let real = input_ids.len();
        let mut attention_mask = vec![1u32; real];

        input_ids.resize(self.max_seq_len, self.pad_id);
        attention_mask.resize(self.max_seq_len, 0);

        EncodedText {
            input_ids,
            attention_mask,
            token_type_ids: vec![0u32; self.max_seq_len],
        }
    }

    pub fn encode(&self, tokenizer: &Tokenizer, text: &str) -> Result<EncodedText> {
        let enc = tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(self.from_ids(enc.get_ids()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_and_pads() {
        let enc = SequenceEncoder::new(6, 101, 102, 0).unwrap();
        let out = enc.from_ids(&[7, 8]);

        assert_eq!(out.input_ids, vec![101, 7, 8, 102, 0, 0]);
        assert_eq!(out.attention_mask, vec![1, 1, 1, 1, 0, 0]);
        assert_eq!(out.token_type_ids, vec![0; 6]);
        assert_eq!(out.real_len(), 4);
    }

    #[test]
    fn test_truncation_keeps_sep_last() {
        let enc = SequenceEncoder::new(4, 101, 102, 0).unwrap();
        let out = enc.from_ids(&[1, 2, 3, 4, 5]);

        assert_eq!(out.input_ids, vec![101, 1, 2, 102]);
        assert_eq!(out.attention_mask, vec![1; 4]);
    }

    #[test]
    fn test_empty_sentence_is_cls_sep() {
        let enc = SequenceEncoder::new(3, 101, 102, 0).unwrap();
        assert_eq!(enc.from_ids(&[]).input_ids, vec![101, 102, 0]);
    }

    #[test]
    fn test_too_short_max_len_rejected() {
        assert!(SequenceEncoder::new(1, 101, 102, 0).is_err());
    }
}
