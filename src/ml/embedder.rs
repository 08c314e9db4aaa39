// ============================================================
// Layer 5 — Embedder
// ============================================================
// Inference side of a trained run:
//
//   1. read train_config.json      → rebuild the encoder shape
//   2. load encoder.mpk.gz         → best-epoch weights
//   3. load tokenizer.json         → the training vocabulary
//   4. [CLS] tokens [SEP] + pad    → ids / mask / types [n, seq]
//   5. pooler output               → sentence embeddings [n, hidden]
//
// The cosine-similarity matrix of the embeddings is what the
// `similarity` command prints.
//
// Reference: Gao et al. (2021) SimCSE, §6 (evaluation uses [CLS]
//            representations with the pooler)

use anyhow::{anyhow, Result};
use burn::prelude::*;
use tokenizers::Tokenizer;

use crate::data::{
    encoding::{EncodedText, SequenceEncoder},
    preprocessor::Preprocessor,
};
use crate::domain::traits::SentenceEmbedder;
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::{encoder::SentenceEncoder, similarity::pairwise_cosine};

type InferBackend = burn::backend::Wgpu;

pub struct Embedder<B: Backend> {
    encoder:      SentenceEncoder<B>,
    tokenizer:    Tokenizer,
    sequence:     SequenceEncoder,
    preprocessor: Preprocessor,
    device:       B::Device,
}

impl Embedder<InferBackend> {
    /// Load on the default WGPU device.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        Self::load(ckpt_manager, device)
    }
}

impl<B: Backend> Embedder<B> {
    pub fn new(
        encoder:   SentenceEncoder<B>,
        tokenizer: Tokenizer,
        sequence:  SequenceEncoder,
        device:    B::Device,
    ) -> Self {
        Self { encoder, tokenizer, sequence, preprocessor: Preprocessor::default(), device }
    }

    pub fn load(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg       = ckpt_manager.load_config()?;
        let tokenizer = TokenizerStore::new(ckpt_manager.dir()).load()?;
        let sequence  = SequenceEncoder::for_tokenizer(&tokenizer, cfg.max_seq_len)?;

        let encoder = cfg.encoder_config().with_dropout(0.0).init::<B>(&device);
        let encoder = ckpt_manager.load_encoder(encoder, &device)?;
        tracing::info!(
            "Encoder loaded from '{}' ({:?} run, {} layers)",
            ckpt_manager.dir().display(),
            cfg.objective,
            cfg.num_layers
        );

        Ok(Self {
            encoder,
            tokenizer,
            sequence,
            preprocessor: Preprocessor::new(cfg.min_chars),
            device,
        })
    }

    fn encode(&self, sentences: &[String]) -> Result<Vec<EncodedText>> {
        sentences
            .iter()
            .map(|s| self.sequence.encode(&self.tokenizer, &self.preprocessor.clean(s)))
            .collect()
    }

    fn to_tensor(&self, rows: &[EncodedText], field: fn(&EncodedText) -> &Vec<u32>) -> Tensor<B, 2, Int> {
        let flat: Vec<i32> = rows.iter().flat_map(|r| field(r).iter().map(|&x| x as i32)).collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([rows.len(), self.sequence.max_seq_len()])
    }

    /// sentences → [n, hidden]
    pub fn embed_tensor(&self, sentences: &[String]) -> Result<Tensor<B, 2>> {
        anyhow::ensure!(!sentences.is_empty(), "no sentences to embed");
        let encoded = self.encode(sentences)?;

        self.encoder.embed(
            self.to_tensor(&encoded, |e| &e.input_ids),
            self.to_tensor(&encoded, |e| &e.attention_mask),
            Some(self.to_tensor(&encoded, |e| &e.token_type_ids)),
        )
    }

    /// Cosine similarity of every sentence against every other, [n][n].
    pub fn similarity_matrix(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }
        let emb = self.embed_tensor(sentences)?;
        into_rows(pairwise_cosine(emb.clone(), emb))
    }
}

impl<B: Backend> SentenceEmbedder for Embedder<B> {
    fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }
        into_rows(self.embed_tensor(sentences)?)
    }
}

fn into_rows<B: Backend>(t: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [_, cols] = t.dims();
    let flat: Vec<f32> = t
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| anyhow!("Cannot read tensor data: {e:?}"))?;
    Ok(flat.chunks(cols.max(1)).map(<[f32]>::to_vec).collect())
}
