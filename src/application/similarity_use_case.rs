// ============================================================
// Layer 2 — SimilarityUseCase
// ============================================================
// Loads the trained encoder from a checkpoint directory and
// scores sentences against each other:
//
//   Step 1: Rebuild the embedder   (Layer 5 - ml, Layer 6 - infra)
//   Step 2: Embed all sentences    (Layer 5 - ml)
//   Step 3: Cosine-similarity grid (Layer 5 - ml)

use anyhow::{ensure, Result};

use crate::domain::traits::SentenceEmbedder;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::embedder::Embedder;

pub struct SimilarityUseCase {
    embedder: Embedder<burn::backend::Wgpu>,
}

impl SimilarityUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let ckpt_manager = CheckpointManager::new(checkpoint_dir)?;
        let embedder     = Embedder::from_checkpoint(&ckpt_manager)?;
        Ok(Self { embedder })
    }

    /// [n][n] cosine similarities, row i against every sentence.
    pub fn matrix(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>> {
        ensure!(!sentences.is_empty(), "give at least one --sentence");
        tracing::info!("Scoring {} sentences", sentences.len());
        self.embedder.similarity_matrix(sentences)
    }

    pub fn embeddings(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embedder.embed(sentences)
    }
}

/// Render a similarity matrix as an aligned text table.
pub fn format_matrix(sentences: &[String], matrix: &[Vec<f32>]) -> String {
    let mut out = String::new();
    for (i, s) in sentences.iter().enumerate() {
        out.push_str(&format!("[{i}] {s}\n"));
    }
    out.push('\n');

    out.push_str("     ");
    for j in 0..matrix.len() {
        out.push_str(&format!("{:>8}", format!("[{j}]")));
    }
    out.push('\n');

    for (i, row) in matrix.iter().enumerate() {
        out.push_str(&format!("{:<5}", format!("[{i}]")));
        for v in row {
            out.push_str(&format!("{v:>8.4}"));
        }
        out.push('\n');
    }
    out
}
