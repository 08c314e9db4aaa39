// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these, so a corpus
// could come from a file, a database or an in-memory fixture,
// and embeddings from any trained model.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::sentence::NliTriplet;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can supply training text.
pub trait CorpusSource {
    /// Raw sentences, one per example.
    fn sentences(&self) -> Result<Vec<String>>;

    /// Premise / entailment / contradiction triplets.
    fn triplets(&self) -> Result<Vec<NliTriplet>>;
}

// ─── SentenceEmbedder ─────────────────────────────────────────────────────────
/// Anything that maps sentences to fixed-size vectors.
pub trait SentenceEmbedder {
    fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>>;
}
