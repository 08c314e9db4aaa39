// ============================================================
// Layer 3 — Training Examples
// ============================================================
// What one training example looks like before tokenisation.
//
//   Unsupervised / self-guided: a single sentence. Unsupervised
//   SimCSE feeds it twice, the dropout noise makes the pair.
//
//   Supervised: an NLI triplet. The entailment is the positive
//   for the premise, the contradiction its hard negative.
//
// Reference: Gao et al. (2021) SimCSE, §4 (NLI as supervision)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NliTriplet {
    pub premise:       String,
    pub entailment:    String,
    pub contradiction: String,
}

impl NliTriplet {
    pub fn new(
        premise:       impl Into<String>,
        entailment:    impl Into<String>,
        contradiction: impl Into<String>,
    ) -> Self {
        Self {
            premise:       premise.into(),
            entailment:    entailment.into(),
            contradiction: contradiction.into(),
        }
    }

    /// Views in the order the supervised model expects them.
    pub fn views(&self) -> [&str; 3] {
        [&self.premise, &self.entailment, &self.contradiction]
    }
}

/// One example as a list of texts, one per encoded view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTexts(pub Vec<String>);

impl ViewTexts {
    /// The same sentence repeated `views` times.
    pub fn repeated(sentence: &str, views: usize) -> Self {
        Self(vec![sentence.to_string(); views])
    }
}
