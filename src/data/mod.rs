// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a corpus file on disk to tensor batches.
//
//   corpus file (.txt / .tsv / .csv)
//       │
//       ▼
//   CorpusLoader      → sentences or NLI triplets
//       │
//       ▼
//   Preprocessor      → whitespace / control-char cleanup
//       │
//       ▼
//   SequenceEncoder   → [CLS] tokens [SEP] + padding, per view
//       │
//       ▼
//   ContrastDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   ContrastBatcher   → stacks samples into [batch, views, seq]
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads sentence and triplet corpora from disk
pub mod loader;

/// Cleans and normalises raw text
pub mod preprocessor;

/// Tokenises, truncates and pads one view
pub mod encoding;

/// Implements Burn's Dataset trait for contrastive samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
