// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by training and inference:
//
//   checkpoint.rs      — model and encoder weights through Burn's
//                        CompactRecorder, plus TrainConfig as JSON
//                        so inference can rebuild the encoder
//
//   tokenizer_store.rs — picks a provided tokenizer.json or builds
//                        a word-level one from the corpus, and keeps
//                        it next to the checkpoints
//
//   metrics.rs         — per-epoch CSV of losses and alignment
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer selection, building, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
