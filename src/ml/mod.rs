// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here.
//
//   similarity.rs  — batched cosine similarity
//   encoder.rs     — BERT-style transformer encoder returning
//                    every layer's hidden states and a pooler
//   pooling.rs     — CLS / mean / max token pooling, layer stacking
//   sampler.rs     — uniform and weighted layer samplers
//   params.rs      — parameter visitor and weight copying
//   loss/          — SimCSE, self-guided and regulariser losses
//   contrastive.rs — the ContrastiveModel trait the trainer drives
//   simcse.rs      — unsupervised / supervised SimCSE wrappers
//   self_guided.rs — trainable + frozen encoder pair with projection
//   trainer.rs     — Adam training loop with validation
//   embedder.rs    — checkpoint loading and sentence embeddings
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Devlin et al. (2019) BERT

pub mod similarity;

pub mod encoder;

pub mod pooling;

pub mod sampler;

pub mod params;

pub mod loss;

pub mod contrastive;

pub mod simcse;

pub mod self_guided;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Loads a trained encoder and embeds sentences
pub mod embedder;
