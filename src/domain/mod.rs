// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types naming the concepts of the system: sentences,
// NLI triplets, training objectives, and the traits other layers
// implement. No Burn types, no file I/O.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Sentences and NLI triplets
pub mod sentence;

// Objective / sampler / pooling choices
pub mod objective;

// Core abstractions (traits) that other layers implement
pub mod traits;
