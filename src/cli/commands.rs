// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `similarity`, and all
// their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::domain::objective::{Objective, PoolingStrategy, SamplerKind, SelfGuidedVariant};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a sentence encoder with a contrastive objective
    Train(TrainArgs),

    /// Print the cosine-similarity matrix of sentences under a trained encoder
    Similarity(SimilarityArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training objective
    #[arg(long, value_enum, default_value_t = Objective::Unsup)]
    pub objective: Objective,

    /// Corpus file: one sentence per line, or premise/entailment/contradiction
    /// rows (TSV, or CSV by extension) for the supervised objective
    #[arg(long = "data", default_value = "data/wiki1m.txt")]
    pub data_path: String,

    /// Directory to save checkpoints, metrics and the tokenizer
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Existing HuggingFace tokenizer.json; built from the corpus if omitted
    #[arg(long = "tokenizer")]
    pub tokenizer_path: Option<String>,

    /// Checkpoint directory whose encoder initialises this run;
    /// its encoder shape and tokenizer replace the flags here
    #[arg(long)]
    pub init_from: Option<String>,

    /// Maximum tokens per sentence, including [CLS] and [SEP]
    #[arg(long, default_value_t = 32)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    /// Share of examples held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Seed for the train/validation split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Drop sentences shorter than this many characters
    #[arg(long, default_value_t = 1)]
    pub min_chars: usize,

    /// Softmax temperature of every contrastive loss
    #[arg(long, default_value_t = 0.05)]
    pub temperature: f64,

    /// Self-guided loss variant
    #[arg(long, value_enum, default_value_t = SelfGuidedVariant::Opt3)]
    pub sg_variant: SelfGuidedVariant,

    /// Weight of the parameter-distance regulariser (self-guided)
    #[arg(long, default_value_t = 0.1)]
    pub lambda: f64,

    /// Layer sampler for the opt2 self-guided variant
    #[arg(long, value_enum, default_value_t = SamplerKind::Uniform)]
    pub sampler: SamplerKind,

    /// Comma-separated per-layer weights for the weighted sampler
    #[arg(long, value_delimiter = ',')]
    pub layer_weights: Vec<f32>,

    /// Token pooling applied to each frozen layer (self-guided)
    #[arg(long, value_enum, default_value_t = PoolingStrategy::Mean)]
    pub pooling: PoolingStrategy,

    /// Also treat the embedding output as a layer (self-guided)
    #[arg(long)]
    pub include_embeddings: bool,

    /// Hidden size of the projection head (self-guided)
    #[arg(long, default_value_t = 4096)]
    pub proj_dim: usize,

    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Hidden dimension of the encoder; must be divisible by num_heads
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    /// Dropout probability; for unsupervised SimCSE this is the augmentation
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            objective:       a.objective,
            data_path:       a.data_path,
            checkpoint_dir:  a.checkpoint_dir,
            tokenizer_path:  a.tokenizer_path,
            init_from:       a.init_from,
            max_seq_len:     a.max_seq_len,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            val_fraction:    a.val_fraction,
            seed:            a.seed,
            min_chars:       a.min_chars,
            temperature:     a.temperature,
            sg_variant:      a.sg_variant,
            lambda:          a.lambda,
            sampler:         a.sampler,
            layer_weights:   a.layer_weights,
            pooling:         a.pooling,
            skip_embeddings: !a.include_embeddings,
            proj_dim:        a.proj_dim,
            vocab_size:      a.vocab_size,
            d_model:         a.d_model,
            num_heads:       a.num_heads,
            num_layers:      a.num_layers,
            d_ff:            a.d_ff,
            dropout:         a.dropout,
        }
    }
}

/// All arguments for the `similarity` command
#[derive(Args, Debug)]
pub struct SimilarityArgs {
    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// A sentence to compare; repeat the flag for each sentence
    #[arg(long = "sentence", required = true)]
    pub sentences: Vec<String>,

    /// Print the raw embeddings as JSON instead of the matrix
    #[arg(long)]
    pub embeddings: bool,
}
