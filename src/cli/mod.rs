// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and delegates every piece of work to Layer 2.
//
//   1. `train`      — trains an encoder with SimCSE or the
//                     self-guided objective
//   2. `similarity` — loads a trained encoder and prints the
//                     cosine-similarity matrix of sentences
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, SimilarityArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "sent-contrast",
    version,
    about = "Train contrastive sentence encoders (SimCSE, self-guided) and compare sentences."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the use case; the CLI layer never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)      => run_train(args),
            Commands::Similarity(args) => run_similarity(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting {:?} training on '{}'", args.objective, args.data_path);
    let checkpoint_dir = args.checkpoint_dir.clone();

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete. Best epoch {}/{} (loss {:.4}); encoder saved in '{}'.",
        summary.best_epoch, summary.epochs, summary.best_loss, checkpoint_dir
    );
    Ok(())
}

fn run_similarity(args: SimilarityArgs) -> Result<()> {
    use crate::application::similarity_use_case::{format_matrix, SimilarityUseCase};

    let use_case = SimilarityUseCase::new(&args.checkpoint_dir)?;

    if args.embeddings {
        let rows = use_case.embeddings(&args.sentences)?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let matrix = use_case.matrix(&args.sentences)?;
        print!("{}", format_matrix(&args.sentences, &matrix));
    }
    Ok(())
}
