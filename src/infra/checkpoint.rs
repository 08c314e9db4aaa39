// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores weights using Burn's CompactRecorder.
//
// File layout:
//   checkpoints/
//     model_epoch_1.mpk.gz   ← full training model after epoch 1
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json      ← number of the latest saved epoch
//     encoder.mpk.gz         ← sentence encoder of the best epoch
//     train_config.json      ← hyper-parameters of the run
//     tokenizer.json         ← vocabulary used for training
//
// The full model differs per objective (SimCSE wraps one encoder,
// the self-guided model two plus a projection head), but inference
// only ever needs the encoder, so it is also saved on its own.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::encoder::SentenceEncoder;

const ENCODER_FILE: &str = "encoder";
const LATEST_FILE:  &str = "latest_epoch.json";
const CONFIG_FILE:  &str = "train_config.json";

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the full training model for `epoch` and update latest_epoch.json.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join(LATEST_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {LATEST_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Save the sentence encoder on its own.
    pub fn save_encoder<B: Backend>(&self, encoder: &SentenceEncoder<B>) -> Result<()> {
        let path = self.dir.join(ENCODER_FILE);
        CompactRecorder::new()
            .record(encoder.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save encoder to '{}'", path.display()))?;
        tracing::debug!("Saved encoder to '{}'", path.display());
        Ok(())
    }

    pub fn load_encoder<B: Backend>(
        &self,
        encoder: SentenceEncoder<B>,
        device:  &B::Device,
    ) -> Result<SentenceEncoder<B>> {
        let path = self.dir.join(ENCODER_FILE);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load encoder '{}'. Have you run 'train' first?", path.display())
            })?;
        Ok(encoder.load_record(record))
    }

    /// Written before training starts so inference can rebuild the encoder.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'similarity'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }

    /// Returns an error if training hasn't been run yet.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{LATEST_FILE}'. Have you run 'train' first?"))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
