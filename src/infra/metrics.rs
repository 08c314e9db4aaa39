// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:         the epoch number (1, 2, 3, ...)
//   - train_loss:    mean contrastive loss over training batches
//   - val_loss:      mean contrastive loss on the validation set
//   - val_alignment: mean cosine between each anchor and its
//                    positive view (empty for self-guided runs,
//                    which have no explicit positive)
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,val_loss,val_alignment
//   1,2.814310,2.790112,0.912004
//   2,1.903275,1.955870,0.934411
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,train_loss,val_loss,val_alignment";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,

    pub train_loss: f64,

    /// NaN when the run has no validation split
    pub val_loss: f64,

    pub val_alignment: Option<f64>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, val_alignment: Option<f64>) -> Self {
        Self { epoch, train_loss, val_loss, val_alignment }
    }

    /// The loss used for best-epoch tracking: validation when
    /// available, training otherwise.
    pub fn tracked_loss(&self) -> f64 {
        if self.val_loss.is_finite() { self.val_loss } else { self.train_loss }
    }

    /// Returns true if this epoch improved over the previous best
    pub fn is_improvement(&self, best_loss: f64) -> bool {
        self.tracked_loss() < best_loss
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let alignment = m.val_alignment.map(|a| format!("{a:.6}")).unwrap_or_default();
        writeln!(f, "{},{:.6},{:.6},{}", m.epoch, m.train_loss, m.val_loss, alignment)?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
