// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads training text from a single file.
//
//   sentences() — plain text, one sentence per line
//                 (e.g. the 1M Wikipedia sentences used by SimCSE)
//   triplets()  — NLI triplets, one per row:
//                   premise, entailment, contradiction
//                 Comma-separated for .csv files, tab-separated
//                 otherwise. Quoted fields are handled by the csv
//                 crate. A header row (sent0 / premise / ...) is
//                 detected and skipped.
//
// Blank lines are skipped; malformed rows are logged and skipped
// rather than failing the whole run.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::sentence::NliTriplet;
use crate::domain::traits::CorpusSource;

const HEADER_NAMES: [&str; 5] = ["premise", "sent0", "sentence1", "anchor", "sentence"];

/// Loads a corpus from one text / CSV / TSV file.
pub struct CorpusLoader {
    path: PathBuf,
}

impl CorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn delimiter(&self) -> u8 {
        match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
            _ => b'\t',
        }
    }

    fn check_exists(&self) -> Result<()> {
        fs::metadata(&self.path)
            .map(|_| ())
            .with_context(|| format!("Corpus file '{}' not found", self.path.display()))
    }
}

fn looks_like_header(first_field: &str) -> bool {
    let f = first_field.trim().to_lowercase();
    HEADER_NAMES.contains(&f.as_str())
}

impl CorpusSource for CorpusLoader {
    fn sentences(&self) -> Result<Vec<String>> {
        self.check_exists()?;
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;

        let sentences: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        tracing::info!("Loaded {} sentences from '{}'", sentences.len(), self.path.display());
        Ok(sentences)
    }

    fn triplets(&self) -> Result<Vec<NliTriplet>> {
        self.check_exists()?;
        read_triplets(&self.path, self.delimiter())
    }
}

fn read_triplets(path: &Path, delimiter: u8) -> Result<Vec<NliTriplet>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open triplet file '{}'", path.display()))?;

    let mut triplets = Vec::new();
    let mut skipped  = 0usize;

    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping row {} of '{}': {}", row + 1, path.display(), e);
                skipped += 1;
                continue;
            }
        };

        if row == 0 && record.get(0).map(looks_like_header).unwrap_or(false) {
            tracing::debug!("Skipping header row of '{}'", path.display());
            continue;
        }

        let fields: Vec<&str> = record.iter().map(str::trim).collect();
        match fields.as_slice() {
            [p, e, c, ..] if !p.is_empty() && !e.is_empty() && !c.is_empty() => {
                triplets.push(NliTriplet::new(*p, *e, *c));
            }
            [] | [""] => {}
            _ => {
                tracing::warn!(
                    "Skipping row {} of '{}': expected premise, entailment, contradiction",
                    row + 1,
                    path.display()
                );
                skipped += 1;
            }
        }
    }

    tracing::info!(
        "Loaded {} triplets from '{}' ({} rows skipped)",
        triplets.len(),
        path.display(),
        skipped
    );
    Ok(triplets)
}
