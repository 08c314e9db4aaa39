// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Decides which tokenizer a run uses and keeps a copy of it in
// the checkpoint directory so inference sees the same vocabulary.
//
//   1. --tokenizer <path> given  → load it, copy to tokenizer.json
//   2. tokenizer.json present    → load it
//   3. otherwise                 → build a word-level vocabulary
//                                  from the corpus and save it
//
// The built vocabulary is written as HuggingFace tokenizer JSON
// and loaded back with Tokenizer::from_file, which sidesteps the
// trainer / ModelWrapper type mismatch of tokenizers 0.15.
// Special tokens keep BERT's ids so a BERT vocab.txt tokenizer
// and a built one agree on [PAD]/[CLS]/[SEP].

use anyhow::{ensure, Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

const TOKENIZER_FILE: &str = "tokenizer.json";

/// First id handed to corpus words; everything below is reserved.
const FIRST_WORD_ID: usize = 104;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Use `provided` when given, else load or build in the store dir.
    pub fn resolve(
        &self,
        provided:   Option<&Path>,
        texts:      &[String],
        vocab_size: usize,
    ) -> Result<Tokenizer> {
        match provided {
            Some(src) => {
                let tokenizer = load_file(src)?;
                fs::create_dir_all(&self.dir)?;
                if src != self.path() {
                    fs::copy(src, self.path()).with_context(|| {
                        format!("Cannot copy tokenizer '{}' into '{}'", src.display(), self.dir.display())
                    })?;
                }
                tracing::info!("Using tokenizer from '{}'", src.display());
                Ok(tokenizer)
            }
            None => self.load_or_build(texts, vocab_size),
        }
    }

    /// Load existing tokenizer or build a new one from texts
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from disk");
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        load_file(&self.path())
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        ensure!(
            vocab_size > FIRST_WORD_ID,
            "vocab_size must exceed {FIRST_WORD_ID} to leave room for corpus words, got {vocab_size}"
        );
        fs::create_dir_all(&self.dir)?;

        // ── Step 1: Word frequencies ──────────────────────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                let w = word.to_lowercase();
                let w = w.trim_matches(|c: char| !c.is_alphanumeric());
                if !w.is_empty() {
                    *freq.entry(w.to_string()).or_insert(0) += 1;
                }
            }
        }

        // Most frequent first; ties broken alphabetically so the ids are stable
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size - FIRST_WORD_ID);

        // ── Step 2: Vocab JSON ────────────────────────────────────────────────
        let mut vocab = serde_json::json!({
            "[PAD]":  0,
            "[UNK]":  1,
            "[CLS]":  101,
            "[SEP]":  102,
            "[MASK]": 103,
        });

        let mut next_id = FIRST_WORD_ID;
        for (word, _) in &words {
            if vocab.get(word).is_none() {
                vocab[word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // ── Step 3: HuggingFace tokenizer JSON ────────────────────────────────
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": 0,   "content": "[PAD]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 1,   "content": "[UNK]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 101, "content": "[CLS]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 102, "content": "[SEP]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 103, "content": "[MASK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let tok_path = self.path();
        fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", tok_path.display()))?;

        tracing::info!(
            "Tokenizer built with {} words, saved to '{}'",
            next_id - FIRST_WORD_ID,
            tok_path.display()
        );

        load_file(&tok_path)
    }
}

fn load_file(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}

/// Smallest embedding table that can index every id of `tokenizer`.
pub fn required_vocab_size(tokenizer: &Tokenizer) -> usize {
    tokenizer
        .get_vocab(true)
        .values()
        .max()
        .map(|&id| id as usize + 1)
        .unwrap_or(0)
}
