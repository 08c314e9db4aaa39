// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Normalises one raw sentence before tokenisation.
//
// Corpora scraped from the web or exported from spreadsheets
// carry non-breaking spaces, zero-width characters, BOMs, tabs
// and stray control bytes. A sentence is always a single line
// here, so every whitespace variant (including newlines) becomes
// one plain space and runs of spaces are collapsed.
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor {
    /// Sentences shorter than this (in chars, after cleaning) are dropped
    min_chars: usize,
}

impl Preprocessor {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    /// Clean a sentence into a single trimmed line.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true; // swallows leading whitespace

        for c in text.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_whitespace() || c.is_control() => ' ',
                c => c,
            };
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        if out.ends_with(' ') {
            out.pop();
        }
        out
    }

    /// Clean and return the sentence only if it is long enough to keep.
    pub fn accept(&self, text: &str) -> Option<String> {
        let cleaned = self.clean(text);
        (cleaned.chars().count() >= self.min_chars.max(1)).then_some(cleaned)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(1)
    }
}
