// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles samples with a seeded RNG and splits them into a
// training set and a held-out validation set.
//
// The seed comes from TrainConfig so a run can be reproduced:
// the same corpus and seed always yield the same split.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// `val_fraction` is the share held out, e.g. 0.1 = 10%. When the
/// corpus has at least two samples and a non-zero fraction is
/// requested, both sides receive at least one sample.
pub fn split_train_val<T>(mut samples: Vec<T>, val_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let fraction = val_fraction.clamp(0.0, 1.0);
    let mut val_len = ((total as f64) * fraction).round() as usize;
    if fraction > 0.0 && total >= 2 {
        val_len = val_len.clamp(1, total - 1);
    }
    let val_len = val_len.min(total);

    // split_off(n) keeps [0..n] in place and returns [n..]
    let val = samples.split_off(total - val_len);

    tracing::debug!(
        "Dataset split: {} training, {} validation (seed {})",
        samples.len(),
        val.len(),
        seed,
    );

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_train_val(items, 0.2, 7);
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(),   20);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val)      = split_train_val(items, 0.3, 7);
        let mut all: Vec<usize> = train.into_iter().chain(val).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_val((0..40).collect::<Vec<usize>>(), 0.25, 42);
        let b = split_train_val((0..40).collect::<Vec<usize>>(), 0.25, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tiny_corpus_keeps_both_sides() {
        let (train, val) = split_train_val(vec![1, 2, 3], 0.1, 0);
        assert_eq!(train.len(), 2);
        assert_eq!(val.len(),   1);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, val)      = split_train_val(items, 0.2, 0);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_zero_fraction_keeps_everything_for_training() {
        let items: Vec<usize> = (0..10).collect();
        let (train, val)      = split_train_val(items, 0.0, 0);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }
}
