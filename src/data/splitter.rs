// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles examples with a seeded RNG and splits them into
// two sets:
//   - Training set:   used to update model weights
//   - Validation set: used for periodic evaluation and for
//                     picking the best checkpoint
//
// The seed is fixed by configuration, so the same file always
// yields the same partition across runs.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// `validation_fraction` is the share held out, e.g. 0.1 = 10%.
/// Out-of-range fractions are clamped into [0, 1].
pub fn split_train_val<T>(
    mut samples:         Vec<T>,
    validation_fraction: f64,
    seed:                u64,
) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let fraction = validation_fraction.clamp(0.0, 1.0);
    let val_len  = ((total as f64) * fraction).round() as usize;
    let split_at = total - val_len.min(total);

    // split_off(n) removes elements [n..] and returns them
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation (seed {})",
        samples.len(),
        val.len(),
        seed,
    );

    (samples, val)
}
