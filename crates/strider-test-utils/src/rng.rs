//! Deterministic RNG utilities for reproducible tests.

use nalgebra::DVector;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Deterministic vector of length `dim` with entries in `[-scale, scale)`.
pub fn deterministic_vec(dim: usize, scale: f64, seed: u64) -> DVector<f64> {
    use rand::Rng;
    let mut rng = seeded_rng(seed);
    DVector::from_fn(dim, |_, _| rng.gen_range(-scale..scale))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
