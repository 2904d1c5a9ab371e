//! Seeded RNG helpers shared by every runner.
//!
//! Replaces the internal foundation crate the algorithm families in this
//! workspace used to depend on (`u-numflow::random`) with the two
//! primitives actually needed, built directly on `rand`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Creates a deterministic, seedable RNG.
pub fn create_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Shuffles a slice in place (Fisher-Yates, via `rand`'s `SliceRandom`).
pub fn shuffle<T>(slice: &mut [T], rng: &mut impl Rng) {
    slice.shuffle(rng);
}
