//! Seeded randomness, passed around as an explicit context object.
//!
//! Every random decision in the pipeline draws from one [`Randomize`]
//! instance, so the same seed, input and configuration reproduce the same
//! partition bit for bit.

use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;

#[derive(Debug, Clone)]
pub struct Randomize {
    rng: Pcg64,
}

impl Randomize {
    pub fn with_seed(seed: u64) -> Self {
        Randomize {
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.rng);
    }

    /// Uniform integer in `0..bound`.
    pub fn index(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0);
        self.rng.random_range(0..bound)
    }
}
