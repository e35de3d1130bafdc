//! Pseudo-random number generator wrapper for randomisation runs.
//!
//! This module provides [`TrialRng`], a seeded PRNG wrapper that offers
//! reproducible in-place shuffles and keeps a count of draws for audit logs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Randomisation run random number generator.
///
/// One instance is created per run and passed by `&mut` to every component
/// that draws. It is deliberately not `Clone`: two copies would make the
/// draw order ambiguous.
///
/// # Examples
///
/// ```rust
/// use trial_core::rng::TrialRng;
///
/// let mut rng1 = TrialRng::from_seed(12345);
/// let mut rng2 = TrialRng::from_seed(12345);
///
/// let mut a: Vec<u32> = (0..10).collect();
/// let mut b = a.clone();
/// rng1.shuffle(&mut a);
/// rng2.shuffle(&mut b);
///
/// // Same seed produces identical permutations
/// assert_eq!(a, b);
/// ```
#[derive(Debug)]
pub struct TrialRng {
    /// The underlying PRNG instance.
    inner: StdRng,
    /// The seed used for initialisation (stored for reproducibility tracking).
    seed: u64,
    /// Number of shuffles performed so far.
    shuffles: usize,
}

impl TrialRng {
    /// Creates a new RNG instance initialised with the given seed.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
            shuffles: 0,
        }
    }

    /// Returns the seed used for initialisation.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of shuffles drawn from this generator.
    #[inline]
    pub fn shuffle_count(&self) -> usize {
        self.shuffles
    }

    /// Shuffles `items` in place (Fisher-Yates).
    ///
    /// Empty and single-element slices still count as one shuffle so that
    /// the counter reflects the number of calls, not the number of draws.
    #[inline]
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
        self.shuffles += 1;
    }
}
