//! # Seeded Random Number Generation
//!
//! Every random draw of a randomisation run goes through one [`TrialRng`]
//! created from the configured seed. Nothing in the workspace touches a
//! thread-local or OS-seeded generator.
//!
//! ## Draw Order
//!
//! A run consumes the generator in a fixed order:
//!
//! 1. one shuffle per block, strata in composition order, blocks in order
//! 2. one shuffle per label pool, pools in pool key order
//!
//! Same seed and same configuration therefore yield the same table, for a
//! given `rand` version.
//!
//! ## Usage Example
//!
//! ```rust
//! use trial_core::rng::TrialRng;
//!
//! let mut rng = TrialRng::from_seed(42);
//! let mut block = vec!["Tratamento", "Tratamento", "Placebo", "Placebo"];
//! rng.shuffle(&mut block);
//!
//! assert_eq!(block.len(), 4);
//! assert_eq!(rng.shuffle_count(), 1);
//! ```

mod prng;

pub use prng::TrialRng;
