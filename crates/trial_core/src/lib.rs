//! # trial_core: Foundation for Stratified Block Randomisation
//!
//! ## Layer 1 (Foundation) Role
//!
//! trial_core is the bottom layer of the workspace, providing:
//! - Arms and allocation ratios (`types::arm`)
//! - Stratification dimensions and stratum keys (`types::stratum`)
//! - Participants, label slots and exported records (`types::participant`, `types::record`)
//! - Error types: `ConfigError`, `RandomisationError` (`error`)
//! - The seeded random number generator threaded through a run (`rng`)
//!
//! ## Minimal Dependencies
//!
//! Layer 1 has no dependencies on other workspace crates:
//! - rand: seeded `StdRng` and slice shuffling
//! - thiserror: error derives
//! - serde: serialisation of keys and records (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use trial_core::types::{ArmRatio, Dimension, StratumKey};
//!
//! let ratio = ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap();
//! assert_eq!(ratio.per_block_counts(4).unwrap(), vec![2, 2]);
//!
//! let gender = Dimension::new("gender", ["Masculino", "Feminino"]);
//! let counts = gender.split_count(&StratumKey::root(), 24).unwrap();
//! assert_eq!(counts, vec![12, 12]);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable serialisation for `Arm`, `StratumKey` and `RandomisationRecord`

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod rng;
pub mod types;

pub use error::{ConfigError, RandomisationError};
