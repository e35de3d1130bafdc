//! Domain types for stratified block randomisation.
//!
//! This module provides:
//! - `arm`: treatment arms and allocation ratios
//! - `stratum`: stratification dimensions, stratum keys and stratum descriptors
//! - `participant`: randomised participants and their label slots
//! - `record`: exported records, identifier formats and column names
//!
//! # Re-exports
//!
//! For convenience, commonly used types are re-exported at this module level.

pub mod arm;
pub mod participant;
pub mod record;
pub mod stratum;

pub use arm::{Arm, ArmRatio};
pub use participant::{LabelSlots, Participant};
pub use record::{header, IdFormat, RandomisationRecord};
pub use stratum::{Dimension, Split, Stratum, StratumKey};
