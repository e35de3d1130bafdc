//! # trial_randomise (L2: Randomisation Engine)
//!
//! Stratified block randomisation with resource-label allocation.
//!
//! This crate provides:
//! - Permuted-block generation per stratum (`block`)
//! - Nested stratum composition over any number of dimensions (`strata`)
//! - Label demand from realised assignments, with a buffer (`demand`)
//! - Label pools with atomic, non-reusable withdrawal (`pool`)
//! - Table assembly with sequential identifiers (`assembler`)
//! - The run engine, run summary and post-run verification
//!   (`engine`, `summary`, `verify`)
//!
//! ## Architecture Position
//!
//! Depends on `trial_core` (L1) only. File formats, configuration files and
//! the command line live in `service_cli`.
//!
//! ## Example
//!
//! ```rust
//! use trial_core::types::{ArmRatio, Dimension, IdFormat};
//! use trial_randomise::prelude::*;
//!
//! let config = RandomisationConfig::builder()
//!     .total_participants(16)
//!     .ratio(ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap())
//!     .dimension(Dimension::new("site", ["1", "2"]))
//!     .dimension(Dimension::new("gender", ["Masculino", "Feminino"]))
//!     .block_size(4)
//!     .consumption(ConsumptionRates::by_dimension(
//!         "gender",
//!         [("Masculino", 2), ("Feminino", 1)],
//!     ))
//!     .buffer(1.5)
//!     .labels(LabelScheme::new("centro_{site}_", "", 3).unwrap())
//!     .id_format(IdFormat::Padded { prefix: "R".to_string(), width: 3 })
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let outcome = RandomisationEngine::new(config).unwrap().run().unwrap();
//! assert_eq!(outcome.table().records()[0].randomisation_id(), "R001");
//! assert_eq!(outcome.summary().pools.len(), 4);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): `Serialize` for `RunSummary` and its parts

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod assembler;
pub mod block;
pub mod config;
pub mod demand;
pub mod engine;
pub mod pool;
pub mod strata;
pub mod summary;
pub mod verify;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::assembler::{RandomisationTable, RandomisationTableAssembler};
    pub use crate::block::BlockGenerator;
    pub use crate::config::{RandomisationConfig, RandomisationConfigBuilder};
    pub use crate::demand::{BufferMultiplier, ConsumptionRates, PoolDemand, ResourceDemandCalculator};
    pub use crate::engine::{RandomisationEngine, RandomisationOutcome};
    pub use crate::pool::{LabelPoolAllocator, LabelScheme, PoolKey, PoolScope, ResourcePool};
    pub use crate::strata::StratumComposer;
    pub use crate::summary::{ArmCount, PoolSummary, RunSummary, StratumSummary};
    pub use crate::verify::verify_outcome;
    pub use trial_core::{ConfigError, RandomisationError};
}
