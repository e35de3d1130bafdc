//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod check;
pub mod generate;
pub mod summary;

use std::path::Path;

use tracing::debug;
use trial_randomise::engine::RandomisationEngine;

use crate::config::{load_study, StudyConfig};
use crate::Result;

/// Load the study file and build an engine; no random draw happens here
pub(crate) fn load_engine(
    config_path: &Path,
    seed: Option<u64>,
) -> Result<(StudyConfig, RandomisationEngine)> {
    let study = load_study(config_path, seed)?;
    let engine = RandomisationEngine::new(study.to_randomisation_config()?)?;
    debug!(
        config = %config_path.display(),
        strata = engine.strata().len(),
        "Study loaded"
    );
    Ok((study, engine))
}
