//! Summary command implementation
//!
//! Runs the randomisation and prints only the run summary.

use std::path::Path;

use tracing::info;

use crate::writer::{self, SummaryFormat};
use crate::Result;

/// Run the summary command
pub fn run(config_path: &Path, format: SummaryFormat, seed: Option<u64>) -> Result<()> {
    info!("Summarising randomisation for {}", config_path.display());

    let (_, engine) = super::load_engine(config_path, seed)?;
    let outcome = engine.run()?;
    println!("{}", writer::render_summary(outcome.summary(), format)?);

    Ok(())
}
