//! Check command implementation
//!
//! Validates the study file and prints the composed strata. No random draw
//! is made.

use std::path::Path;

use tracing::info;
use trial_randomise::engine::RandomisationEngine;

use crate::Result;

/// Run the check command
pub fn run(config_path: &Path) -> Result<()> {
    info!("Checking study file {}", config_path.display());

    let (_, engine) = super::load_engine(config_path, None)?;
    print!("{}", report(&engine));

    info!("Study file is valid");
    Ok(())
}

/// Plain-text description of the composed run
pub(crate) fn report(engine: &RandomisationEngine) -> String {
    let config = engine.config();
    let arms: Vec<String> = config
        .ratio()
        .entries()
        .iter()
        .map(|(arm, weight)| format!("{} ({}) x{}", arm.name(), arm.code(), weight))
        .collect();
    let scope = if config.pool_scope().dimensions().is_empty() {
        "none".to_string()
    } else {
        config.pool_scope().dimensions().join(", ")
    };

    let mut out = String::new();
    out.push_str(&format!("Participants: {}\n", config.total_participants()));
    out.push_str(&format!("Arms:         {}\n", arms.join(", ")));
    out.push_str(&format!("Block size:   {}\n", config.block_size()));
    out.push_str(&format!("Buffer:       {}\n", config.buffer().as_f64()));
    out.push_str(&format!("Pool scope:   {}\n", scope));
    out.push_str(&format!("Seed:         {}\n", config.seed()));
    out.push_str(&format!("Strata:       {}\n", engine.strata().len()));
    for stratum in engine.strata() {
        out.push_str(&format!(
            "  [{}] {} participants, {} blocks\n",
            stratum.key(),
            stratum.target(),
            stratum.block_count()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CliError;

    #[test]
    fn test_check_reports_strata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");
        std::fs::write(
            &path,
            r#"
[study]
total_participants = 100
seed = 42
block_size = 10
buffer = 1.5

[[arms]]
name = "Tratamento"
[[arms]]
name = "Placebo"

[[dimensions]]
name = "site"
levels = ["1", "2", "3", "4", "5"]

[[dimensions]]
name = "gender"
levels = ["Masculino", "Feminino"]

[consumption]
dimension = "gender"
rates = { Masculino = 2, Feminino = 1 }
"#,
        )
        .unwrap();

        let (_, engine) = crate::commands::load_engine(&path, None).unwrap();
        let text = report(&engine);
        assert!(text.contains("Strata:       10"));
        assert!(text.contains("[site=5, gender=Feminino] 10 participants, 1 blocks"));
        assert!(text.contains("Pool scope:   site"));
        assert!(run(&path).is_ok());
    }

    #[test]
    fn test_check_missing_file() {
        let result = run(Path::new("no/such/study.toml"));
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }
}
