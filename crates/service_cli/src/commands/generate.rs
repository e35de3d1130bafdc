//! Generate command implementation
//!
//! Runs the randomisation and writes the table (and optionally the run
//! summary) to disk.

use std::path::Path;

use tracing::info;

use crate::writer::{self, OutputFormat, SummaryFormat};
use crate::{CliError, Result};

/// Run the generate command
pub fn run(
    config_path: &Path,
    output: &Path,
    format: OutputFormat,
    seed: Option<u64>,
    no_bom: bool,
    write_summary: bool,
) -> Result<()> {
    info!("Generating randomisation table...");
    info!("  Study file: {}", config_path.display());
    info!("  Output: {}", output.display());

    if output.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Output {} is a directory",
            output.display()
        )));
    }

    let (study, engine) = super::load_engine(config_path, seed)?;
    let outcome = engine.run()?;

    let bom = study.output.utf8_bom && !no_bom;
    let table = writer::render(outcome.table(), format, bom)?;
    let summary = if write_summary {
        Some(writer::render_summary(outcome.summary(), SummaryFormat::Json)?)
    } else {
        None
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, table)?;
    if let Some(summary) = summary {
        let path = writer::summary_path(output);
        std::fs::write(&path, summary)?;
        info!("  Summary: {}", path.display());
    }

    for total in outcome.summary().arm_totals() {
        info!("  {}: {} participants", total.arm, total.count);
    }
    info!(
        "Wrote {} records ({} labels allocated)",
        outcome.table().len(),
        outcome.summary().total_consumed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDY: &str = r#"
[study]
total_participants = 16
seed = 42
block_size = 4
buffer = 1.5

[[arms]]
name = "Tratamento"
[[arms]]
name = "Placebo"

[[dimensions]]
name = "site"
levels = ["1", "2"]

[[dimensions]]
name = "gender"
levels = ["Masculino", "Feminino"]

[consumption]
dimension = "gender"
rates = { Masculino = 2, Feminino = 1 }

[labels]
prefix_template = "centro_{site}_"

[output]
id_prefix = "R"
id_width = 3
"#;

    fn study_file(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("randomisation.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_generate_csv_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let config = study_file(dir.path(), STUDY);
        let output = dir.path().join("out").join("table.csv");

        run(&config, &output, OutputFormat::Csv, None, false, true).unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text.lines().count(), 17);
        assert!(text.lines().nth(1).unwrap().starts_with("R001,1,Masculino,"));

        let summary = std::fs::read_to_string(writer::summary_path(&output)).unwrap();
        assert!(summary.contains("\"seed\": 42"));
    }

    #[test]
    fn test_generate_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let config = study_file(dir.path(), STUDY);
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");

        run(&config, &first, OutputFormat::Json, Some(7), false, false).unwrap();
        run(&config, &second, OutputFormat::Json, Some(7), false, false).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }

    #[test]
    fn test_no_bom_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config = study_file(dir.path(), STUDY);
        let output = dir.path().join("table.csv");

        run(&config, &output, OutputFormat::Csv, None, true, false).unwrap();
        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"randomization_id"));
    }

    #[test]
    fn test_output_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = study_file(dir.path(), STUDY);

        let result = run(&config, dir.path(), OutputFormat::Csv, None, false, false);
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn test_failed_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = study_file(dir.path(), &STUDY.replace("total_participants = 16", "total_participants = 12"));
        let output = dir.path().join("table.csv");

        let result = run(&config, &output, OutputFormat::Csv, None, false, false);
        assert!(matches!(result, Err(CliError::Config(_))));
        assert!(!output.exists());
    }
}
