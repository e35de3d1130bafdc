//! trial-rand - Stratified Block Randomisation CLI
//!
//! Operational entry point for generating randomisation tables with
//! resource-label allocation.
//!
//! # Commands
//!
//! - `trial-rand generate --output <file>` - Run and write the table
//! - `trial-rand check` - Validate the study file without drawing
//! - `trial-rand summary` - Run and print the summary only
//!
//! # Architecture
//!
//! As the **S**ervice layer, this crate owns everything outside the
//! algorithm: the study file, environment overrides, output formats and
//! logging.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod writer;

pub use error::{CliError, Result};

use writer::{OutputFormat, SummaryFormat};

/// Stratified block randomisation CLI
#[derive(Parser)]
#[command(name = "trial-rand")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Study file path
    #[arg(short, long, global = true, default_value = "randomisation.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the randomisation and write the table
    Generate {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// Seed override
        #[arg(short, long)]
        seed: Option<u64>,

        /// Omit the UTF-8 byte order mark from CSV output
        #[arg(long)]
        no_bom: bool,

        /// Also write <output>.summary.json
        #[arg(long)]
        summary: bool,
    },

    /// Validate the study file and print the composed strata
    Check,

    /// Run the randomisation and print the summary only
    Summary {
        /// Summary format
        #[arg(short, long, value_enum, default_value = "table")]
        format: SummaryFormat,

        /// Seed override
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

/// Log filter: `RUST_LOG`, then `--verbose`, then `TRIAL_RAND_LOG_LEVEL`
fn log_filter(verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if verbose {
        "debug".to_string()
    } else {
        std::env::var(config::ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string())
    };
    EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialise tracing; logs go to stderr so stdout stays clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(cli.verbose))
        .init();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Generate {
            output,
            format,
            seed,
            no_bom,
            summary,
        } => commands::generate::run(&cli.config, &output, format, seed, no_bom, summary),
        Commands::Check => commands::check::run(&cli.config),
        Commands::Summary { format, seed } => commands::summary::run(&cli.config, format, seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from([
            "trial-rand",
            "--config",
            "study.toml",
            "generate",
            "--output",
            "table.json",
            "--format",
            "json",
            "--seed",
            "7",
            "--summary",
        ]);
        assert_eq!(cli.config, PathBuf::from("study.toml"));
        match cli.command {
            Commands::Generate {
                output,
                format,
                seed,
                no_bom,
                summary,
            } => {
                assert_eq!(output, PathBuf::from("table.json"));
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(seed, Some(7));
                assert!(!no_bom);
                assert!(summary);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["trial-rand", "summary"]);
        assert_eq!(cli.config, PathBuf::from("randomisation.toml"));
        assert!(matches!(
            cli.command,
            Commands::Summary {
                format: SummaryFormat::Table,
                seed: None
            }
        ));
    }
}
