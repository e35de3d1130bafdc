//! CLI error types

use thiserror::Error;
use trial_core::{ConfigError, RandomisationError};

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Randomisation settings rejected before any draw
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Randomisation run failed
    #[error("Randomisation failed: {0}")]
    Randomisation(#[from] RandomisationError),

    /// Study file failed validation
    #[error("Invalid study file: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Study file could not be found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Study file is not valid TOML for the expected layout
    #[error("Failed to parse study file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Environment override could not be parsed
    #[error("Invalid value '{value}' for {variable}")]
    Env {
        /// Variable name
        variable: &'static str,
        /// Raw value
        value: String,
    },

    /// Invalid command line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_joins_messages() {
        let err = CliError::Validation(vec!["no arms".to_string(), "bad buffer".to_string()]);
        assert_eq!(err.to_string(), "Invalid study file: no arms; bad buffer");
    }

    #[test]
    fn test_core_errors_convert() {
        let err: CliError = ConfigError::ZeroTotal.into();
        assert!(matches!(err, CliError::Config(ConfigError::ZeroTotal)));

        let err: CliError = RandomisationError::invariant("broken").into();
        assert!(err.to_string().contains("broken"));
    }
}
