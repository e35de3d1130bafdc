//! Study file configuration.
//!
//! Loads the randomisation settings of a study from a TOML file, applies
//! environment and command line overrides, and converts the result into a
//! [`RandomisationConfig`].
//!
//! Priority (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (`TRIAL_RAND_*`)
//! 3. Study file
//! 4. Default values

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use trial_core::types::{Arm, ArmRatio, Dimension, IdFormat, Split};
use trial_randomise::config::RandomisationConfig;
use trial_randomise::demand::ConsumptionRates;
use trial_randomise::pool::{LabelScheme, PoolScope};

use crate::{CliError, Result};

/// Seed override
pub const ENV_SEED: &str = "TRIAL_RAND_SEED";
/// Participant total override
pub const ENV_TOTAL: &str = "TRIAL_RAND_TOTAL_PARTICIPANTS";
/// Buffer override
pub const ENV_BUFFER: &str = "TRIAL_RAND_BUFFER";
/// Log filter override
pub const ENV_LOG_LEVEL: &str = "TRIAL_RAND_LOG_LEVEL";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// `[study]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StudySection {
    /// Participants to randomise
    pub total_participants: usize,
    /// Seed; may also come from the environment or the command line
    pub seed: Option<u64>,
    /// Block size
    pub block_size: usize,
    /// Label buffer multiplier
    #[serde(default = "default_buffer")]
    pub buffer: f64,
}

/// `[[arms]]` entry
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ArmSection {
    /// Arm name as exported
    pub name: String,
    /// Ratio weight
    #[serde(default = "default_weight")]
    pub weight: usize,
    /// Label code; first letter of the name when absent
    pub code: Option<String>,
}

/// `[[dimensions]]` entry
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DimensionSection {
    /// Dimension name, also the column header
    pub name: String,
    /// Levels in generation order
    pub levels: Vec<String>,
    /// Absolute per-level counts
    pub targets: Option<Vec<usize>>,
    /// Relative per-level weights
    pub weights: Option<Vec<u64>>,
}

/// `[consumption]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConsumptionSection {
    /// Dimension whose level selects the rate
    pub dimension: Option<String>,
    /// Units per participant without a dimension
    #[serde(default = "default_units")]
    pub default_units: u32,
    /// Units per level of the dimension
    #[serde(default)]
    pub rates: BTreeMap<String, u32>,
}

impl Default for ConsumptionSection {
    fn default() -> Self {
        Self {
            dimension: None,
            default_units: default_units(),
            rates: BTreeMap::new(),
        }
    }
}

/// `[labels]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LabelSection {
    /// Prefix with `{dimension}` placeholders
    #[serde(default)]
    pub prefix_template: String,
    /// Text between arm code and ordinal
    #[serde(default)]
    pub separator: String,
    /// Zero-padding width of the ordinal
    #[serde(default = "default_ordinal_width")]
    pub ordinal_width: usize,
    /// Dimensions keying the pools
    pub scope: Option<Vec<String>>,
}

impl Default for LabelSection {
    fn default() -> Self {
        Self {
            prefix_template: String::new(),
            separator: String::new(),
            ordinal_width: default_ordinal_width(),
            scope: None,
        }
    }
}

/// `[output]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Identifier prefix (`R` gives `R001`)
    pub id_prefix: Option<String>,
    /// Identifier zero-padding width
    pub id_width: Option<usize>,
    /// Write a UTF-8 byte order mark before CSV output
    #[serde(default = "default_bom")]
    pub utf8_bom: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            id_prefix: None,
            id_width: None,
            utf8_bom: default_bom(),
        }
    }
}

/// Study configuration file
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StudyConfig {
    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Study parameters
    pub study: StudySection,
    /// Arms in ratio order
    pub arms: Vec<ArmSection>,
    /// Stratification dimensions, outer first
    #[serde(default)]
    pub dimensions: Vec<DimensionSection>,
    /// Label consumption
    #[serde(default)]
    pub consumption: ConsumptionSection,
    /// Label naming and pooling
    #[serde(default)]
    pub labels: LabelSection,
    /// Export options
    #[serde(default)]
    pub output: OutputSection,
}

fn default_buffer() -> f64 {
    1.0
}

fn default_weight() -> usize {
    1
}

fn default_units() -> u32 {
    1
}

fn default_ordinal_width() -> usize {
    3
}

fn default_bom() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl StudyConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `TRIAL_RAND_*` environment variable overrides
    pub fn with_env_override(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = lookup(ENV_SEED) {
            self.study.seed = Some(parse_env(ENV_SEED, &seed)?);
        }

        if let Some(total) = lookup(ENV_TOTAL) {
            self.study.total_participants = parse_env(ENV_TOTAL, &total)?;
        }

        if let Some(buffer) = lookup(ENV_BUFFER) {
            self.study.buffer = parse_env(ENV_BUFFER, &buffer)?;
        }

        if let Some(log_level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = log_level;
        }

        Ok(self)
    }

    /// Merge command line overrides (CLI takes precedence)
    pub fn merge_with_cli(&mut self, seed: Option<u64>) {
        if let Some(seed) = seed {
            self.study.seed = Some(seed);
        }
    }

    /// Validate settings the randomisation layer cannot see
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid log_level '{}'. Valid values: {:?}",
                self.log_level, VALID_LOG_LEVELS
            ));
        }

        if self.study.seed.is_none() {
            errors.push(format!(
                "study.seed must be set in the file, via {} or with --seed",
                ENV_SEED
            ));
        }

        if self.arms.is_empty() {
            errors.push("at least one [[arms]] entry is required".to_string());
        }

        for dimension in &self.dimensions {
            if dimension.targets.is_some() && dimension.weights.is_some() {
                errors.push(format!(
                    "dimension '{}' sets both targets and weights",
                    dimension.name
                ));
            }
        }

        if self.consumption.dimension.is_none() && !self.consumption.rates.is_empty() {
            errors.push("consumption.rates requires consumption.dimension".to_string());
        }

        if self.output.id_prefix.is_none() && self.output.id_width.is_some() {
            errors.push("output.id_width requires output.id_prefix (use \"\" for none)".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CliError::Validation(errors))
        }
    }

    /// Identifier format from the `[output]` section
    pub fn id_format(&self) -> IdFormat {
        match &self.output.id_prefix {
            Some(prefix) => IdFormat::Padded {
                prefix: prefix.clone(),
                width: self.output.id_width.unwrap_or(3),
            },
            None => IdFormat::Numeric,
        }
    }

    /// Convert into a validated randomisation configuration
    pub fn to_randomisation_config(&self) -> Result<RandomisationConfig> {
        self.validate()?;

        let arms = self
            .arms
            .iter()
            .map(|arm| {
                let entry = match &arm.code {
                    Some(code) => Arm::with_code(arm.name.clone(), code.clone()),
                    None => Arm::new(arm.name.clone()),
                };
                (entry, arm.weight)
            })
            .collect();
        let ratio = ArmRatio::new(arms)?;

        let dimensions = self
            .dimensions
            .iter()
            .map(|d| {
                let split = match (&d.targets, &d.weights) {
                    (Some(targets), _) => Split::Targets(targets.clone()),
                    (None, Some(weights)) => Split::Weights(weights.clone()),
                    (None, None) => Split::Equal,
                };
                Dimension::new(d.name.clone(), d.levels.iter().cloned()).with_split(split)
            })
            .collect();

        let consumption = match &self.consumption.dimension {
            Some(dimension) => ConsumptionRates::by_dimension(
                dimension.clone(),
                self.consumption.rates.iter().map(|(level, units)| (level.clone(), *units)),
            ),
            None => ConsumptionRates::uniform(self.consumption.default_units),
        };

        let labels = LabelScheme::new(
            self.labels.prefix_template.clone(),
            self.labels.separator.clone(),
            self.labels.ordinal_width,
        )?;

        let mut builder = RandomisationConfig::builder()
            .total_participants(self.study.total_participants)
            .ratio(ratio)
            .dimensions(dimensions)
            .block_size(self.study.block_size)
            .consumption(consumption)
            .buffer(self.study.buffer)
            .labels(labels)
            .id_format(self.id_format());
        if let Some(seed) = self.study.seed {
            builder = builder.seed(seed);
        }
        if let Some(scope) = &self.labels.scope {
            builder = builder.pool_scope(PoolScope::new(scope.iter().cloned()));
        }

        Ok(builder.build()?)
    }
}

fn parse_env<T: std::str::FromStr>(variable: &'static str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| CliError::Env {
        variable,
        value: value.to_string(),
    })
}

/// Load a study file, apply environment and CLI overrides, and validate
pub fn load_study(path: &Path, seed: Option<u64>) -> Result<StudyConfig> {
    let mut config = StudyConfig::load(path)?.with_env_override()?;
    config.merge_with_cli(seed);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTICENTRE: &str = r#"
[study]
total_participants = 96
seed = 42
block_size = 4
buffer = 1.5

[[arms]]
name = "Tratamento"
[[arms]]
name = "Placebo"

[[dimensions]]
name = "site"
levels = ["1", "2", "3", "4"]
targets = [24, 24, 24, 24]

[[dimensions]]
name = "gender"
levels = ["Masculino", "Feminino"]

[consumption]
dimension = "gender"
rates = { Masculino = 2, Feminino = 1 }

[labels]
prefix_template = "centro_{site}_"
scope = ["site"]

[output]
id_prefix = "R"
id_width = 3
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_multicentre() {
        let config = StudyConfig::from_toml_str(MULTICENTRE).unwrap();
        assert_eq!(config.study.total_participants, 96);
        assert_eq!(config.study.seed, Some(42));
        assert_eq!(config.arms[0].weight, 1);
        assert_eq!(config.dimensions[0].targets, Some(vec![24, 24, 24, 24]));
        assert_eq!(config.consumption.rates.get("Masculino"), Some(&2));
        assert_eq!(config.labels.ordinal_width, 3);
        assert!(config.output.utf8_bom);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_convert_to_randomisation_config() {
        let config = StudyConfig::from_toml_str(MULTICENTRE).unwrap();
        let randomisation = config.to_randomisation_config().unwrap();

        assert_eq!(randomisation.total_participants(), 96);
        assert_eq!(randomisation.buffer().basis_points(), 15_000);
        assert_eq!(randomisation.pool_scope().dimensions(), &["site".to_string()]);
        assert_eq!(
            randomisation.id_format(),
            &IdFormat::Padded {
                prefix: "R".to_string(),
                width: 3
            }
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = StudyConfig::from_toml_str(MULTICENTRE)
            .unwrap()
            .with_overrides(|name| match name {
                ENV_SEED => Some("7".to_string()),
                ENV_BUFFER => Some("2.0".to_string()),
                ENV_LOG_LEVEL => Some("debug".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.study.seed, Some(7));
        assert_eq!(config.study.buffer, 2.0);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.study.total_participants, 96);
    }

    #[test]
    fn test_invalid_env_value() {
        let result = StudyConfig::from_toml_str(MULTICENTRE)
            .unwrap()
            .with_overrides(|name| (name == ENV_TOTAL).then(|| "many".to_string()));
        assert!(matches!(
            result,
            Err(CliError::Env {
                variable: ENV_TOTAL,
                ..
            })
        ));
    }

    #[test]
    fn test_cli_seed_wins() {
        let mut config = StudyConfig::from_toml_str(MULTICENTRE)
            .unwrap()
            .with_overrides(|name| (name == ENV_SEED).then(|| "7".to_string()))
            .unwrap();
        config.merge_with_cli(Some(99));
        assert_eq!(config.study.seed, Some(99));

        config.merge_with_cli(None);
        assert_eq!(config.study.seed, Some(99));
    }

    #[test]
    fn test_missing_seed_reported() {
        let text = MULTICENTRE.replace("seed = 42\n", "");
        let config = StudyConfig::from_toml_str(&text)
            .unwrap()
            .with_overrides(no_env)
            .unwrap();

        match config.validate() {
            Err(CliError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("study.seed")));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = StudyConfig::from_toml_str(MULTICENTRE).unwrap();
        config.log_level = "loud".to_string();
        config.dimensions[0].weights = Some(vec![1, 1, 1, 1]);

        match config.validate() {
            Err(CliError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].contains("log_level"));
                assert!(errors[1].contains("both targets and weights"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let text = MULTICENTRE.replace("buffer = 1.5", "bufer = 1.5");
        assert!(matches!(
            StudyConfig::from_toml_str(&text),
            Err(CliError::Toml(_))
        ));
    }

    #[test]
    fn test_core_errors_surface() {
        let text = MULTICENTRE.replace("block_size = 4", "block_size = 3");
        let config = StudyConfig::from_toml_str(&text).unwrap();
        assert!(matches!(
            config.to_randomisation_config(),
            Err(CliError::Config(trial_core::ConfigError::InvalidBlockSize { .. }))
        ));
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let text = r#"
[study]
total_participants = 8
seed = 1
block_size = 2

[[arms]]
name = "Tratamento"
[[arms]]
name = "Placebo"
"#;
        let config = StudyConfig::from_toml_str(text).unwrap();
        assert_eq!(config.id_format(), IdFormat::Numeric);
        assert_eq!(config.study.buffer, 1.0);

        let randomisation = config.to_randomisation_config().unwrap();
        assert!(randomisation.dimensions().is_empty());
    }

    #[test]
    fn test_sample_study_files() {
        let samples = [
            include_str!("../../../randomisation.toml"),
            include_str!("../config/gender_only.toml"),
            include_str!("../config/five_sites.toml"),
        ];
        for text in samples {
            let config = StudyConfig::from_toml_str(text)
                .unwrap()
                .to_randomisation_config()
                .unwrap();
            assert!(trial_randomise::engine::RandomisationEngine::new(config).is_ok());
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = StudyConfig::load(Path::new("does/not/exist.toml"));
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }
}
