//! Error types for structured error handling.
//!
//! This module provides:
//! - `ConfigError`: configuration problems detected before any random draw
//! - `RandomisationError`: failures of a randomisation run (configuration,
//!   label pool exhaustion, broken invariants)
//!
//! None of these errors are recoverable inside a run. A failed run produces
//! no table; it is re-run after the configuration is fixed.

use thiserror::Error;

/// Configuration errors.
///
/// Raised eagerly while a run is being set up, before the random number
/// generator is seeded or consulted.
///
/// # Examples
/// ```
/// use trial_core::ConfigError;
///
/// let err = ConfigError::NotDivisible {
///     stratum: "site=1, gender=Masculino".to_string(),
///     count: 10,
///     block_size: 4,
/// };
/// assert!(err.to_string().contains("not divisible by block size 4"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Total participant count is zero.
    #[error("Total participant count must be greater than 0")]
    ZeroTotal,

    /// No arms were declared.
    #[error("Arm ratio must declare at least one arm")]
    EmptyRatio,

    /// An arm name (or its derived code) is empty.
    #[error("Arm names and codes must not be empty")]
    EmptyArmName,

    /// An arm weight is zero.
    #[error("Arm '{arm}' has weight 0; weights must be at least 1")]
    ZeroArmWeight {
        /// Arm name
        arm: String,
    },

    /// The same arm name appears twice.
    #[error("Arm '{0}' is declared more than once")]
    DuplicateArm(String),

    /// Two arms share a label code.
    #[error("Arms '{first}' and '{second}' share the label code '{code}'")]
    DuplicateArmCode {
        /// Shared code
        code: String,
        /// First arm using the code
        first: String,
        /// Second arm using the code
        second: String,
    },

    /// Block size is zero or not a multiple of the ratio sum.
    #[error("Block size {block_size} must be a positive multiple of the arm ratio sum {ratio_sum}")]
    InvalidBlockSize {
        /// Configured block size
        block_size: usize,
        /// Sum of arm weights
        ratio_sum: usize,
    },

    /// A stratum count cannot be filled with whole blocks.
    #[error("Stratum [{stratum}] count {count} is not divisible by block size {block_size}")]
    NotDivisible {
        /// Stratum description
        stratum: String,
        /// Participant count of the stratum
        count: usize,
        /// Configured block size
        block_size: usize,
    },

    /// A parent count cannot be split exactly across a dimension's levels.
    #[error("Count {count} of [{parent}] cannot be split exactly across dimension '{dimension}'")]
    UnevenSplit {
        /// Dimension being split
        dimension: String,
        /// Parent stratum description
        parent: String,
        /// Parent participant count
        count: usize,
    },

    /// Explicit targets do not add up to the parent count.
    #[error("Targets for dimension '{dimension}' sum to {actual}, expected {expected}")]
    TargetsMismatch {
        /// Dimension name
        dimension: String,
        /// Parent participant count
        expected: usize,
        /// Sum of the configured targets
        actual: usize,
    },

    /// Weights or targets do not have one entry per level.
    #[error("Dimension '{dimension}' has {levels} levels but {given} split entries")]
    SplitLengthMismatch {
        /// Dimension name
        dimension: String,
        /// Number of levels
        levels: usize,
        /// Number of weights or targets
        given: usize,
    },

    /// A split weight is zero.
    #[error("Level '{level}' of dimension '{dimension}' has weight 0")]
    ZeroWeight {
        /// Dimension name
        dimension: String,
        /// Level value
        level: String,
    },

    /// A dimension declares no levels.
    #[error("Dimension '{0}' declares no levels")]
    EmptyDimension(String),

    /// The same dimension name appears twice.
    #[error("Dimension '{0}' is declared more than once")]
    DuplicateDimension(String),

    /// The same level appears twice within a dimension.
    #[error("Level '{level}' is declared more than once in dimension '{dimension}'")]
    DuplicateLevel {
        /// Dimension name
        dimension: String,
        /// Duplicated level
        level: String,
    },

    /// A setting refers to a dimension that was not declared.
    #[error("{context} refers to unknown dimension '{name}'")]
    UnknownDimension {
        /// Which setting made the reference
        context: &'static str,
        /// Unknown dimension name
        name: String,
    },

    /// A level of the consumption dimension has no unit rate.
    #[error("No consumption rate for level '{level}' of dimension '{dimension}'")]
    MissingRate {
        /// Consumption dimension
        dimension: String,
        /// Level without a rate
        level: String,
    },

    /// A unit rate exceeds the two label fields of a record.
    #[error("Consumption rate {units} for '{level}' exceeds the maximum of 2 units")]
    InvalidRate {
        /// Level (or `default`)
        level: String,
        /// Configured units
        units: u32,
    },

    /// The buffer multiplier is not finite or below 1.0.
    #[error("Buffer multiplier {0} must be finite and within [1.0, 100.0]")]
    InvalidBuffer(f64),

    /// The label prefix template cannot be rendered.
    #[error("Invalid label template '{template}': {reason}")]
    InvalidLabelTemplate {
        /// Template text
        template: String,
        /// What is wrong with it
        reason: String,
    },

    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Description of the invalid value
        value: String,
    },
}

/// Errors from a randomisation run.
///
/// # Examples
/// ```
/// use trial_core::RandomisationError;
///
/// let err = RandomisationError::ResourceExhausted {
///     pool: "site=1 / Tratamento".to_string(),
///     requested: 2,
///     available: 1,
/// };
/// assert!(err.to_string().contains("requested 2, available 1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RandomisationError {
    /// Configuration rejected before randomisation started.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A label pool could not satisfy a withdrawal.
    #[error("Label pool [{pool}] exhausted: requested {requested}, available {available}")]
    ResourceExhausted {
        /// Pool description
        pool: String,
        /// Labels requested by the withdrawal
        requested: usize,
        /// Labels left in the pool
        available: usize,
    },

    /// An algorithm invariant does not hold.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl RandomisationError {
    /// Create an invariant violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidBlockSize {
            block_size: 3,
            ratio_sum: 2,
        };
        assert!(err.to_string().contains("Block size 3"));

        let err = ConfigError::TargetsMismatch {
            dimension: "site".to_string(),
            expected: 96,
            actual: 90,
        };
        assert!(err.to_string().contains("sum to 90, expected 96"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: RandomisationError = ConfigError::ZeroTotal.into();
        assert!(matches!(err, RandomisationError::Config(ConfigError::ZeroTotal)));
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_invariant_helper() {
        let err = RandomisationError::invariant("block 3 unbalanced");
        assert_eq!(err.to_string(), "Invariant violation: block 3 unbalanced");
    }
}
