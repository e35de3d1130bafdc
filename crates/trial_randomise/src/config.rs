//! Randomisation run configuration.
//!
//! This module provides the immutable [`RandomisationConfig`] and its
//! builder. Everything a run needs is fixed here; the engine never reads
//! configuration from anywhere else.

use trial_core::types::{ArmRatio, Dimension, IdFormat};
use trial_core::ConfigError;

use crate::demand::{BufferMultiplier, ConsumptionRates};
use crate::pool::{LabelScheme, PoolScope};
use crate::strata::StratumComposer;

/// Largest accepted participant total.
pub const MAX_PARTICIPANTS: usize = 1_000_000;

/// Randomisation run configuration.
///
/// Use [`RandomisationConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use trial_core::types::{ArmRatio, Dimension};
/// use trial_randomise::config::RandomisationConfig;
///
/// let config = RandomisationConfig::builder()
///     .total_participants(200)
///     .ratio(ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap())
///     .dimension(Dimension::new("gender", ["Masculino", "Feminino"]))
///     .block_size(4)
///     .seed(123)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.total_participants(), 200);
/// assert_eq!(config.pool_scope().dimensions(), &["gender".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RandomisationConfig {
    total_participants: usize,
    dimensions: Vec<Dimension>,
    ratio: ArmRatio,
    block_size: usize,
    consumption: ConsumptionRates,
    buffer: BufferMultiplier,
    labels: LabelScheme,
    pool_scope: PoolScope,
    id_format: IdFormat,
    seed: u64,
}

impl RandomisationConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> RandomisationConfigBuilder {
        RandomisationConfigBuilder::default()
    }

    /// Total number of participants.
    #[inline]
    pub fn total_participants(&self) -> usize {
        self.total_participants
    }

    /// Stratification dimensions, outer first.
    #[inline]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Dimension names, outer first.
    pub fn dimension_names(&self) -> Vec<String> {
        self.dimensions.iter().map(|d| d.name().to_string()).collect()
    }

    /// Arm ratio.
    #[inline]
    pub fn ratio(&self) -> &ArmRatio {
        &self.ratio
    }

    /// Block size.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Label units per participant.
    #[inline]
    pub fn consumption(&self) -> &ConsumptionRates {
        &self.consumption
    }

    /// Buffer applied to realised consumption.
    #[inline]
    pub fn buffer(&self) -> BufferMultiplier {
        self.buffer
    }

    /// Label naming scheme.
    #[inline]
    pub fn labels(&self) -> &LabelScheme {
        &self.labels
    }

    /// Dimensions keying the label pools.
    #[inline]
    pub fn pool_scope(&self) -> &PoolScope {
        &self.pool_scope
    }

    /// Identifier format.
    #[inline]
    pub fn id_format(&self) -> &IdFormat {
        &self.id_format
    }

    /// Seed of the run.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Same configuration with another seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates every setting that can be checked without composing
    /// strata.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `total_participants` is 0 or greater than 1,000,000
    /// - `block_size` is not a positive multiple of the ratio sum
    /// - a dimension is invalid or declared twice
    /// - consumption rates, pool scope, label template or id format do not
    ///   match the dimensions
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_participants == 0 {
            return Err(ConfigError::ZeroTotal);
        }
        if self.total_participants > MAX_PARTICIPANTS {
            return Err(ConfigError::InvalidParameter {
                name: "total_participants",
                value: format!(
                    "{} exceeds the maximum of {}",
                    self.total_participants, MAX_PARTICIPANTS
                ),
            });
        }
        self.ratio.per_block_counts(self.block_size)?;
        StratumComposer::new(&self.dimensions)?;
        self.consumption.validate(&self.dimensions)?;
        self.pool_scope.validate(&self.dimensions)?;
        self.labels.validate(&self.pool_scope)?;
        self.id_format.validate()?;
        Ok(())
    }
}

/// Builder for [`RandomisationConfig`].
///
/// `total_participants`, `ratio`, `block_size` and `seed` are required.
/// Without an explicit pool scope, pools are keyed by every dimension
/// except the consumption dimension.
#[derive(Debug, Clone, Default)]
pub struct RandomisationConfigBuilder {
    total_participants: Option<usize>,
    dimensions: Vec<Dimension>,
    ratio: Option<ArmRatio>,
    block_size: Option<usize>,
    consumption: ConsumptionRates,
    buffer: Option<f64>,
    labels: Option<LabelScheme>,
    pool_scope: Option<PoolScope>,
    id_format: IdFormat,
    seed: Option<u64>,
}

impl RandomisationConfigBuilder {
    /// Sets the total participant count.
    #[inline]
    pub fn total_participants(mut self, total: usize) -> Self {
        self.total_participants = Some(total);
        self
    }

    /// Appends a stratification dimension (inner to those already added).
    #[inline]
    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Replaces all stratification dimensions.
    #[inline]
    pub fn dimensions(mut self, dimensions: Vec<Dimension>) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Sets the arm ratio.
    #[inline]
    pub fn ratio(mut self, ratio: ArmRatio) -> Self {
        self.ratio = Some(ratio);
        self
    }

    /// Sets the block size.
    #[inline]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Sets the consumption rates (default: one unit per participant).
    #[inline]
    pub fn consumption(mut self, consumption: ConsumptionRates) -> Self {
        self.consumption = consumption;
        self
    }

    /// Sets the buffer multiplier (default: 1.0).
    #[inline]
    pub fn buffer(mut self, buffer: f64) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Sets the label scheme.
    ///
    /// An empty prefix template (also the default) is filled with one
    /// `{dimension}_` placeholder per pool scope dimension.
    #[inline]
    pub fn labels(mut self, labels: LabelScheme) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Sets the pool scope explicitly.
    #[inline]
    pub fn pool_scope(mut self, scope: PoolScope) -> Self {
        self.pool_scope = Some(scope);
        self
    }

    /// Sets the identifier format (default: numeric).
    #[inline]
    pub fn id_format(mut self, id_format: IdFormat) -> Self {
        self.id_format = id_format;
        self
    }

    /// Sets the seed.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for a missing required
    /// setting, `InvalidBuffer` for a bad buffer, or any error from
    /// [`RandomisationConfig::validate`].
    pub fn build(self) -> Result<RandomisationConfig, ConfigError> {
        let total_participants = self.total_participants.ok_or_else(|| missing("total_participants"))?;
        let ratio = self.ratio.ok_or_else(|| missing("ratio"))?;
        let block_size = self.block_size.ok_or_else(|| missing("block_size"))?;
        let seed = self.seed.ok_or_else(|| missing("seed"))?;
        let buffer = match self.buffer {
            Some(value) => BufferMultiplier::new(value)?,
            None => BufferMultiplier::none(),
        };
        let pool_scope = self
            .pool_scope
            .unwrap_or_else(|| PoolScope::excluding_consumption(&self.dimensions, &self.consumption));
        let labels = self.labels.unwrap_or_default().resolve_prefix(&pool_scope);

        let config = RandomisationConfig {
            total_participants,
            dimensions: self.dimensions,
            ratio,
            block_size,
            consumption: self.consumption,
            buffer,
            labels,
            pool_scope,
            id_format: self.id_format,
            seed,
        };

        config.validate()?;
        Ok(config)
    }
}

fn missing(name: &'static str) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        value: "must be specified".to_string(),
    }
}
