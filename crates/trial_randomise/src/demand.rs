//! Label demand per pool.
//!
//! This module provides:
//! - `ConsumptionRates`: label units consumed per participant, optionally
//!   varying by the level of one dimension
//! - `BufferMultiplier`: overage applied to realised consumption
//! - `ResourceDemandCalculator`: quantity of labels to generate per pool
//!
//! Demand is computed from the realised assignments, never from nominal
//! targets. The buffer is held in basis points so that
//! `ceil(consumption x buffer)` is exact integer arithmetic:
//!
//! ```text
//! consumption = 8, buffer = 1.5  ->  quantity = 12
//! consumption = 3, buffer = 1.5  ->  quantity = 5
//! ```

use std::collections::HashMap;

use trial_core::types::{ArmRatio, Dimension, Participant, Stratum, StratumKey};
use trial_core::{ConfigError, RandomisationError};

use crate::pool::{PoolKey, PoolScope};

/// Most label units a participant can consume (one per label field).
pub const MAX_UNITS_PER_PARTICIPANT: u32 = 2;

/// Largest accepted buffer multiplier.
pub const MAX_BUFFER: f64 = 100.0;

const BASIS_POINTS: u64 = 10_000;

/// Label units consumed per participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionRates {
    dimension: Option<String>,
    rates: Vec<(String, u32)>,
    default_units: u32,
}

impl Default for ConsumptionRates {
    fn default() -> Self {
        Self::uniform(1)
    }
}

impl ConsumptionRates {
    /// Same number of units for every participant.
    pub fn uniform(units: u32) -> Self {
        Self {
            dimension: None,
            rates: Vec::new(),
            default_units: units,
        }
    }

    /// Units keyed by the level of `dimension`.
    ///
    /// ```rust
    /// use trial_core::types::StratumKey;
    /// use trial_randomise::demand::ConsumptionRates;
    ///
    /// let rates = ConsumptionRates::by_dimension("gender", [("Masculino", 2), ("Feminino", 1)]);
    /// let key = StratumKey::root().child("site", "1").child("gender", "Masculino");
    /// assert_eq!(rates.units_for(&key).unwrap(), 2);
    /// ```
    pub fn by_dimension<I, S>(dimension: impl Into<String>, rates: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            dimension: Some(dimension.into()),
            rates: rates.into_iter().map(|(level, units)| (level.into(), units)).collect(),
            default_units: 0,
        }
    }

    /// Dimension the rates depend on, if any.
    #[inline]
    pub fn dimension(&self) -> Option<&str> {
        self.dimension.as_deref()
    }

    /// Configured `(level, units)` pairs.
    #[inline]
    pub fn rates(&self) -> &[(String, u32)] {
        &self.rates
    }

    /// Units used when no dimension is configured.
    #[inline]
    pub fn default_units(&self) -> u32 {
        self.default_units
    }

    /// Checks the rates against the declared dimensions.
    ///
    /// # Errors
    ///
    /// - `InvalidRate` if any rate exceeds [`MAX_UNITS_PER_PARTICIPANT`]
    /// - `UnknownDimension` if the consumption dimension is not declared
    /// - `MissingRate` if a level of that dimension has no rate
    /// - `InvalidParameter` for a rate naming an undeclared level
    pub fn validate(&self, dimensions: &[Dimension]) -> Result<(), ConfigError> {
        let Some(name) = &self.dimension else {
            return check_units("default", self.default_units);
        };

        for (level, units) in &self.rates {
            check_units(level, *units)?;
        }

        let dimension = dimensions
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| ConfigError::UnknownDimension {
                context: "Consumption rates",
                name: name.clone(),
            })?;

        for level in dimension.levels() {
            if !self.rates.iter().any(|(l, _)| l == level) {
                return Err(ConfigError::MissingRate {
                    dimension: name.clone(),
                    level: level.clone(),
                });
            }
        }
        if let Some((level, _)) = self
            .rates
            .iter()
            .find(|(l, _)| !dimension.levels().contains(l))
        {
            return Err(ConfigError::InvalidParameter {
                name: "consumption.rates",
                value: format!("'{}' is not a level of dimension '{}'", level, name),
            });
        }
        Ok(())
    }

    /// Units consumed by a participant of `stratum`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDimension` if the stratum does not carry the
    /// consumption dimension, or `MissingRate` if its level has no rate.
    pub fn units_for(&self, stratum: &StratumKey) -> Result<u32, ConfigError> {
        let Some(name) = &self.dimension else {
            return Ok(self.default_units);
        };
        let level = stratum.value(name).ok_or_else(|| ConfigError::UnknownDimension {
            context: "Consumption rates",
            name: name.clone(),
        })?;
        self.rates
            .iter()
            .find(|(l, _)| l == level)
            .map(|(_, units)| *units)
            .ok_or_else(|| ConfigError::MissingRate {
                dimension: name.clone(),
                level: level.to_string(),
            })
    }
}

fn check_units(level: &str, units: u32) -> Result<(), ConfigError> {
    if units > MAX_UNITS_PER_PARTICIPANT {
        return Err(ConfigError::InvalidRate {
            level: level.to_string(),
            units,
        });
    }
    Ok(())
}

/// Overage applied to realised consumption, stored in basis points.
///
/// # Examples
///
/// ```rust
/// use trial_randomise::demand::BufferMultiplier;
///
/// let buffer = BufferMultiplier::new(1.5).unwrap();
/// assert_eq!(buffer.apply(8), 12);
/// assert_eq!(buffer.apply(3), 5);
/// assert!(BufferMultiplier::new(0.9).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferMultiplier {
    basis_points: u64,
}

impl Default for BufferMultiplier {
    fn default() -> Self {
        Self::none()
    }
}

impl BufferMultiplier {
    /// Creates a multiplier from a decimal factor, rounded to 4 places.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBuffer` if `multiplier` is not finite or lies outside
    /// `[1.0, 100.0]`.
    pub fn new(multiplier: f64) -> Result<Self, ConfigError> {
        if !multiplier.is_finite() || !(1.0..=MAX_BUFFER).contains(&multiplier) {
            return Err(ConfigError::InvalidBuffer(multiplier));
        }
        let basis_points = (multiplier * BASIS_POINTS as f64).round() as u64;
        Ok(Self { basis_points })
    }

    /// Multiplier of exactly 1.0.
    pub const fn none() -> Self {
        Self {
            basis_points: BASIS_POINTS,
        }
    }

    /// Multiplier in basis points (1.5 is 15000).
    #[inline]
    pub fn basis_points(&self) -> u64 {
        self.basis_points
    }

    /// Multiplier as a decimal factor.
    pub fn as_f64(&self) -> f64 {
        self.basis_points as f64 / BASIS_POINTS as f64
    }

    /// `ceil(consumption x multiplier)`.
    pub fn apply(&self, consumption: usize) -> usize {
        let scaled = consumption as u128 * self.basis_points as u128;
        scaled.div_ceil(BASIS_POINTS as u128) as usize
    }
}

/// Labels required by one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDemand {
    key: PoolKey,
    participants: usize,
    consumption: usize,
    quantity: usize,
}

impl PoolDemand {
    /// Pool key.
    #[inline]
    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    /// Participants drawing from the pool.
    #[inline]
    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Units consumed by those participants.
    #[inline]
    pub fn consumption(&self) -> usize {
        self.consumption
    }

    /// Labels to generate, buffer included.
    #[inline]
    pub fn quantity(&self) -> usize {
        self.quantity
    }
}

/// Computes the per-pool label quantities of a run.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDemandCalculator<'a> {
    ratio: &'a ArmRatio,
    rates: &'a ConsumptionRates,
    scope: &'a PoolScope,
    buffer: BufferMultiplier,
}

impl<'a> ResourceDemandCalculator<'a> {
    /// Creates a calculator.
    pub fn new(
        ratio: &'a ArmRatio,
        rates: &'a ConsumptionRates,
        scope: &'a PoolScope,
        buffer: BufferMultiplier,
    ) -> Self {
        Self {
            ratio,
            rates,
            scope,
            buffer,
        }
    }

    /// Demand of every pool, in pool key order.
    ///
    /// Pool keys are ordered by the first stratum projecting onto each
    /// scope, then by arm in ratio order. Every `(scope, arm)` pair gets an
    /// entry, including pools with zero consumption.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if a participant falls outside the
    /// composed strata or its arm is not in the ratio.
    pub fn calculate(
        &self,
        strata: &[Stratum],
        participants: &[Participant],
    ) -> Result<Vec<PoolDemand>, RandomisationError> {
        let mut demands = Vec::new();
        let mut index = HashMap::new();

        for stratum in strata {
            let scope = self.scope.project(stratum.key());
            for arm in self.ratio.arms() {
                let key = PoolKey::new(scope.clone(), arm.clone());
                if index.contains_key(&key) {
                    continue;
                }
                index.insert(key.clone(), demands.len());
                demands.push(PoolDemand {
                    key,
                    participants: 0,
                    consumption: 0,
                    quantity: 0,
                });
            }
        }

        for participant in participants {
            let key = self.scope.key_for(participant.stratum(), participant.arm());
            let Some(&i) = index.get(&key) else {
                return Err(RandomisationError::invariant(format!(
                    "participant {} maps to unknown pool [{}]",
                    participant.sequence(),
                    key
                )));
            };
            let units = self.rates.units_for(participant.stratum())?;
            demands[i].participants += 1;
            demands[i].consumption += units as usize;
        }

        for demand in &mut demands {
            demand.quantity = self.buffer.apply(demand.consumption);
        }
        Ok(demands)
    }
}
