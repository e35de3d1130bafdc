//! Randomisation engine.
//!
//! One engine covers every stratification depth. A run is a single
//! synchronous batch:
//!
//! 1. seed one [`TrialRng`]
//! 2. generate blocks per stratum, in stratum order
//! 3. compute label demand from the realised assignments
//! 4. generate and shuffle one pool per `(scope, arm)`, in pool key order
//! 5. hand labels out in participant order
//! 6. assemble the table and verify it
//!
//! Identical seed and configuration give an identical draw sequence and
//! therefore an identical table.

use tracing::{debug, info};
use trial_core::rng::TrialRng;
use trial_core::types::{Participant, Stratum, StratumKey};
use trial_core::{ConfigError, RandomisationError};

use crate::assembler::{RandomisationTable, RandomisationTableAssembler};
use crate::block::BlockGenerator;
use crate::config::RandomisationConfig;
use crate::demand::ResourceDemandCalculator;
use crate::pool::LabelPoolAllocator;
use crate::strata::StratumComposer;
use crate::summary::RunSummary;
use crate::verify::verify_outcome;

/// Table and summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomisationOutcome {
    pub(crate) table: RandomisationTable,
    pub(crate) summary: RunSummary,
}

impl RandomisationOutcome {
    /// Randomisation table.
    #[inline]
    pub fn table(&self) -> &RandomisationTable {
        &self.table
    }

    /// Run summary.
    #[inline]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Splits the outcome into table and summary.
    pub fn into_parts(self) -> (RandomisationTable, RunSummary) {
        (self.table, self.summary)
    }
}

/// Validated configuration plus its composed strata.
///
/// # Examples
///
/// ```rust
/// use trial_core::types::ArmRatio;
/// use trial_randomise::config::RandomisationConfig;
/// use trial_randomise::engine::RandomisationEngine;
///
/// let config = RandomisationConfig::builder()
///     .total_participants(8)
///     .ratio(ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap())
///     .block_size(2)
///     .seed(42)
///     .build()
///     .unwrap();
///
/// let outcome = RandomisationEngine::new(config).unwrap().run().unwrap();
/// assert_eq!(outcome.table().len(), 8);
/// assert_eq!(outcome.summary().arm_totals()[0].count, 4);
/// ```
#[derive(Debug, Clone)]
pub struct RandomisationEngine {
    config: RandomisationConfig,
    strata: Vec<Stratum>,
}

impl RandomisationEngine {
    /// Validates `config` and composes the strata.
    ///
    /// No random draw happens here.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for any invalid setting, an inexact
    /// composition, or two pools whose labels could coincide.
    pub fn new(config: RandomisationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let strata = StratumComposer::new(config.dimensions())?
            .compose(config.total_participants(), config.block_size())?;
        let scopes: Vec<StratumKey> = strata
            .iter()
            .map(|stratum| config.pool_scope().project(stratum.key()))
            .collect();
        config.labels().check_stems(&scopes, config.ratio())?;
        Ok(Self { config, strata })
    }

    /// Configuration of the engine.
    #[inline]
    pub fn config(&self) -> &RandomisationConfig {
        &self.config
    }

    /// Composed strata, in generation order.
    #[inline]
    pub fn strata(&self) -> &[Stratum] {
        &self.strata
    }

    /// Runs with the configured seed.
    pub fn run(&self) -> Result<RandomisationOutcome, RandomisationError> {
        self.run_with_seed(self.config.seed())
    }

    /// Runs with `seed` instead of the configured seed.
    ///
    /// # Errors
    ///
    /// - `ResourceExhausted` if a pool cannot cover a withdrawal
    /// - `InvariantViolation` if a block or the finished table breaks an
    ///   invariant
    pub fn run_with_seed(&self, seed: u64) -> Result<RandomisationOutcome, RandomisationError> {
        let config = &self.config;
        let mut rng = TrialRng::from_seed(seed);

        info!(
            seed,
            total = config.total_participants(),
            strata = self.strata.len(),
            block_size = config.block_size(),
            "Randomisation started"
        );

        let participants = self.assign_arms(&mut rng)?;

        let demands = ResourceDemandCalculator::new(
            config.ratio(),
            config.consumption(),
            config.pool_scope(),
            config.buffer(),
        )
        .calculate(&self.strata, &participants)?;

        let mut allocator = LabelPoolAllocator::generate(&demands, config.labels(), &mut rng)?;
        let slots = allocator.allocate(&participants, config.consumption(), config.pool_scope())?;

        let table = RandomisationTableAssembler::new(config.id_format().clone()).assemble(
            config.dimension_names(),
            &participants,
            slots,
        )?;

        let summary = RunSummary::collect(
            config,
            seed,
            rng.shuffle_count(),
            &self.strata,
            &participants,
            &demands,
            &allocator,
        );

        let outcome = RandomisationOutcome { table, summary };
        verify_outcome(config, &self.strata, &outcome)?;

        info!(
            seed,
            records = outcome.table.len(),
            pools = outcome.summary.pools.len(),
            labels_generated = outcome.summary.total_generated(),
            labels_consumed = outcome.summary.total_consumed(),
            shuffles = rng.shuffle_count(),
            "Randomisation finished"
        );
        Ok(outcome)
    }

    fn assign_arms(&self, rng: &mut TrialRng) -> Result<Vec<Participant>, RandomisationError> {
        let generator = BlockGenerator::new(self.config.ratio(), self.config.block_size())?;
        let mut participants = Vec::with_capacity(self.config.total_participants());

        for stratum in &self.strata {
            let arms = generator.generate(stratum.key(), stratum.target(), rng)?;
            debug!(
                stratum = %stratum.key(),
                target = stratum.target(),
                blocks = stratum.block_count(),
                "Stratum randomised"
            );
            for (position, arm) in arms.into_iter().enumerate() {
                let sequence = participants.len() + 1;
                participants.push(Participant::new(sequence, stratum.key().clone(), position, arm));
            }
        }

        Ok(participants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::ConsumptionRates;
    use crate::pool::LabelScheme;
    use trial_core::types::{Arm, ArmRatio, Dimension, IdFormat};

    fn site_gender_config(seed: u64) -> RandomisationConfig {
        RandomisationConfig::builder()
            .total_participants(32)
            .ratio(ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap())
            .dimension(Dimension::new("site", ["1", "2"]))
            .dimension(Dimension::new("gender", ["Masculino", "Feminino"]))
            .block_size(4)
            .consumption(ConsumptionRates::by_dimension(
                "gender",
                [("Masculino", 2), ("Feminino", 1)],
            ))
            .buffer(1.5)
            .labels(LabelScheme::new("centro_{site}_", "", 3).unwrap())
            .id_format(IdFormat::Padded {
                prefix: "R".to_string(),
                width: 3,
            })
            .seed(seed)
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_composes_without_draws() {
        let engine = RandomisationEngine::new(site_gender_config(42)).unwrap();
        assert_eq!(engine.strata().len(), 4);
        assert!(engine.strata().iter().all(|s| s.target() == 8));
    }

    #[test]
    fn test_run_site_gender() {
        let engine = RandomisationEngine::new(site_gender_config(42)).unwrap();
        let outcome = engine.run().unwrap();
        let table = outcome.table();

        assert_eq!(table.len(), 32);
        assert_eq!(table.records()[0].randomisation_id(), "R001");
        assert_eq!(table.records()[31].randomisation_id(), "R032");

        // 8 blocks of 4, then 4 pools
        assert_eq!(outcome.summary().shuffles, 12);
        assert_eq!(outcome.summary().pools.len(), 4);

        // per site and arm: 4 men x 2 + 4 women x 1 = 12 units, buffered to 18
        for pool in &outcome.summary().pools {
            assert_eq!(pool.consumption, 12);
            assert_eq!(pool.generated, 18);
            assert_eq!(pool.consumed, 12);
            assert_eq!(pool.remaining, 6);
        }

        for record in table.records() {
            let site = record.strata().value("site").unwrap();
            let prefix = format!("centro_{}_{}", site, record.assigned_arm().code());
            assert!(record.labels().all(|l| l.starts_with(&prefix)));
            let expected = match record.strata().value("gender") {
                Some("Masculino") => 2,
                _ => 1,
            };
            assert_eq!(record.labels().count(), expected);
        }
    }

    #[test]
    fn test_run_with_seed_overrides() {
        let engine = RandomisationEngine::new(site_gender_config(42)).unwrap();
        let a = engine.run_with_seed(7).unwrap();
        let b = RandomisationEngine::new(site_gender_config(7)).unwrap().run().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.summary().seed, 7);
    }

    #[test]
    fn test_default_labels_unique_per_stratum() {
        let config = RandomisationConfig::builder()
            .total_participants(16)
            .ratio(ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap())
            .dimension(Dimension::new("site", ["1", "2"]))
            .dimension(Dimension::new("gender", ["Masculino", "Feminino"]))
            .block_size(2)
            .seed(42)
            .build()
            .unwrap();
        let outcome = RandomisationEngine::new(config).unwrap().run().unwrap();

        assert_eq!(outcome.summary().pools.len(), 8);
        let first = outcome.table().records()[0].resource_label_1().unwrap();
        assert!(first.starts_with("1_Masculino_"));
    }

    #[test]
    fn test_clashing_labels_rejected_at_new() {
        let config = RandomisationConfig::builder()
            .total_participants(8)
            .ratio(
                ArmRatio::new(vec![
                    (Arm::with_code("Tratamento", "T"), 1),
                    (Arm::with_code("Placebo", "PT"), 1),
                ])
                .unwrap(),
            )
            // site 1 / Placebo and site 1P / Tratamento share the stem "1PT"
            .dimension(Dimension::new("site", ["1", "1P"]))
            .block_size(2)
            .labels(LabelScheme::new("{site}", "", 3).unwrap())
            .seed(42)
            .build()
            .unwrap();
        assert!(matches!(
            RandomisationEngine::new(config),
            Err(ConfigError::InvalidLabelTemplate { .. })
        ));
    }

    #[test]
    fn test_composition_error_surfaces_at_new() {
        let config = RandomisationConfig::builder()
            .total_participants(100)
            .ratio(ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap())
            .dimension(Dimension::new("site", ["1", "2", "3", "4", "5"]))
            .dimension(Dimension::new("gender", ["Masculino", "Feminino"]))
            .block_size(4)
            .seed(42)
            .build()
            .unwrap();
        assert!(matches!(
            RandomisationEngine::new(config),
            Err(ConfigError::NotDivisible { count: 10, .. })
        ));
    }
}
