//! Post-run verification of a finished table.
//!
//! Re-derives every published property from the table itself, so a defect
//! anywhere upstream surfaces as an `InvariantViolation` instead of a
//! released table:
//!
//! - record count equals the configured total
//! - identifiers run `1..=N` in record order
//! - every block-aligned window of each stratum matches the ratio
//! - each participant holds exactly its consumption in labels
//! - no label is assigned twice
//! - per pool, labels consumed never exceed labels generated

use std::collections::{HashMap, HashSet};

use trial_core::types::{Arm, Stratum, StratumKey};
use trial_core::RandomisationError;

use crate::block::BlockGenerator;
use crate::config::RandomisationConfig;
use crate::engine::RandomisationOutcome;

/// Checks a finished outcome against its configuration and strata.
///
/// # Errors
///
/// Returns `InvariantViolation` describing the first failed check.
pub fn verify_outcome(
    config: &RandomisationConfig,
    strata: &[Stratum],
    outcome: &RandomisationOutcome,
) -> Result<(), RandomisationError> {
    let table = outcome.table();
    let records = table.records();

    if records.len() != config.total_participants() {
        return Err(RandomisationError::invariant(format!(
            "table has {} records, expected {}",
            records.len(),
            config.total_participants()
        )));
    }

    for (position, record) in records.iter().enumerate() {
        let expected = config.id_format().format(position + 1);
        if record.sequence() != position + 1 || record.randomisation_id() != expected {
            return Err(RandomisationError::invariant(format!(
                "record {} has identifier '{}', expected '{}'",
                position + 1,
                record.randomisation_id(),
                expected
            )));
        }
    }

    let mut by_stratum: HashMap<&StratumKey, Vec<Arm>> = HashMap::new();
    let mut seen = HashSet::new();
    let mut consumed_per_pool = HashMap::new();
    for record in records {
        by_stratum
            .entry(record.strata())
            .or_default()
            .push(record.assigned_arm().clone());

        let units = config.consumption().units_for(record.strata())? as usize;
        let held = record.labels().count();
        if held != units {
            return Err(RandomisationError::invariant(format!(
                "record '{}' holds {} labels, expected {}",
                record.randomisation_id(),
                held,
                units
            )));
        }
        for label in record.labels() {
            if !seen.insert(label) {
                return Err(RandomisationError::invariant(format!(
                    "label '{}' assigned more than once",
                    label
                )));
            }
        }
        let key = config.pool_scope().key_for(record.strata(), record.assigned_arm());
        *consumed_per_pool.entry(key.to_string()).or_insert(0usize) += held;
    }

    let generator = BlockGenerator::new(config.ratio(), config.block_size())?;
    for stratum in strata {
        let arms = by_stratum.remove(stratum.key()).unwrap_or_default();
        if arms.len() != stratum.target() {
            return Err(RandomisationError::invariant(format!(
                "stratum [{}] has {} records, expected {}",
                stratum.key(),
                arms.len(),
                stratum.target()
            )));
        }
        for (index, block) in arms.chunks(config.block_size()).enumerate() {
            generator.check_block(block).map_err(|detail| {
                RandomisationError::invariant(format!(
                    "block {} of stratum [{}]: {}",
                    index + 1,
                    stratum.key(),
                    detail
                ))
            })?;
        }
    }
    if let Some((key, arms)) = by_stratum.into_iter().next() {
        return Err(RandomisationError::invariant(format!(
            "{} records in unknown stratum [{}]",
            arms.len(),
            key
        )));
    }

    for pool in &outcome.summary().pools {
        let key = format!("{} / {}", pool.scope, pool.arm);
        let consumed = consumed_per_pool.remove(&key).unwrap_or(0);
        if consumed != pool.consumed || pool.consumed > pool.generated {
            return Err(RandomisationError::invariant(format!(
                "pool [{}] consumed {} of {} generated labels (table shows {})",
                key, pool.consumed, pool.generated, consumed
            )));
        }
    }
    if let Some((key, consumed)) = consumed_per_pool.into_iter().next() {
        return Err(RandomisationError::invariant(format!(
            "{} labels drawn from unknown pool [{}]",
            consumed, key
        )));
    }

    Ok(())
}
