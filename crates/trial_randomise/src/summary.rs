//! Run summary: realised arm counts per stratum and label usage per pool.

use std::collections::HashMap;

use trial_core::types::{Participant, Stratum, StratumKey};

use crate::config::RandomisationConfig;
use crate::demand::PoolDemand;
use crate::pool::LabelPoolAllocator;

/// Participants assigned to one arm.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArmCount {
    /// Arm name
    pub arm: String,
    /// Participants assigned
    pub count: usize,
}

/// Realised allocation of one stratum.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StratumSummary {
    /// Stratum key
    pub key: StratumKey,
    /// Target participant count
    pub target: usize,
    /// Per-arm counts, in ratio order
    pub arm_counts: Vec<ArmCount>,
}

/// Label usage of one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolSummary {
    /// Pool scope
    pub scope: StratumKey,
    /// Arm name
    pub arm: String,
    /// Participants drawing from the pool
    pub participants: usize,
    /// Units those participants consume
    pub consumption: usize,
    /// Labels generated
    pub generated: usize,
    /// Labels handed out
    pub consumed: usize,
    /// Labels left over
    pub remaining: usize,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunSummary {
    /// Seed of the run
    pub seed: u64,
    /// Participants randomised
    pub total_participants: usize,
    /// Block size
    pub block_size: usize,
    /// Buffer multiplier
    pub buffer: f64,
    /// Shuffles drawn from the generator
    pub shuffles: usize,
    /// Strata in generation order
    pub strata: Vec<StratumSummary>,
    /// Pools in generation order
    pub pools: Vec<PoolSummary>,
}

impl RunSummary {
    pub(crate) fn collect(
        config: &RandomisationConfig,
        seed: u64,
        shuffles: usize,
        strata: &[Stratum],
        participants: &[Participant],
        demands: &[PoolDemand],
        allocator: &LabelPoolAllocator,
    ) -> Self {
        let ratio = config.ratio();
        let mut counts: HashMap<&StratumKey, Vec<usize>> = HashMap::new();
        for participant in participants {
            if let Some(index) = ratio.position(participant.arm()) {
                counts
                    .entry(participant.stratum())
                    .or_insert_with(|| vec![0; ratio.len()])[index] += 1;
            }
        }

        let strata = strata
            .iter()
            .map(|stratum| {
                let realised = counts.get(stratum.key());
                StratumSummary {
                    key: stratum.key().clone(),
                    target: stratum.target(),
                    arm_counts: ratio
                        .arms()
                        .enumerate()
                        .map(|(index, arm)| ArmCount {
                            arm: arm.name().to_string(),
                            count: realised.map_or(0, |c| c[index]),
                        })
                        .collect(),
                }
            })
            .collect();

        let pools = demands
            .iter()
            .map(|demand| {
                let (consumed, remaining) = allocator
                    .pool(demand.key())
                    .map(|pool| (pool.consumed(), pool.remaining()))
                    .unwrap_or((0, 0));
                PoolSummary {
                    scope: demand.key().scope().clone(),
                    arm: demand.key().arm().name().to_string(),
                    participants: demand.participants(),
                    consumption: demand.consumption(),
                    generated: demand.quantity(),
                    consumed,
                    remaining,
                }
            })
            .collect();

        Self {
            seed,
            total_participants: participants.len(),
            block_size: config.block_size(),
            buffer: config.buffer().as_f64(),
            shuffles,
            strata,
            pools,
        }
    }

    /// Participants per arm over all strata, in ratio order.
    pub fn arm_totals(&self) -> Vec<ArmCount> {
        let mut totals: Vec<ArmCount> = Vec::new();
        for count in self.strata.iter().flat_map(|s| &s.arm_counts) {
            match totals.iter_mut().find(|t| t.arm == count.arm) {
                Some(total) => total.count += count.count,
                None => totals.push(count.clone()),
            }
        }
        totals
    }

    /// Labels generated per arm over all pools.
    pub fn labels_per_arm(&self) -> Vec<ArmCount> {
        let mut totals: Vec<ArmCount> = Vec::new();
        for pool in &self.pools {
            match totals.iter_mut().find(|t| t.arm == pool.arm) {
                Some(total) => total.count += pool.generated,
                None => totals.push(ArmCount {
                    arm: pool.arm.clone(),
                    count: pool.generated,
                }),
            }
        }
        totals
    }

    /// Labels generated over all pools.
    pub fn total_generated(&self) -> usize {
        self.pools.iter().map(|p| p.generated).sum()
    }

    /// Labels handed out over all pools.
    pub fn total_consumed(&self) -> usize {
        self.pools.iter().map(|p| p.consumed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        let key = |site: &str| StratumKey::root().child("site", site);
        let counts = |t: usize, p: usize| {
            vec![
                ArmCount {
                    arm: "Tratamento".to_string(),
                    count: t,
                },
                ArmCount {
                    arm: "Placebo".to_string(),
                    count: p,
                },
            ]
        };
        let pool = |site: &str, arm: &str, generated: usize, consumed: usize| PoolSummary {
            scope: key(site),
            arm: arm.to_string(),
            participants: consumed,
            consumption: consumed,
            generated,
            consumed,
            remaining: generated - consumed,
        };

        RunSummary {
            seed: 42,
            total_participants: 16,
            block_size: 4,
            buffer: 1.5,
            shuffles: 8,
            strata: vec![
                StratumSummary {
                    key: key("1"),
                    target: 8,
                    arm_counts: counts(4, 4),
                },
                StratumSummary {
                    key: key("2"),
                    target: 8,
                    arm_counts: counts(4, 4),
                },
            ],
            pools: vec![
                pool("1", "Tratamento", 6, 4),
                pool("1", "Placebo", 6, 4),
                pool("2", "Tratamento", 6, 4),
                pool("2", "Placebo", 6, 4),
            ],
        }
    }

    #[test]
    fn test_arm_totals() {
        let totals = summary().arm_totals();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].arm, "Tratamento");
        assert_eq!(totals[0].count, 8);
        assert_eq!(totals[1].count, 8);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(summary()).unwrap();

        assert_eq!(value["seed"], 42);
        assert_eq!(value["buffer"], 1.5);
        assert_eq!(value["strata"][0]["key"], serde_json::json!([["site", "1"]]));
        assert_eq!(value["strata"][1]["arm_counts"][0]["arm"], "Tratamento");
        assert_eq!(value["pools"][3]["scope"], serde_json::json!([["site", "2"]]));
        assert_eq!(value["pools"][3]["remaining"], 2);
    }

    #[test]
    fn test_collect_counts_per_stratum() {
        use crate::prelude::*;
        use trial_core::types::{ArmRatio, Dimension};

        let config = RandomisationConfig::builder()
            .total_participants(24)
            .ratio(ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap())
            .dimension(Dimension::new("site", ["1", "2", "3"]))
            .block_size(4)
            .seed(5)
            .build()
            .unwrap();
        let outcome = RandomisationEngine::new(config).unwrap().run().unwrap();

        for stratum in &outcome.summary().strata {
            assert_eq!(stratum.target, 8);
            let counts: Vec<usize> = stratum.arm_counts.iter().map(|c| c.count).collect();
            assert_eq!(counts, vec![4, 4]);
        }
    }

    #[test]
    fn test_label_totals() {
        let summary = summary();
        assert_eq!(summary.total_generated(), 24);
        assert_eq!(summary.total_consumed(), 16);
        let per_arm = summary.labels_per_arm();
        assert_eq!(per_arm[1].arm, "Placebo");
        assert_eq!(per_arm[1].count, 12);
    }
}
