//! Integration tests for module exports.
//!
//! Verify that all public modules and types are exported and usable via
//! absolute paths.

/// Types module is accessible via absolute path.
#[test]
fn test_types_module_exports() {
    use trial_core::types::arm::{Arm, ArmRatio};
    use trial_core::types::participant::{LabelSlots, Participant};
    use trial_core::types::record::{IdFormat, RandomisationRecord, ID_FIELD};
    use trial_core::types::stratum::{Dimension, Split, Stratum, StratumKey};

    let ratio = ArmRatio::new(vec![(Arm::new("Tratamento"), 1), (Arm::new("Placebo"), 1)]).unwrap();
    let site = Dimension::new("site", ["1", "2"]).with_split(Split::Equal);
    site.validate().unwrap();

    let key = StratumKey::root().child("site", "1");
    let stratum = Stratum::new(key.clone(), 4, ratio.ratio_sum()).unwrap();
    assert_eq!(stratum.block_count(), 2);

    let participant = Participant::new(1, key.clone(), 0, Arm::new("Placebo"));
    let record = RandomisationRecord::new(
        participant.sequence(),
        IdFormat::Numeric.format(participant.sequence()),
        participant.stratum().clone(),
        participant.arm().clone(),
        LabelSlots::empty(),
    );
    assert_eq!(record.randomisation_id(), "1");
    assert_eq!(ID_FIELD, "randomization_id");
}

/// Re-exports at the types module level match the submodule paths.
#[test]
fn test_types_reexports() {
    use trial_core::types::{header, Arm, StratumKey};

    assert_eq!(Arm::new("Placebo"), trial_core::types::arm::Arm::new("Placebo"));
    assert!(StratumKey::root().is_root());
    assert_eq!(header(["site"]).len(), 5);
}

/// Error types are reachable from the crate root.
#[test]
fn test_error_exports() {
    use trial_core::{ConfigError, RandomisationError};

    let err: RandomisationError = ConfigError::EmptyRatio.into();
    assert!(err.to_string().contains("at least one arm"));
}

/// RNG module is accessible via absolute path.
#[test]
fn test_rng_exports() {
    use trial_core::rng::TrialRng;

    let mut rng = TrialRng::from_seed(42);
    let mut values = [1, 2, 3];
    rng.shuffle(&mut values);
    assert_eq!(rng.seed(), 42);
}
