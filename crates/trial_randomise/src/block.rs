//! Permuted-block generation for one homogeneous group.
//!
//! Each block is laid out in ratio order, shuffled on its own and appended.
//! Shuffling per block (rather than the whole sequence) keeps every
//! block-aligned window exactly balanced.

use tracing::trace;
use trial_core::rng::TrialRng;
use trial_core::types::{Arm, ArmRatio, StratumKey};
use trial_core::{ConfigError, RandomisationError};

/// Generates balanced arm sequences for one stratum at a time.
///
/// # Examples
///
/// ```rust
/// use trial_core::rng::TrialRng;
/// use trial_core::types::{ArmRatio, StratumKey};
/// use trial_randomise::block::BlockGenerator;
///
/// let ratio = ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap();
/// let generator = BlockGenerator::new(&ratio, 4).unwrap();
/// let mut rng = TrialRng::from_seed(42);
///
/// let arms = generator.generate(&StratumKey::root(), 8, &mut rng).unwrap();
/// assert_eq!(arms.len(), 8);
/// assert_eq!(rng.shuffle_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct BlockGenerator<'a> {
    ratio: &'a ArmRatio,
    block_size: usize,
    per_block: Vec<usize>,
    template: Vec<Arm>,
}

impl<'a> BlockGenerator<'a> {
    /// Creates a generator for `ratio` with blocks of `block_size`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBlockSize` if `block_size` is not a
    /// positive multiple of the ratio sum.
    pub fn new(ratio: &'a ArmRatio, block_size: usize) -> Result<Self, ConfigError> {
        let per_block = ratio.per_block_counts(block_size)?;
        let template = ratio
            .arms()
            .zip(&per_block)
            .flat_map(|(arm, count)| std::iter::repeat(arm.clone()).take(*count))
            .collect();
        Ok(Self {
            ratio,
            block_size,
            per_block,
            template,
        })
    }

    /// Block size.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Occurrences of each arm per block, in ratio order.
    #[inline]
    pub fn per_block_counts(&self) -> &[usize] {
        &self.per_block
    }

    /// Unshuffled block in ratio order.
    #[inline]
    pub fn template(&self) -> &[Arm] {
        &self.template
    }

    /// Number of blocks needed for `count` participants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotDivisible` if `count` would need a partial
    /// block.
    pub fn block_count(&self, stratum: &StratumKey, count: usize) -> Result<usize, ConfigError> {
        if count % self.block_size != 0 {
            return Err(ConfigError::NotDivisible {
                stratum: stratum.to_string(),
                count,
                block_size: self.block_size,
            });
        }
        Ok(count / self.block_size)
    }

    /// Generates `count` assignments for one stratum.
    ///
    /// The count is checked before the generator is touched, so a rejected
    /// call consumes no randomness.
    ///
    /// # Errors
    ///
    /// - `Config(NotDivisible)` if `count` is not a whole number of blocks
    /// - `InvariantViolation` if a shuffled block does not match the ratio
    pub fn generate(
        &self,
        stratum: &StratumKey,
        count: usize,
        rng: &mut TrialRng,
    ) -> Result<Vec<Arm>, RandomisationError> {
        let blocks = self.block_count(stratum, count)?;
        let mut sequence = Vec::with_capacity(count);

        for index in 0..blocks {
            let mut block = self.template.clone();
            rng.shuffle(&mut block);
            self.check_block(&block).map_err(|detail| {
                RandomisationError::invariant(format!(
                    "block {} of stratum [{}]: {}",
                    index + 1,
                    stratum,
                    detail
                ))
            })?;
            trace!(stratum = %stratum, block = index + 1, "Block generated");
            sequence.extend(block);
        }

        Ok(sequence)
    }

    /// Checks that `block` holds exactly the per-arm counts of the ratio.
    ///
    /// Returns a description of the first mismatch.
    pub fn check_block(&self, block: &[Arm]) -> Result<(), String> {
        if block.len() != self.block_size {
            return Err(format!(
                "length {} differs from block size {}",
                block.len(),
                self.block_size
            ));
        }

        let mut counts = vec![0usize; self.per_block.len()];
        for arm in block {
            match self.ratio.position(arm) {
                Some(index) => counts[index] += 1,
                None => return Err(format!("arm '{}' is not part of the ratio", arm)),
            }
        }

        for ((arm, _), (actual, expected)) in self
            .ratio
            .entries()
            .iter()
            .zip(counts.iter().zip(&self.per_block))
        {
            if actual != expected {
                return Err(format!(
                    "arm '{}' appears {} times, expected {}",
                    arm, actual, expected
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_to_one() -> ArmRatio {
        ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap()
    }

    #[test]
    fn test_template_in_ratio_order() {
        let ratio = ArmRatio::new(vec![(Arm::new("A"), 2), (Arm::new("B"), 1)]).unwrap();
        let generator = BlockGenerator::new(&ratio, 6).unwrap();
        let names: Vec<&str> = generator.template().iter().map(Arm::name).collect();
        assert_eq!(names, vec!["A", "A", "A", "A", "B", "B"]);
        assert_eq!(generator.per_block_counts(), &[4, 2]);
    }

    #[test]
    fn test_every_block_balanced() {
        let ratio = one_to_one();
        let generator = BlockGenerator::new(&ratio, 4).unwrap();
        let mut rng = TrialRng::from_seed(42);
        let arms = generator
            .generate(&StratumKey::root(), 40, &mut rng)
            .unwrap();

        assert_eq!(arms.len(), 40);
        for block in arms.chunks(4) {
            assert!(generator.check_block(block).is_ok());
        }
        assert_eq!(rng.shuffle_count(), 10);
    }

    #[test]
    fn test_partial_block_rejected_without_draws() {
        let ratio = one_to_one();
        let generator = BlockGenerator::new(&ratio, 4).unwrap();
        let mut rng = TrialRng::from_seed(42);

        let result = generator.generate(&StratumKey::root(), 10, &mut rng);
        assert!(matches!(
            result,
            Err(RandomisationError::Config(ConfigError::NotDivisible { count: 10, .. }))
        ));
        assert_eq!(rng.shuffle_count(), 0);
    }

    #[test]
    fn test_zero_count_yields_empty_sequence() {
        let ratio = one_to_one();
        let generator = BlockGenerator::new(&ratio, 2).unwrap();
        let mut rng = TrialRng::from_seed(1);
        let arms = generator.generate(&StratumKey::root(), 0, &mut rng).unwrap();
        assert!(arms.is_empty());
    }

    #[test]
    fn test_invalid_block_size() {
        let ratio = one_to_one();
        assert!(matches!(
            BlockGenerator::new(&ratio, 3),
            Err(ConfigError::InvalidBlockSize { block_size: 3, ratio_sum: 2 })
        ));
    }

    #[test]
    fn test_check_block_reports_mismatch() {
        let ratio = one_to_one();
        let generator = BlockGenerator::new(&ratio, 2).unwrap();

        let skewed = vec![Arm::new("Tratamento"), Arm::new("Tratamento")];
        let err = generator.check_block(&skewed).unwrap_err();
        assert!(err.contains("appears 2 times, expected 1"));

        let foreign = vec![Arm::new("Tratamento"), Arm::new("Outro")];
        assert!(generator.check_block(&foreign).unwrap_err().contains("not part"));

        let short = vec![Arm::new("Tratamento")];
        assert!(generator.check_block(&short).unwrap_err().contains("length 1"));
    }
}
