//! Treatment arms and allocation ratios.

use std::collections::HashSet;
use std::fmt;

use crate::error::ConfigError;

/// A randomisation arm.
///
/// The `code` is the token written into resource labels. When not given
/// explicitly it is the upper-cased first character of the name.
///
/// # Examples
/// ```
/// use trial_core::types::Arm;
///
/// let arm = Arm::new("Tratamento");
/// assert_eq!(arm.name(), "Tratamento");
/// assert_eq!(arm.code(), "T");
///
/// let arm = Arm::with_code("Placebo", "PL");
/// assert_eq!(arm.code(), "PL");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Arm {
    name: String,
    code: String,
}

impl Arm {
    /// Creates an arm whose code is derived from its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let code = name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default();
        Self { name, code }
    }

    /// Creates an arm with an explicit label code.
    pub fn with_code(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    /// Arm name as written in the `assigned_arm` column.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label code for this arm.
    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ordered arm ratio, e.g. `Tratamento:Placebo = 1:1`.
///
/// Entry order is significant: it is the order in which arms are laid out
/// in a block before shuffling and the order of pools within a scope.
///
/// # Examples
/// ```
/// use trial_core::types::{Arm, ArmRatio};
///
/// let ratio = ArmRatio::new(vec![
///     (Arm::new("Tratamento"), 2),
///     (Arm::new("Placebo"), 1),
/// ]).unwrap();
///
/// assert_eq!(ratio.ratio_sum(), 3);
/// assert_eq!(ratio.per_block_counts(6).unwrap(), vec![4, 2]);
/// assert!(ratio.per_block_counts(4).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmRatio {
    entries: Vec<(Arm, usize)>,
}

impl ArmRatio {
    /// Creates a validated ratio.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - no arms are given
    /// - an arm name or code is empty
    /// - a weight is zero
    /// - two arms share a name or a label code
    pub fn new(entries: Vec<(Arm, usize)>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::EmptyRatio);
        }

        let mut names = HashSet::new();
        let mut codes: Vec<(&str, &str)> = Vec::with_capacity(entries.len());
        for (arm, weight) in &entries {
            if arm.name.is_empty() || arm.code.is_empty() {
                return Err(ConfigError::EmptyArmName);
            }
            if *weight == 0 {
                return Err(ConfigError::ZeroArmWeight {
                    arm: arm.name.clone(),
                });
            }
            if !names.insert(arm.name.as_str()) {
                return Err(ConfigError::DuplicateArm(arm.name.clone()));
            }
            if let Some((first, _)) = codes.iter().find(|(_, code)| *code == arm.code) {
                return Err(ConfigError::DuplicateArmCode {
                    code: arm.code.clone(),
                    first: first.to_string(),
                    second: arm.name.clone(),
                });
            }
            codes.push((arm.name.as_str(), arm.code.as_str()));
        }

        Ok(Self { entries })
    }

    /// Equal-weight ratio over the given arm names.
    pub fn balanced(names: &[&str]) -> Result<Self, ConfigError> {
        Self::new(names.iter().map(|name| (Arm::new(*name), 1)).collect())
    }

    /// Ratio entries in declared order.
    #[inline]
    pub fn entries(&self) -> &[(Arm, usize)] {
        &self.entries
    }

    /// Arms in declared order.
    pub fn arms(&self) -> impl Iterator<Item = &Arm> {
        self.entries.iter().map(|(arm, _)| arm)
    }

    /// Number of arms.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a validated ratio.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of arm weights (the smallest valid block size).
    pub fn ratio_sum(&self) -> usize {
        self.entries.iter().map(|(_, weight)| weight).sum()
    }

    /// Index of an arm in declared order.
    pub fn position(&self, arm: &Arm) -> Option<usize> {
        self.entries.iter().position(|(a, _)| a == arm)
    }

    /// Number of times each arm appears in one block of `block_size`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBlockSize` if `block_size` is zero or not
    /// a multiple of [`ratio_sum`](Self::ratio_sum).
    pub fn per_block_counts(&self, block_size: usize) -> Result<Vec<usize>, ConfigError> {
        let ratio_sum = self.ratio_sum();
        if block_size == 0 || block_size % ratio_sum != 0 {
            return Err(ConfigError::InvalidBlockSize {
                block_size,
                ratio_sum,
            });
        }
        let multiple = block_size / ratio_sum;
        Ok(self
            .entries
            .iter()
            .map(|(_, weight)| weight * multiple)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_code_derivation() {
        assert_eq!(Arm::new("placebo").code(), "P");
        assert_eq!(Arm::new("Ácido").code(), "Á");
        assert_eq!(Arm::new("").code(), "");
    }

    #[test]
    fn test_balanced_ratio() {
        let ratio = ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap();
        assert_eq!(ratio.len(), 2);
        assert_eq!(ratio.ratio_sum(), 2);
        assert_eq!(ratio.per_block_counts(4).unwrap(), vec![2, 2]);
        assert_eq!(ratio.position(&Arm::new("Placebo")), Some(1));
    }

    #[test]
    fn test_empty_ratio_rejected() {
        assert_eq!(ArmRatio::new(vec![]), Err(ConfigError::EmptyRatio));
    }

    #[test]
    fn test_zero_weight_rejected() {
        let result = ArmRatio::new(vec![(Arm::new("A"), 0), (Arm::new("B"), 1)]);
        assert!(matches!(result, Err(ConfigError::ZeroArmWeight { .. })));
    }

    #[test]
    fn test_duplicate_arm_rejected() {
        let result = ArmRatio::balanced(&["A", "A"]);
        assert_eq!(result, Err(ConfigError::DuplicateArm("A".to_string())));
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let result = ArmRatio::balanced(&["Placebo", "Probiotic"]);
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateArmCode { ref code, .. }) if code == "P"
        ));

        let ratio = ArmRatio::new(vec![
            (Arm::new("Placebo"), 1),
            (Arm::with_code("Probiotic", "B"), 1),
        ]);
        assert!(ratio.is_ok());
    }

    #[test]
    fn test_block_size_must_be_multiple() {
        let ratio = ArmRatio::new(vec![(Arm::new("A"), 2), (Arm::new("B"), 1)]).unwrap();
        assert!(ratio.per_block_counts(0).is_err());
        assert!(ratio.per_block_counts(4).is_err());
        assert_eq!(ratio.per_block_counts(3).unwrap(), vec![2, 1]);
        assert_eq!(ratio.per_block_counts(9).unwrap(), vec![6, 3]);
    }
}
