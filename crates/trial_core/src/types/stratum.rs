//! Stratification dimensions, stratum keys and stratum descriptors.

use std::collections::HashSet;
use std::fmt;

use super::record::RESERVED_FIELDS;
use crate::error::ConfigError;

/// How a parent count is divided across the levels of a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Split {
    /// Same count for every level.
    #[default]
    Equal,
    /// Relative integer weights, one per level.
    Weights(Vec<u64>),
    /// Absolute counts, one per level; must sum to the parent count.
    Targets(Vec<usize>),
}

/// A categorical stratification dimension such as `site` or `gender`.
///
/// # Examples
/// ```
/// use trial_core::types::{Dimension, Split, StratumKey};
///
/// let site = Dimension::new("site", ["1", "2", "3"])
///     .with_split(Split::Weights(vec![2, 1, 1]));
/// site.validate().unwrap();
///
/// let counts = site.split_count(&StratumKey::root(), 40).unwrap();
/// assert_eq!(counts, vec![20, 10, 10]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    name: String,
    levels: Vec<String>,
    split: Split,
}

impl Dimension {
    /// Creates a dimension with an equal split.
    pub fn new<I, S>(name: impl Into<String>, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            levels: levels.into_iter().map(Into::into).collect(),
            split: Split::Equal,
        }
    }

    /// Replaces the split rule.
    pub fn with_split(mut self, split: Split) -> Self {
        self.split = split;
        self
    }

    /// Dimension name, also the column header in the exported table.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Levels in declared order.
    #[inline]
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Split rule.
    #[inline]
    pub fn split(&self) -> &Split {
        &self.split
    }

    /// Checks the dimension on its own, independent of any count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "dimension.name",
                value: "must not be empty".to_string(),
            });
        }
        if RESERVED_FIELDS.contains(&self.name.as_str()) {
            return Err(ConfigError::InvalidParameter {
                name: "dimension.name",
                value: format!("'{}' is a reserved column name", self.name),
            });
        }
        if self.levels.is_empty() {
            return Err(ConfigError::EmptyDimension(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for level in &self.levels {
            if !seen.insert(level.as_str()) {
                return Err(ConfigError::DuplicateLevel {
                    dimension: self.name.clone(),
                    level: level.clone(),
                });
            }
        }

        let given = match &self.split {
            Split::Equal => return Ok(()),
            Split::Weights(weights) => {
                if let Some(index) = weights.iter().position(|w| *w == 0) {
                    return Err(ConfigError::ZeroWeight {
                        dimension: self.name.clone(),
                        level: self.levels.get(index).cloned().unwrap_or_default(),
                    });
                }
                weights.len()
            }
            Split::Targets(targets) => targets.len(),
        };
        if given != self.levels.len() {
            return Err(ConfigError::SplitLengthMismatch {
                dimension: self.name.clone(),
                levels: self.levels.len(),
                given,
            });
        }
        Ok(())
    }

    /// Divides `count` (the size of `parent`) across this dimension's levels.
    ///
    /// # Errors
    ///
    /// - `UnevenSplit` if an equal or weighted split leaves a remainder
    /// - `TargetsMismatch` if explicit targets do not sum to `count`
    pub fn split_count(&self, parent: &StratumKey, count: usize) -> Result<Vec<usize>, ConfigError> {
        let uneven = || ConfigError::UnevenSplit {
            dimension: self.name.clone(),
            parent: parent.to_string(),
            count,
        };

        match &self.split {
            Split::Equal => {
                let levels = self.levels.len();
                if count % levels != 0 {
                    return Err(uneven());
                }
                Ok(vec![count / levels; levels])
            }
            Split::Weights(weights) => {
                let total: u128 = weights.iter().map(|w| u128::from(*w)).sum();
                if total == 0 || weights.len() != self.levels.len() {
                    return Err(uneven());
                }
                weights
                    .iter()
                    .map(|w| {
                        let scaled = count as u128 * u128::from(*w);
                        if scaled % total != 0 {
                            Err(uneven())
                        } else {
                            Ok((scaled / total) as usize)
                        }
                    })
                    .collect()
            }
            Split::Targets(targets) => {
                let actual: usize = targets.iter().sum();
                if actual != count {
                    return Err(ConfigError::TargetsMismatch {
                        dimension: self.name.clone(),
                        expected: count,
                        actual,
                    });
                }
                Ok(targets.clone())
            }
        }
    }
}

/// Ordered `(dimension, level)` pairs identifying a stratum.
///
/// The root key (no pairs) identifies the single stratum of an
/// unstratified run.
///
/// # Examples
/// ```
/// use trial_core::types::StratumKey;
///
/// let key = StratumKey::root().child("site", "1").child("gender", "Feminino");
/// assert_eq!(key.to_string(), "site=1, gender=Feminino");
/// assert_eq!(key.value("gender"), Some("Feminino"));
///
/// let scope = key.project(&["site".to_string()]);
/// assert_eq!(scope.to_string(), "site=1");
/// assert_eq!(StratumKey::root().to_string(), "all");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StratumKey {
    values: Vec<(String, String)>,
}

impl StratumKey {
    /// Key of the whole population.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extends this key with one more `(dimension, level)` pair.
    pub fn child(&self, dimension: impl Into<String>, level: impl Into<String>) -> Self {
        let mut values = self.values.clone();
        values.push((dimension.into(), level.into()));
        Self { values }
    }

    /// All pairs in dimension order.
    #[inline]
    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    /// Level of `dimension`, if this key carries it.
    pub fn value(&self, dimension: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(dim, _)| dim == dimension)
            .map(|(_, level)| level.as_str())
    }

    /// Keeps only the pairs whose dimension is listed, in key order.
    pub fn project(&self, dimensions: &[String]) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(dim, _)| dimensions.iter().any(|d| d == dim))
                .cloned()
                .collect(),
        }
    }

    /// True for the key of an unstratified run.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of dimensions in the key.
    #[inline]
    pub fn depth(&self) -> usize {
        self.values.len()
    }
}

impl fmt::Display for StratumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            return f.write_str("all");
        }
        for (i, (dim, level)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", dim, level)?;
        }
        Ok(())
    }
}

/// A leaf stratum: key, target participant count and block size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stratum {
    key: StratumKey,
    target: usize,
    block_size: usize,
}

impl Stratum {
    /// Creates a stratum descriptor.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotDivisible` if `target` cannot be filled with
    /// whole blocks of `block_size`.
    pub fn new(key: StratumKey, target: usize, block_size: usize) -> Result<Self, ConfigError> {
        if block_size == 0 || target % block_size != 0 {
            return Err(ConfigError::NotDivisible {
                stratum: key.to_string(),
                count: target,
                block_size,
            });
        }
        Ok(Self {
            key,
            target,
            block_size,
        })
    }

    /// Stratum key.
    #[inline]
    pub fn key(&self) -> &StratumKey {
        &self.key
    }

    /// Target participant count.
    #[inline]
    pub fn target(&self) -> usize {
        self.target
    }

    /// Block size used in this stratum.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of whole blocks needed to reach the target.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.target / self.block_size
    }
}
