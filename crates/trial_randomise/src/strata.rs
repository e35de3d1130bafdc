//! Stratum composition.
//!
//! Splits the total participant count across the declared dimensions,
//! outer dimension first. The resulting order is the generation order of
//! the whole run and therefore the row order of the exported table:
//!
//! ```text
//! site=1, gender=Masculino
//! site=1, gender=Feminino
//! site=2, gender=Masculino
//! ...
//! ```

use std::collections::HashSet;

use tracing::debug;
use trial_core::types::{Dimension, Stratum, StratumKey};
use trial_core::ConfigError;

/// Partitions a total count into leaf strata.
///
/// Depth 0 (no dimensions) yields a single root stratum holding the whole
/// total.
///
/// # Examples
///
/// ```rust
/// use trial_core::types::{Dimension, Split};
/// use trial_randomise::strata::StratumComposer;
///
/// let dimensions = vec![
///     Dimension::new("site", ["1", "2"]).with_split(Split::Targets(vec![16, 8])),
///     Dimension::new("gender", ["Masculino", "Feminino"]),
/// ];
/// let composer = StratumComposer::new(&dimensions).unwrap();
/// let strata = composer.compose(24, 4).unwrap();
///
/// let targets: Vec<usize> = strata.iter().map(|s| s.target()).collect();
/// assert_eq!(targets, vec![8, 8, 4, 4]);
/// assert_eq!(strata[2].key().to_string(), "site=2, gender=Masculino");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StratumComposer<'a> {
    dimensions: &'a [Dimension],
}

impl<'a> StratumComposer<'a> {
    /// Creates a composer over validated dimensions.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a dimension is invalid on its own or two
    /// dimensions share a name.
    pub fn new(dimensions: &'a [Dimension]) -> Result<Self, ConfigError> {
        let mut names = HashSet::new();
        for dimension in dimensions {
            dimension.validate()?;
            if !names.insert(dimension.name()) {
                return Err(ConfigError::DuplicateDimension(dimension.name().to_string()));
            }
        }
        Ok(Self { dimensions })
    }

    /// Number of stratification dimensions.
    #[inline]
    pub fn depth(&self) -> usize {
        self.dimensions.len()
    }

    /// Dimension names in declared order.
    pub fn dimension_names(&self) -> impl Iterator<Item = &'a str> {
        self.dimensions.iter().map(Dimension::name)
    }

    /// Produces the leaf strata for `total` participants.
    ///
    /// # Errors
    ///
    /// - `ZeroTotal` if `total` is zero
    /// - `UnevenSplit` / `TargetsMismatch` if a level split is inexact
    /// - `NotDivisible` if a leaf count is not a whole number of blocks
    pub fn compose(&self, total: usize, block_size: usize) -> Result<Vec<Stratum>, ConfigError> {
        if total == 0 {
            return Err(ConfigError::ZeroTotal);
        }

        let mut strata = Vec::new();
        self.expand(0, StratumKey::root(), total, block_size, &mut strata)?;

        debug!(
            depth = self.depth(),
            strata = strata.len(),
            total,
            "Strata composed"
        );
        Ok(strata)
    }

    fn expand(
        &self,
        level: usize,
        parent: StratumKey,
        count: usize,
        block_size: usize,
        out: &mut Vec<Stratum>,
    ) -> Result<(), ConfigError> {
        let Some(dimension) = self.dimensions.get(level) else {
            out.push(Stratum::new(parent, count, block_size)?);
            return Ok(());
        };

        let counts = dimension.split_count(&parent, count)?;
        for (value, child_count) in dimension.levels().iter().zip(counts) {
            let child = parent.child(dimension.name(), value.as_str());
            self.expand(level + 1, child, child_count, block_size, out)?;
        }
        Ok(())
    }
}
