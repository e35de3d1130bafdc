//! Exported randomisation records and identifier formats.
//!
//! Field names of the exported table are fixed because downstream data
//! capture imports the table by column name:
//!
//! | Column | Content |
//! |---|---|
//! | `randomization_id` | sequential identifier |
//! | one per dimension | stratum level |
//! | `assigned_arm` | arm name |
//! | `resource_label_1` | first label, or empty |
//! | `resource_label_2` | second label, or empty |

use super::{Arm, LabelSlots, StratumKey};
use crate::error::ConfigError;

/// Column name of the identifier.
pub const ID_FIELD: &str = "randomization_id";
/// Column name of the assigned arm.
pub const ARM_FIELD: &str = "assigned_arm";
/// Column name of the first resource label.
pub const LABEL_1_FIELD: &str = "resource_label_1";
/// Column name of the second resource label.
pub const LABEL_2_FIELD: &str = "resource_label_2";

/// Fixed column names; no dimension may reuse them.
pub const RESERVED_FIELDS: [&str; 4] = [ID_FIELD, ARM_FIELD, LABEL_1_FIELD, LABEL_2_FIELD];

/// Widest zero padding accepted for identifiers.
pub const MAX_ID_WIDTH: usize = 12;

/// Format of the `randomization_id` column.
///
/// # Examples
/// ```
/// use trial_core::types::IdFormat;
///
/// assert_eq!(IdFormat::Numeric.format(7), "7");
///
/// let padded = IdFormat::Padded { prefix: "R".to_string(), width: 3 };
/// assert_eq!(padded.format(7), "R007");
/// assert_eq!(padded.format(1234), "R1234");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdFormat {
    /// Plain integers starting at 1.
    #[default]
    Numeric,
    /// Prefix followed by a zero-padded integer, e.g. `R001`.
    Padded {
        /// Text before the number
        prefix: String,
        /// Minimum number of digits
        width: usize,
    },
}

impl IdFormat {
    /// Renders the identifier for a 1-based sequence number.
    pub fn format(&self, sequence: usize) -> String {
        match self {
            IdFormat::Numeric => sequence.to_string(),
            IdFormat::Padded { prefix, width } => {
                format!("{}{:0width$}", prefix, sequence, width = *width)
            }
        }
    }

    /// Validates the format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let IdFormat::Padded { width, .. } = self {
            if *width == 0 || *width > MAX_ID_WIDTH {
                return Err(ConfigError::InvalidParameter {
                    name: "id_width",
                    value: format!("{} must be in range [1, {}]", width, MAX_ID_WIDTH),
                });
            }
        }
        Ok(())
    }
}

/// One row of the randomisation table.
///
/// Records are immutable once assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomisationRecord {
    sequence: usize,
    randomisation_id: String,
    strata: StratumKey,
    assigned_arm: Arm,
    resource_label_1: Option<String>,
    resource_label_2: Option<String>,
}

impl RandomisationRecord {
    /// Creates a record.
    pub fn new(
        sequence: usize,
        randomisation_id: String,
        strata: StratumKey,
        assigned_arm: Arm,
        labels: LabelSlots,
    ) -> Self {
        let (resource_label_1, resource_label_2) = labels.into_parts();
        Self {
            sequence,
            randomisation_id,
            strata,
            assigned_arm,
            resource_label_1,
            resource_label_2,
        }
    }

    /// 1-based row number.
    #[inline]
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Formatted identifier.
    #[inline]
    pub fn randomisation_id(&self) -> &str {
        &self.randomisation_id
    }

    /// Stratum descriptors.
    #[inline]
    pub fn strata(&self) -> &StratumKey {
        &self.strata
    }

    /// Assigned arm.
    #[inline]
    pub fn assigned_arm(&self) -> &Arm {
        &self.assigned_arm
    }

    /// First resource label.
    #[inline]
    pub fn resource_label_1(&self) -> Option<&str> {
        self.resource_label_1.as_deref()
    }

    /// Second resource label.
    #[inline]
    pub fn resource_label_2(&self) -> Option<&str> {
        self.resource_label_2.as_deref()
    }

    /// Labels held by this record, in field order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.resource_label_1
            .iter()
            .chain(self.resource_label_2.iter())
            .map(String::as_str)
    }

    /// Row cells in column order; absent labels are empty strings.
    pub fn cells(&self) -> Vec<&str> {
        let mut cells = Vec::with_capacity(self.strata.depth() + 4);
        cells.push(self.randomisation_id.as_str());
        cells.extend(self.strata.values().iter().map(|(_, level)| level.as_str()));
        cells.push(self.assigned_arm.name());
        cells.push(self.resource_label_1().unwrap_or(""));
        cells.push(self.resource_label_2().unwrap_or(""));
        cells
    }
}

/// Header row for a table stratified by `dimensions`.
pub fn header<'a>(dimensions: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut header = vec![ID_FIELD];
    header.extend(dimensions);
    header.extend([ARM_FIELD, LABEL_1_FIELD, LABEL_2_FIELD]);
    header
}

#[cfg(feature = "serde")]
impl serde::Serialize for RandomisationRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.strata.depth() + 4))?;
        map.serialize_entry(ID_FIELD, &self.randomisation_id)?;
        for (dimension, level) in self.strata.values() {
            map.serialize_entry(dimension, level)?;
        }
        map.serialize_entry(ARM_FIELD, self.assigned_arm.name())?;
        map.serialize_entry(LABEL_1_FIELD, self.resource_label_1().unwrap_or(""))?;
        map.serialize_entry(LABEL_2_FIELD, self.resource_label_2().unwrap_or(""))?;
        map.end()
    }
}
