//! Final randomisation table.

use trial_core::types::{header, IdFormat, LabelSlots, Participant, RandomisationRecord};
use trial_core::RandomisationError;

/// Ordered records plus the stratification dimensions that head the
/// stratum columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomisationTable {
    dimensions: Vec<String>,
    records: Vec<RandomisationRecord>,
}

impl RandomisationTable {
    /// Stratification dimension names, in column order.
    #[inline]
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    /// Records in sequence order.
    #[inline]
    pub fn records(&self) -> &[RandomisationRecord] {
        &self.records
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names: id, one column per dimension, arm, two label fields.
    pub fn header(&self) -> Vec<&str> {
        header(self.dimensions.iter().map(String::as_str))
    }

    /// Row cells in column order, absent labels as empty strings.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> {
        self.records.iter().map(RandomisationRecord::cells)
    }
}

/// Joins participants and their labels into a [`RandomisationTable`].
#[derive(Debug, Clone, Default)]
pub struct RandomisationTableAssembler {
    id_format: IdFormat,
}

impl RandomisationTableAssembler {
    /// Creates an assembler rendering ids with `id_format`.
    pub fn new(id_format: IdFormat) -> Self {
        Self { id_format }
    }

    /// Id format in use.
    #[inline]
    pub fn id_format(&self) -> &IdFormat {
        &self.id_format
    }

    /// Builds the table, one record per participant, in participant order.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the slot count differs from the
    /// participant count or sequence numbers are not `1..=N`.
    pub fn assemble(
        &self,
        dimensions: Vec<String>,
        participants: &[Participant],
        slots: Vec<LabelSlots>,
    ) -> Result<RandomisationTable, RandomisationError> {
        if participants.len() != slots.len() {
            return Err(RandomisationError::invariant(format!(
                "{} participants but {} label allocations",
                participants.len(),
                slots.len()
            )));
        }

        let mut records = Vec::with_capacity(participants.len());
        for (position, (participant, labels)) in participants.iter().zip(slots).enumerate() {
            if participant.sequence() != position + 1 {
                return Err(RandomisationError::invariant(format!(
                    "participant at position {} has sequence {}",
                    position + 1,
                    participant.sequence()
                )));
            }
            records.push(RandomisationRecord::new(
                participant.sequence(),
                self.id_format.format(participant.sequence()),
                participant.stratum().clone(),
                participant.arm().clone(),
                labels,
            ));
        }

        Ok(RandomisationTable {
            dimensions,
            records,
        })
    }
}
