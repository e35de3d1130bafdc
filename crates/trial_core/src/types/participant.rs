//! Randomised participants.

use super::{Arm, StratumKey};

/// A participant after arm assignment, before label allocation.
///
/// `sequence` is the 1-based position in generation order (outer stratum
/// order, then position within the stratum). `stratum_position` is the
/// 0-based position within the participant's own stratum, so
/// `stratum_position / block_size` is the block the assignment came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    sequence: usize,
    stratum: StratumKey,
    stratum_position: usize,
    arm: Arm,
}

impl Participant {
    /// Creates a participant.
    pub fn new(sequence: usize, stratum: StratumKey, stratum_position: usize, arm: Arm) -> Self {
        Self {
            sequence,
            stratum,
            stratum_position,
            arm,
        }
    }

    /// 1-based position in generation order.
    #[inline]
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Stratum attributes.
    #[inline]
    pub fn stratum(&self) -> &StratumKey {
        &self.stratum
    }

    /// 0-based position within the stratum.
    #[inline]
    pub fn stratum_position(&self) -> usize {
        self.stratum_position
    }

    /// Assigned arm.
    #[inline]
    pub fn arm(&self) -> &Arm {
        &self.arm
    }
}

/// Up to two resource labels withdrawn for one participant.
///
/// The first slot is always filled before the second.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSlots {
    first: Option<String>,
    second: Option<String>,
}

impl LabelSlots {
    /// No labels.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds slots from withdrawn labels, in withdrawal order.
    ///
    /// Returns `None` if more than two labels are given.
    pub fn from_labels(labels: Vec<String>) -> Option<Self> {
        let mut iter = labels.into_iter();
        let slots = Self {
            first: iter.next(),
            second: iter.next(),
        };
        if iter.next().is_some() {
            return None;
        }
        Some(slots)
    }

    /// First label field.
    #[inline]
    pub fn first(&self) -> Option<&str> {
        self.first.as_deref()
    }

    /// Second label field.
    #[inline]
    pub fn second(&self) -> Option<&str> {
        self.second.as_deref()
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        usize::from(self.first.is_some()) + usize::from(self.second.is_some())
    }

    /// True when no label was withdrawn.
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Filled labels in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.first.iter().chain(self.second.iter()).map(String::as_str)
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Option<String>) {
        (self.first, self.second)
    }
}
