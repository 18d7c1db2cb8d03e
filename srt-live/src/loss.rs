//! Loss report ranges
//!
//! NAK reports carry inclusive `(from, to)` pairs of cyclic sequence numbers.

use crate::sequence::SeqNumber;
use std::fmt;

/// Loss sequence range (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LossRange {
    /// First sequence number in range
    pub start: SeqNumber,
    /// Last sequence number in range (inclusive)
    pub end: SeqNumber,
}

impl LossRange {
    pub fn new(start: SeqNumber, end: SeqNumber) -> Self {
        LossRange { start, end }
    }

    pub fn single(seq: SeqNumber) -> Self {
        LossRange { start: seq, end: seq }
    }

    /// Decode a flat `[from, to, from, to, ...]` list
    ///
    /// A trailing unpaired element is ignored.
    pub fn from_pairs(pairs: &[SeqNumber]) -> impl Iterator<Item = LossRange> + '_ {
        pairs
            .chunks_exact(2)
            .map(|pair| LossRange::new(pair[0], pair[1]))
    }

    /// Check if this range contains a sequence number
    #[inline]
    pub fn contains(&self, seq: SeqNumber) -> bool {
        seq.ge(self.start) && seq.le(self.end)
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for LossRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..={}", self.start, self.end)
        }
    }
}
