//! Sequence Number Handling
//!
//! SRT data packets carry 31-bit sequence numbers (bit 31 of the first header
//! word is the control flag). The numbers live on a circle of 2^31 values, so
//! every comparison in this crate goes through the cyclic helpers below
//! instead of plain integer ordering.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Maximum sequence number value (31-bit: 0x7FFFFFFF)
pub const MAX_SEQ_NUMBER: u32 = 0x7FFF_FFFF;

/// Number of distinct sequence numbers (2^31)
pub const SEQ_NUMBER_SPACE: u64 = MAX_SEQ_NUMBER as u64 + 1;

const HALF_SPACE: u32 = 1 << 30;

/// Cyclic 31-bit sequence number
///
/// Deliberately implements neither `Ord` nor `PartialOrd`: "less than" only
/// makes sense as "fewer than half the circle behind", which is what
/// [`SeqNumber::lt`] and friends compute.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct SeqNumber(u32);

impl SeqNumber {
    /// Create a new sequence number
    ///
    /// # Panics
    /// Panics if value exceeds MAX_SEQ_NUMBER
    pub fn new(value: u32) -> Self {
        assert!(
            value <= MAX_SEQ_NUMBER,
            "Sequence number {} exceeds maximum {}",
            value,
            MAX_SEQ_NUMBER
        );
        SeqNumber(value)
    }

    /// Create a sequence number, masking the value to 31 bits
    #[inline]
    pub fn new_unchecked(value: u32) -> Self {
        SeqNumber(value & MAX_SEQ_NUMBER)
    }

    #[inline]
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Advance in place by one, wrapping at the modulus
    #[inline]
    pub fn increment(&mut self) {
        *self = self.next();
    }

    #[inline]
    pub fn next(self) -> Self {
        SeqNumber(self.0.wrapping_add(1) & MAX_SEQ_NUMBER)
    }

    #[inline]
    pub fn prev(self) -> Self {
        SeqNumber(self.0.wrapping_sub(1) & MAX_SEQ_NUMBER)
    }

    /// Signed shortest distance from `self` to `other`
    ///
    /// Positive when `other` is ahead of `self`, negative when it is behind.
    /// Two numbers exactly half the circle apart are ordered by their raw
    /// value so that the relation stays antisymmetric.
    pub fn distance_to(self, other: SeqNumber) -> i32 {
        let forward = other.0.wrapping_sub(self.0) & MAX_SEQ_NUMBER;

        let ahead = match forward.cmp(&HALF_SPACE) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.0 < other.0,
        };

        if ahead {
            forward as i32
        } else {
            (forward as i64 - SEQ_NUMBER_SPACE as i64) as i32
        }
    }

    /// Absolute shortest distance between two sequence numbers
    #[inline]
    pub fn distance(self, other: SeqNumber) -> u32 {
        self.distance_to(other).unsigned_abs()
    }

    /// Cyclic ordering of `self` relative to `other`
    #[inline]
    pub fn cyclic_cmp(self, other: SeqNumber) -> Ordering {
        0.cmp(&self.distance_to(other))
    }

    #[inline]
    pub fn lt(self, other: SeqNumber) -> bool {
        self.distance_to(other) > 0
    }

    #[inline]
    pub fn le(self, other: SeqNumber) -> bool {
        self == other || self.lt(other)
    }

    #[inline]
    pub fn gt(self, other: SeqNumber) -> bool {
        self.distance_to(other) < 0
    }

    #[inline]
    pub fn ge(self, other: SeqNumber) -> bool {
        self == other || self.gt(other)
    }
}

impl fmt::Debug for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqNumber({})", self.0)
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SeqNumber {
    fn from(value: u32) -> Self {
        SeqNumber::new_unchecked(value)
    }
}

impl From<SeqNumber> for u32 {
    fn from(seq: SeqNumber) -> u32 {
        seq.0
    }
}

impl Add<u32> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: u32) -> SeqNumber {
        SeqNumber::new_unchecked(self.0.wrapping_add(rhs))
    }
}

impl AddAssign<u32> for SeqNumber {
    fn add_assign(&mut self, rhs: u32) {
        *self = *self + rhs;
    }
}

impl Sub<u32> for SeqNumber {
    type Output = SeqNumber;

    fn sub(self, rhs: u32) -> SeqNumber {
        SeqNumber::new_unchecked(self.0.wrapping_sub(rhs))
    }
}

impl SubAssign<u32> for SeqNumber {
    fn sub_assign(&mut self, rhs: u32) {
        *self = *self - rhs;
    }
}

impl Sub for SeqNumber {
    type Output = i32;

    /// Signed distance from `rhs` up to `self`
    fn sub(self, rhs: SeqNumber) -> i32 {
        rhs.distance_to(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic]
    fn test_new_overflow() {
        SeqNumber::new(MAX_SEQ_NUMBER + 1);
    }

    #[test]
    fn test_new_unchecked_masks() {
        let seq = SeqNumber::new_unchecked(MAX_SEQ_NUMBER + 100);
        assert_eq!(seq.as_raw(), 99);
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let top = SeqNumber::new(MAX_SEQ_NUMBER);
        assert_eq!(top.next().as_raw(), 0);
        assert_eq!(SeqNumber::new(0).prev(), top);

        let mut seq = top;
        seq.increment();
        assert_eq!(seq, SeqNumber::new(0));
    }

    #[test]
    fn test_distance_across_wrap() {
        let a = SeqNumber::new(MAX_SEQ_NUMBER - 10);
        let b = SeqNumber::new(10);

        assert_eq!(a.distance_to(b), 21);
        assert_eq!(b.distance_to(a), -21);
        assert_eq!(a.distance(b), 21);
        assert_eq!(b.distance(a), 21);
    }

    #[test]
    fn test_ordering_across_wrap() {
        let last = SeqNumber::new(MAX_SEQ_NUMBER);
        let first = last.next();

        assert!(last.lt(first));
        assert!(!first.lt(last));
        assert!(first.gt(last));
        assert!(last.le(last));
        assert!(last.ge(last));
        assert_eq!(last.cyclic_cmp(first), Ordering::Less);
        assert_eq!(first.cyclic_cmp(last), Ordering::Greater);
        assert_eq!(first.cyclic_cmp(first), Ordering::Equal);
    }

    #[test]
    fn test_half_circle_is_antisymmetric() {
        let a = SeqNumber::new(5);
        let b = a + HALF_SPACE;

        assert_ne!(a.lt(b), b.lt(a));
        assert_eq!(a.distance(b), HALF_SPACE);
    }

    #[test]
    fn test_arithmetic_wraps() {
        assert_eq!((SeqNumber::new(MAX_SEQ_NUMBER - 10) + 20).as_raw(), 9);
        assert_eq!((SeqNumber::new(10) - 20).as_raw(), MAX_SEQ_NUMBER - 9);

        let mut seq = SeqNumber::new(3);
        seq -= 4;
        assert_eq!(seq, SeqNumber::new(MAX_SEQ_NUMBER));
        seq += 2;
        assert_eq!(seq, SeqNumber::new(1));
    }

    #[test]
    fn test_sub_seqnumbers() {
        let a = SeqNumber::new(200);
        let b = SeqNumber::new(100);
        assert_eq!(a - b, 100);
        assert_eq!(b - a, -100);
    }
}
