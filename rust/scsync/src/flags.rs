//! The bit set flag byte carried by every depth record.

use std::fmt;

/// Indicates the last record of a depth batch.
pub const END_OF_BATCH: u8 = 1 << 0;

/// A transparent wrapper around the flag byte of a [`DepthRecord`](crate::record::DepthRecord).
/// Only bit 0 is assigned; the remaining bits are preserved as read.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct FlagSet {
    raw: u8,
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_end_of_batch() {
            write!(f, "END_OF_BATCH ({})", self.raw())
        } else {
            write!(f, "{}", self.raw())
        }
    }
}

impl From<u8> for FlagSet {
    fn from(raw: u8) -> Self {
        Self { raw }
    }
}

impl FlagSet {
    /// Returns an empty [`FlagSet`]: one with no flags set.
    pub const fn empty() -> Self {
        Self { raw: 0 }
    }

    /// Creates a new flag set from `raw`.
    pub const fn new(raw: u8) -> Self {
        Self { raw }
    }

    /// Returns the raw value.
    pub const fn raw(&self) -> u8 {
        self.raw
    }

    /// Returns `true` if any of the flags are on or set to true.
    pub const fn any(&self) -> bool {
        self.raw > 0
    }

    /// Returns `true` if all flags are unset/false.
    pub fn is_empty(&self) -> bool {
        self.raw == 0
    }

    /// Returns `true` if this is the last record of its batch.
    pub const fn is_end_of_batch(&self) -> bool {
        (self.raw & END_OF_BATCH) > 0
    }

    /// Sets the `END_OF_BATCH` bit flag to `true` to mark the last record of
    /// a batch.
    pub fn set_end_of_batch(&mut self) -> Self {
        self.raw |= END_OF_BATCH;
        *self
    }

    /// Sets the `END_OF_BATCH` bit flag to `false`.
    pub fn clear_end_of_batch(&mut self) -> Self {
        self.raw &= !END_OF_BATCH;
        *self
    }

    /// Returns the raw value with the `END_OF_BATCH` bit masked off. Batch
    /// boundaries may move during a rewrite; every other bit must survive
    /// byte-identical.
    pub const fn raw_without_end_of_batch(&self) -> u8 {
        self.raw & !END_OF_BATCH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    #[rstest]
    #[case::empty(FlagSet::empty(), "0")]
    #[case::end_of_batch(FlagSet::empty().set_end_of_batch(), "END_OF_BATCH (1)")]
    #[case::reserved_bits(FlagSet::new(0b1000_0001), "END_OF_BATCH (129)")]
    #[case::reserved_only(FlagSet::new(0b1000_0000), "128")]
    fn dbg(#[case] target: FlagSet, #[case] exp: &str) {
        assert_eq!(format!("{target:?}"), exp);
    }

    #[test]
    fn set_and_clear() {
        let mut flags = FlagSet::new(0b0100_0000);
        assert!(!flags.is_end_of_batch());
        flags.set_end_of_batch();
        assert!(flags.is_end_of_batch());
        assert_eq!(flags.raw_without_end_of_batch(), 0b0100_0000);
        flags.clear_end_of_batch();
        assert_eq!(flags.raw(), 0b0100_0000);
    }
}
