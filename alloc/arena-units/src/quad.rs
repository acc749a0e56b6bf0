use crate::{ByteCount, ByteOffset, QUAD_SIZE_IN_BYTES};
use core::fmt;
use core::ops::{Add, AddAssign, Sub};

/// A 0-based index into the backing region viewed as an array of 32-bit
/// words.
///
/// Newtype over `u32` to prevent mixing with byte offsets.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct QuadIndex(u32);

impl QuadIndex {
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// The byte offset of the first byte of this word.
    #[inline]
    #[must_use]
    pub const fn to_byte_offset(self) -> ByteOffset {
        ByteOffset::new(self.0 * QUAD_SIZE_IN_BYTES)
    }

    /// Distance in quads from `earlier` to `self`.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `earlier` lies past `self`.
    #[inline]
    #[must_use]
    pub const fn offset_from(self, earlier: Self) -> QuadCount {
        debug_assert!(earlier.0 <= self.0);
        QuadCount::new(self.0 - earlier.0)
    }
}

impl fmt::Display for QuadIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for QuadIndex {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl Add<QuadCount> for QuadIndex {
    type Output = Self;

    #[inline]
    fn add(self, rhs: QuadCount) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign<QuadCount> for QuadIndex {
    #[inline]
    fn add_assign(&mut self, rhs: QuadCount) {
        self.0 += rhs.0;
    }
}

impl Sub<QuadCount> for QuadIndex {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: QuadCount) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// A length or size measured in quads.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct QuadCount(u32);

impl QuadCount {
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// This count expressed in bytes.
    #[inline]
    #[must_use]
    pub const fn to_byte_count(self) -> ByteCount {
        ByteCount::new(self.0 * QUAD_SIZE_IN_BYTES)
    }
}

impl fmt::Display for QuadCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for QuadCount {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl Add for QuadCount {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for QuadCount {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for QuadCount {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}
