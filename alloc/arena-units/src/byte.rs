use crate::{QUAD_SIZE_IN_BYTES, QuadCount, QuadIndex};
use core::fmt;

/// A position in the backing region, in bytes, as seen by callers.
///
/// Newtype over `u32` to prevent mixing with quad indices. No alignment
/// guarantees by itself; [`to_quad_index`](Self::to_quad_index) is the checked
/// crossing into quad space.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ByteOffset(u32);

impl ByteOffset {
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

    /// Whether this offset falls on a quad boundary.
    #[inline]
    #[must_use]
    pub const fn is_quad_aligned(self) -> bool {
        self.0 % QUAD_SIZE_IN_BYTES == 0
    }

    /// The quad index of this offset, or `None` if it is not quad-aligned.
    #[inline]
    #[must_use]
    pub const fn to_quad_index(self) -> Option<QuadIndex> {
        if self.is_quad_aligned() {
            Some(QuadIndex::new(self.0 / QUAD_SIZE_IN_BYTES))
        } else {
            None
        }
    }
}

impl fmt::Debug for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteOffset(0x{:08X})", self.0)
    }
}

impl fmt::Display for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for ByteOffset {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<ByteOffset> for u32 {
    #[inline]
    fn from(value: ByteOffset) -> Self {
        value.as_u32()
    }
}

/// A length or size, in bytes.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ByteCount(u32);

impl ByteCount {
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

    /// Whether this count is a whole number of quads.
    #[inline]
    #[must_use]
    pub const fn is_quad_aligned(self) -> bool {
        self.0 % QUAD_SIZE_IN_BYTES == 0
    }

    /// This count expressed in quads, or `None` if it is not a whole number
    /// of quads.
    #[inline]
    #[must_use]
    pub const fn to_quad_count(self) -> Option<QuadCount> {
        if self.is_quad_aligned() {
            Some(QuadCount::new(self.0 / QUAD_SIZE_IN_BYTES))
        } else {
            None
        }
    }
}

impl fmt::Debug for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteCount({})", self.0)
    }
}

impl fmt::Display for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ByteCount {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<ByteCount> for u32 {
    #[inline]
    fn from(value: ByteCount) -> Self {
        value.as_u32()
    }
}
