//! Error types for the allocator's public operations.
//!
//! Three causes are distinguished: an argument that fails validation before
//! any state is touched, an address that does not name an allocated block,
//! and a violated arena invariant. Running out of memory is **not** an error;
//! [`Allocator::alloc`](crate::Allocator::alloc) signals it with `Ok(None)`
//! so callers can fall back without error handling.

use arena_units::{ByteCount, ByteOffset};

/// Any failure of a public allocator operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A size or address argument failed validation; nothing was modified.
    #[error(transparent)]
    OutOfRange(#[from] RangeError),
    /// The address does not point at a currently allocated block; nothing
    /// was modified.
    #[error(transparent)]
    InvalidBlock(#[from] BlockError),
    /// An arena invariant does not hold. The instance must be considered
    /// unusable; the arena was corrupted externally or by a bug.
    #[error(transparent)]
    Corrupted(#[from] IntegrityError),
}

/// An argument failed validation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("requested size {0} is not a multiple of the pointer size")]
    UnalignedSize(ByteCount),
    #[error("requested size {0} is below the minimum freeable size")]
    SizeTooSmall(ByteCount),
    #[error("requested size {0} exceeds the arena length")]
    SizeTooLarge(ByteCount),
    #[error("address {0} is not a multiple of the pointer size")]
    UnalignedAddress(ByteOffset),
    #[error("address {0} is outside the allocatable range")]
    AddressOutOfBounds(ByteOffset),
    #[error("the backing region is too small to hold a header and one block")]
    RegionTooSmall,
    #[error("the backing region exceeds the 32-bit addressable limit")]
    RegionTooLarge,
    #[error("the selected sub-region is out of bounds or not 4-byte aligned")]
    BadSubRegion,
}

/// An address passed range validation but does not name an allocated block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("no allocated block starts at {0}")]
    NoSuchBlock(ByteOffset),
    #[error("the block at {0} is already free")]
    AlreadyFree(ByteOffset),
}

/// A violated arena invariant, detected during an operation, an adoption, or
/// an explicit [`check`](crate::Allocator::check).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("header words are not a valid freelist sentinel")]
    BadHeader,
    #[error("boundary tags disagree for the block at {0}")]
    TagMismatch(ByteOffset),
    #[error("blocks do not tile the arena (walk broke at {0})")]
    BrokenTiling(ByteOffset),
    #[error("adjacent free blocks at {0} were never coalesced")]
    UncoalescedNeighbors(ByteOffset),
    #[error("free block at {0} carries a height outside the legal range")]
    BadHeight(ByteOffset),
    #[error("freelist is not sorted by size at {0}")]
    UnsortedFreelist(ByteOffset),
    #[error("free block at {0} is missing from the freelist index")]
    UnindexedBlock(ByteOffset),
    #[error("freelist index disagrees with the arena contents")]
    IndexMismatch,
}
