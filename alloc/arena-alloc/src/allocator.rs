//! # Allocation Engine
//!
//! Ties the boundary-tagged arena and the freelist index together into the
//! public operations: find / split on allocation, probe / coalesce / insert
//! on free.
//!
//! Every public call validates its arguments before touching any state, runs
//! to completion synchronously, and leaves the arena invariants intact. The
//! instance owns the arena exclusively for its lifetime; for shared access
//! see [`LockedAllocator`](crate::LockedAllocator).

use crate::arena::{
    Arena, FIRST_BLOCK_OFFSET_IN_BYTES, MIN_FREEABLE_SIZE_IN_QUADS, MIN_REGION_SIZE_IN_BYTES,
    OVERHEAD_IN_QUADS, POINTER_OVERHEAD_IN_QUADS, verify_header,
};
use crate::coin::{CoinFlip, RandomCoin};
use crate::error::{BlockError, Error, RangeError};
use crate::index::FreeIndex;
use arena_units::{ByteCount, ByteOffset, QUAD_SIZE_IN_BYTES, QuadCount, QuadIndex};
use log::trace;

/// A boundary-tag allocator over a caller-supplied byte region.
///
/// The allocator partitions the region into variable-sized blocks, hands out
/// byte offsets into the region, and reclaims freed blocks by coalescing them
/// with adjacent free neighbors. Free blocks are indexed by a skip list keyed
/// by size, giving expected `O(log n)` best-fit allocation.
///
/// The region itself is the persisted format: a region whose header words
/// [`verify_header`] is adopted as-is (after a full integrity check), so
/// memory-mapped arenas survive process restarts. The format is 32-bit and
/// host-endian.
///
/// # Example
///
/// ```
/// use arena_alloc::Allocator;
/// use arena_units::ByteCount;
///
/// let mut region = [0_u8; 4096];
/// let mut alloc = Allocator::new(&mut region)?;
///
/// let addr = alloc.alloc(ByteCount::new(64))?.expect("arena has room");
/// assert_eq!(alloc.size_of(addr)?, ByteCount::new(64));
/// assert_eq!(alloc.free(addr)?, ByteCount::new(64));
/// # Ok::<(), arena_alloc::Error>(())
/// ```
pub struct Allocator<'region, C: CoinFlip = RandomCoin> {
    pub(crate) arena: Arena<'region>,
    pub(crate) index: FreeIndex,
    coin: C,
}

impl<'region> Allocator<'region> {
    /// Creates an allocator over the whole of `region`.
    ///
    /// If the region already carries a valid arena header it is adopted
    /// as-is; otherwise a fresh header and one spanning free block are
    /// installed.
    ///
    /// # Errors
    ///
    /// [`RangeError`] if the region is shorter than
    /// [`MIN_REGION_SIZE_IN_BYTES`], not a whole number of quads, or longer
    /// than 32 bits can address; [`crate::IntegrityError`] if an adopted
    /// region fails the integrity check.
    pub fn new(region: &'region mut [u8]) -> Result<Self, Error> {
        Self::with_coins(region, RandomCoin::default())
    }

    /// Creates an allocator over `byte_length` bytes of `region` starting at
    /// `byte_offset`.
    ///
    /// # Errors
    ///
    /// As for [`new`](Self::new), plus [`RangeError::BadSubRegion`] if the
    /// selection is unaligned or out of bounds.
    pub fn with_bounds(
        region: &'region mut [u8],
        byte_offset: usize,
        byte_length: usize,
    ) -> Result<Self, Error> {
        let sub = select_sub_region(region, byte_offset, byte_length)?;
        Self::build(sub, RandomCoin::default())
    }
}

impl<'region, C: CoinFlip> Allocator<'region, C> {
    /// Creates an allocator over the whole of `region` with an explicit coin
    /// source, pinning block placement for reproducibility.
    ///
    /// # Errors
    ///
    /// As for [`new`](Allocator::new).
    pub fn with_coins(region: &'region mut [u8], coin: C) -> Result<Self, Error> {
        let byte_length = region.len();
        let sub = select_sub_region(region, 0, byte_length)?;
        Self::build(sub, coin)
    }

    fn build(sub: &'region mut [u8], coin: C) -> Result<Self, Error> {
        let adopt = verify_header(sub);
        let mut arena = Arena::new(sub);
        if !adopt {
            arena.install_header();
        }
        let this = Self {
            arena,
            index: FreeIndex::new(),
            coin,
        };
        if adopt {
            this.check()?;
            trace!("adopted arena of {} quads", this.arena.len_quads());
        } else {
            trace!("initialized arena of {} quads", this.arena.len_quads());
        }
        Ok(this)
    }

    /// Total arena length in bytes.
    #[must_use]
    pub const fn capacity(&self) -> ByteCount {
        self.arena.len_bytes()
    }

    /// Reserves `size` bytes and returns the byte offset of the reservation,
    /// or `Ok(None)` when no free block is large enough. Out of memory is a
    /// regular outcome, not an error.
    ///
    /// The returned offset stays valid until the matching [`free`](Self::free);
    /// blocks are never moved.
    ///
    /// # Errors
    ///
    /// [`RangeError`] if `size` is not a positive multiple of the pointer
    /// size, below [`crate::MIN_FREEABLE_SIZE_IN_BYTES`], or larger than the
    /// arena; [`crate::IntegrityError`] if the freelist turns out to be
    /// corrupt.
    pub fn alloc(&mut self, size: ByteCount) -> Result<Option<ByteOffset>, Error> {
        let quads = self.validated_size(size)?;
        let Some(block) = self.index.search(&self.arena, quads) else {
            return Ok(None);
        };
        let found = self.arena.size_of(block);
        self.index.remove(&mut self.arena, block)?;

        // Split only if the leftover still makes a legal free block once a
        // new pair of boundary tags is paid for; otherwise the caller gets
        // the whole block.
        if found.as_u32() >= quads.as_u32() + POINTER_OVERHEAD_IN_QUADS + MIN_FREEABLE_SIZE_IN_QUADS
        {
            self.arena.write_used_tags(block, quads);
            let tail = block + quads + QuadCount::new(POINTER_OVERHEAD_IN_QUADS);
            let tail_size = found - quads - QuadCount::new(POINTER_OVERHEAD_IN_QUADS);
            self.arena.write_used_tags(tail, tail_size);
            self.index
                .insert(&mut self.arena, &mut self.coin, tail, tail_size);
        }
        Ok(Some(block.to_byte_offset()))
    }

    /// Like [`alloc`](Self::alloc), additionally zeroing the reserved bytes.
    ///
    /// # Errors
    ///
    /// As for [`alloc`](Self::alloc).
    pub fn alloc_zeroed(&mut self, size: ByteCount) -> Result<Option<ByteOffset>, Error> {
        let Some(address) = self.alloc(size)? else {
            return Ok(None);
        };
        if let Some(block) = address.to_quad_index() {
            let reserved = self.arena.size_of(block);
            self.arena.zero_payload(block, reserved);
        }
        Ok(Some(address))
    }

    /// Releases the block at `address`, coalescing it with directly adjacent
    /// free neighbors, and returns the size of the released block itself
    /// (not of the coalesced result).
    ///
    /// # Errors
    ///
    /// [`RangeError`] if `address` is unaligned or outside the allocatable
    /// range; [`BlockError`] if it does not name a currently allocated block
    /// (including double frees); [`crate::IntegrityError`] if a neighbor is
    /// missing from the freelist.
    pub fn free(&mut self, address: ByteOffset) -> Result<ByteCount, Error> {
        let block = self.validated_block(address)?;
        if self.arena.is_free(block) {
            return Err(BlockError::AlreadyFree(address).into());
        }
        let size = self.arena.size_of(block);
        let before = self.arena.free_neighbor_before(block);
        let after = self.arena.free_neighbor_after(block);
        match (before, after) {
            (None, None) => {
                self.index
                    .insert(&mut self.arena, &mut self.coin, block, size);
            }
            (None, Some(right)) => {
                let right_size = self.arena.size_of(right);
                self.index.remove(&mut self.arena, right)?;
                let combined = size + right_size + QuadCount::new(POINTER_OVERHEAD_IN_QUADS);
                self.index
                    .insert(&mut self.arena, &mut self.coin, block, combined);
            }
            (Some(left), None) => {
                self.index.remove(&mut self.arena, left)?;
                let combined = block.offset_from(left) + size;
                self.index
                    .insert(&mut self.arena, &mut self.coin, left, combined);
            }
            (Some(left), Some(right)) => {
                let right_size = self.arena.size_of(right);
                self.index.remove(&mut self.arena, left)?;
                self.index.remove(&mut self.arena, right)?;
                let combined = right.offset_from(left) + right_size;
                self.index
                    .insert(&mut self.arena, &mut self.coin, left, combined);
            }
        }
        Ok(size.to_byte_count())
    }

    /// Size in bytes of the block starting at `address`.
    ///
    /// The size is reported for free blocks too; callers should only ask
    /// about addresses they currently own.
    ///
    /// # Errors
    ///
    /// As for [`free`](Self::free), except that a free block is not an
    /// error.
    pub fn size_of(&self, address: ByteOffset) -> Result<ByteCount, Error> {
        let block = self.validated_block(address)?;
        Ok(self.arena.size_of(block).to_byte_count())
    }

    fn validated_size(&self, size: ByteCount) -> Result<QuadCount, RangeError> {
        let Some(quads) = size.to_quad_count() else {
            return Err(RangeError::UnalignedSize(size));
        };
        if quads.as_u32() < MIN_FREEABLE_SIZE_IN_QUADS {
            return Err(RangeError::SizeTooSmall(size));
        }
        if size.as_u32() > self.arena.len_bytes().as_u32() {
            return Err(RangeError::SizeTooLarge(size));
        }
        Ok(quads)
    }

    fn validated_block(&self, address: ByteOffset) -> Result<QuadIndex, Error> {
        let Some(block) = address.to_quad_index() else {
            return Err(RangeError::UnalignedAddress(address).into());
        };
        if address.as_u32() < FIRST_BLOCK_OFFSET_IN_BYTES
            || address.as_u32() >= self.arena.len_bytes().as_u32()
        {
            return Err(RangeError::AddressOutOfBounds(address).into());
        }
        // A size tag outside what the arena could ever hold, or one whose
        // foot would land past the end, means the address is not a block
        // start.
        let size = self.arena.size_of(block);
        if size.as_u32() < MIN_FREEABLE_SIZE_IN_QUADS
            || size.as_u32() > self.arena.len_quads() - OVERHEAD_IN_QUADS
            || block.as_u32() + size.as_u32() >= self.arena.len_quads()
        {
            return Err(BlockError::NoSuchBlock(address).into());
        }
        Ok(block)
    }
}

/// Validates and selects the caller's sub-region.
fn select_sub_region(
    region: &mut [u8],
    byte_offset: usize,
    byte_length: usize,
) -> Result<&mut [u8], RangeError> {
    let quad = QUAD_SIZE_IN_BYTES as usize;
    if byte_offset % quad != 0 || byte_length % quad != 0 {
        return Err(RangeError::BadSubRegion);
    }
    let end = byte_offset
        .checked_add(byte_length)
        .ok_or(RangeError::BadSubRegion)?;
    if end > region.len() {
        return Err(RangeError::BadSubRegion);
    }
    if u32::try_from(byte_length).is_err() {
        return Err(RangeError::RegionTooLarge);
    }
    if byte_length < MIN_REGION_SIZE_IN_BYTES as usize {
        return Err(RangeError::RegionTooSmall);
    }
    Ok(&mut region[byte_offset..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{FIRST_BLOCK_OFFSET_IN_QUADS, OVERHEAD_IN_BYTES};

    const FIRST: ByteOffset = ByteOffset::new(FIRST_BLOCK_OFFSET_IN_BYTES);

    fn quads_to_bytes(quads: u32) -> usize {
        (quads * QUAD_SIZE_IN_BYTES) as usize
    }

    #[test]
    fn first_allocation_lands_at_the_first_block() {
        let mut region = [0_u8; 4096];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        let addr = alloc.alloc(ByteCount::new(64)).expect("valid size");
        assert_eq!(addr, Some(FIRST));
    }

    #[test]
    fn split_keeps_the_requested_size() {
        let mut region = [0_u8; 4096];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        let addr = alloc
            .alloc(ByteCount::new(64))
            .expect("valid size")
            .expect("fits");
        assert_eq!(alloc.size_of(addr).expect("allocated"), ByteCount::new(64));
    }

    #[test]
    fn whole_block_is_taken_when_the_leftover_is_too_small() {
        // One free block of exactly request + overhead + 2 quads: splitting
        // would leave a 2-quad leftover, which is below the freeable minimum.
        let len = quads_to_bytes(OVERHEAD_IN_QUADS + 4 + POINTER_OVERHEAD_IN_QUADS + 2);
        let mut region = vec![0_u8; len];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        let addr = alloc
            .alloc(ByteCount::new(16))
            .expect("valid size")
            .expect("fits");
        assert_eq!(alloc.size_of(addr).expect("allocated"), ByteCount::new(32));
    }

    #[test]
    fn leftover_of_exactly_the_minimum_still_splits() {
        let len = quads_to_bytes(
            OVERHEAD_IN_QUADS + 4 + POINTER_OVERHEAD_IN_QUADS + MIN_FREEABLE_SIZE_IN_QUADS,
        );
        let mut region = vec![0_u8; len];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        let addr = alloc
            .alloc(ByteCount::new(16))
            .expect("valid size")
            .expect("fits");
        assert_eq!(alloc.size_of(addr).expect("allocated"), ByteCount::new(16));
        // The split-off remainder is the smallest allocatable block.
        let tail = alloc
            .alloc(ByteCount::new(12))
            .expect("valid size")
            .expect("fits");
        assert_eq!(alloc.size_of(tail).expect("allocated"), ByteCount::new(12));
        assert_eq!(alloc.alloc(ByteCount::new(12)).expect("valid size"), None);
    }

    #[test]
    fn out_of_memory_is_not_an_error() {
        let mut region = [0_u8; 512];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        assert_eq!(alloc.alloc(ByteCount::new(400)).expect("valid size"), None);
    }

    #[test]
    fn size_validation() {
        let mut region = [0_u8; 4096];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        assert_eq!(
            alloc.alloc(ByteCount::new(10)),
            Err(RangeError::UnalignedSize(ByteCount::new(10)).into())
        );
        assert_eq!(
            alloc.alloc(ByteCount::new(8)),
            Err(RangeError::SizeTooSmall(ByteCount::new(8)).into())
        );
        assert_eq!(
            alloc.alloc(ByteCount::new(8192)),
            Err(RangeError::SizeTooLarge(ByteCount::new(8192)).into())
        );
    }

    #[test]
    fn address_validation() {
        let mut region = [0_u8; 4096];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        assert_eq!(
            alloc.free(ByteOffset::new(274)),
            Err(RangeError::UnalignedAddress(ByteOffset::new(274)).into())
        );
        // Inside the header region.
        assert_eq!(
            alloc.free(ByteOffset::new(128)),
            Err(RangeError::AddressOutOfBounds(ByteOffset::new(128)).into())
        );
        assert_eq!(
            alloc.free(ByteOffset::new(4096)),
            Err(RangeError::AddressOutOfBounds(ByteOffset::new(4096)).into())
        );
        // In range, but nothing was ever allocated there.
        let dangling = ByteOffset::new((FIRST_BLOCK_OFFSET_IN_QUADS + 8) * QUAD_SIZE_IN_BYTES);
        assert_eq!(
            alloc.free(dangling),
            Err(BlockError::NoSuchBlock(dangling).into())
        );
    }

    #[test]
    fn double_free_is_rejected() {
        let mut region = [0_u8; 4096];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        let addr = alloc
            .alloc(ByteCount::new(64))
            .expect("valid size")
            .expect("fits");
        alloc.free(addr).expect("first free succeeds");
        assert_eq!(alloc.free(addr), Err(BlockError::AlreadyFree(addr).into()));
    }

    #[test]
    fn size_of_reads_free_blocks_too() {
        let mut region = [0_u8; 4096];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        let addr = alloc
            .alloc(ByteCount::new(64))
            .expect("valid size")
            .expect("fits");
        // Pin the neighborhood so the freed block is not coalesced away.
        let pin = alloc
            .alloc(ByteCount::new(64))
            .expect("valid size")
            .expect("fits");
        alloc.free(addr).expect("allocated");
        assert_eq!(alloc.size_of(addr).expect("still a block"), ByteCount::new(64));
        alloc.free(pin).expect("allocated");
    }

    #[test]
    fn alloc_zeroed_clears_the_payload() {
        let mut region = [0xA5_u8; 4096];
        let mut alloc = Allocator::new(&mut region).expect("region is large enough");
        let addr = alloc
            .alloc_zeroed(ByteCount::new(64))
            .expect("valid size")
            .expect("fits");
        let start = addr.as_usize();
        drop(alloc);
        assert!(region[start..start + 64].iter().all(|&b| b == 0));
    }

    #[test]
    fn undersized_and_unaligned_regions_are_rejected() {
        let mut tiny = [0_u8; OVERHEAD_IN_BYTES as usize];
        assert!(matches!(
            Allocator::new(&mut tiny),
            Err(Error::OutOfRange(RangeError::RegionTooSmall))
        ));
        let mut ragged = [0_u8; 4097];
        assert!(matches!(
            Allocator::new(&mut ragged),
            Err(Error::OutOfRange(RangeError::BadSubRegion))
        ));
    }

    #[test]
    fn sub_region_selection() {
        let mut region = [0_u8; 8192];
        {
            let mut alloc =
                Allocator::with_bounds(&mut region, 4096, 4096).expect("aligned selection");
            let addr = alloc.alloc(ByteCount::new(64)).expect("valid size");
            assert_eq!(addr, Some(FIRST));
        }
        // The selected window carries the header, not the region start.
        assert!(!verify_header(&region));
        assert!(verify_header(&region[4096..]));

        assert!(matches!(
            Allocator::with_bounds(&mut region, 2, 4096),
            Err(Error::OutOfRange(RangeError::BadSubRegion))
        ));
        assert!(matches!(
            Allocator::with_bounds(&mut region, 8192, 4096),
            Err(Error::OutOfRange(RangeError::BadSubRegion))
        ));
    }
}
