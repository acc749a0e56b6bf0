//! # Inspection & Invariant Checking
//!
//! Read-only views over the arena: a left-to-right block iterator driven by
//! the tiling invariant, aggregate statistics, and the full integrity check
//! that adoption runs before trusting an externally supplied region.

use crate::arena::{
    Arena, FIRST_BLOCK, FIRST_BLOCK_OFFSET_IN_QUADS, HEADER_BLOCK, MAX_HEIGHT,
    POINTER_OVERHEAD_IN_QUADS, POINTER_SIZE_IN_QUADS, verify_header,
};
use crate::allocator::Allocator;
use crate::coin::CoinFlip;
use crate::error::IntegrityError;
use arena_units::{ByteCount, ByteOffset, QuadCount, QuadIndex};

/// One block in the left-to-right tiling of the arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    /// Byte offset of the block payload.
    pub offset: ByteOffset,
    /// Payload size in bytes.
    pub size: ByteCount,
    pub state: BlockState,
}

/// Whether a block is handed out or on the freelist.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockState {
    Used,
    Free {
        /// Freelist node height of this block.
        height: usize,
    },
}

impl BlockState {
    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free { .. })
    }
}

/// Iterator over the arena's blocks in address order. Pure read.
pub struct Blocks<'iter, 'region> {
    arena: &'iter Arena<'region>,
    cursor: Option<QuadIndex>,
}

impl Iterator for Blocks<'_, '_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.cursor?;
        let size = self.arena.size_of(block);
        let state = if self.arena.is_free(block) {
            BlockState::Free {
                height: self.arena.height_of(block),
            }
        } else {
            BlockState::Used
        };
        self.cursor = self.arena.next_block(block);
        Some(BlockInfo {
            offset: block.to_byte_offset(),
            size: size.to_byte_count(),
            state,
        })
    }
}

/// Aggregate totals over one tiling walk.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ArenaStats {
    pub used_blocks: usize,
    pub free_blocks: usize,
    pub used_bytes: ByteCount,
    pub free_bytes: ByteCount,
    /// Payload size of the largest free block; the biggest request that is
    /// certain to succeed.
    pub largest_free: ByteCount,
}

impl<'region, C: CoinFlip> Allocator<'region, C> {
    /// Walks the arena's blocks left to right.
    #[must_use]
    pub fn blocks(&self) -> Blocks<'_, 'region> {
        Blocks {
            arena: &self.arena,
            cursor: Some(FIRST_BLOCK),
        }
    }

    /// Aggregates block totals from one tiling walk.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        let mut used_blocks = 0;
        let mut free_blocks = 0;
        let mut used_bytes = 0;
        let mut free_bytes = 0;
        let mut largest_free = 0;
        for info in self.blocks() {
            if info.state.is_free() {
                free_blocks += 1;
                free_bytes += info.size.as_u32();
                largest_free = largest_free.max(info.size.as_u32());
            } else {
                used_blocks += 1;
                used_bytes += info.size.as_u32();
            }
        }
        ArenaStats {
            used_blocks,
            free_blocks,
            used_bytes: ByteCount::new(used_bytes),
            free_bytes: ByteCount::new(free_bytes),
            largest_free: ByteCount::new(largest_free),
        }
    }

    /// Verifies every arena invariant: header words, tag agreement, block
    /// tiling, neighbor coalescing, and the freelist index (reachability per
    /// level, size ordering, height accounting).
    ///
    /// Runs automatically when an existing arena is adopted; also useful in
    /// tests and for triaging suspect persistent arenas.
    ///
    /// # Errors
    ///
    /// The first [`IntegrityError`] encountered. Any error means the arena
    /// was corrupted externally or by a bug, and the instance must not be
    /// used further.
    pub fn check(&self) -> Result<(), IntegrityError> {
        let arena = &self.arena;
        if !verify_header(arena.as_bytes()) {
            return Err(IntegrityError::BadHeader);
        }
        let live = arena.list_height();
        if !(1..=MAX_HEIGHT).contains(&live) {
            return Err(IntegrityError::BadHeader);
        }

        // Pass 1: tile the arena, checking tags, coalescing, and heights.
        let len = arena.len_quads();
        let mut linked_at_level = [0_usize; MAX_HEIGHT];
        let mut free_blocks = 0_usize;
        let mut tallest = 1_usize;
        let mut previous_free = false;
        let mut block = FIRST_BLOCK;
        loop {
            let head = arena.word(block - QuadCount::new(POINTER_SIZE_IN_QUADS));
            let size = head.unsigned_abs();
            if head == 0 || block.as_u32() + size >= len {
                return Err(IntegrityError::BrokenTiling(block.to_byte_offset()));
            }
            let foot = arena.word(block + QuadCount::new(size));
            if foot != head {
                return Err(IntegrityError::TagMismatch(block.to_byte_offset()));
            }
            if head > 0 {
                if previous_free {
                    return Err(IntegrityError::UncoalescedNeighbors(block.to_byte_offset()));
                }
                free_blocks += 1;
                let height = arena.height_of(block);
                if !(1..=live).contains(&height) {
                    return Err(IntegrityError::BadHeight(block.to_byte_offset()));
                }
                for count in linked_at_level.iter_mut().take(height) {
                    *count += 1;
                }
                tallest = tallest.max(height);
            }
            previous_free = head > 0;

            let next = block.as_u32() + size + POINTER_OVERHEAD_IN_QUADS;
            if next == len + 1 {
                break;
            }
            if next >= len {
                return Err(IntegrityError::BrokenTiling(block.to_byte_offset()));
            }
            block = QuadIndex::new(next);
        }
        // The live height tracks the tallest node exactly (one when empty).
        if live != tallest {
            return Err(IntegrityError::BadHeader);
        }

        // Pass 2: walk every live level. Each walk must visit exactly the
        // free blocks tall enough for it, in non-decreasing size order.
        for level in 0..live {
            let mut visited = 0_usize;
            let mut previous_size = 0_u32;
            let mut node = arena.next_of(HEADER_BLOCK, level);
            while node != HEADER_BLOCK {
                visited += 1;
                #[allow(clippy::cast_possible_truncation)]
                let link_slot = node.as_u32() + POINTER_SIZE_IN_QUADS + level as u32;
                if visited > free_blocks
                    || node.as_u32() < FIRST_BLOCK_OFFSET_IN_QUADS
                    || link_slot >= len
                {
                    return Err(IntegrityError::IndexMismatch);
                }
                if !arena.is_free(node) || arena.height_of(node) <= level {
                    return Err(IntegrityError::IndexMismatch);
                }
                let size = arena.size_of(node).as_u32();
                if size < previous_size {
                    return Err(IntegrityError::UnsortedFreelist(node.to_byte_offset()));
                }
                previous_size = size;
                node = arena.next_of(node, level);
            }
            if visited != linked_at_level[level] {
                return Err(IntegrityError::IndexMismatch);
            }
        }
        // Above the live height the header must loop to itself.
        for level in live..MAX_HEIGHT {
            if arena.next_of(HEADER_BLOCK, level) != HEADER_BLOCK {
                return Err(IntegrityError::BadHeader);
            }
        }
        Ok(())
    }
}
