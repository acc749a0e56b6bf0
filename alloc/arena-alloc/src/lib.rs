//! # Boundary-Tag Arena Allocator
//!
//! A user-space memory allocator over a caller-supplied fixed-size region:
//! a memory-mapped file, a shared-memory segment, or any single contiguous
//! slab whose lifetime the caller owns. The allocator partitions the region
//! into variable-sized blocks, satisfies requests with byte offsets into the
//! region, and reclaims freed blocks by coalescing them with adjacent free
//! neighbors.
//!
//! ## Architecture Overview
//!
//! Three collaborating parts operate over one shared arena of 32-bit words:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                Allocation Engine                    │
//! │    • validate / find / split on alloc               │
//! │    • probe / coalesce / insert on free              │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Freelist Index                         │
//! │    • skip list keyed by block size ascending        │
//! │    • node storage in-band in free block payloads    │
//! │    • expected O(log n) search / insert / delete     │
//! └─────────────────┬───────────────────────────────────┘
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Arena Layout & Boundary Tags              │
//! │    • head/foot tag words (sign = free bit)          │
//! │    • single-word neighbor probes via tiling         │
//! │    • host-endian 32-bit words = persisted format    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key properties
//!
//! * **Best fit.** Requests get the smallest free block that satisfies them;
//!   oversized blocks are split when the leftover still makes a legal free
//!   block.
//! * **Coalescing.** Freed blocks absorb directly adjacent free neighbors in
//!   `O(1)` tag reads plus two freelist operations, so no two free blocks
//!   are ever adjacent.
//! * **Persistence.** The arena itself is the stored state; a region that
//!   still carries a valid header is adopted (after a full integrity check)
//!   instead of re-initialized, which lets memory-mapped arenas survive
//!   process restarts. The format is 32-bit, host-endian.
//! * **Out of memory is not an error.** [`Allocator::alloc`] returns
//!   `Ok(None)` when nothing fits; errors are reserved for invalid arguments,
//!   invalid blocks, and corrupted arenas.
//! * **Deterministic when asked.** Block placement depends on the randomized
//!   freelist node heights; the flip source is injectable
//!   ([`Allocator::with_coins`]) so placement can be pinned.
//!
//! ## Usage
//!
//! ```
//! use arena_alloc::Allocator;
//! use arena_units::ByteCount;
//!
//! let mut region = [0_u8; 4096];
//! let mut alloc = Allocator::new(&mut region)?;
//!
//! let a = alloc.alloc(ByteCount::new(128))?.expect("arena has room");
//! let b = alloc.alloc(ByteCount::new(64))?.expect("arena has room");
//!
//! alloc.free(a)?;
//! let c = alloc.alloc(ByteCount::new(96))?.expect("reuses the gap");
//! assert_eq!(a, c);
//!
//! alloc.free(b)?;
//! alloc.free(c)?;
//! assert_eq!(alloc.stats().free_blocks, 1);
//! # Ok::<(), arena_alloc::Error>(())
//! ```
//!
//! ## Concurrency
//!
//! Every operation is synchronous and non-blocking, and the arena is
//! exclusively owned by its allocator instance; `&mut self` makes data races
//! unrepresentable. For cross-thread sharing, [`LockedAllocator`] provides
//! the outer lock.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![forbid(unsafe_code)]

mod allocator;
mod arena;
mod coin;
mod error;
mod index;
mod inspect;
mod locked;

pub use allocator::Allocator;
pub use arena::{
    FIRST_BLOCK_OFFSET_IN_BYTES, FIRST_BLOCK_OFFSET_IN_QUADS, HEADER_OFFSET_IN_QUADS,
    HEADER_SIZE_IN_QUADS, MAX_HEIGHT, MIN_FREEABLE_SIZE_IN_BYTES, MIN_FREEABLE_SIZE_IN_QUADS,
    MIN_REGION_SIZE_IN_BYTES, OVERHEAD_IN_BYTES, OVERHEAD_IN_QUADS, POINTER_OVERHEAD_IN_QUADS,
    POINTER_SIZE_IN_QUADS, verify_header,
};
pub use coin::{CoinFlip, RandomCoin};
pub use error::{BlockError, Error, IntegrityError, RangeError};
pub use inspect::{ArenaStats, BlockInfo, BlockState, Blocks};
pub use locked::LockedAllocator;

/// The byte/quad unit types used throughout the public API.
pub use arena_units as units;
