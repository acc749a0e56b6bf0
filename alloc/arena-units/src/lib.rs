//! # Byte and Quad Units
//!
//! Strongly typed wrappers for the two address spaces an arena allocator
//! juggles: **byte offsets** as seen by callers, and **quad indices** (32-bit
//! word indices) used internally.
//!
//! ## Overview
//!
//! This crate defines a minimal set of types that prevent mixing bytes and
//! quads at compile time while remaining zero-cost wrappers around `u32`
//! values.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`ByteOffset`] | A position in the backing region, in bytes. |
//! | [`ByteCount`] | A length or size, in bytes. |
//! | [`QuadIndex`] | A position in the region viewed as an array of 32-bit words. |
//! | [`QuadCount`] | A length or size, in quads. |
//!
//! One quad is [`QUAD_SIZE_IN_BYTES`] (4) bytes. Byte→quad conversions are
//! **checked**: they return `None` unless the value is quad-aligned, so an
//! unaligned caller value can never silently become a word index.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use arena_units::*;
//! let addr = ByteOffset::new(272);
//! let index = addr.to_quad_index().expect("aligned");
//! assert_eq!(index.as_u32(), 68);
//!
//! // Round-trips back to the same byte offset
//! assert_eq!(index.to_byte_offset(), addr);
//!
//! // Unaligned offsets do not convert
//! assert!(ByteOffset::new(273).to_quad_index().is_none());
//!
//! // Index arithmetic stays in quad space
//! let block = index + QuadCount::new(4);
//! assert_eq!(block.offset_from(index), QuadCount::new(4));
//! ```
//!
//! ## Design Notes
//!
//! - All types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord`,
//!   and `Hash`, making them suitable as map keys.
//! - Conversions and arithmetic are `const fn` and zero-cost in release
//!   builds.
//! - The wrappers are deliberately 32-bit: the arena format they index is a
//!   32-bit, host-endian word array.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![forbid(unsafe_code)]

mod byte;
mod quad;

pub use byte::{ByteCount, ByteOffset};
pub use quad::{QuadCount, QuadIndex};

/// Number of bytes per quad (one 32-bit word).
pub const QUAD_SIZE_IN_BYTES: u32 = 4;
