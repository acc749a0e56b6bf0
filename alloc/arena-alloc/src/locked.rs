//! Shared access to an allocator instance.
//!
//! The allocator itself is single-threaded by construction: every operation
//! takes `&mut self` and the arena is exclusively owned for the instance's
//! lifetime. Callers that need to share one arena across threads wrap it
//! here; the lock serializes every word-level access.

use crate::allocator::Allocator;
use crate::coin::{CoinFlip, RandomCoin};
use crate::error::Error;
use arena_units::{ByteCount, ByteOffset};
use spin::Mutex;

/// A spin-lock wrapper granting `&self` access to an [`Allocator`].
pub struct LockedAllocator<'region, C: CoinFlip = RandomCoin> {
    inner: Mutex<Allocator<'region, C>>,
}

impl<'region, C: CoinFlip> LockedAllocator<'region, C> {
    #[must_use]
    pub const fn new(allocator: Allocator<'region, C>) -> Self {
        Self {
            inner: Mutex::new(allocator),
        }
    }

    /// See [`Allocator::alloc`].
    ///
    /// # Errors
    ///
    /// As for [`Allocator::alloc`].
    pub fn alloc(&self, size: ByteCount) -> Result<Option<ByteOffset>, Error> {
        self.inner.lock().alloc(size)
    }

    /// See [`Allocator::alloc_zeroed`].
    ///
    /// # Errors
    ///
    /// As for [`Allocator::alloc_zeroed`].
    pub fn alloc_zeroed(&self, size: ByteCount) -> Result<Option<ByteOffset>, Error> {
        self.inner.lock().alloc_zeroed(size)
    }

    /// See [`Allocator::free`].
    ///
    /// # Errors
    ///
    /// As for [`Allocator::free`].
    pub fn free(&self, address: ByteOffset) -> Result<ByteCount, Error> {
        self.inner.lock().free(address)
    }

    /// See [`Allocator::size_of`].
    ///
    /// # Errors
    ///
    /// As for [`Allocator::size_of`].
    pub fn size_of(&self, address: ByteOffset) -> Result<ByteCount, Error> {
        self.inner.lock().size_of(address)
    }

    /// Runs `body` with the lock held, for compound operations and the
    /// read-only views (`blocks`, `stats`, `check`).
    pub fn with_lock<R>(&self, body: impl FnOnce(&mut Allocator<'region, C>) -> R) -> R {
        body(&mut self.inner.lock())
    }

    /// Unwraps the inner allocator.
    #[must_use]
    pub fn into_inner(self) -> Allocator<'region, C> {
        self.inner.into_inner()
    }
}
