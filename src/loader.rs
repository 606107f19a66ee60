//! Shared loader plumbing: the `locked` flag, the [`ChunkIterator`]
//! contract, and defaults every format-specific loader configuration pulls
//! from (`SPEC_FULL.md` §6).

use std::cell::Cell;
use std::rc::Rc;

use crate::error::Error;
use crate::model::DataChunk;
use crate::Result;

/// Hard cap on vertices in one chunk; triggers a chunk cut when reached.
pub const DEFAULT_MAX_VERTICES_PER_CHUNK: usize = 65_535;
/// Whether cross-token vertex deduplication is disabled by default.
pub const DEFAULT_ALLOW_DUPLICATE_VERTICES_IN_CHUNK: bool = true;
/// Bound on the OBJ position cache, in entries.
pub const DEFAULT_MAX_CACHED_POSITIONS: usize = 1_000_000;
/// Whether a triangulation failure is skipped rather than fatal.
pub const DEFAULT_CONTINUE_ON_TRIANGULATION_ERROR: bool = true;

/// Produces chunks one at a time; `Err(Error::NotAvailable)` marks
/// exhaustion rather than ending the stream silently, matching
/// `SPEC_FULL.md` §7. Every loader in this crate also implements
/// [`Iterator<Item = Result<DataChunk>>`](Iterator) over the same state, for
/// ordinary `for` loops and combinators; that impl treats `NotAvailable` as
/// `None` and passes every other error through as `Some(Err(_))`.
pub trait ChunkIterator {
    fn next_chunk(&mut self) -> Result<DataChunk>;
}

/// A reentrancy guard shared between a loader and the iterator it hands out.
///
/// Acquiring sets a shared flag; the loader's configuration mutators check
/// it and fail with [`Error::Locked`] while an iterator holds it. Dropping
/// the returned [`LockGuard`] releases the flag, whether that happens
/// because the iterator ran to exhaustion or because the caller dropped it
/// early to cancel the load.
#[derive(Clone, Default)]
pub struct LoaderLock {
    locked: Rc<Cell<bool>>,
}

impl LoaderLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    /// Acquire the lock, failing if it is already held.
    pub fn acquire(&self) -> Result<LockGuard> {
        if self.locked.replace(true) {
            return Err(Error::Locked);
        }
        Ok(LockGuard {
            locked: self.locked.clone(),
            released: false,
        })
    }
}

/// RAII handle released on drop (or early via [`release`](LockGuard::release)).
pub struct LockGuard {
    locked: Rc<Cell<bool>>,
    released: bool,
}

impl LockGuard {
    /// Release the lock immediately, rather than waiting for drop. Calling
    /// this as soon as a chunk iterator is exhausted is what lets the
    /// underlying stream close at exhaustion instead of only at drop
    /// (`SPEC_FULL.md` §3 "Lifetime").
    pub fn release(&mut self) {
        if !self.released {
            self.locked.set(false);
            self.released = true;
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let lock = LoaderLock::new();
        let guard = lock.acquire().unwrap();
        assert!(lock.is_locked());
        assert!(matches!(lock.acquire(), Err(Error::Locked)));
        drop(guard);
        assert!(!lock.is_locked());
        assert!(lock.acquire().is_ok());
    }

    #[test]
    fn early_release_unlocks_before_drop() {
        let lock = LoaderLock::new();
        let mut guard = lock.acquire().unwrap();
        guard.release();
        assert!(!lock.is_locked());
        // Dropping an already-released guard must not double-release or panic.
        drop(guard);
        assert!(!lock.is_locked());
    }
}
