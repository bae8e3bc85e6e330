//! Lock-free reference counting shared by a buffer and its derived handles.
//!
//! The counter starts at one and follows the usual retain/release protocol:
//! a buffer is *accessible* while the count is positive, and the transition
//! from one to zero is reported to exactly one caller, which then runs
//! deallocation. Resurrection (retaining a dead counter) and counter wrap
//! are rejected rather than silently corrupting lifetime tracking.

use std::sync::atomic::{AtomicUsize, Ordering, fence};

use crate::error::BufferError;

/// Atomic reference counter with CAS retain/release.
#[derive(Debug)]
pub struct RefCount(AtomicUsize);

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

impl RefCount {
    /// Creates a counter initialised to one.
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicUsize::new(1))
    }

    /// Returns the current count.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Returns `true` while the count is positive.
    #[inline]
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.count() > 0
    }

    /// Increments the count by `n`.
    ///
    /// # Errors
    ///
    /// Fails with [`BufferError::IllegalReferenceCount`] when the current
    /// count is zero (resurrection) or when the increment would wrap the
    /// counter, detected as `new <= n`.
    pub fn try_retain(&self, n: usize) -> Result<usize, BufferError> {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return Err(BufferError::IllegalReferenceCount {
                    count: 0,
                    delta: n as isize,
                });
            }
            let next = current.wrapping_add(n);
            if next <= n {
                return Err(BufferError::IllegalReferenceCount {
                    count: current,
                    delta: n as isize,
                });
            }
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return Ok(next),
                Err(observed) => current = observed,
            }
        }
    }

    /// Decrements the count by `n`.
    ///
    /// Returns `true` when this call moved the count to zero; the caller
    /// must then deallocate. The release store pairs with the acquire fence
    /// taken on the zero transition, so deallocation happens-after every
    /// prior retain and release.
    ///
    /// # Errors
    ///
    /// Fails with [`BufferError::IllegalReferenceCount`] when the count is
    /// smaller than `n`.
    pub fn release(&self, n: usize) -> Result<bool, BufferError> {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            if current < n {
                return Err(BufferError::IllegalReferenceCount {
                    count: current,
                    delta: -(n as isize),
                });
            }
            let next = current - n;
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => {
                    if next == 0 {
                        fence(Ordering::Acquire);
                        return Ok(true);
                    }
                    return Ok(false);
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Overwrites the count. Initialisation escape hatch for allocators and
    /// pools; not part of the user-facing contract.
    pub(crate) fn set_count(&self, value: usize) {
        self.0.store(value, Ordering::Release);
    }

    /// Resets the count to one. See [`RefCount::set_count`].
    pub(crate) fn reset(&self) {
        self.set_count(1);
    }
}
