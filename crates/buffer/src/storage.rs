//! Backing storage shared between a buffer and its derived handles.
//!
//! A [`Shared`] pairs the reference counter with one storage region. Handles
//! (the original buffer, slices, duplicates) all hold the same `Arc<Shared>`;
//! the counter tracks the *logical* lifetime while the `Arc` keeps the memory
//! mapped, so a stale handle observes `IllegalReferenceCount` instead of
//! undefined behaviour.

use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::alloc::BufAllocator;
use crate::bytebuf::ByteBuf;
use crate::pool::BufPool;
use crate::refcount::RefCount;

/// One component of a composite buffer.
///
/// `base` is the child index the component starts at (the child's reader
/// index when it was added) and `length` the number of bytes it contributes.
#[derive(Debug)]
pub(crate) struct Component {
    pub buf: ByteBuf,
    pub base: usize,
    pub length: usize,
}

/// Component list of a composite buffer.
#[derive(Debug)]
pub(crate) struct Composite {
    pub alloc: BufAllocator,
    pub direct: bool,
    pub components: Vec<Component>,
}

impl Composite {
    pub fn capacity(&self) -> usize {
        self.components.iter().map(|c| c.length).sum()
    }
}

/// A fixed region with a stable address, optionally owned by a pool.
#[derive(Debug)]
pub(crate) struct DirectRegion {
    pub data: Box<[u8]>,
    pub pool: Option<Arc<BufPool>>,
}

impl DirectRegion {
    /// Returns the region to its pool, or drops it when it has none or no
    /// longer matches the pool's region size.
    pub fn recycle(self) {
        if let Some(pool) = self.pool {
            pool.recycle(self.data);
        }
    }
}

/// Storage variants behind a buffer handle.
#[derive(Debug)]
pub(crate) enum Storage {
    Heap(Vec<u8>),
    Direct(DirectRegion),
    Composite(Composite),
    /// Logically deallocated; reached only after the 1→0 transition.
    Freed,
}

impl Storage {
    pub fn capacity(&self) -> usize {
        match self {
            Self::Heap(data) => data.len(),
            Self::Direct(region) => region.data.len(),
            Self::Composite(composite) => composite.capacity(),
            Self::Freed => 0,
        }
    }
}

/// Reference counter plus storage cell shared by all handles of one buffer.
///
/// Interior mutability is required because slices and duplicates write
/// through storage owned jointly with their ancestor. The aliasing contract
/// is the pipeline threading model: a buffer and its derived handles are
/// confined to a single event-loop thread at any point in time, and moving a
/// buffer across threads requires a retain plus an external happens-before
/// edge. Within that contract the `&mut` handed out by [`Shared::with_mut`]
/// is never aliased.
#[derive(Debug)]
pub(crate) struct Shared {
    pub refs: RefCount,
    cell: UnsafeCell<Storage>,
}

// SAFETY: see the aliasing contract above; the refcount itself is atomic.
unsafe impl Send for Shared {}
// SAFETY: as for `Send`.
unsafe impl Sync for Shared {}

impl Shared {
    pub fn new(storage: Storage) -> Arc<Self> {
        Arc::new(Self {
            refs: RefCount::new(),
            cell: UnsafeCell::new(storage),
        })
    }

    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&Storage) -> R) -> R {
        // SAFETY: single-threaded confinement per the contract above.
        f(unsafe { &*self.cell.get() })
    }

    #[inline]
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Storage) -> R) -> R {
        // SAFETY: single-threaded confinement per the contract above.
        f(unsafe { &mut *self.cell.get() })
    }

    /// Replaces the storage with [`Storage::Freed`] and returns the previous
    /// contents for teardown.
    pub fn take_storage(&self) -> Storage {
        self.with_mut(|storage| std::mem::replace(storage, Storage::Freed))
    }
}
