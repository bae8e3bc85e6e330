//! Buffer allocation: heap, direct, pooled direct, and composite buffers.
//!
//! The allocator is cheap to clone and safe to share across threads; the
//! buffers it hands out start with a reference count of one. A pooled
//! allocator recycles direct regions through a [`BufPool`] freelist, so
//! steady-state codec traffic allocates nothing.

use std::sync::Arc;

use crate::bytebuf::ByteBuf;
use crate::error::{BufferError, Result};
use crate::pool::BufPool;
use crate::storage::{Composite, DirectRegion, Shared, Storage};

/// Factory for [`ByteBuf`] instances.
#[derive(Clone, Debug, Default)]
pub struct BufAllocator {
    pool: Option<Arc<BufPool>>,
}

impl BufAllocator {
    /// Creates an unpooled allocator.
    #[must_use]
    pub const fn new() -> Self {
        Self { pool: None }
    }

    /// Creates an allocator that recycles direct regions of `region_size`
    /// bytes, keeping at most `max_regions` free regions parked.
    #[must_use]
    pub fn pooled(region_size: usize, max_regions: usize) -> Self {
        Self {
            pool: Some(Arc::new(BufPool::new(region_size, max_regions))),
        }
    }

    /// The pool backing this allocator, when it has one.
    #[must_use]
    pub fn pool(&self) -> Option<&BufPool> {
        self.pool.as_deref()
    }

    /// Allocates a heap buffer of `capacity` bytes with an unbounded
    /// maximum capacity.
    #[must_use]
    pub fn buffer(&self, capacity: usize) -> ByteBuf {
        let shared = Shared::new(Storage::Heap(vec![0u8; capacity]));
        ByteBuf::new_base(shared, usize::MAX)
    }

    /// Allocates a heap buffer bounded at `max_capacity`.
    pub fn buffer_with_max(&self, capacity: usize, max_capacity: usize) -> Result<ByteBuf> {
        if capacity > max_capacity {
            return Err(BufferError::InvalidArgument(format!(
                "initial capacity {capacity} exceeds max capacity {max_capacity}"
            )));
        }
        let shared = Shared::new(Storage::Heap(vec![0u8; capacity]));
        Ok(ByteBuf::new_base(shared, max_capacity))
    }

    /// Allocates a direct buffer with a stable memory address.
    ///
    /// With a pool configured, requests up to the pool's region size reuse a
    /// recycled region (the capacity is then the region size); larger
    /// requests allocate an exact, unpooled region.
    #[must_use]
    pub fn direct_buffer(&self, capacity: usize) -> ByteBuf {
        let region = match &self.pool {
            Some(pool) if capacity <= pool.region_size() => {
                let data = pool
                    .acquire()
                    .unwrap_or_else(|| vec![0u8; pool.region_size()].into_boxed_slice());
                DirectRegion {
                    data,
                    pool: Some(Arc::clone(pool)),
                }
            }
            _ => DirectRegion {
                data: vec![0u8; capacity].into_boxed_slice(),
                pool: None,
            },
        };
        let shared = Shared::new(Storage::Direct(region));
        ByteBuf::new_base(shared, usize::MAX)
    }

    /// Allocates an empty composite buffer assembling heap children.
    #[must_use]
    pub fn composite_buffer(&self) -> ByteBuf {
        self.composite(false)
    }

    /// Allocates an empty composite buffer assembling direct children.
    #[must_use]
    pub fn composite_direct_buffer(&self) -> ByteBuf {
        self.composite(true)
    }

    fn composite(&self, direct: bool) -> ByteBuf {
        let shared = Shared::new(Storage::Composite(Composite {
            alloc: self.clone(),
            direct,
            components: Vec::new(),
        }));
        ByteBuf::new_base(shared, usize::MAX)
    }

    /// A zero-capacity buffer, useful as an explicit empty payload.
    #[must_use]
    pub fn empty(&self) -> ByteBuf {
        let shared = Shared::new(Storage::Heap(Vec::new()));
        ByteBuf::new_base(shared, 0)
    }
}

/// Wraps an existing byte vector without copying. The buffer starts fully
/// readable and cannot grow past the vector's length.
#[must_use]
pub fn wrapped_buffer(data: Vec<u8>) -> ByteBuf {
    let length = data.len();
    let shared = Shared::new(Storage::Heap(data));
    let mut buf = ByteBuf::new_base(shared, length);
    buf.writer_index = length;
    buf
}

/// Copies `src` into a fresh fully readable buffer.
#[must_use]
pub fn copied_buffer(src: &[u8]) -> ByteBuf {
    wrapped_buffer(src.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_buffer_is_fully_readable() {
        let buf = wrapped_buffer(b"wrapped".to_vec());
        assert_eq!(buf.readable_bytes(), 7);
        assert_eq!(buf.max_capacity(), 7);
        assert_eq!(buf.to_vec().expect("contents"), b"wrapped");
    }

    #[test]
    fn empty_buffer_has_no_capacity() {
        let buf = BufAllocator::new().empty();
        assert_eq!(buf.capacity(), 0);
        assert!(!buf.is_readable());
        assert!(!buf.is_writable());
    }

    #[test]
    fn pooled_direct_regions_are_recycled() {
        let alloc = BufAllocator::pooled(64, 4);
        let mut buf = alloc.direct_buffer(16);
        assert_eq!(buf.capacity(), 64, "pooled capacity is the region size");
        buf.write_bytes(b"scribble").expect("write");
        assert!(buf.release().expect("deallocate"));
        assert_eq!(alloc.pool().expect("pool").free_regions(), 1);

        let reused = alloc.direct_buffer(64);
        assert_eq!(alloc.pool().expect("pool").free_regions(), 0);
        assert_eq!(reused.capacity(), 64);
        let mut probe = [0u8; 8];
        reused.get_bytes(0, &mut probe).expect("read");
        assert_eq!(probe, [0u8; 8], "recycled region must be zeroed");
    }

    #[test]
    fn oversized_request_bypasses_pool() {
        let alloc = BufAllocator::pooled(16, 4);
        let buf = alloc.direct_buffer(64);
        assert_eq!(buf.capacity(), 64);
        assert!(buf.release().expect("deallocate"));
        assert_eq!(alloc.pool().expect("pool").free_regions(), 0);
    }

    #[test]
    fn buffer_with_max_validates_arguments() {
        let alloc = BufAllocator::new();
        assert!(alloc.buffer_with_max(8, 4).is_err());
        let buf = alloc.buffer_with_max(4, 8).expect("valid");
        assert_eq!(buf.max_capacity(), 8);
    }
}
