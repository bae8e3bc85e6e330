//! # Overview
//!
//! The [`ByteBuf`] handle: a reference-counted, random-access byte container
//! with separate reader and writer indices.
//!
//! A handle is a window onto shared storage. The original buffer covers the
//! whole region; [`ByteBuf::slice`] and [`ByteBuf::duplicate`] create derived
//! handles that reuse the storage and the reference counter of their
//! ancestor, so releasing any handle of a family counts against the same
//! lifetime. The index invariant
//! `0 <= reader_index <= writer_index <= capacity <= max_capacity`
//! holds after every public operation; operations that would violate it fail
//! without mutating anything.
//!
//! Lifetimes are explicit: the allocator hands out buffers with a count of
//! one, [`ByteBuf::retain`] adds references, [`ByteBuf::release`] removes
//! them, and the transition to zero deallocates exactly once. A released
//! buffer stays inert — every operation on it reports
//! [`BufferError::IllegalReferenceCount`] instead of touching freed storage.

use std::fmt;
use std::sync::Arc;

use crate::error::{BufferError, Result};
use crate::storage::{Composite, DirectRegion, Shared, Storage};

/// Growth above this size happens in fixed steps instead of doubling.
const CAPACITY_GROWTH_THRESHOLD: usize = 4 * 1024 * 1024;

/// Reference-counted byte buffer with reader/writer indices.
pub struct ByteBuf {
    pub(crate) shared: Arc<Shared>,
    /// Start of this handle's window in storage space.
    pub(crate) offset: usize,
    /// Fixed window length for derived slices; `None` tracks the storage.
    pub(crate) window: Option<usize>,
    pub(crate) reader_index: usize,
    pub(crate) writer_index: usize,
    reader_mark: usize,
    writer_mark: usize,
    max_capacity: usize,
    read_only: bool,
    unreleasable: bool,
}

impl ByteBuf {
    pub(crate) fn new_base(shared: Arc<Shared>, max_capacity: usize) -> Self {
        Self {
            shared,
            offset: 0,
            window: None,
            reader_index: 0,
            writer_index: 0,
            reader_mark: 0,
            writer_mark: 0,
            max_capacity,
            read_only: false,
            unreleasable: false,
        }
    }

    // --- accessibility and bounds -------------------------------------------------

    pub(crate) fn ensure_accessible(&self) -> Result<()> {
        if self.shared.refs.is_accessible() {
            Ok(())
        } else {
            Err(BufferError::released())
        }
    }

    pub(crate) fn check_mutable(&self) -> Result<()> {
        if self.read_only {
            Err(BufferError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Validates `index..index + length` against the capacity, without
    /// touching storage.
    pub(crate) fn check_index(&self, index: usize, length: usize) -> Result<()> {
        self.ensure_accessible()?;
        let capacity = self.capacity();
        match index.checked_add(length) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(BufferError::out_of_range(index, length, capacity)),
        }
    }

    pub(crate) fn check_readable(&self, length: usize) -> Result<()> {
        self.ensure_accessible()?;
        if length <= self.readable_bytes() {
            Ok(())
        } else {
            Err(BufferError::out_of_range(
                self.reader_index,
                length,
                self.writer_index,
            ))
        }
    }

    // --- capacity and indices -----------------------------------------------------

    /// Number of addressable bytes in this handle's window.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.window
            .unwrap_or_else(|| self.shared.with(Storage::capacity))
    }

    /// Hard ceiling the buffer may grow to.
    #[must_use]
    pub const fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Current reader index.
    #[must_use]
    pub const fn reader_index(&self) -> usize {
        self.reader_index
    }

    /// Current writer index.
    #[must_use]
    pub const fn writer_index(&self) -> usize {
        self.writer_index
    }

    /// Moves the reader index.
    pub fn set_reader_index(&mut self, index: usize) -> Result<()> {
        self.ensure_accessible()?;
        if index > self.writer_index {
            return Err(BufferError::out_of_range(index, 0, self.writer_index));
        }
        self.reader_index = index;
        Ok(())
    }

    /// Moves the writer index.
    pub fn set_writer_index(&mut self, index: usize) -> Result<()> {
        self.ensure_accessible()?;
        if index < self.reader_index || index > self.capacity() {
            return Err(BufferError::out_of_range(index, 0, self.capacity()));
        }
        self.writer_index = index;
        Ok(())
    }

    /// Moves both indices in one validated step.
    pub fn set_index(&mut self, reader: usize, writer: usize) -> Result<()> {
        self.ensure_accessible()?;
        if reader > writer || writer > self.capacity() {
            return Err(BufferError::out_of_range(reader, writer, self.capacity()));
        }
        self.reader_index = reader;
        self.writer_index = writer;
        Ok(())
    }

    /// Bytes available for reading.
    #[must_use]
    pub const fn readable_bytes(&self) -> usize {
        self.writer_index - self.reader_index
    }

    /// Bytes writable without growing.
    #[must_use]
    pub fn writable_bytes(&self) -> usize {
        self.capacity() - self.writer_index
    }

    /// Bytes writable after growing to `max_capacity`.
    #[must_use]
    pub const fn max_writable_bytes(&self) -> usize {
        self.max_capacity - self.writer_index
    }

    /// `true` when at least one byte can be read.
    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.readable_bytes() > 0
    }

    /// `true` when at least one byte can be written without growing.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable_bytes() > 0
    }

    /// Resets both indices to zero. Storage is untouched.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_accessible()?;
        self.reader_index = 0;
        self.writer_index = 0;
        Ok(())
    }

    /// Advances the reader index by `length` without copying.
    pub fn skip_bytes(&mut self, length: usize) -> Result<()> {
        self.check_readable(length)?;
        self.reader_index += length;
        Ok(())
    }

    // --- marks --------------------------------------------------------------------

    /// Saves the reader index for a later [`ByteBuf::reset_reader_index`].
    pub fn mark_reader_index(&mut self) -> Result<()> {
        self.ensure_accessible()?;
        self.reader_mark = self.reader_index;
        Ok(())
    }

    /// Restores the reader index to the saved mark.
    pub fn reset_reader_index(&mut self) -> Result<()> {
        let mark = self.reader_mark;
        self.set_reader_index(mark)
    }

    /// Saves the writer index for a later [`ByteBuf::reset_writer_index`].
    pub fn mark_writer_index(&mut self) -> Result<()> {
        self.ensure_accessible()?;
        self.writer_mark = self.writer_index;
        Ok(())
    }

    /// Restores the writer index to the saved mark.
    pub fn reset_writer_index(&mut self) -> Result<()> {
        let mark = self.writer_mark;
        self.set_writer_index(mark)
    }

    // --- compaction and growth ----------------------------------------------------

    /// Drops the bytes before the reader index and shifts the readable
    /// region to the front, freeing writable space without reallocating.
    pub fn discard_read_bytes(&mut self) -> Result<()> {
        self.ensure_accessible()?;
        self.check_mutable()?;
        if self.reader_index == 0 {
            return Ok(());
        }
        let reader = self.reader_index;
        let writer = self.writer_index;
        let offset = self.offset;
        let is_view = self.window.is_some();
        self.shared.with_mut(|storage| match storage {
            Storage::Heap(data) => {
                data.copy_within(offset + reader..offset + writer, offset);
                Ok(())
            }
            Storage::Direct(region) => {
                region.data.copy_within(offset + reader..offset + writer, offset);
                Ok(())
            }
            Storage::Composite(_) if is_view => Err(BufferError::Unsupported(
                "discard_read_bytes on a composite slice",
            )),
            Storage::Composite(composite) => {
                crate::composite::trim_read_components(composite, reader)
            }
            Storage::Freed => Err(BufferError::released()),
        })?;
        self.writer_index -= reader;
        self.reader_index = 0;
        self.reader_mark = self.reader_mark.saturating_sub(reader);
        self.writer_mark = self.writer_mark.saturating_sub(reader);
        Ok(())
    }

    /// Guarantees room for `needed` more writable bytes, growing the buffer
    /// up to `max_capacity` when necessary.
    pub fn ensure_writable(&mut self, needed: usize) -> Result<()> {
        self.ensure_accessible()?;
        self.check_mutable()?;
        if needed <= self.writable_bytes() {
            return Ok(());
        }
        let required = self
            .writer_index
            .checked_add(needed)
            .ok_or(BufferError::Overflow {
                requested: usize::MAX,
                max: self.max_capacity,
            })?;
        if required > self.max_capacity {
            return Err(BufferError::Overflow {
                requested: required,
                max: self.max_capacity,
            });
        }
        let target = calculate_new_capacity(required, self.max_capacity);
        let shortfall = required - self.capacity();
        self.shared.with_mut(|storage| match storage {
            Storage::Heap(data) => {
                data.resize(target, 0);
                Ok(())
            }
            Storage::Direct(region) => {
                let mut grown = vec![0u8; target].into_boxed_slice();
                grown[..region.data.len()].copy_from_slice(&region.data);
                let pool = region.pool.take();
                *region = DirectRegion { data: grown, pool };
                Ok(())
            }
            Storage::Composite(composite) => extend_composite(composite, shortfall),
            Storage::Freed => Err(BufferError::released()),
        })
    }

    // --- reference counting -------------------------------------------------------

    /// Current reference count.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.shared.refs.count()
    }

    /// Adds one reference.
    pub fn retain(&self) -> Result<()> {
        self.retain_n(1)
    }

    /// Adds `n` references.
    pub fn retain_n(&self, n: usize) -> Result<()> {
        if self.unreleasable {
            return Ok(());
        }
        self.shared.refs.try_retain(n).map(|_| ())
    }

    /// Removes one reference. Returns `true` when this call deallocated.
    pub fn release(&self) -> Result<bool> {
        self.release_n(1)
    }

    /// Removes `n` references. Returns `true` when this call deallocated.
    pub fn release_n(&self, n: usize) -> Result<bool> {
        if self.unreleasable {
            return Ok(false);
        }
        let deallocated = self.shared.refs.release(n)?;
        if deallocated {
            self.deallocate();
        }
        Ok(deallocated)
    }

    /// Runs once, on whichever handle crossed the 1→0 transition. Heap
    /// storage is dropped, direct regions return to their pool, composite
    /// children give back the reference taken when they were added.
    fn deallocate(&self) {
        match self.shared.take_storage() {
            Storage::Heap(_) | Storage::Freed => {}
            Storage::Direct(region) => region.recycle(),
            Storage::Composite(composite) => {
                for component in composite.components {
                    // Teardown path: a child that already failed its own
                    // release cannot be recovered here.
                    let _ = component.buf.release();
                }
            }
        }
    }

    // --- derived buffers ----------------------------------------------------------

    /// Returns a derived buffer over `[index, index + length)` sharing this
    /// buffer's storage and reference count, with independent indices. The
    /// slice does not add a reference; use [`ByteBuf::retained_slice`] when
    /// the slice outlives the caller's reference.
    pub fn slice(&self, index: usize, length: usize) -> Result<Self> {
        self.check_index(index, length)?;
        Ok(Self {
            shared: Arc::clone(&self.shared),
            offset: self.offset + index,
            window: Some(length),
            reader_index: 0,
            writer_index: length,
            reader_mark: 0,
            writer_mark: 0,
            max_capacity: length,
            read_only: self.read_only,
            unreleasable: self.unreleasable,
        })
    }

    /// [`ByteBuf::slice`] plus a retain, extending the ancestor's lifetime
    /// for as long as the slice is live.
    pub fn retained_slice(&self, index: usize, length: usize) -> Result<Self> {
        let slice = self.slice(index, length)?;
        self.retain()?;
        Ok(slice)
    }

    /// Returns a derived buffer over the whole region with its own copy of
    /// the indices. No reference is added.
    pub fn duplicate(&self) -> Result<Self> {
        self.ensure_accessible()?;
        Ok(Self {
            shared: Arc::clone(&self.shared),
            offset: self.offset,
            window: self.window,
            reader_index: self.reader_index,
            writer_index: self.writer_index,
            reader_mark: self.reader_mark,
            writer_mark: self.writer_mark,
            max_capacity: self.max_capacity,
            read_only: self.read_only,
            unreleasable: self.unreleasable,
        })
    }

    /// [`ByteBuf::duplicate`] plus a retain.
    pub fn retained_duplicate(&self) -> Result<Self> {
        let duplicate = self.duplicate()?;
        self.retain()?;
        Ok(duplicate)
    }

    /// Slices off the next `length` readable bytes and advances the reader.
    pub fn read_slice(&mut self, length: usize) -> Result<Self> {
        self.check_readable(length)?;
        let slice = self.slice(self.reader_index, length)?;
        self.reader_index += length;
        Ok(slice)
    }

    /// [`ByteBuf::read_slice`] plus a retain.
    pub fn read_retained_slice(&mut self, length: usize) -> Result<Self> {
        self.check_readable(length)?;
        let slice = self.retained_slice(self.reader_index, length)?;
        self.reader_index += length;
        Ok(slice)
    }

    // --- wrappers -----------------------------------------------------------------

    /// Wraps this handle so every mutating operation fails with
    /// [`BufferError::ReadOnly`]. Storage stays shared.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// `true` when mutation is rejected.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Wraps this handle so retain and release become no-ops, pinning the
    /// reference count contributions made through it at their current value.
    #[must_use]
    pub fn unreleasable(mut self) -> Self {
        self.unreleasable = true;
        self
    }

    /// `true` when retain/release are swallowed.
    #[must_use]
    pub const fn is_unreleasable(&self) -> bool {
        self.unreleasable
    }

    // --- introspection ------------------------------------------------------------

    /// `true` for direct storage (and composites assembling direct children).
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.shared.with(|storage| match storage {
            Storage::Direct(_) => true,
            Storage::Composite(composite) => composite.direct,
            Storage::Heap(_) | Storage::Freed => false,
        })
    }

    /// `true` when a stable memory address is obtainable.
    #[must_use]
    pub fn has_memory_address(&self) -> bool {
        self.shared
            .with(|storage| matches!(storage, Storage::Direct(_)))
    }

    /// Address of the first byte of this handle's window.
    ///
    /// Only direct buffers expose an address; the value is stable until the
    /// buffer grows or is deallocated.
    pub fn memory_address(&self) -> Result<usize> {
        self.ensure_accessible()?;
        self.shared.with(|storage| match storage {
            Storage::Direct(region) => Ok(region.data.as_ptr() as usize + self.offset),
            _ => Err(BufferError::Unsupported(
                "memory_address requires a direct buffer",
            )),
        })
    }

    /// Copies the readable region into a fresh `Vec`.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.readable_bytes()];
        self.get_bytes(self.reader_index, &mut out)?;
        Ok(out)
    }

    /// Renders the readable region as lowercase hex for diagnostics.
    pub fn hex_dump(&self) -> Result<String> {
        use std::fmt::Write as _;

        let bytes = self.to_vec()?;
        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in &bytes {
            let _ = write!(&mut out, "{byte:02x}");
        }
        Ok(out)
    }
}

/// Doubling growth from a floor of 64 bytes, switching to fixed 4 MiB steps
/// past the threshold so large buffers do not overshoot.
fn calculate_new_capacity(required: usize, max: usize) -> usize {
    debug_assert!(required <= max);
    if required > CAPACITY_GROWTH_THRESHOLD {
        let base = required / CAPACITY_GROWTH_THRESHOLD * CAPACITY_GROWTH_THRESHOLD;
        if base > max.saturating_sub(CAPACITY_GROWTH_THRESHOLD) {
            max
        } else {
            (base + CAPACITY_GROWTH_THRESHOLD).min(max)
        }
    } else {
        let mut capacity = 64;
        while capacity < required {
            capacity <<= 1;
        }
        capacity.min(max)
    }
}

/// Appends a zero-filled child so the composite gains `additional` bytes of
/// capacity. The child's readable window is what contributes capacity, so it
/// is added fully written.
fn extend_composite(composite: &mut Composite, additional: usize) -> Result<()> {
    let mut child = if composite.direct {
        composite.alloc.direct_buffer(additional)
    } else {
        composite.alloc.buffer(additional)
    };
    child.set_writer_index(additional)?;
    let base = child.reader_index();
    composite.components.push(crate::storage::Component {
        buf: child,
        base,
        length: additional,
    });
    Ok(())
}

impl fmt::Debug for ByteBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuf")
            .field("reader_index", &self.reader_index)
            .field("writer_index", &self.writer_index)
            .field("capacity", &self.capacity())
            .field("max_capacity", &self.max_capacity)
            .field("ref_count", &self.ref_count())
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::alloc::BufAllocator;

    #[test]
    fn fresh_buffer_has_zeroed_indices() {
        let buf = BufAllocator::new().buffer(16);
        assert_eq!(buf.reader_index(), 0);
        assert_eq!(buf.writer_index(), 0);
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.readable_bytes(), 0);
        assert_eq!(buf.writable_bytes(), 16);
    }

    #[test]
    fn set_index_rejects_inverted_pair() {
        let mut buf = BufAllocator::new().buffer(16);
        buf.set_index(0, 8).expect("valid index pair");
        let err = buf.set_index(9, 8).expect_err("reader beyond writer");
        assert!(matches!(
            err,
            crate::error::BufferError::IndexOutOfRange { .. }
        ));
    }

    #[test]
    fn marks_save_and_restore_positions() {
        let mut buf = BufAllocator::new().buffer(16);
        buf.write_bytes(b"abcdef").expect("write");
        buf.skip_bytes(2).expect("skip");
        buf.mark_reader_index().expect("mark");
        buf.skip_bytes(3).expect("skip more");
        buf.reset_reader_index().expect("reset");
        assert_eq!(buf.reader_index(), 2);
    }

    #[test]
    fn discard_read_bytes_compacts_and_adjusts_marks() {
        let mut buf = BufAllocator::new().buffer(16);
        buf.write_bytes(b"abcdef").expect("write");
        buf.skip_bytes(4).expect("skip");
        buf.mark_reader_index().expect("mark");
        buf.discard_read_bytes().expect("discard");
        assert_eq!(buf.reader_index(), 0);
        assert_eq!(buf.writer_index(), 2);
        assert_eq!(buf.to_vec().expect("contents"), b"ef");
    }

    #[test]
    fn ensure_writable_grows_up_to_max() {
        let mut buf = BufAllocator::new()
            .buffer_with_max(4, 128)
            .expect("bounded buffer");
        buf.write_bytes(b"abcd").expect("fill");
        buf.ensure_writable(10).expect("grow");
        assert!(buf.capacity() >= 14);
        assert_eq!(buf.to_vec().expect("contents"), b"abcd");

        let err = buf.ensure_writable(1024).expect_err("beyond max");
        assert!(matches!(err, crate::error::BufferError::Overflow { .. }));
    }

    #[test]
    fn growth_doubles_below_threshold() {
        assert_eq!(super::calculate_new_capacity(65, usize::MAX), 128);
        assert_eq!(super::calculate_new_capacity(1, usize::MAX), 64);
        assert_eq!(super::calculate_new_capacity(100, 100), 100);
    }

    #[test]
    fn slice_shares_storage_and_refcount() {
        let mut buf = BufAllocator::new().buffer(16);
        buf.write_bytes(b"hello world").expect("write");
        let slice = buf.slice(6, 5).expect("slice");
        assert_eq!(slice.to_vec().expect("slice contents"), b"world");
        assert_eq!(slice.capacity(), 5);
        assert_eq!(buf.ref_count(), 1, "plain slice does not retain");

        let retained = buf.retained_slice(0, 5).expect("retained slice");
        assert_eq!(buf.ref_count(), 2);
        retained.release().expect("release slice");
        assert_eq!(buf.ref_count(), 1);
    }

    #[test]
    fn released_buffer_rejects_every_operation() {
        let mut buf = BufAllocator::new().buffer(8);
        buf.write_bytes(b"hi").expect("write");
        assert!(buf.release().expect("final release"));
        assert!(buf.get_u8(0).is_err());
        assert!(buf.write_bytes(b"x").is_err());
        assert!(buf.slice(0, 1).is_err());
        assert!(buf.retain().is_err());
    }

    #[test]
    fn read_only_wrapper_rejects_mutation() {
        let mut buf = BufAllocator::new().buffer(8);
        buf.write_bytes(b"ab").expect("write");
        let mut frozen = buf.read_only();
        assert_eq!(frozen.get_u8(0).expect("read"), b'a');
        assert!(matches!(
            frozen.write_bytes(b"x"),
            Err(crate::error::BufferError::ReadOnly)
        ));
        assert!(matches!(
            frozen.set_u8(0, 0),
            Err(crate::error::BufferError::ReadOnly)
        ));
    }

    #[test]
    fn unreleasable_wrapper_swallows_release() {
        let mut buf = BufAllocator::new().buffer(8);
        buf.write_bytes(b"ab").expect("write");
        let pinned = buf.unreleasable();
        assert!(!pinned.release().expect("swallowed release"));
        assert_eq!(pinned.ref_count(), 1);
        assert_eq!(pinned.get_u8(0).expect("still accessible"), b'a');
    }

    #[test]
    fn memory_address_only_on_direct() {
        let alloc = BufAllocator::new();
        let heap = alloc.buffer(8);
        assert!(!heap.has_memory_address());
        assert!(heap.memory_address().is_err());

        let direct = alloc.direct_buffer(8);
        assert!(direct.has_memory_address());
        let address = direct.memory_address().expect("address");
        assert_ne!(address, 0);
    }
}
