//! Composite buffers: one logical byte sequence over non-contiguous child
//! buffers, without copying.
//!
//! Each component contributes its readable window at the time it was added.
//! The composite's capacity is the sum of those windows, so
//! `capacity == sum(child.readable_bytes)` holds after every mutation.
//! Adding a component transfers ownership of the child handle; removal and
//! deallocation release it.

use crate::bytebuf::ByteBuf;
use crate::error::{BufferError, Result};
use crate::storage::{Component, Composite, Storage};

impl ByteBuf {
    /// `true` when this handle is the base of a composite buffer.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.window.is_none()
            && self
                .shared
                .with(|storage| matches!(storage, Storage::Composite(_)))
    }

    fn composite_check(&self) -> Result<()> {
        self.ensure_accessible()?;
        if self.is_composite() {
            Ok(())
        } else {
            Err(BufferError::Unsupported(
                "operation requires a composite buffer",
            ))
        }
    }

    /// Number of components currently assembled.
    pub fn num_components(&self) -> Result<usize> {
        self.composite_check()?;
        self.shared.with(|storage| match storage {
            Storage::Composite(composite) => Ok(composite.components.len()),
            _ => Err(BufferError::released()),
        })
    }

    /// Appends `child`'s readable window as the last component, taking
    /// ownership of the handle. With `increase_writer_index` the composite's
    /// writer index advances past the new bytes, making them readable.
    pub fn add_component(&mut self, increase_writer_index: bool, child: Self) -> Result<()> {
        self.composite_check()?;
        self.check_mutable()?;
        child.ensure_accessible()?;
        let base = child.reader_index();
        let length = child.readable_bytes();
        self.shared.with_mut(|storage| match storage {
            Storage::Composite(composite) => {
                composite.components.push(Component {
                    buf: child,
                    base,
                    length,
                });
                Ok(())
            }
            _ => Err(BufferError::released()),
        })?;
        if increase_writer_index {
            self.writer_index += length;
        }
        Ok(())
    }

    /// Removes the component at `index`, releasing the child.
    pub fn remove_component(&mut self, index: usize) -> Result<()> {
        self.composite_check()?;
        self.check_mutable()?;
        self.shared.with_mut(|storage| match storage {
            Storage::Composite(composite) => {
                if index >= composite.components.len() {
                    return Err(BufferError::InvalidArgument(format!(
                        "component index {index} out of range for {} components",
                        composite.components.len()
                    )));
                }
                let component = composite.components.remove(index);
                let _ = component.buf.release();
                Ok(())
            }
            _ => Err(BufferError::released()),
        })?;
        let capacity = self.capacity();
        self.writer_index = self.writer_index.min(capacity);
        self.reader_index = self.reader_index.min(self.writer_index);
        Ok(())
    }

    /// Merges every component into one freshly allocated buffer and releases
    /// the originals. Indices are unchanged; contents are preserved.
    pub fn consolidate(&mut self) -> Result<()> {
        self.composite_check()?;
        self.check_mutable()?;
        let total = self.capacity();
        let mut data = vec![0u8; total];
        self.get_bytes(0, &mut data)?;
        self.shared.with_mut(|storage| match storage {
            Storage::Composite(composite) => {
                let mut merged = if composite.direct {
                    composite.alloc.direct_buffer(total)
                } else {
                    composite.alloc.buffer(total)
                };
                merged.write_bytes(&data)?;
                for component in composite.components.drain(..) {
                    let _ = component.buf.release();
                }
                composite.components.push(Component {
                    buf: merged,
                    base: 0,
                    length: total,
                });
                Ok(())
            }
            _ => Err(BufferError::released()),
        })
    }
}

/// Drops fully read components and trims the partially read head so the
/// composite's window starts at what is still unread. The caller rebases the
/// composite's own indices afterwards.
pub(crate) fn trim_read_components(composite: &mut Composite, reader: usize) -> Result<()> {
    let mut remaining = reader;
    while remaining > 0 {
        let Some(first) = composite.components.first_mut() else {
            break;
        };
        if first.length <= remaining {
            remaining -= first.length;
            let component = composite.components.remove(0);
            let _ = component.buf.release();
        } else {
            first.buf.skip_bytes(remaining)?;
            first.base += remaining;
            first.length -= remaining;
            remaining = 0;
        }
    }
    Ok(())
}

/// Reads `dst.len()` bytes starting at composite index `abs`, walking the
/// components left to right.
pub(crate) fn composite_get(composite: &Composite, abs: usize, dst: &mut [u8]) -> Result<()> {
    if dst.is_empty() {
        return Ok(());
    }
    let mut pos = 0usize;
    let mut cursor = 0usize;
    for component in &composite.components {
        let end = pos + component.length;
        let index = abs + cursor;
        if index < end {
            let local = index - pos;
            let n = (component.length - local).min(dst.len() - cursor);
            component
                .buf
                .get_bytes(component.base + local, &mut dst[cursor..cursor + n])?;
            cursor += n;
            if cursor == dst.len() {
                return Ok(());
            }
        }
        pos = end;
    }
    Err(BufferError::out_of_range(abs, dst.len(), pos))
}

/// Writes `src` starting at composite index `abs`, walking the components.
pub(crate) fn composite_set(composite: &mut Composite, abs: usize, src: &[u8]) -> Result<()> {
    if src.is_empty() {
        return Ok(());
    }
    let mut pos = 0usize;
    let mut cursor = 0usize;
    for component in &mut composite.components {
        let end = pos + component.length;
        let index = abs + cursor;
        if index < end {
            let local = index - pos;
            let n = (component.length - local).min(src.len() - cursor);
            component
                .buf
                .set_bytes(component.base + local, &src[cursor..cursor + n])?;
            cursor += n;
            if cursor == src.len() {
                return Ok(());
            }
        }
        pos = end;
    }
    Err(BufferError::out_of_range(abs, src.len(), pos))
}
