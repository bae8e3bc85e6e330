#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `buffer` provides the reference-counted, zero-copy byte containers used
//! by the ironpipe codec stack. A [`ByteBuf`] is a linearly addressable
//! region with independent reader and writer indices, endian-specified
//! primitive accessors, and bulk transfers against slices, other buffers,
//! and blocking streams (async streams behind the `async` feature).
//!
//! # Design
//!
//! Buffers come in four storage shapes: heap (a growable byte vector),
//! direct (a separately allocated region with a stable address, optionally
//! recycled through a pool), composite (an ordered sequence of child buffer
//! windows read and written without copying), and derived (slices and
//! duplicates sharing the storage and reference count of an ancestor).
//! Wrappers layer behaviour on a handle: [`ByteBuf::read_only`] rejects
//! mutation, [`ByteBuf::unreleasable`] pins the reference count.
//!
//! # Invariants
//!
//! - `0 <= reader_index <= writer_index <= capacity <= max_capacity` after
//!   every public operation; failed operations mutate nothing.
//! - Lifetime is explicit: buffers start with one reference,
//!   [`ByteBuf::retain`] and [`ByteBuf::release`] move the count, and the
//!   1→0 transition deallocates exactly once. Every operation on a released
//!   buffer fails with [`BufferError::IllegalReferenceCount`]; the count
//!   can neither be resurrected nor driven negative.
//! - A composite buffer's capacity equals the sum of its children's
//!   readable windows after every mutation.
//!
//! # Threading
//!
//! The reference count is atomic and may be manipulated from any thread. A
//! buffer's contents, however, are confined to one thread at a time: the
//! owner must establish a happens-before edge (and usually a retain) when
//! handing a buffer to another event loop.
//!
//! # Examples
//!
//! ```
//! use buffer::BufAllocator;
//!
//! # fn main() -> Result<(), buffer::BufferError> {
//! let alloc = BufAllocator::new();
//! let mut buf = alloc.buffer(16);
//! buf.write_u16(0xCAFE)?;
//! buf.write_bytes(b"hi")?;
//! assert_eq!(buf.read_u16()?, 0xCAFE);
//!
//! let slice = buf.retained_slice(2, 2)?;
//! assert_eq!(slice.to_vec()?, b"hi");
//! slice.release()?;
//! buf.release()?;
//! # Ok(())
//! # }
//! ```

mod alloc;
mod bytebuf;
mod bytes_io;
mod composite;
mod error;
mod pool;
mod primitives;
mod refcount;
mod storage;

pub use alloc::{BufAllocator, copied_buffer, wrapped_buffer};
pub use bytebuf::ByteBuf;
pub use error::{BufferError, Result};
pub use pool::BufPool;
pub use refcount::RefCount;
