//! Bulk transfers between buffers, slices, and blocking or async streams.
//!
//! Every transfer validates bounds and accessibility before the first byte
//! moves. Transfers that cross composite component boundaries run through a
//! bounded stack scratch so no call path ever borrows two storage cells at
//! once.

use std::io::{Read, Write};

use crate::bytebuf::ByteBuf;
use crate::error::{BufferError, Result};
use crate::storage::{Shared, Storage};

/// Chunk size for scratch-mediated transfers.
const TRANSFER_CHUNK: usize = 4096;

impl ByteBuf {
    pub(crate) fn storage_get(&self, abs: usize, dst: &mut [u8]) -> Result<()> {
        self.shared.with(|storage| match storage {
            Storage::Heap(data) => {
                dst.copy_from_slice(&data[abs..abs + dst.len()]);
                Ok(())
            }
            Storage::Direct(region) => {
                dst.copy_from_slice(&region.data[abs..abs + dst.len()]);
                Ok(())
            }
            Storage::Composite(composite) => crate::composite::composite_get(composite, abs, dst),
            Storage::Freed => Err(BufferError::released()),
        })
    }

    pub(crate) fn storage_set(&self, abs: usize, src: &[u8]) -> Result<()> {
        self.shared.with_mut(|storage| match storage {
            Storage::Heap(data) => {
                data[abs..abs + src.len()].copy_from_slice(src);
                Ok(())
            }
            Storage::Direct(region) => {
                region.data[abs..abs + src.len()].copy_from_slice(src);
                Ok(())
            }
            Storage::Composite(composite) => crate::composite::composite_set(composite, abs, src),
            Storage::Freed => Err(BufferError::released()),
        })
    }

    // --- slice transfers ----------------------------------------------------------

    /// Copies `dst.len()` bytes starting at `index` into `dst`.
    pub fn get_bytes(&self, index: usize, dst: &mut [u8]) -> Result<()> {
        self.check_index(index, dst.len())?;
        self.storage_get(self.offset + index, dst)
    }

    /// Copies `src` into the buffer starting at `index`.
    pub fn set_bytes(&mut self, index: usize, src: &[u8]) -> Result<()> {
        self.check_mutable()?;
        self.check_index(index, src.len())?;
        self.storage_set(self.offset + index, src)
    }

    /// Reads `dst.len()` bytes from the reader index, advancing it.
    pub fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        self.check_readable(dst.len())?;
        self.storage_get(self.offset + self.reader_index, dst)?;
        self.reader_index += dst.len();
        Ok(())
    }

    /// Appends `src` at the writer index, growing if needed, advancing it.
    pub fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.ensure_writable(src.len())?;
        self.storage_set(self.offset + self.writer_index, src)?;
        self.writer_index += src.len();
        Ok(())
    }

    // --- buffer transfers ---------------------------------------------------------

    /// Copies `length` bytes starting at `index` into `dst`, advancing only
    /// `dst`'s writer index.
    pub fn get_into(&self, index: usize, dst: &mut Self, length: usize) -> Result<()> {
        self.check_index(index, length)?;
        dst.ensure_writable(length)?;
        let mut scratch = [0u8; TRANSFER_CHUNK];
        let mut done = 0;
        while done < length {
            let n = (length - done).min(TRANSFER_CHUNK);
            self.get_bytes(index + done, &mut scratch[..n])?;
            dst.write_bytes(&scratch[..n])?;
            done += n;
        }
        Ok(())
    }

    /// Copies `length` bytes out of `src` into this buffer at `index`,
    /// advancing only `src`'s reader index.
    pub fn set_from(&mut self, index: usize, src: &mut Self, length: usize) -> Result<()> {
        self.check_mutable()?;
        self.check_index(index, length)?;
        src.check_readable(length)?;
        let mut scratch = [0u8; TRANSFER_CHUNK];
        let mut done = 0;
        while done < length {
            let n = (length - done).min(TRANSFER_CHUNK);
            src.read_bytes(&mut scratch[..n])?;
            self.set_bytes(index + done, &scratch[..n])?;
            done += n;
        }
        Ok(())
    }

    /// Moves `length` readable bytes into `dst`, advancing both buffers.
    pub fn read_into(&mut self, dst: &mut Self, length: usize) -> Result<()> {
        self.check_readable(length)?;
        let reader = self.reader_index;
        self.get_into(reader, dst, length)?;
        self.reader_index += length;
        Ok(())
    }

    /// Appends `length` bytes read out of `src`, advancing both buffers.
    pub fn write_from(&mut self, src: &mut Self, length: usize) -> Result<()> {
        self.ensure_writable(length)?;
        let writer = self.writer_index;
        self.set_from(writer, src, length)?;
        self.writer_index += length;
        Ok(())
    }

    // --- blocking stream transfers ------------------------------------------------

    /// Fills `[index, index + length)` from a blocking reader. Returns the
    /// number of bytes transferred, which is smaller than `length` only when
    /// the reader reached end of stream.
    pub fn set_from_reader<R: Read + ?Sized>(
        &mut self,
        index: usize,
        reader: &mut R,
        length: usize,
    ) -> Result<usize> {
        self.check_mutable()?;
        self.check_index(index, length)?;
        let mut scratch = [0u8; TRANSFER_CHUNK];
        let mut done = 0;
        while done < length {
            let want = (length - done).min(TRANSFER_CHUNK);
            let got = reader.read(&mut scratch[..want])?;
            if got == 0 {
                break;
            }
            self.set_bytes(index + done, &scratch[..got])?;
            done += got;
        }
        Ok(done)
    }

    /// Copies `[index, index + length)` into a blocking writer.
    pub fn get_to_writer<W: Write + ?Sized>(
        &self,
        index: usize,
        writer: &mut W,
        length: usize,
    ) -> Result<()> {
        self.check_index(index, length)?;
        let mut scratch = [0u8; TRANSFER_CHUNK];
        let mut done = 0;
        while done < length {
            let n = (length - done).min(TRANSFER_CHUNK);
            self.get_bytes(index + done, &mut scratch[..n])?;
            writer.write_all(&scratch[..n])?;
            done += n;
        }
        Ok(())
    }

    /// Appends up to `length` bytes from a blocking reader at the writer
    /// index, growing if needed. Returns the byte count actually read.
    pub fn write_from_reader<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        length: usize,
    ) -> Result<usize> {
        self.ensure_writable(length)?;
        let writer = self.writer_index;
        let got = self.set_from_reader(writer, reader, length)?;
        self.writer_index += got;
        Ok(got)
    }

    /// Streams `length` readable bytes into a blocking writer, advancing the
    /// reader index.
    pub fn read_to_writer<W: Write + ?Sized>(&mut self, writer: &mut W, length: usize) -> Result<()> {
        self.check_readable(length)?;
        let reader = self.reader_index;
        self.get_to_writer(reader, writer, length)?;
        self.reader_index += length;
        Ok(())
    }

    // --- zero fill ----------------------------------------------------------------

    /// Zeroes `[index, index + length)`.
    pub fn set_zero(&mut self, index: usize, length: usize) -> Result<()> {
        self.check_mutable()?;
        self.check_index(index, length)?;
        let scratch = [0u8; TRANSFER_CHUNK];
        let mut done = 0;
        while done < length {
            let n = (length - done).min(TRANSFER_CHUNK);
            self.set_bytes(index + done, &scratch[..n])?;
            done += n;
        }
        Ok(())
    }

    /// Appends `length` zero bytes, growing if needed.
    pub fn write_zero(&mut self, length: usize) -> Result<()> {
        self.ensure_writable(length)?;
        let writer = self.writer_index;
        self.set_zero(writer, length)?;
        self.writer_index += length;
        Ok(())
    }

    // --- copies -------------------------------------------------------------------

    /// Returns an independent heap buffer holding a copy of
    /// `[index, index + length)`. The copy has its own storage and counter.
    pub fn copy(&self, index: usize, length: usize) -> Result<Self> {
        self.check_index(index, length)?;
        let mut data = vec![0u8; length];
        self.get_bytes(index, &mut data)?;
        let shared = Shared::new(Storage::Heap(data));
        let mut copy = Self::new_base(shared, self.max_capacity().max(length));
        copy.set_writer_index(length)?;
        Ok(copy)
    }
}

#[cfg(feature = "async")]
mod async_io {
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    use super::TRANSFER_CHUNK;
    use crate::bytebuf::ByteBuf;
    use crate::error::Result;

    impl ByteBuf {
        /// Fills `[index, index + length)` from an async reader. Returns the
        /// bytes transferred; end of stream stops the transfer early.
        ///
        /// Cancelling the returned future between reads leaves the bytes
        /// already copied in place; indices are untouched because indexed
        /// setters never advance them.
        pub async fn set_from_async_reader<R>(
            &mut self,
            index: usize,
            reader: &mut R,
            length: usize,
        ) -> Result<usize>
        where
            R: AsyncRead + Unpin + ?Sized,
        {
            self.check_mutable()?;
            self.check_index(index, length)?;
            let mut scratch = [0u8; TRANSFER_CHUNK];
            let mut done = 0;
            while done < length {
                let want = (length - done).min(TRANSFER_CHUNK);
                let got = reader.read(&mut scratch[..want]).await?;
                if got == 0 {
                    break;
                }
                self.set_bytes(index + done, &scratch[..got])?;
                done += got;
            }
            Ok(done)
        }

        /// Appends up to `length` bytes from an async reader at the writer
        /// index. The writer index advances by the bytes actually read, so a
        /// cancelled transfer that moved nothing leaves the indices
        /// unchanged and a partial transfer stays observable.
        pub async fn write_from_async_reader<R>(
            &mut self,
            reader: &mut R,
            length: usize,
        ) -> Result<usize>
        where
            R: AsyncRead + Unpin + ?Sized,
        {
            self.ensure_writable(length)?;
            let writer = self.writer_index;
            let got = self.set_from_async_reader(writer, reader, length).await?;
            self.writer_index += got;
            Ok(got)
        }

        /// Streams `length` readable bytes into an async writer, advancing
        /// the reader index after the last chunk is accepted.
        pub async fn read_to_async_writer<W>(&mut self, writer: &mut W, length: usize) -> Result<()>
        where
            W: AsyncWrite + Unpin + ?Sized,
        {
            self.check_readable(length)?;
            let mut scratch = [0u8; TRANSFER_CHUNK];
            let mut done = 0;
            while done < length {
                let n = (length - done).min(TRANSFER_CHUNK);
                self.get_bytes(self.reader_index + done, &mut scratch[..n])?;
                writer.write_all(&scratch[..n]).await?;
                done += n;
            }
            self.reader_index += length;
            Ok(())
        }
    }
}
