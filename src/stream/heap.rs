//! Heap-buffered [`ByteStream`](super::ByteStream): any OS-backed
//! read/write/seek source.

use std::io::{Read, Seek, SeekFrom, Write};

use super::ByteStream;
use crate::Result;

/// A [`ByteStream`] over any `Read + Write + Seek` source.
///
/// Used for files too large to map safely, and for any in-memory cursor
/// (handy in tests: `HeapByteStream::new(Cursor::new(Vec::new()))`).
pub struct HeapByteStream<F> {
    inner: F,
    pos: u64,
    len: u64,
}

impl<F: Read + Write + Seek> HeapByteStream<F> {
    pub fn new(mut inner: F) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, pos: 0, len })
    }

    /// Unwrap the backing reader/writer.
    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: Read + Write + Seek> ByteStream for HeapByteStream<F> {
    fn position(&self) -> u64 {
        self.pos
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        self.pos += buf.len() as u64;
        if self.pos > self.len {
            self.len = self.pos;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
