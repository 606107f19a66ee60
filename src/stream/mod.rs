//! Random-access byte streams: the substrate every parser in this crate is
//! built on.
//!
//! [`ByteStream`] is one trait with two backends — [`HeapByteStream`], generic
//! over any [`Read`](std::io::Read) + [`Write`](std::io::Write) +
//! [`Seek`](std::io::Seek), and [`MappedByteStream`], backed by a memory map.
//! [`open`] picks between them using [`fileSizeLimitToKeepInMemory`
//! semantics](crate) so callers and format parsers never branch on which is
//! active.

mod heap;
mod mapped;

pub use heap::HeapByteStream;
pub use mapped::MappedByteStream;

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::Result;

/// Threshold (in bytes) below which [`open`] chooses a memory-mapped stream.
pub const DEFAULT_FILE_SIZE_LIMIT_TO_KEEP_IN_MEMORY: u64 = 50 * 1024 * 1024;

/// Byte order for a single typed read or write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// A cursor over a bounded byte region with endian-aware typed accessors.
///
/// A byte written at offset `k` is read back unchanged at offset `k`
/// irrespective of which implementation is in use, up until [`close`]
/// (`SPEC_FULL.md` §4.1). All multi-byte accessors are provided as default
/// methods over the handful of primitives each backend must supply.
pub trait ByteStream {
    /// Current cursor offset.
    fn position(&self) -> u64;
    /// Total addressable length of the region.
    fn len(&self) -> u64;
    /// Move the cursor to an absolute offset.
    fn seek(&mut self, pos: u64) -> Result<()>;
    /// Read exactly `buf.len()` bytes, advancing the cursor.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;
    /// Write exactly `buf.len()` bytes, advancing the cursor.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
    /// Flush and, for the mapped backend, force the mapping to disk.
    fn close(&mut self) -> Result<()>;

    /// Whether the cursor is at or past the end of the region.
    fn eof(&self) -> bool {
        self.position() >= self.len()
    }

    /// Move the cursor by a relative offset; negative values move backward
    /// and saturate at 0.
    fn skip(&mut self, delta: i64) -> Result<()> {
        let new_pos = if delta >= 0 {
            self.position().saturating_add(delta as u64)
        } else {
            self.position().saturating_sub(delta.unsigned_abs())
        };
        self.seek(new_pos)
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16(&mut self, endian: Endian) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(match endian {
            Endian::Big => u16::from_be_bytes(buf),
            Endian::Little => u16::from_le_bytes(buf),
        })
    }

    fn read_i16(&mut self, endian: Endian) -> Result<i16> {
        Ok(self.read_u16(endian)? as i16)
    }

    fn read_u32(&mut self, endian: Endian) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(match endian {
            Endian::Big => u32::from_be_bytes(buf),
            Endian::Little => u32::from_le_bytes(buf),
        })
    }

    fn read_i32(&mut self, endian: Endian) -> Result<i32> {
        Ok(self.read_u32(endian)? as i32)
    }

    fn read_u64(&mut self, endian: Endian) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(match endian {
            Endian::Big => u64::from_be_bytes(buf),
            Endian::Little => u64::from_le_bytes(buf),
        })
    }

    fn read_i64(&mut self, endian: Endian) -> Result<i64> {
        Ok(self.read_u64(endian)? as i64)
    }

    fn read_f32(&mut self, endian: Endian) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32(endian)?))
    }

    fn read_f64(&mut self, endian: Endian) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64(endian)?))
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_all(&[v])
    }

    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_u8(v as u8)
    }

    fn write_u16(&mut self, v: u16, endian: Endian) -> Result<()> {
        let bytes = match endian {
            Endian::Big => v.to_be_bytes(),
            Endian::Little => v.to_le_bytes(),
        };
        self.write_all(&bytes)
    }

    fn write_i16(&mut self, v: i16, endian: Endian) -> Result<()> {
        self.write_u16(v as u16, endian)
    }

    fn write_u32(&mut self, v: u32, endian: Endian) -> Result<()> {
        let bytes = match endian {
            Endian::Big => v.to_be_bytes(),
            Endian::Little => v.to_le_bytes(),
        };
        self.write_all(&bytes)
    }

    fn write_i32(&mut self, v: i32, endian: Endian) -> Result<()> {
        self.write_u32(v as u32, endian)
    }

    fn write_u64(&mut self, v: u64, endian: Endian) -> Result<()> {
        let bytes = match endian {
            Endian::Big => v.to_be_bytes(),
            Endian::Little => v.to_le_bytes(),
        };
        self.write_all(&bytes)
    }

    fn write_i64(&mut self, v: i64, endian: Endian) -> Result<()> {
        self.write_u64(v as u64, endian)
    }

    fn write_f32(&mut self, v: f32, endian: Endian) -> Result<()> {
        self.write_u32(v.to_bits(), endian)
    }

    fn write_f64(&mut self, v: f64, endian: Endian) -> Result<()> {
        self.write_u64(v.to_bits(), endian)
    }

    /// Consume bytes up to (and including) the first byte in `delimiters`,
    /// or through EOF if none is found. The delimiter is discarded; the
    /// accumulated bytes are decoded as ISO-8859-1 (each byte is its own
    /// code point).
    fn scan_until(&mut self, delimiters: &[u8]) -> Result<String> {
        let mut out = Vec::new();
        while !self.eof() {
            let b = self.read_u8()?;
            if delimiters.contains(&b) {
                break;
            }
            out.push(b);
        }
        Ok(out.into_iter().map(char::from).collect())
    }

    /// Read one line, terminated by CR, LF, or CR-LF (terminator consumed).
    ///
    /// Returns `Ok(None)` only when the cursor was already at EOF before any
    /// byte was read, so an empty line is distinguishable from no line.
    fn read_line(&mut self) -> Result<Option<String>> {
        if self.eof() {
            return Ok(None);
        }
        let mut out = Vec::new();
        while !self.eof() {
            let b = self.read_u8()?;
            match b {
                b'\n' => break,
                b'\r' => {
                    if !self.eof() {
                        let save = self.position();
                        let next = self.read_u8()?;
                        if next != b'\n' {
                            self.seek(save)?;
                        }
                    }
                    break;
                }
                other => out.push(other),
            }
        }
        Ok(Some(out.into_iter().map(char::from).collect()))
    }
}

/// Open `path` as a [`ByteStream`], choosing the mapped backend when the
/// file is smaller than `file_size_limit_to_keep_in_memory`.
pub fn open(path: impl AsRef<Path>, file_size_limit_to_keep_in_memory: u64) -> Result<Box<dyn ByteStream>> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let len = file.metadata()?.len();
    if len < file_size_limit_to_keep_in_memory {
        Ok(Box::new(MappedByteStream::new(&file)?))
    } else {
        Ok(Box::new(HeapByteStream::new(file)?))
    }
}

/// Create a brand-new file and open it as a writable [`HeapByteStream`].
///
/// Writers always use the heap backend: the final length isn't known ahead
/// of time, and the mapped backend can't grow past its initial mapping.
pub fn create(path: impl AsRef<Path>) -> Result<HeapByteStream<File>> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    HeapByteStream::new(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(mut s: impl ByteStream) {
        s.write_u8(0x7f).unwrap();
        s.write_u16(0x1234, Endian::Big).unwrap();
        s.write_u16(0x1234, Endian::Little).unwrap();
        s.write_i32(-1, Endian::Big).unwrap();
        s.write_f32(1.5, Endian::Little).unwrap();
        s.write_f64(-2.5, Endian::Big).unwrap();
        s.seek(0).unwrap();
        assert_eq!(s.read_u8().unwrap(), 0x7f);
        assert_eq!(s.read_u16(Endian::Big).unwrap(), 0x1234);
        assert_eq!(s.read_u16(Endian::Little).unwrap(), 0x1234);
        assert_eq!(s.read_i32(Endian::Big).unwrap(), -1);
        assert_eq!(s.read_f32(Endian::Little).unwrap(), 1.5);
        assert_eq!(s.read_f64(Endian::Big).unwrap(), -2.5);
        assert!(s.eof());
    }

    #[test]
    fn heap_cursor_round_trips() {
        round_trip(HeapByteStream::new(Cursor::new(Vec::new())).unwrap());
    }

    #[test]
    fn scan_until_consumes_delimiter() {
        let data = b"hello,world".to_vec();
        let mut s = HeapByteStream::new(Cursor::new(data)).unwrap();
        let first = s.scan_until(b",").unwrap();
        assert_eq!(first, "hello");
        let second = s.scan_until(b",").unwrap();
        assert_eq!(second, "world");
    }

    #[test]
    fn read_line_accepts_all_terminators() {
        let mut s = HeapByteStream::new(Cursor::new(b"a\r\nb\nc\rd".to_vec())).unwrap();
        assert_eq!(s.read_line().unwrap().as_deref(), Some("a"));
        assert_eq!(s.read_line().unwrap().as_deref(), Some("b"));
        assert_eq!(s.read_line().unwrap().as_deref(), Some("c"));
        assert_eq!(s.read_line().unwrap().as_deref(), Some("d"));
        assert_eq!(s.read_line().unwrap(), None);
    }

    #[test]
    fn read_line_on_empty_stream_is_none() {
        let mut s = HeapByteStream::new(Cursor::new(Vec::new())).unwrap();
        assert_eq!(s.read_line().unwrap(), None);
    }
}
