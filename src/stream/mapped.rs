//! Memory-mapped [`ByteStream`](super::ByteStream), for files small enough to
//! keep mapped for the duration of a load.

use std::fs::File;
use std::io;

use memmap2::MmapMut;

use super::ByteStream;
use crate::Result;

/// A [`ByteStream`] backed by a whole-file memory map.
///
/// Reads are zero-copy slices of the mapping. Writes are bounded by the
/// file's original length — the mapping cannot grow, so writers that don't
/// know their final size ahead of time should use [`super::HeapByteStream`]
/// instead.
pub struct MappedByteStream {
    map: MmapMut,
    pos: u64,
    len: u64,
}

impl MappedByteStream {
    pub fn new(file: &File) -> Result<Self> {
        let len = file.metadata()?.len();
        // SAFETY: the caller owns `file` and this crate's loaders do not
        // modify a file out from under a stream they have open.
        let map = unsafe { MmapMut::map_mut(file)? };
        Ok(Self { map, pos: 0, len })
    }
}

impl ByteStream for MappedByteStream {
    fn position(&self) -> u64 {
        self.pos
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "seek past end of mapping").into());
        }
        self.pos = pos;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.pos as usize;
        let end = start
            .checked_add(buf.len())
            .filter(|&e| e as u64 <= self.len)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of mapping"))?;
        buf.copy_from_slice(&self.map[start..end]);
        self.pos = end as u64;
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let start = self.pos as usize;
        let end = start
            .checked_add(buf.len())
            .filter(|&e| e as u64 <= self.len)
            .ok_or_else(|| io::Error::new(io::ErrorKind::WriteZero, "write past end of mapping"))?;
        self.map[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &[u8]) -> File {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "meshkit-mapped-test-{:?}-{}",
            std::thread::current().id(),
            contents.len()
        ));
        let mut f = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        File::options().read(true).write(true).open(&path).unwrap()
    }

    #[test]
    fn reads_match_written_bytes() {
        let file = temp_file(b"0123456789");
        let mut s = MappedByteStream::new(&file).unwrap();
        assert_eq!(s.len(), 10);
        let bytes = s.read_bytes(5).unwrap();
        assert_eq!(&bytes, b"01234");
        assert_eq!(s.position(), 5);
    }

    #[test]
    fn write_past_end_fails() {
        let file = temp_file(b"ab");
        let mut s = MappedByteStream::new(&file).unwrap();
        assert!(s.write_all(b"abc").is_err());
    }

    #[test]
    fn write_then_seek_back_reads_updated_bytes() {
        let file = temp_file(b"abcdef");
        let mut s = MappedByteStream::new(&file).unwrap();
        s.seek(2).unwrap();
        s.write_all(b"XY").unwrap();
        s.seek(0).unwrap();
        let bytes = s.read_bytes(6).unwrap();
        assert_eq!(&bytes, b"abXYef");
    }
}
