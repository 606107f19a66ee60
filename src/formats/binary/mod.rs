//! The custom binary V2 mesh container: a loader/writer pair for a compact,
//! already-chunked wire format (`SPEC_FULL.md` §4.5).
//!
//! Unlike OBJ and PLY there is no polygon data to triangulate or vertices to
//! deduplicate — a V2 file stores [`DataChunk`](crate::model::DataChunk)s
//! verbatim, so [`BinaryLoader`] is a thin framing/validation layer over
//! [`ByteStream`].

mod reader;
mod writer;

pub use reader::BinaryChunks;
pub use writer::BinaryWriter;

use std::path::Path;

use self::reader::read_prologue;
use crate::error::Error;
use crate::listener::{BinaryListener, LoadListener};
use crate::loader::LoaderLock;
use crate::stream::{self, ByteStream, DEFAULT_FILE_SIZE_LIMIT_TO_KEEP_IN_MEMORY};
use crate::Result;

/// Tunables for [`BinaryLoader`]; see `SPEC_FULL.md` §2.1 "Configuration".
///
/// The V2 format has no notion of re-chunking or vertex dedup on read — a
/// file's chunks are already final — so this carries only the option that
/// meaningfully applies to this loader.
#[derive(Copy, Clone, Debug)]
pub struct BinaryConfig {
    pub file_size_limit_to_keep_in_memory: u64,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self { file_size_limit_to_keep_in_memory: DEFAULT_FILE_SIZE_LIMIT_TO_KEEP_IN_MEMORY }
    }
}

/// Reads a V2 container: the texture-record prologue, then a [`BinaryChunks`]
/// iterator over the chunk records that follow.
pub struct BinaryLoader {
    config: BinaryConfig,
    stream: Option<Box<dyn ByteStream>>,
    lock: LoaderLock,
    load_listener: Option<Box<dyn LoadListener>>,
    binary_listener: Option<Box<dyn BinaryListener>>,
}

impl BinaryLoader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = BinaryConfig::default();
        let stream = stream::open(path, config.file_size_limit_to_keep_in_memory)?;
        Ok(Self {
            config,
            stream: Some(stream),
            lock: LoaderLock::new(),
            load_listener: None,
            binary_listener: None,
        })
    }

    pub fn set_config(&mut self, config: BinaryConfig) -> Result<()> {
        self.check_unlocked()?;
        self.config = config;
        Ok(())
    }

    pub fn set_load_listener(&mut self, listener: Box<dyn LoadListener>) -> Result<()> {
        self.check_unlocked()?;
        self.load_listener = Some(listener);
        Ok(())
    }

    /// Register the callback that receives embedded texture payloads as the
    /// prologue is read; see [`BinaryListener`].
    pub fn set_binary_listener(&mut self, listener: Box<dyn BinaryListener>) -> Result<()> {
        self.check_unlocked()?;
        self.binary_listener = Some(listener);
        Ok(())
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.lock.is_locked() {
            return Err(Error::Locked);
        }
        Ok(())
    }

    /// Validate the version byte, relay every texture record through the
    /// registered [`BinaryListener`], and hand back a chunk iterator
    /// positioned at the first chunk.
    pub fn load(&mut self) -> Result<BinaryChunks> {
        tracing::debug!("starting binary V2 load");
        let guard = self.lock.acquire()?;
        let mut stream = self.stream.take().ok_or(Error::NotReady)?;
        if let Some(listener) = &mut self.load_listener {
            listener.on_load_start();
        }

        read_prologue(stream.as_mut(), self.binary_listener.as_deref_mut())?;

        Ok(BinaryChunks {
            stream,
            load_listener: self.load_listener.take(),
            lock: Some(guard),
            finished: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ChunkIterator;
    use crate::model::DataChunk;
    use std::io::Write;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("meshkit-binary-test-{:?}-{name}", std::thread::current().id()));
        path
    }

    fn write_raw(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = temp_path(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn rejects_an_unsupported_version_byte() {
        let path = write_raw("bad_version", &[1, 0x00]);
        let mut loader = BinaryLoader::open(&path).unwrap();
        assert!(matches!(loader.load(), Err(Error::Malformed(_))));
    }

    #[test]
    fn a_corrupted_chunk_size_is_malformed() {
        let path = temp_path("corrupt");
        let mut writer = crate::formats::binary::BinaryWriter::create(&path).unwrap();
        writer
            .write_chunk(&DataChunk {
                coords: vec![0.0; 3],
                normals: vec![],
                texcoords: vec![],
                colors: vec![],
                color_components: 0,
                indices: vec![],
                bbox: None,
                material: None,
            })
            .unwrap();
        writer.finish().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        // The chunk's size field sits right after the version byte and the
        // no-more-textures marker; push it far past the remaining file length.
        bytes[2] = 0x7f;
        std::fs::write(&path, &bytes).unwrap();

        let mut loader = BinaryLoader::open(&path).unwrap();
        let mut chunks = loader.load().unwrap();
        assert!(matches!(chunks.next_chunk(), Err(Error::Malformed(_))));
    }

    #[test]
    fn config_mutators_fail_while_an_iterator_is_active() {
        let path = write_raw("locked", &[2, 0x00]);
        let mut loader = BinaryLoader::open(&path).unwrap();
        let _chunks = loader.load().unwrap();
        assert!(matches!(loader.set_config(BinaryConfig::default()), Err(Error::Locked)));
    }
}
