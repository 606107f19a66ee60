//! Re-encodes any chunk source into the custom binary V2 container
//! (`SPEC_FULL.md` §4.6).
//!
//! [`Transcoder`] installs a [`BinaryListener`] (via [`Transcoder::new`]) on
//! the source loader before it's loaded, so every texture payload the source
//! exposes is captured to a temp file as the source's own `load()` runs.
//! [`Transcoder::run`] then relays those temp files into the
//! [`BinaryWriter`] before draining the source's chunk iterator, so texture
//! bytes always precede any chunk that references them.
//!
//! Text-format sources (OBJ, PLY) don't carry embedded texture payloads —
//! their materials only ever hold a filename — so a [`Transcoder`] fed one
//! of those transcodes geometry correctly but never has anything to relay;
//! the texture path is exercised when the source is a
//! [`BinaryLoader`](crate::formats::binary::BinaryLoader).

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use crate::formats::binary::BinaryWriter;
use crate::listener::BinaryListener;
use crate::model::DataChunk;
use crate::Result;

struct PendingTexture {
    tex_id: i32,
    width: u32,
    height: u32,
    path: PathBuf,
}

/// Installed on the source loader; captures each texture payload to a
/// uniquely-named temp file and records it for [`Transcoder::run`] to pick up.
pub struct TranscoderListener {
    pending: Rc<RefCell<Vec<PendingTexture>>>,
    counter: Cell<u32>,
}

impl BinaryListener for TranscoderListener {
    fn texture_received(&mut self, tex_id: i32, _width: u32, _height: u32) -> Option<PathBuf> {
        let n = self.counter.get();
        self.counter.set(n + 1);
        let mut path = std::env::temp_dir();
        path.push(format!("meshkit-transcode-{:?}-{tex_id}-{n}", std::thread::current().id()));
        Some(path)
    }

    fn texture_data_available(&mut self, path: &std::path::Path, tex_id: i32, width: u32, height: u32) -> bool {
        self.pending.borrow_mut().push(PendingTexture { tex_id, width, height, path: path.to_path_buf() });
        true
    }
}

/// Forwards a chunk source's textures and geometry into a [`BinaryWriter`].
pub struct Transcoder {
    pending: Rc<RefCell<Vec<PendingTexture>>>,
}

impl Transcoder {
    /// Build a transcoder and the listener it expects to be registered on
    /// the source loader before that loader's `load()` is called.
    pub fn new() -> (Self, TranscoderListener) {
        let pending = Rc::new(RefCell::new(Vec::new()));
        let listener = TranscoderListener { pending: pending.clone(), counter: Cell::new(0) };
        (Self { pending }, listener)
    }

    /// Relay every texture captured by the installed listener, then drain
    /// `source` into `writer`, forwarding each chunk in order.
    ///
    /// `source` is any chunk iterator already returned by a loader's
    /// `load()` — consuming it here releases that loader's reentrancy lock
    /// at exhaustion, same as iterating it directly would.
    pub fn run(self, source: impl Iterator<Item = Result<DataChunk>>, mut writer: BinaryWriter) -> Result<()> {
        for texture in self.pending.borrow_mut().drain(..) {
            let bytes = std::fs::read(&texture.path)?;
            writer.write_texture(texture.tex_id, texture.width, texture.height, &bytes)?;
            let _ = std::fs::remove_file(&texture.path);
        }

        for chunk in source {
            writer.write_chunk(&chunk?)?;
        }

        writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::binary::{BinaryLoader, BinaryWriter};
    use crate::model::BoundingBox;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("meshkit-transcode-test-{:?}-{name}", std::thread::current().id()));
        path
    }

    #[test]
    fn relays_a_texture_before_forwarding_chunks() {
        let src_path = temp_path("source");
        let mut src_writer = BinaryWriter::create(&src_path).unwrap();
        src_writer.write_texture(1, 2, 2, &[9, 9, 9, 9]).unwrap();
        src_writer
            .write_chunk(&DataChunk {
                coords: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                normals: vec![],
                texcoords: vec![],
                colors: vec![],
                color_components: 0,
                indices: vec![0, 1, 2],
                bbox: Some(BoundingBox { min: [0.0; 3], max: [1.0, 1.0, 0.0] }),
                material: None,
            })
            .unwrap();
        src_writer.finish().unwrap();

        let (transcoder, listener) = Transcoder::new();
        let mut source = BinaryLoader::open(&src_path).unwrap();
        source.set_binary_listener(Box::new(listener)).unwrap();
        let chunks = source.load().unwrap();

        let dest_path = temp_path("dest");
        let dest_writer = BinaryWriter::create(&dest_path).unwrap();
        transcoder.run(chunks, dest_writer).unwrap();

        let bytes = std::fs::read(&dest_path).unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], 0x01);
    }

    #[test]
    fn a_source_with_no_textures_still_forwards_chunks() {
        let src_path = temp_path("textureless_source");
        let mut src_writer = BinaryWriter::create(&src_path).unwrap();
        src_writer
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
        src_writer.finish().unwrap();

        let (transcoder, _listener) = Transcoder::new();
        let mut source = BinaryLoader::open(&src_path).unwrap();
        let chunks = source.load().unwrap();

        let dest_path = temp_path("textureless_dest");
        let dest_writer = BinaryWriter::create(&dest_path).unwrap();
        transcoder.run(chunks, dest_writer).unwrap();
        assert!(std::fs::read(&dest_path).unwrap().len() > 2);
    }
}
