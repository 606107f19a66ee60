//! The PLY (Polygon File Format) loader (`SPEC_FULL.md` §4.4).
//!
//! Unlike OBJ, the `vertex` element is fully materialized into a
//! [`VertexTable`] during [`load`](PlyLoader::load) — PLY files don't carry
//! OBJ's "declarations and faces interleaved, arbitrary order" structure, so
//! there is no need for a position cache; the `face` element is read in full
//! too, and [`PlyChunks`] just walks it.

mod chunks;
mod decode;
mod schema;
mod vertex;

pub use chunks::PlyChunks;
pub use schema::{ElementDef, PlyFormat, PlyType, Property, Schema};

use std::path::Path;
use std::rc::Rc;

use self::decode::{decode_row, PlyValue};
use self::schema::parse_header;
use self::vertex::VertexTable;
use crate::error::Error;
use crate::listener::LoadListener;
use crate::loader::{LoaderLock, DEFAULT_ALLOW_DUPLICATE_VERTICES_IN_CHUNK, DEFAULT_MAX_VERTICES_PER_CHUNK};
use crate::stream::{self, ByteStream, DEFAULT_FILE_SIZE_LIMIT_TO_KEEP_IN_MEMORY};
use crate::triangulate::{FanTriangulator, Triangulator};
use crate::Result;

/// Tunables for [`PlyLoader`]; see `SPEC_FULL.md` §2.1 "Configuration".
#[derive(Copy, Clone, Debug)]
pub struct PlyConfig {
    pub max_vertices_per_chunk: usize,
    pub allow_duplicate_vertices_in_chunk: bool,
    pub file_size_limit_to_keep_in_memory: u64,
}

impl Default for PlyConfig {
    fn default() -> Self {
        Self {
            max_vertices_per_chunk: DEFAULT_MAX_VERTICES_PER_CHUNK,
            allow_duplicate_vertices_in_chunk: DEFAULT_ALLOW_DUPLICATE_VERTICES_IN_CHUNK,
            file_size_limit_to_keep_in_memory: DEFAULT_FILE_SIZE_LIMIT_TO_KEEP_IN_MEMORY,
        }
    }
}

/// Constructs a PLY chunk iterator bound to one file.
pub struct PlyLoader {
    config: PlyConfig,
    stream: Option<Box<dyn ByteStream>>,
    lock: LoaderLock,
    load_listener: Option<Box<dyn LoadListener>>,
    triangulator: Rc<dyn Triangulator>,
}

impl PlyLoader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = PlyConfig::default();
        let stream = stream::open(path, config.file_size_limit_to_keep_in_memory)?;
        Ok(Self {
            config,
            stream: Some(stream),
            lock: LoaderLock::new(),
            load_listener: None,
            triangulator: Rc::new(FanTriangulator),
        })
    }

    pub fn set_config(&mut self, config: PlyConfig) -> Result<()> {
        self.check_unlocked()?;
        self.config = config;
        Ok(())
    }

    pub fn set_load_listener(&mut self, listener: Box<dyn LoadListener>) -> Result<()> {
        self.check_unlocked()?;
        self.load_listener = Some(listener);
        Ok(())
    }

    pub fn set_triangulator(&mut self, triangulator: Box<dyn Triangulator>) -> Result<()> {
        self.check_unlocked()?;
        self.triangulator = Rc::from(triangulator);
        Ok(())
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.lock.is_locked() {
            return Err(Error::Locked);
        }
        Ok(())
    }

    /// Parse the header, materialize the `vertex` and `face` elements, and
    /// hand back a chunk iterator. The underlying stream is fully consumed
    /// and closed by the time this returns.
    pub fn load(&mut self) -> Result<PlyChunks> {
        tracing::debug!(max_vertices_per_chunk = self.config.max_vertices_per_chunk, "starting PLY load");
        let guard = self.lock.acquire()?;
        let mut stream = self.stream.take().ok_or(Error::NotReady)?;
        if let Some(listener) = &mut self.load_listener {
            listener.on_load_start();
        }

        let schema = parse_header(stream.as_mut())?;
        let mut vertex_table = None;
        let mut vertex_count = 0usize;
        let mut faces: Vec<Vec<u64>> = Vec::new();

        for element in &schema.elements {
            let mut rows = Vec::with_capacity(element.count as usize);
            for _ in 0..element.count {
                rows.push(decode_row(stream.as_mut(), schema.format, &element.properties)?);
            }
            match element.name.as_str() {
                "vertex" => {
                    vertex_count = rows.len();
                    vertex_table = Some(VertexTable::from_rows(element, &rows)?);
                }
                "face" => faces.extend(extract_faces(element, &rows)?),
                _ => {}
            }
        }

        stream.close()?;

        let vertex_table = vertex_table.ok_or(Error::Malformed("PLY file has no vertex element"))?;
        tracing::debug!(vertex_count, face_count = faces.len(), "PLY body materialized");

        Ok(PlyChunks {
            vertex: vertex_table,
            faces,
            face_cursor: 0,
            config: self.config,
            triangulator: self.triangulator.clone(),
            load_listener: self.load_listener.take(),
            last_progress: 0.0,
            lock: Some(guard),
            finished: false,
            pending_triangles: std::collections::VecDeque::new(),
        })
    }
}

fn extract_faces(element: &schema::ElementDef, rows: &[Vec<PlyValue>]) -> Result<Vec<Vec<u64>>> {
    let list_index = element
        .properties
        .iter()
        .position(|(_, p)| matches!(p, schema::Property::List { .. }))
        .ok_or(Error::Malformed("PLY face element has no list property"))?;
    rows.iter()
        .map(|row| {
            let indices = row[list_index].as_list();
            if indices.len() < 3 {
                return Err(Error::Malformed("PLY face has fewer than 3 indices"));
            }
            Ok(indices.iter().map(|&v| v as u64).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ChunkIterator;
    use std::io::Write;

    fn temp_ply(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("meshkit-ply-test-{:?}-{name}", std::thread::current().id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path
    }

    const ASCII_TRIANGLE: &[u8] = b"ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n";

    #[test]
    fn loads_an_ascii_triangle() {
        let path = temp_ply("triangle", ASCII_TRIANGLE);
        let mut loader = PlyLoader::open(&path).unwrap();
        let mut chunks = loader.load().unwrap();
        let chunk = chunks.next_chunk().unwrap();
        assert_eq!(chunk.vertex_count(), 3);
        assert_eq!(chunk.indices, vec![0, 1, 2]);
        assert!(matches!(chunks.next_chunk(), Err(Error::NotAvailable)));
    }

    #[test]
    fn missing_vertex_element_is_malformed() {
        let header = b"ply\nformat ascii 1.0\nelement face 0\nproperty list uchar int vertex_indices\nend_header\n";
        let path = temp_ply("no_vertex", header);
        let mut loader = PlyLoader::open(&path).unwrap();
        assert!(loader.load().is_err());
    }

    #[test]
    fn config_mutators_fail_while_an_iterator_is_active() {
        let path = temp_ply("locked", ASCII_TRIANGLE);
        let mut loader = PlyLoader::open(&path).unwrap();
        let _chunks = loader.load().unwrap();
        assert!(matches!(loader.set_config(PlyConfig::default()), Err(Error::Locked)));
    }
}
