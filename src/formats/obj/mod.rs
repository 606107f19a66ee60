//! The Wavefront OBJ loader (`SPEC_FULL.md` §4.3).
//!
//! [`ObjLoader::open`] binds a path, runs a preflight pass on [`load`](ObjLoader::load)
//! to locate each attribute stream and resolve a referenced `mtllib`, then
//! hands back an [`ObjChunks`] iterator that streams faces into
//! [`DataChunk`](crate::model::DataChunk)s.

mod cache;
mod chunks;
mod parse;
mod preflight;
mod resolver;

pub use chunks::ObjChunks;
pub use resolver::{DefaultMaterialResolver, MaterialResolver, NullMaterialResolver};

use std::path::{Path, PathBuf};
use std::rc::Rc;

use self::cache::PositionCache;
use self::preflight::run_preflight;
use crate::error::Error;
use crate::listener::LoadListener;
use crate::loader::{
    LoaderLock, DEFAULT_ALLOW_DUPLICATE_VERTICES_IN_CHUNK, DEFAULT_CONTINUE_ON_TRIANGULATION_ERROR,
    DEFAULT_MAX_CACHED_POSITIONS, DEFAULT_MAX_VERTICES_PER_CHUNK,
};
use crate::stream::{self, ByteStream, DEFAULT_FILE_SIZE_LIMIT_TO_KEEP_IN_MEMORY};
use crate::triangulate::{FanTriangulator, Triangulator};
use crate::Result;

/// Tunables for [`ObjLoader`]; see `SPEC_FULL.md` §2.1 "Configuration".
#[derive(Copy, Clone, Debug)]
pub struct ObjConfig {
    /// Vertices are flushed into a new chunk once this many would be exceeded.
    pub max_vertices_per_chunk: usize,
    /// Skip cross-face vertex deduplication within a chunk.
    pub allow_duplicate_vertices_in_chunk: bool,
    /// Bound on the position cache, per attribute stream.
    pub max_cached_positions: usize,
    /// Skip (rather than fail) a face whose triangulation is rejected.
    pub continue_on_triangulation_error: bool,
    /// Below this file size, the OBJ text is memory-mapped rather than
    /// streamed through a heap buffer.
    pub file_size_limit_to_keep_in_memory: u64,
}

impl Default for ObjConfig {
    fn default() -> Self {
        Self {
            max_vertices_per_chunk: DEFAULT_MAX_VERTICES_PER_CHUNK,
            allow_duplicate_vertices_in_chunk: DEFAULT_ALLOW_DUPLICATE_VERTICES_IN_CHUNK,
            max_cached_positions: DEFAULT_MAX_CACHED_POSITIONS,
            continue_on_triangulation_error: DEFAULT_CONTINUE_ON_TRIANGULATION_ERROR,
            file_size_limit_to_keep_in_memory: DEFAULT_FILE_SIZE_LIMIT_TO_KEEP_IN_MEMORY,
        }
    }
}

/// Constructs a streaming OBJ chunk iterator bound to one file.
pub struct ObjLoader {
    config: ObjConfig,
    stream: Option<Box<dyn ByteStream>>,
    lock: LoaderLock,
    load_listener: Option<Box<dyn LoadListener>>,
    material_resolver: Box<dyn MaterialResolver>,
    triangulator: Rc<dyn Triangulator>,
}

impl ObjLoader {
    /// Open `path`, installing a [`DefaultMaterialResolver`] rooted at its
    /// parent directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = ObjConfig::default();
        let stream = stream::open(path, config.file_size_limit_to_keep_in_memory)?;
        let base_dir: PathBuf = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self {
            config,
            stream: Some(stream),
            lock: LoaderLock::new(),
            load_listener: None,
            material_resolver: Box::new(DefaultMaterialResolver::new(base_dir)),
            triangulator: Rc::new(FanTriangulator),
        })
    }

    pub fn set_config(&mut self, config: ObjConfig) -> Result<()> {
        self.check_unlocked()?;
        self.config = config;
        Ok(())
    }

    pub fn set_load_listener(&mut self, listener: Box<dyn LoadListener>) -> Result<()> {
        self.check_unlocked()?;
        self.load_listener = Some(listener);
        Ok(())
    }

    pub fn set_material_resolver(&mut self, resolver: Box<dyn MaterialResolver>) -> Result<()> {
        self.check_unlocked()?;
        self.material_resolver = resolver;
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

    /// Run the preflight pass and hand back a chunk iterator. Fails with
    /// [`Error::Locked`] if a previous iterator from this loader is still
    /// alive, and with [`Error::NotReady`] if called more than once.
    pub fn load(&mut self) -> Result<ObjChunks> {
        tracing::debug!(max_vertices_per_chunk = self.config.max_vertices_per_chunk, "starting OBJ load");
        let guard = self.lock.acquire()?;
        let mut stream = self.stream.take().ok_or(Error::NotReady)?;
        if let Some(listener) = &mut self.load_listener {
            listener.on_load_start();
        }
        let preflight = run_preflight(stream.as_mut(), self.material_resolver.as_mut())?;
        tracing::debug!(face_count = preflight.face_count, "OBJ preflight complete");
        Ok(ObjChunks {
            stream,
            config: self.config,
            materials: preflight.materials,
            vertex_cache: PositionCache::new(self.config.max_cached_positions),
            texcoord_cache: PositionCache::new(self.config.max_cached_positions),
            normal_cache: PositionCache::new(self.config.max_cached_positions),
            vertex_first_offset: preflight.vertex_first_offset,
            texcoord_first_offset: preflight.texcoord_first_offset,
            normal_first_offset: preflight.normal_first_offset,
            total_faces: preflight.face_count,
            faces_emitted: 0,
            triangulator: self.triangulator.clone(),
            load_listener: self.load_listener.take(),
            last_progress: 0.0,
            lock: Some(guard),
            finished: false,
            current_material: None,
            pending_triangles: std::collections::VecDeque::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ChunkIterator;
    use std::io::Write;

    fn temp_obj(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("meshkit-obj-test-{:?}-{name}", std::thread::current().id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_a_single_triangle() {
        let path = temp_obj("triangle", "v 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\n");
        let mut loader = ObjLoader::open(&path).unwrap();
        let mut chunks = loader.load().unwrap();
        let chunk = chunks.next_chunk().unwrap();
        assert_eq!(chunk.vertex_count(), 3);
        assert_eq!(chunk.indices, vec![0, 1, 2]);
        assert!(matches!(chunks.next_chunk(), Err(Error::NotAvailable)));
    }

    #[test]
    fn quad_is_triangulated_by_the_default_fan_triangulator() {
        let path = temp_obj(
            "quad",
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        );
        let mut loader = ObjLoader::open(&path).unwrap();
        let mut chunks = loader.load().unwrap();
        let chunk = chunks.next_chunk().unwrap();
        assert_eq!(chunk.vertex_count(), 4);
        assert_eq!(chunk.indices.len(), 6);
    }

    #[test]
    fn tiny_chunk_capacity_splits_faces_across_chunks() {
        let path = temp_obj(
            "split",
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n",
        );
        let mut loader = ObjLoader::open(&path).unwrap();
        loader
            .set_config(ObjConfig {
                max_vertices_per_chunk: 3,
                allow_duplicate_vertices_in_chunk: true,
                ..ObjConfig::default()
            })
            .unwrap();
        let mut chunks = loader.load().unwrap();
        let first = chunks.next_chunk().unwrap();
        assert_eq!(first.vertex_count(), 3);
        let second = chunks.next_chunk().unwrap();
        assert_eq!(second.vertex_count(), 3);
        assert!(matches!(chunks.next_chunk(), Err(Error::NotAvailable)));
    }

    #[test]
    fn deduplication_reuses_slots_across_faces() {
        let path = temp_obj(
            "dedup",
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n",
        );
        let mut loader = ObjLoader::open(&path).unwrap();
        loader
            .set_config(ObjConfig {
                allow_duplicate_vertices_in_chunk: false,
                ..ObjConfig::default()
            })
            .unwrap();
        let mut chunks = loader.load().unwrap();
        let chunk = chunks.next_chunk().unwrap();
        assert_eq!(chunk.vertex_count(), 4);
        assert_eq!(chunk.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn usemtl_binds_the_material_from_the_sibling_mtl_file() {
        let obj_path = temp_obj(
            "with_mtl",
            "mtllib with_mtl.mtl.ref\nusemtl red\nv 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\n",
        );
        let mtl_path = obj_path.with_extension("mtl.ref");
        std::fs::write(&mtl_path, "newmtl red\nKd 1 0 0\n").unwrap();
        // Rewrite the OBJ to reference the actual sibling filename.
        std::fs::write(
            &obj_path,
            format!(
                "mtllib {}\nusemtl red\nv 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\n",
                mtl_path.file_name().unwrap().to_string_lossy()
            ),
        )
        .unwrap();

        let mut loader = ObjLoader::open(&obj_path).unwrap();
        let mut chunks = loader.load().unwrap();
        let chunk = chunks.next_chunk().unwrap();
        let material = chunk.material.unwrap();
        assert_eq!(material.diffuse, Some((255, 0, 0)));
    }

    #[test]
    fn missing_face_directive_is_malformed() {
        let path = temp_obj("no_faces", "v 0 0 0\nv 1 0 0\nv 1 1 0\n");
        let mut loader = ObjLoader::open(&path).unwrap();
        assert!(matches!(loader.load(), Err(Error::Malformed(_))));
    }

    #[test]
    fn config_mutators_fail_while_an_iterator_is_active() {
        let path = temp_obj("locked", "v 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\n");
        let mut loader = ObjLoader::open(&path).unwrap();
        let _chunks = loader.load().unwrap();
        assert!(matches!(loader.set_config(ObjConfig::default()), Err(Error::Locked)));
    }
}
