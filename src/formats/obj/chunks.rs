//! The OBJ streaming pass: turns the face stream into [`DataChunk`]s,
//! fetching vertex attributes lazily through the position cache
//! (`SPEC_FULL.md` §4.3).

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use super::cache::{DedupMaps, PositionCache};
use super::parse::{first_token, parse_face_vertex_token, parse_normal_line, parse_texcoord_line, parse_vertex_line};
use super::ObjConfig;
use crate::error::Error;
use crate::formats::mtl::MaterialSet;
use crate::listener::LoadListener;
use crate::loader::{ChunkIterator, LockGuard};
use crate::model::{ChunkBuilder, DataChunk, Material};
use crate::stream::ByteStream;
use crate::triangulate::Triangulator;
use crate::Result;

/// One triangle's worth of already-resolved attributes, queued when a
/// single face's triangulation alone overflows a full, empty chunk.
pub(super) struct PendingVertex {
    position: [f32; 3],
    normal: Option<[f32; 3]>,
    texcoord: Option<[f32; 2]>,
    refs: (u64, Option<u64>, Option<u64>),
}

/// Chunk iterator returned by [`ObjLoader::load`](super::ObjLoader::load).
pub struct ObjChunks {
    pub(super) stream: Box<dyn ByteStream>,
    pub(super) config: ObjConfig,
    pub(super) materials: MaterialSet,
    pub(super) vertex_cache: PositionCache,
    pub(super) texcoord_cache: PositionCache,
    pub(super) normal_cache: PositionCache,
    pub(super) vertex_first_offset: u64,
    pub(super) texcoord_first_offset: u64,
    pub(super) normal_first_offset: u64,
    pub(super) total_faces: u64,
    pub(super) faces_emitted: u64,
    pub(super) triangulator: Rc<dyn Triangulator>,
    pub(super) load_listener: Option<Box<dyn LoadListener>>,
    pub(super) last_progress: f32,
    pub(super) lock: Option<LockGuard>,
    pub(super) finished: bool,
    /// The material bound by the most recent `usemtl`, carried forward
    /// across chunk cuts that aren't themselves a material change (an
    /// overflow cut mid-run of faces sharing one material).
    pub(super) current_material: Option<Arc<Material>>,
    /// Triangles from a face whose triangulation alone exceeds a full
    /// chunk's capacity; drained a triangle at a time across as many
    /// subsequent chunks as it takes.
    pub(super) pending_triangles: VecDeque<[PendingVertex; 3]>,
}

/// Push one triangle's three vertices into `builder`, deduplicating through
/// `dedup` unless `allow_duplicates` is set.
fn push_triangle(builder: &mut ChunkBuilder, dedup: &mut DedupMaps, allow_duplicates: bool, vertices: &[PendingVertex; 3]) {
    for pv in vertices {
        let (v, t, n) = pv.refs;
        let slot = if allow_duplicates {
            builder.push_vertex(pv.position, pv.normal, pv.texcoord, None)
        } else {
            match dedup.find(v, t, n) {
                Some(existing) => existing,
                None => {
                    let s = builder.push_vertex(pv.position, pv.normal, pv.texcoord, None);
                    dedup.record(s, v, t, n);
                    s
                }
            }
        };
        builder.push_index(slot);
    }
}

/// Drain as many queued triangles as fit into `builder`, leaving the rest
/// queued for the next chunk.
fn drain_pending_triangles(
    pending: &mut VecDeque<[PendingVertex; 3]>,
    builder: &mut ChunkBuilder,
    dedup: &mut DedupMaps,
    allow_duplicates: bool,
) {
    while builder.has_room_for(3) {
        let Some(tri) = pending.pop_front() else { break };
        push_triangle(builder, dedup, allow_duplicates, &tri);
    }
}

impl ObjChunks {
    fn fetch_vertex(&mut self, index: u64) -> Result<[f32; 3]> {
        let (offset, idx) = self.vertex_cache.floor(index).map_or((self.vertex_first_offset, 0), |(k, o)| (o, k));
        let line = fetch_by_index(self.stream.as_mut(), &mut self.vertex_cache, offset, idx, index, "v")?;
        parse_vertex_line(&line)
    }

    fn fetch_texcoord(&mut self, index: u64) -> Result<[f32; 2]> {
        let (offset, idx) = self.texcoord_cache.floor(index).map_or((self.texcoord_first_offset, 0), |(k, o)| (o, k));
        let line = fetch_by_index(self.stream.as_mut(), &mut self.texcoord_cache, offset, idx, index, "vt")?;
        parse_texcoord_line(&line)
    }

    fn fetch_normal(&mut self, index: u64) -> Result<[f32; 3]> {
        let (offset, idx) = self.normal_cache.floor(index).map_or((self.normal_first_offset, 0), |(k, o)| (o, k));
        let line = fetch_by_index(self.stream.as_mut(), &mut self.normal_cache, offset, idx, index, "vn")?;
        parse_normal_line(&line)
    }

    fn report_progress(&mut self) {
        if self.total_faces == 0 {
            return;
        }
        let fraction = self.faces_emitted as f32 / self.total_faces as f32;
        if fraction - self.last_progress >= 0.01 || self.faces_emitted == self.total_faces {
            if let Some(listener) = &mut self.load_listener {
                listener.on_progress(fraction);
            }
            self.last_progress = fraction;
        }
    }

    fn finish(&mut self) -> Result<()> {
        if !self.finished {
            if let Some(listener) = &mut self.load_listener {
                listener.on_load_end();
            }
            self.stream.close()?;
            if let Some(lock) = &mut self.lock {
                lock.release();
            }
            self.finished = true;
        }
        Ok(())
    }
}

/// Seek to `start_offset` (the declaration at original index `start_idx`)
/// and read forward, caching every matching declaration, until `target` is
/// reached.
fn fetch_by_index(
    stream: &mut dyn ByteStream,
    cache: &mut PositionCache,
    start_offset: u64,
    start_idx: u64,
    target: u64,
    directive: &str,
) -> Result<String> {
    stream.seek(start_offset)?;
    let mut idx = start_idx;
    loop {
        let line_offset = stream.position();
        let line = stream
            .read_line()?
            .ok_or(Error::Malformed("unexpected EOF while resolving an OBJ attribute"))?;
        let trimmed = line.trim();
        if first_token(trimmed) == directive {
            cache.insert(idx, line_offset);
            if idx == target {
                return Ok(line.to_string());
            }
            idx += 1;
        }
    }
}

impl ChunkIterator for ObjChunks {
    fn next_chunk(&mut self) -> Result<DataChunk> {
        if self.finished || self.faces_emitted >= self.total_faces {
            self.finish()?;
            return Err(Error::NotAvailable);
        }

        let mut builder = ChunkBuilder::new(self.config.max_vertices_per_chunk);
        if let Some(m) = &self.current_material {
            builder.set_material(m.clone());
        }
        let mut dedup = DedupMaps::default();

        // Resume a face whose triangulation alone overflowed the previous
        // chunk before reading any further lines.
        if !self.pending_triangles.is_empty() {
            drain_pending_triangles(
                &mut self.pending_triangles,
                &mut builder,
                &mut dedup,
                self.config.allow_duplicate_vertices_in_chunk,
            );
            if !self.pending_triangles.is_empty() {
                tracing::debug!(vertex_count = builder.vertex_count(), "emitting OBJ chunk");
                return Ok(builder.build());
            }
        }

        loop {
            if self.faces_emitted >= self.total_faces {
                break;
            }
            let line_offset = self.stream.position();
            let Some(line) = self.stream.read_line()? else {
                break;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let directive = first_token(trimmed);
            match directive {
                "usemtl" => {
                    if builder.material().is_none() || builder.is_empty() {
                        let name = trimmed[directive.len()..].trim();
                        if let Some(m) = self.materials.get_by_name(name) {
                            builder.set_material(m.clone());
                            self.current_material = Some(m.clone());
                        }
                    } else {
                        self.stream.seek(line_offset)?;
                        break;
                    }
                }
                "f" => {
                    let tokens: Vec<&str> = trimmed[directive.len()..].split_whitespace().collect();
                    if tokens.len() < 3 {
                        return Err(Error::Malformed("face has fewer than 3 vertices"));
                    }
                    let refs: Vec<(u64, Option<u64>, Option<u64>)> =
                        tokens.iter().map(|t| parse_face_vertex_token(t)).collect::<Result<_>>()?;

                    let mut positions = Vec::with_capacity(refs.len());
                    let mut texcoords = Vec::with_capacity(refs.len());
                    let mut normals = Vec::with_capacity(refs.len());
                    for &(v, t, n) in &refs {
                        positions.push(self.fetch_vertex(v)?);
                        texcoords.push(match t {
                            Some(ti) => Some(self.fetch_texcoord(ti)?),
                            None => None,
                        });
                        normals.push(match n {
                            Some(ni) => Some(self.fetch_normal(ni)?),
                            None => None,
                        });
                    }

                    let triangles: Vec<[usize; 3]> = if refs.len() == 3 {
                        vec![[0, 1, 2]]
                    } else {
                        match self.triangulator.triangulate(&positions) {
                            Ok(t) => t,
                            Err(e) if self.config.continue_on_triangulation_error => {
                                tracing::warn!(error = %e, "skipping face: triangulation failed");
                                self.faces_emitted += 1;
                                self.report_progress();
                                continue;
                            }
                            Err(e) => return Err(e),
                        }
                    };

                    let worst_case_new_slots = 3 * triangles.len();
                    if builder.is_empty() && worst_case_new_slots > self.config.max_vertices_per_chunk {
                        // The face alone overflows a full, empty chunk: queue
                        // its triangles and close chunks off them one at a
                        // time instead of emitting a chunk over capacity.
                        tracing::debug!(triangle_count = triangles.len(), "splitting an oversized face across chunks");
                        for tri in &triangles {
                            self.pending_triangles.push_back(std::array::from_fn(|i| {
                                let local = tri[i];
                                PendingVertex {
                                    position: positions[local],
                                    normal: normals[local],
                                    texcoord: texcoords[local],
                                    refs: refs[local],
                                }
                            }));
                        }
                        self.faces_emitted += 1;
                        self.report_progress();
                        drain_pending_triangles(
                            &mut self.pending_triangles,
                            &mut builder,
                            &mut dedup,
                            self.config.allow_duplicate_vertices_in_chunk,
                        );
                        break;
                    }

                    if !builder.is_empty() && !builder.has_room_for(worst_case_new_slots) {
                        self.stream.seek(line_offset)?;
                        break;
                    }

                    for tri in &triangles {
                        for &local in tri {
                            let (v, t, n) = refs[local];
                            let slot = if self.config.allow_duplicate_vertices_in_chunk {
                                builder.push_vertex(positions[local], normals[local], texcoords[local], None)
                            } else {
                                match dedup.find(v, t, n) {
                                    Some(existing) => existing,
                                    None => {
                                        let s = builder.push_vertex(positions[local], normals[local], texcoords[local], None);
                                        dedup.record(s, v, t, n);
                                        s
                                    }
                                }
                            };
                            builder.push_index(slot);
                        }
                    }

                    self.faces_emitted += 1;
                    self.report_progress();
                }
                "mtllib" => {}
                _ => {}
            }
        }

        if builder.is_empty() {
            self.finish()?;
            return Err(Error::NotAvailable);
        }

        tracing::debug!(vertex_count = builder.vertex_count(), "emitting OBJ chunk");
        let chunk = builder.build();
        if self.faces_emitted >= self.total_faces {
            self.finish()?;
        }
        Ok(chunk)
    }
}

impl Iterator for ObjChunks {
    type Item = Result<DataChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(chunk) => Some(Ok(chunk)),
            Err(Error::NotAvailable) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Drop for ObjChunks {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}
