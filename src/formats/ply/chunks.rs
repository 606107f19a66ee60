//! The PLY streaming pass: turns the materialized face list into
//! [`DataChunk`]s (`SPEC_FULL.md` §4.4 "Chunking").

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use super::vertex::VertexTable;
use super::PlyConfig;
use crate::error::Error;
use crate::listener::LoadListener;
use crate::loader::{ChunkIterator, LockGuard};
use crate::model::{ChunkBuilder, DataChunk};
use crate::triangulate::Triangulator;
use crate::Result;

pub struct PlyChunks {
    pub(super) vertex: VertexTable,
    pub(super) faces: Vec<Vec<u64>>,
    pub(super) face_cursor: usize,
    pub(super) config: PlyConfig,
    pub(super) triangulator: Rc<dyn Triangulator>,
    pub(super) load_listener: Option<Box<dyn LoadListener>>,
    pub(super) last_progress: f32,
    pub(super) lock: Option<LockGuard>,
    pub(super) finished: bool,
    /// Triangles from a face whose triangulation alone exceeds a full
    /// chunk's capacity, referenced by vertex index; drained a triangle at a
    /// time across as many subsequent chunks as it takes.
    pub(super) pending_triangles: VecDeque<[u64; 3]>,
}

/// Push one triangle's three vertices (by original vertex index) into
/// `builder`, deduplicating through `dedup` unless `allow_duplicates` is set.
fn push_triangle(
    vertex: &VertexTable,
    builder: &mut ChunkBuilder,
    dedup: &mut HashMap<u64, u32>,
    allow_duplicates: bool,
    tri: [u64; 3],
) -> Result<()> {
    for vi in tri {
        let slot = if allow_duplicates {
            builder.push_vertex(vertex.position(vi)?, vertex.normal(vi), vertex.texcoord(vi), vertex.color(vi).as_deref())
        } else {
            match dedup.get(&vi) {
                Some(&existing) => existing,
                None => {
                    let s = builder.push_vertex(vertex.position(vi)?, vertex.normal(vi), vertex.texcoord(vi), vertex.color(vi).as_deref());
                    dedup.insert(vi, s);
                    s
                }
            }
        };
        builder.push_index(slot);
    }
    Ok(())
}

/// Drain as many queued triangles as fit into `builder`, leaving the rest
/// queued for the next chunk.
fn drain_pending_triangles(
    vertex: &VertexTable,
    pending: &mut VecDeque<[u64; 3]>,
    builder: &mut ChunkBuilder,
    dedup: &mut HashMap<u64, u32>,
    allow_duplicates: bool,
) -> Result<()> {
    while builder.has_room_for(3) {
        let Some(tri) = pending.pop_front() else { break };
        push_triangle(vertex, builder, dedup, allow_duplicates, tri)?;
    }
    Ok(())
}

impl PlyChunks {
    fn report_progress(&mut self) {
        if self.faces.is_empty() {
            return;
        }
        let fraction = self.face_cursor as f32 / self.faces.len() as f32;
        if fraction - self.last_progress >= 0.01 || self.face_cursor == self.faces.len() {
            if let Some(listener) = &mut self.load_listener {
                listener.on_progress(fraction);
            }
            self.last_progress = fraction;
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            if let Some(listener) = &mut self.load_listener {
                listener.on_load_end();
            }
            if let Some(lock) = &mut self.lock {
                lock.release();
            }
            self.finished = true;
        }
    }
}

impl ChunkIterator for PlyChunks {
    fn next_chunk(&mut self) -> Result<DataChunk> {
        if self.finished || self.face_cursor >= self.faces.len() {
            self.finish();
            return Err(Error::NotAvailable);
        }

        let mut builder = ChunkBuilder::new(self.config.max_vertices_per_chunk);
        let mut dedup: HashMap<u64, u32> = HashMap::new();

        // Resume a face whose triangulation alone overflowed the previous
        // chunk before reading any further faces.
        if !self.pending_triangles.is_empty() {
            drain_pending_triangles(
                &self.vertex,
                &mut self.pending_triangles,
                &mut builder,
                &mut dedup,
                self.config.allow_duplicate_vertices_in_chunk,
            )?;
            if !self.pending_triangles.is_empty() {
                tracing::debug!(vertex_count = builder.vertex_count(), "emitting PLY chunk");
                return Ok(builder.build());
            }
        }

        while self.face_cursor < self.faces.len() {
            let face = &self.faces[self.face_cursor];
            if face.len() < 3 {
                return Err(Error::Malformed("PLY face has fewer than 3 indices"));
            }
            let positions: Vec<[f32; 3]> = face.iter().map(|&i| self.vertex.position(i)).collect::<Result<_>>()?;
            let triangles: Vec<[usize; 3]> = if face.len() == 3 {
                vec![[0, 1, 2]]
            } else {
                self.triangulator.triangulate(&positions)?
            };

            let worst_case_new_slots = 3 * triangles.len();
            if builder.is_empty() && worst_case_new_slots > self.config.max_vertices_per_chunk {
                // The face alone overflows a full, empty chunk: queue its
                // triangles and close chunks off them one at a time instead
                // of emitting a chunk over capacity.
                tracing::debug!(triangle_count = triangles.len(), "splitting an oversized PLY face across chunks");
                for tri in &triangles {
                    self.pending_triangles.push_back([face[tri[0]], face[tri[1]], face[tri[2]]]);
                }
                self.face_cursor += 1;
                self.report_progress();
                drain_pending_triangles(
                    &self.vertex,
                    &mut self.pending_triangles,
                    &mut builder,
                    &mut dedup,
                    self.config.allow_duplicate_vertices_in_chunk,
                )?;
                break;
            }

            if !builder.is_empty() && !builder.has_room_for(worst_case_new_slots) {
                break;
            }

            for tri in &triangles {
                for &local in tri {
                    let vi = face[local];
                    let slot = if self.config.allow_duplicate_vertices_in_chunk {
                        builder.push_vertex(
                            self.vertex.position(vi)?,
                            self.vertex.normal(vi),
                            self.vertex.texcoord(vi),
                            self.vertex.color(vi).as_deref(),
                        )
                    } else {
                        match dedup.get(&vi) {
                            Some(&existing) => existing,
                            None => {
                                let s = builder.push_vertex(
                                    self.vertex.position(vi)?,
                                    self.vertex.normal(vi),
                                    self.vertex.texcoord(vi),
                                    self.vertex.color(vi).as_deref(),
                                );
                                dedup.insert(vi, s);
                                s
                            }
                        }
                    };
                    builder.push_index(slot);
                }
            }

            self.face_cursor += 1;
            self.report_progress();
        }

        if builder.is_empty() {
            self.finish();
            return Err(Error::NotAvailable);
        }

        tracing::debug!(vertex_count = builder.vertex_count(), "emitting PLY chunk");
        let chunk = builder.build();
        if self.face_cursor >= self.faces.len() {
            self.finish();
        }
        Ok(chunk)
    }
}

impl Iterator for PlyChunks {
    type Item = Result<DataChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(chunk) => Some(Ok(chunk)),
            Err(Error::NotAvailable) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Drop for PlyChunks {
    fn drop(&mut self) {
        self.finish();
    }
}
