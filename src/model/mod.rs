//! The shared geometry model every loader converges on: [`DataChunk`],
//! [`Material`], [`Texture`], and the [`ChunkBuilder`] parsers use to
//! assemble chunks incrementally.

pub mod material;

pub use material::{Illumination, Material, Rgb, Texture};

use std::sync::Arc;

/// An axis-aligned bounding box in model space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    /// A box enclosing exactly the single point `p`.
    pub fn from_point(p: [f32; 3]) -> Self {
        Self { min: p, max: p }
    }

    /// Grow this box so it also encloses `p`.
    pub fn extend(&mut self, p: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    /// The smallest box enclosing both `self` and `other`.
    pub fn union(self, other: Self) -> Self {
        let mut b = self;
        b.extend(other.min);
        b.extend(other.max);
        b
    }

    /// Whether `p` lies within this box (inclusive on all faces).
    pub fn contains(&self, p: [f32; 3]) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }
}

/// A bounded batch of renderable geometry: the unit every loader emits.
///
/// Invariants (see `SPEC_FULL.md` §3): `coords`/`normals` are flat 3-tuples,
/// `texcoords` are flat 2-tuples, all sized by the same vertex count `V`;
/// `indices.len()` is a multiple of 3 and every index is `< V`; `bbox`, when
/// present, encloses every vertex in `coords`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataChunk {
    pub coords: Vec<f32>,
    pub normals: Vec<f32>,
    pub texcoords: Vec<f32>,
    pub colors: Vec<u8>,
    /// Components per color (3 or 4); meaningless when `colors` is empty.
    pub color_components: u8,
    pub indices: Vec<u32>,
    pub bbox: Option<BoundingBox>,
    pub material: Option<Arc<Material>>,
}

impl DataChunk {
    /// Number of vertices, derived from `coords`.
    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 3
    }

    /// Check the structural invariants from `SPEC_FULL.md` §3/§8.
    ///
    /// Intended for tests and debug assertions, not the hot loading path.
    pub fn check_invariants(&self) -> bool {
        let v = self.vertex_count();
        if self.coords.len() != v * 3 {
            return false;
        }
        if !self.normals.is_empty() && self.normals.len() != v * 3 {
            return false;
        }
        if !self.texcoords.is_empty() && self.texcoords.len() != v * 2 {
            return false;
        }
        if self.indices.len() % 3 != 0 {
            return false;
        }
        if self.indices.iter().any(|&i| i as usize >= v) {
            return false;
        }
        if let Some(bbox) = self.bbox {
            for chunk in self.coords.chunks_exact(3) {
                if !bbox.contains([chunk[0], chunk[1], chunk[2]]) {
                    return false;
                }
            }
        }
        true
    }
}

/// Incrementally assembles a [`DataChunk`] up to a fixed vertex capacity.
///
/// Shared by the OBJ and PLY streaming passes so chunk-cut and
/// bounding-box bookkeeping lives in one place.
#[derive(Debug, Default)]
pub struct ChunkBuilder {
    capacity: usize,
    coords: Vec<f32>,
    normals: Vec<f32>,
    texcoords: Vec<f32>,
    colors: Vec<u8>,
    color_components: u8,
    indices: Vec<u32>,
    bbox: Option<BoundingBox>,
    material: Option<Arc<Material>>,
}

impl ChunkBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            coords: Vec::new(),
            normals: Vec::new(),
            texcoords: Vec::new(),
            colors: Vec::new(),
            color_components: 0,
            indices: Vec::new(),
            bbox: None,
            material: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn has_room_for(&self, n: usize) -> bool {
        self.vertex_count() + n <= self.capacity
    }

    pub fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    pub fn set_material(&mut self, material: Arc<Material>) {
        self.material = Some(material);
    }

    /// Append one vertex and its optional attributes; returns its slot index.
    pub fn push_vertex(
        &mut self,
        position: [f32; 3],
        normal: Option<[f32; 3]>,
        texcoord: Option<[f32; 2]>,
        color: Option<&[u8]>,
    ) -> u32 {
        let slot = self.vertex_count() as u32;
        self.coords.extend_from_slice(&position);
        if let Some(n) = normal {
            self.normals.extend_from_slice(&n);
        }
        if let Some(t) = texcoord {
            self.texcoords.extend_from_slice(&t);
        }
        if let Some(c) = color {
            self.color_components = c.len() as u8;
            self.colors.extend_from_slice(c);
        }
        match &mut self.bbox {
            Some(bbox) => bbox.extend(position),
            None => self.bbox = Some(BoundingBox::from_point(position)),
        }
        slot
    }

    pub fn push_index(&mut self, index: u32) {
        self.indices.push(index);
    }

    /// Consume the builder, producing its finished chunk.
    pub fn build(self) -> DataChunk {
        DataChunk {
            coords: self.coords,
            normals: self.normals,
            texcoords: self.texcoords,
            colors: self.colors,
            color_components: self.color_components,
            indices: self.indices,
            bbox: self.bbox,
            material: self.material,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_union_encloses_both() {
        let a = BoundingBox::from_point([0.0, 0.0, 0.0]);
        let b = BoundingBox::from_point([1.0, 2.0, -1.0]);
        let u = a.union(b);
        assert_eq!(u.min, [0.0, 0.0, -1.0]);
        assert_eq!(u.max, [1.0, 2.0, 0.0]);
    }

    #[test]
    fn chunk_builder_tracks_bbox_and_indices() {
        let mut b = ChunkBuilder::new(4);
        let s0 = b.push_vertex([0.0, 0.0, 0.0], None, None, None);
        let s1 = b.push_vertex([1.0, 1.0, 1.0], None, None, None);
        b.push_index(s0);
        b.push_index(s1);
        b.push_index(s0);
        let chunk = b.build();
        assert_eq!(chunk.vertex_count(), 2);
        assert_eq!(chunk.indices, vec![0, 1, 0]);
        assert_eq!(
            chunk.bbox,
            Some(BoundingBox {
                min: [0.0, 0.0, 0.0],
                max: [1.0, 1.0, 1.0]
            })
        );
        assert!(chunk.check_invariants());
    }

    #[test]
    fn has_room_for_respects_capacity() {
        let mut b = ChunkBuilder::new(2);
        assert!(b.has_room_for(2));
        b.push_vertex([0.0, 0.0, 0.0], None, None, None);
        assert!(b.has_room_for(1));
        assert!(!b.has_room_for(2));
    }
}
