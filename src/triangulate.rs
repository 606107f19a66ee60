//! The triangulation primitive contract (`SPEC_FULL.md` §1 "Out of scope").
//!
//! The real triangulation algorithm is treated as an external collaborator:
//! callers that need to handle concave or self-intersecting polygons
//! correctly should supply their own [`Triangulator`]. [`FanTriangulator`]
//! ships as the built-in default so the crate is usable standalone; it
//! handles convex polygons correctly and is what §8's "OBJ triangulation"
//! property is written against.

use crate::error::Error;
use crate::Result;

/// Given a polygon as ordered 3D vertex positions, returns one index triple
/// per produced triangle, each index into the input slice.
pub trait Triangulator {
    fn triangulate(&self, polygon: &[[f32; 3]]) -> Result<Vec<[usize; 3]>>;
}

/// Naive fan triangulation: for vertices `[0, 1, .., n-1]`, emits triangles
/// `(0, i, i+1)` for `i` in `1..n-1`.
///
/// Correct for convex polygons; produces `n - 2` triangles covering the
/// polygon's surface and indexing exactly the original vertices.
#[derive(Clone, Copy, Debug, Default)]
pub struct FanTriangulator;

impl Triangulator for FanTriangulator {
    fn triangulate(&self, polygon: &[[f32; 3]]) -> Result<Vec<[usize; 3]>> {
        if polygon.len() < 3 {
            return Err(Error::Malformed("polygon has fewer than 3 vertices"));
        }
        Ok((1..polygon.len() - 1).map(|i| [0, i, i + 1]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_triangulates_a_quad_into_two_triangles() {
        let quad = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let tris = FanTriangulator.triangulate(&quad).unwrap();
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn fan_triangle_count_matches_n_minus_2() {
        for n in 3..10 {
            let poly: Vec<[f32; 3]> = (0..n).map(|i| [i as f32, 0.0, 0.0]).collect();
            let tris = FanTriangulator.triangulate(&poly).unwrap();
            assert_eq!(tris.len(), n - 2);
            let indices: std::collections::HashSet<usize> =
                tris.iter().flatten().copied().collect();
            assert_eq!(indices, (0..n).collect());
        }
    }

    #[test]
    fn fan_rejects_degenerate_polygon() {
        assert!(FanTriangulator.triangulate(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]).is_err());
    }
}
