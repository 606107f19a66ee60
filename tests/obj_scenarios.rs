//! End-to-end OBJ loading scenarios (`SPEC_FULL.md` §8 OBJ-1/2/3).

use meshkit::error::Error;
use meshkit::formats::obj::{ObjConfig, ObjLoader};
use meshkit::loader::ChunkIterator;
use meshkit::model::BoundingBox;

fn temp_obj(name: &str, contents: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("meshkit-obj-scenario-{:?}-{name}.obj", std::thread::current().id()));
    std::fs::write(&path, contents).unwrap();
    path
}

/// OBJ-1: one triangle, one chunk, no material.
#[test]
fn single_triangle_produces_one_chunk() {
    let path = temp_obj("single_triangle", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
    let mut loader = ObjLoader::open(&path).unwrap();
    let mut chunks = loader.load().unwrap();

    let chunk = chunks.next_chunk().unwrap();
    assert_eq!(chunk.vertex_count(), 3);
    assert_eq!(chunk.indices, vec![0, 1, 2]);
    assert_eq!(chunk.bbox, Some(BoundingBox { min: [0.0, 0.0, 0.0], max: [1.0, 1.0, 0.0] }));
    assert!(chunk.material.is_none());
    assert!(matches!(chunks.next_chunk(), Err(Error::NotAvailable)));
}

/// OBJ-2: a quad fan-triangulates into two triangles, six indices, four
/// vertices — declarations all precede the face that references them.
#[test]
fn quad_face_fan_triangulates_into_two_triangles() {
    let path = temp_obj(
        "quad",
        "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3 4\n",
    );
    let mut loader = ObjLoader::open(&path).unwrap();
    let mut chunks = loader.load().unwrap();

    let chunk = chunks.next_chunk().unwrap();
    assert_eq!(chunk.vertex_count(), 4);
    assert_eq!(chunk.indices.len(), 6);
    assert!(matches!(chunks.next_chunk(), Err(Error::NotAvailable)));
}

/// OBJ-3: 65,535 unique vertices split across many disjoint triangular
/// faces (a chunk cut happens between faces, never inside one) forces at
/// least two chunk cuts; every declared vertex is accounted for exactly
/// once and the per-chunk bounding boxes union to the whole.
#[test]
fn oversized_vertex_count_splits_into_multiple_chunks() {
    const TRIANGLES: usize = 21_845;
    const N: usize = TRIANGLES * 3;
    let mut obj = String::new();
    for i in 0..N {
        obj.push_str(&format!("v {} 0 0\n", i as f32));
    }
    for t in 0..TRIANGLES {
        let base = t * 3 + 1;
        obj.push_str(&format!("f {} {} {}\n", base, base + 1, base + 2));
    }

    let path = temp_obj("oversized", &obj);
    let mut loader = ObjLoader::open(&path).unwrap();
    loader.set_config(ObjConfig { max_vertices_per_chunk: 1000, ..ObjConfig::default() }).unwrap();
    let mut chunks = loader.load().unwrap();

    let mut chunk_count = 0;
    let mut total_vertices = 0usize;
    let mut union: Option<BoundingBox> = None;
    loop {
        match chunks.next_chunk() {
            Ok(chunk) => {
                chunk_count += 1;
                total_vertices += chunk.vertex_count();
                if let Some(bbox) = chunk.bbox {
                    union = Some(match union {
                        Some(u) => u.union(bbox),
                        None => bbox,
                    });
                }
            }
            Err(Error::NotAvailable) => break,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert!(chunk_count >= 2, "expected at least 2 chunks, got {chunk_count}");
    assert_eq!(total_vertices, N);
    let union = union.unwrap();
    assert_eq!(union.min, [0.0, 0.0, 0.0]);
    assert_eq!(union.max, [(N - 1) as f32, 0.0, 0.0]);
}
