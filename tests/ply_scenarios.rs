//! End-to-end PLY loading scenario (`SPEC_FULL.md` §8 PLY-1).

use meshkit::error::Error;
use meshkit::formats::ply::PlyLoader;
use meshkit::loader::ChunkIterator;
use meshkit::model::BoundingBox;

fn temp_ply(name: &str, contents: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("meshkit-ply-scenario-{:?}-{name}.ply", std::thread::current().id()));
    std::fs::write(&path, contents).unwrap();
    path
}

/// PLY-1: an ASCII triangle mirrors OBJ-1's result exactly.
#[test]
fn ascii_triangle_matches_obj_single_triangle() {
    let contents = "ply\nformat ascii 1.0\n\
         element vertex 3\nproperty float x\nproperty float y\nproperty float z\n\
         element face 1\nproperty list uchar int vertex_indices\n\
         end_header\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n";
    let path = temp_ply("triangle", contents);
    let mut loader = PlyLoader::open(&path).unwrap();
    let mut chunks = loader.load().unwrap();

    let chunk = chunks.next_chunk().unwrap();
    assert_eq!(chunk.vertex_count(), 3);
    assert_eq!(chunk.indices, vec![0, 1, 2]);
    assert_eq!(chunk.bbox, Some(BoundingBox { min: [0.0, 0.0, 0.0], max: [1.0, 1.0, 0.0] }));
    assert!(chunk.material.is_none());
    assert!(matches!(chunks.next_chunk(), Err(Error::NotAvailable)));
}
