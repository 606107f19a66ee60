//! The OBJ preflight pass: a single forward scan that records each
//! attribute stream's first byte offset, counts faces, and resolves the
//! first `mtllib` directive (`SPEC_FULL.md` §4.3 "Two-pass parsing").

use super::parse::first_token;
use super::resolver::MaterialResolver;
use crate::error::Error;
use crate::formats::mtl::MaterialSet;
use crate::stream::ByteStream;
use crate::Result;

pub struct Preflight {
    pub vertex_first_offset: u64,
    pub texcoord_first_offset: u64,
    pub normal_first_offset: u64,
    pub face_count: u64,
    pub materials: MaterialSet,
}

/// Scan `stream` from its current position through EOF, then leave the
/// cursor at the earlier of the first `mtllib` and first `f` directive so
/// the streaming pass replays any `usemtl` between them.
pub fn run_preflight(stream: &mut dyn ByteStream, resolver: &mut dyn MaterialResolver) -> Result<Preflight> {
    let mut vertex_count = 0u64;
    let mut texcoord_count = 0u64;
    let mut normal_count = 0u64;
    let mut face_count = 0u64;
    let mut vertex_first_offset = 0u64;
    let mut texcoord_first_offset = 0u64;
    let mut normal_first_offset = 0u64;
    let mut material_offset: Option<u64> = None;
    let mut face_first_offset: Option<u64> = None;
    let mut materials = MaterialSet::default();

    loop {
        let line_offset = stream.position();
        let Some(line) = stream.read_line()? else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let directive = first_token(trimmed);
        match directive {
            "v" => {
                if vertex_count == 0 {
                    vertex_first_offset = line_offset;
                }
                vertex_count += 1;
            }
            "vt" => {
                if texcoord_count == 0 {
                    texcoord_first_offset = line_offset;
                }
                texcoord_count += 1;
            }
            "vn" => {
                if normal_count == 0 {
                    normal_first_offset = line_offset;
                }
                normal_count += 1;
            }
            "f" => {
                if face_first_offset.is_none() {
                    face_first_offset = Some(line_offset);
                }
                face_count += 1;
            }
            "mtllib" => {
                if material_offset.is_none() {
                    material_offset = Some(line_offset);
                    let path = trimmed[directive.len()..].trim();
                    if let Some(set) = resolver.resolve(path)? {
                        materials = set;
                    }
                }
            }
            _ => {}
        }
    }

    let Some(face_offset) = face_first_offset else {
        return Err(Error::Malformed("OBJ file has no face directive"));
    };
    let start = match material_offset {
        Some(m) => m.min(face_offset),
        None => face_offset,
    };
    stream.seek(start)?;

    Ok(Preflight {
        vertex_first_offset,
        texcoord_first_offset,
        normal_first_offset,
        face_count,
        materials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::obj::resolver::NullMaterialResolver;
    use crate::stream::HeapByteStream;
    use std::io::Cursor;

    fn preflight(src: &str) -> Result<Preflight> {
        let mut stream = HeapByteStream::new(Cursor::new(src.as_bytes().to_vec())).unwrap();
        run_preflight(&mut stream, &mut NullMaterialResolver)
    }

    #[test]
    fn counts_faces_and_records_first_offsets() {
        let pf = preflight("v 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\nf 1 2 3\n").unwrap();
        assert_eq!(pf.face_count, 2);
        assert_eq!(pf.vertex_first_offset, 0);
    }

    #[test]
    fn no_face_directive_is_malformed() {
        assert!(preflight("v 0 0 0\n").is_err());
    }

    #[test]
    fn cursor_lands_before_first_usemtl_when_material_precedes_faces() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nmtllib x.mtl\nusemtl red\nf 1 2 3\n";
        let mut stream = HeapByteStream::new(Cursor::new(src.as_bytes().to_vec())).unwrap();
        let pf = run_preflight(&mut stream, &mut NullMaterialResolver).unwrap();
        assert_eq!(pf.face_count, 1);
        let line = stream.read_line().unwrap().unwrap();
        assert_eq!(line.trim(), "mtllib x.mtl");
    }
}
