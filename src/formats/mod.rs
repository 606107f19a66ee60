//! Parsers and writers for the mesh formats this crate understands.
//!
//! Each submodule targets one file format; all of them converge on the same
//! [`crate::model::DataChunk`] output and follow the same loader shape:
//! `open()` attaches a [`crate::stream::ByteStream`], `load()` consumes it
//! and returns a [`crate::loader::ChunkIterator`] that streams chunks one at
//! a time.
//!
//! ## Format overview
//!
//! | Module     | Format            | Description |
//! |------------|-------------------|-------------|
//! | [`obj`]    | Wavefront OBJ     | Two-pass streaming loader over a position-cached text format |
//! | [`mtl`]    | Wavefront MTL     | Material library referenced by OBJ's `mtllib`/`usemtl` directives |
//! | [`ply`]    | Stanford PLY      | Header-driven ASCII/binary format, materialized then chunked |
//! | [`binary`] | Custom V2 binary  | Pre-chunked container produced by [`crate::transcode`] |

pub mod binary;
pub mod mtl;
pub mod obj;
pub mod ply;
