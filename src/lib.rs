//! **meshkit** - streaming loaders and a transcoder for textured polygon
//! meshes.
//!
//! Three source formats (Wavefront OBJ, Stanford PLY, and a compact custom
//! binary container) are parsed into a common chunked geometry model and
//! streamed out through one iterator contract, so callers don't need a
//! different code path per format.
//!
//! # Loaders
//! | Module            | Format           |
//! |--------------------|------------------|
//! | [`formats::obj`]    | Wavefront OBJ    |
//! | [`formats::mtl`]    | Wavefront MTL    |
//! | [`formats::ply`]    | Stanford PLY     |
//! | [`formats::binary`] | Custom V2 binary |
//!
//! [`transcode`] re-encodes any source loader into the binary container via
//! [`formats::binary::BinaryWriter`].

pub mod error;
pub mod formats;
pub mod listener;
pub mod loader;
pub mod model;
pub mod stream;
pub mod transcode;
pub mod triangulate;

pub use error::{Error, Result};
