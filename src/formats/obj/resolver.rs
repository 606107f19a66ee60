//! Resolving a `mtllib` directive to a [`MaterialSet`]
//! (`SPEC_FULL.md` §4.3 "Material binding").

use std::path::PathBuf;

use crate::formats::mtl::{MaterialSet, MtlParser};
use crate::listener::{AcceptAllTextures, TextureValidator};
use crate::stream;
use crate::Result;

/// Resolves the path named by a `mtllib` directive to the materials it
/// declares. Returning `Ok(None)` leaves material resolution disabled for
/// that directive, matching a `null` callback result.
pub trait MaterialResolver {
    fn resolve(&mut self, mtl_path: &str) -> Result<Option<MaterialSet>>;
}

/// Opens `mtl_path` relative to the OBJ file's directory and parses it with
/// [`MtlParser`]. This is what [`ObjLoader::open`](super::ObjLoader::open)
/// installs by default.
pub struct DefaultMaterialResolver {
    base_dir: PathBuf,
    texture_validator: Box<dyn TextureValidator>,
}

impl DefaultMaterialResolver {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            texture_validator: Box::new(AcceptAllTextures),
        }
    }

    pub fn with_texture_validator(base_dir: PathBuf, validator: Box<dyn TextureValidator>) -> Self {
        Self {
            base_dir,
            texture_validator: validator,
        }
    }
}

impl MaterialResolver for DefaultMaterialResolver {
    fn resolve(&mut self, mtl_path: &str) -> Result<Option<MaterialSet>> {
        let full = self.base_dir.join(mtl_path);
        let mut mtl_stream = stream::open(&full, stream::DEFAULT_FILE_SIZE_LIMIT_TO_KEEP_IN_MEMORY)?;
        let set = MtlParser::new(self.texture_validator.as_mut()).parse(mtl_stream.as_mut())?;
        Ok(Some(set))
    }
}

/// Disables material resolution entirely; every `mtllib` directive is
/// acknowledged but produces no materials.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMaterialResolver;

impl MaterialResolver for NullMaterialResolver {
    fn resolve(&mut self, _mtl_path: &str) -> Result<Option<MaterialSet>> {
        Ok(None)
    }
}
