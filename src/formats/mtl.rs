//! OBJ material sidecar (MTL) parser (`SPEC_FULL.md` §4.2).

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::listener::TextureValidator;
use crate::model::material::unit_float_to_u8;
use crate::model::{Illumination, Material, Texture};
use crate::stream::ByteStream;
use crate::Result;

/// The materials parsed out of one MTL file, indexed by name.
#[derive(Clone, Debug, Default)]
pub struct MaterialSet {
    materials: Vec<Arc<Material>>,
    by_name: HashMap<String, usize>,
}

impl MaterialSet {
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Arc<Material>> {
        self.by_name.get(name).map(|&i| &self.materials[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Material>> {
        self.materials.iter()
    }

    fn push(&mut self, material: Material) {
        let name = material.name.clone();
        let index = self.materials.len();
        self.materials.push(Arc::new(material));
        if let Some(name) = name {
            self.by_name.insert(name, index);
        }
    }
}

/// Parses `newmtl`-delimited material blocks from a [`ByteStream`].
pub struct MtlParser<'v> {
    validator: &'v mut dyn TextureValidator,
    next_texture_id: i32,
}

impl<'v> MtlParser<'v> {
    pub fn new(validator: &'v mut dyn TextureValidator) -> Self {
        Self {
            validator,
            next_texture_id: 0,
        }
    }

    /// Parse every material declared in `stream` from its current position
    /// through EOF.
    pub fn parse(&mut self, stream: &mut dyn ByteStream) -> Result<MaterialSet> {
        tracing::debug!("starting MTL load");
        let mut set = MaterialSet::default();
        let mut current: Option<Material> = None;

        while let Some(line) = stream.read_line()? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (directive, rest) = split_directive(line);
            let directive_lower = directive.to_ascii_lowercase();

            if directive_lower != "newmtl" && current.is_none() {
                return Err(Error::Malformed("MTL directive before first newmtl"));
            }

            match directive_lower.as_str() {
                "newmtl" => {
                    if let Some(finished) = current.take() {
                        set.push(finished);
                    }
                    let id = set.len() as i32;
                    current = Some(Material::new(id, Some(rest.trim().to_string())));
                }
                "ka" => current.as_mut().unwrap().ambient = Some(parse_rgb(rest)?),
                "kd" => current.as_mut().unwrap().diffuse = Some(parse_rgb(rest)?),
                "ks" => current.as_mut().unwrap().specular = Some(parse_rgb(rest)?),
                "ns" | "ni" => current.as_mut().unwrap().specular_coefficient = Some(parse_f32(rest)?),
                "d" | "tr" => current.as_mut().unwrap().transparency = Some(unit_float_to_u8(parse_f32(rest)?)),
                "illum" => {
                    let n: i32 = parse_token(rest)?;
                    current.as_mut().unwrap().illumination = Some(Illumination::from_raw(n));
                }
                "map_ka" => self.bind_texture(current.as_mut().unwrap(), rest, TextureMap::Ambient)?,
                "map_kd" => self.bind_texture(current.as_mut().unwrap(), rest, TextureMap::Diffuse)?,
                "map_ks" => self.bind_texture(current.as_mut().unwrap(), rest, TextureMap::Specular)?,
                "map_d" => self.bind_texture(current.as_mut().unwrap(), rest, TextureMap::Alpha)?,
                "map_bump" | "bump" => self.bind_texture(current.as_mut().unwrap(), rest, TextureMap::Bump)?,
                _ => {
                    tracing::debug!(directive = %directive, "ignoring unknown MTL directive");
                }
            }
        }

        if let Some(finished) = current.take() {
            set.push(finished);
        }

        Ok(set)
    }

    fn bind_texture(&mut self, material: &mut Material, path: &str, slot: TextureMap) -> Result<()> {
        let path = path.trim();
        if !self.validator.validate_texture(path) {
            tracing::warn!(path, "MTL texture rejected by validator");
            return Err(Error::InvalidTexture);
        }
        let texture = Arc::new(Texture {
            id: self.next_texture_id,
            filename: Some(path.to_string()),
            width: 0,
            height: 0,
        });
        self.next_texture_id += 1;
        match slot {
            TextureMap::Ambient => material.ambient_map = Some(texture),
            TextureMap::Diffuse => material.diffuse_map = Some(texture),
            TextureMap::Specular => material.specular_map = Some(texture),
            TextureMap::Alpha => material.alpha_map = Some(texture),
            TextureMap::Bump => material.bump_map = Some(texture),
        }
        Ok(())
    }
}

enum TextureMap {
    Ambient,
    Diffuse,
    Specular,
    Alpha,
    Bump,
}

fn split_directive(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(i) => (&line[..i], line[i..].trim_start()),
        None => (line, ""),
    }
}

fn parse_token<T: std::str::FromStr>(rest: &str) -> Result<T> {
    rest.split_whitespace()
        .next()
        .ok_or(Error::Malformed("expected a value"))?
        .parse()
        .map_err(|_| Error::Malformed("failed to parse numeric MTL value"))
}

fn parse_f32(rest: &str) -> Result<f32> {
    parse_token(rest)
}

fn parse_rgb(rest: &str) -> Result<(u8, u8, u8)> {
    let mut parts = rest.split_whitespace();
    let mut next = || -> Result<f32> {
        parts
            .next()
            .ok_or(Error::Malformed("expected 3 color components"))?
            .parse()
            .map_err(|_| Error::Malformed("failed to parse color component"))
    };
    let r = unit_float_to_u8(next()?);
    let g = unit_float_to_u8(next()?);
    let b = unit_float_to_u8(next()?);
    Ok((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::AcceptAllTextures;
    use crate::stream::HeapByteStream;
    use std::io::Cursor;

    fn parse(src: &str) -> Result<MaterialSet> {
        let mut validator = AcceptAllTextures;
        let mut stream = HeapByteStream::new(Cursor::new(src.as_bytes().to_vec())).unwrap();
        MtlParser::new(&mut validator).parse(&mut stream)
    }

    #[test]
    fn parses_a_single_material() {
        let set = parse("newmtl red\nKd 1.0 0.0 0.0\nNs 96.0\nd 1.0\nillum 2\n").unwrap();
        assert_eq!(set.len(), 1);
        let m = set.get_by_name("red").unwrap();
        assert_eq!(m.id, 0);
        assert_eq!(m.diffuse, Some((255, 0, 0)));
        assert_eq!(m.specular_coefficient, Some(96.0));
        assert_eq!(m.transparency, Some(255));
        assert_eq!(m.illumination, Some(Illumination::HighlightOn));
    }

    #[test]
    fn assigns_incrementing_ids_in_declaration_order() {
        let set = parse("newmtl a\nnewmtl b\nnewmtl c\n").unwrap();
        assert_eq!(set.get_by_name("a").unwrap().id, 0);
        assert_eq!(set.get_by_name("b").unwrap().id, 1);
        assert_eq!(set.get_by_name("c").unwrap().id, 2);
    }

    #[test]
    fn directive_before_first_material_is_malformed() {
        assert!(parse("Kd 1 1 1\nnewmtl a\n").is_err());
    }

    #[test]
    fn unknown_directives_are_ignored() {
        let set = parse("newmtl a\nTf 1 1 1\nKd 0.5 0.5 0.5\n").unwrap();
        assert_eq!(set.get_by_name("a").unwrap().diffuse, Some((128, 128, 128)));
    }

    #[test]
    fn map_kd_binds_a_diffuse_texture() {
        let set = parse("newmtl a\nmap_Kd textures/wall.png\n").unwrap();
        let tex = set.get_by_name("a").unwrap().diffuse_map.clone().unwrap();
        assert_eq!(tex.filename.as_deref(), Some("textures/wall.png"));
    }

    struct RejectEverything;
    impl TextureValidator for RejectEverything {
        fn validate_texture(&mut self, _path: &str) -> bool {
            false
        }
    }

    #[test]
    fn rejected_texture_fails_the_load() {
        let mut validator = RejectEverything;
        let mut stream =
            HeapByteStream::new(Cursor::new(b"newmtl a\nmap_Kd bad.png\n".to_vec())).unwrap();
        let err = MtlParser::new(&mut validator).parse(&mut stream).unwrap_err();
        assert!(matches!(err, Error::InvalidTexture));
    }
}
