//! Materials, textures, and the OBJ illumination enumeration.

use std::sync::Arc;

/// A texture referenced by one or more materials.
///
/// `filename` is only ever populated by text-format loaders (OBJ/MTL) that
/// read a path out of the source file; the custom binary container has no
/// field for it; textures decoded from a V2 file always carry `filename:
/// None`.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    /// Identifier, unique within a loaded model.
    pub id: i32,
    /// Source path, when known.
    pub filename: Option<String>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// OBJ `illum` shading model.
///
/// Values 0-10 are the documented Wavefront models; anything else is kept
/// verbatim rather than rejected, since the directive is otherwise valid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Illumination {
    ColorOnAmbientOff,
    ColorOnAmbientOn,
    HighlightOn,
    ReflectionOnRaytraceOn,
    TransparencyGlassOnRaytraceOn,
    ReflectionFresnelOnRaytraceOn,
    TransparencyRefractionOnRaytraceOn,
    TransparencyRefractionFresnelOnRaytraceOn,
    ReflectionOnRaytraceOff,
    TransparencyGlassOnRaytraceOff,
    CastsShadowsOntoInvisibleSurfaces,
    Unknown(i32),
}

impl Illumination {
    /// Map a raw `illum` integer to its named variant.
    pub fn from_raw(n: i32) -> Self {
        match n {
            0 => Self::ColorOnAmbientOff,
            1 => Self::ColorOnAmbientOn,
            2 => Self::HighlightOn,
            3 => Self::ReflectionOnRaytraceOn,
            4 => Self::TransparencyGlassOnRaytraceOn,
            5 => Self::ReflectionFresnelOnRaytraceOn,
            6 => Self::TransparencyRefractionOnRaytraceOn,
            7 => Self::TransparencyRefractionFresnelOnRaytraceOn,
            8 => Self::ReflectionOnRaytraceOff,
            9 => Self::TransparencyGlassOnRaytraceOff,
            10 => Self::CastsShadowsOntoInvisibleSurfaces,
            other => Self::Unknown(other),
        }
    }

    /// Recover the raw `illum` integer.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::ColorOnAmbientOff => 0,
            Self::ColorOnAmbientOn => 1,
            Self::HighlightOn => 2,
            Self::ReflectionOnRaytraceOn => 3,
            Self::TransparencyGlassOnRaytraceOn => 4,
            Self::ReflectionFresnelOnRaytraceOn => 5,
            Self::TransparencyRefractionOnRaytraceOn => 6,
            Self::TransparencyRefractionFresnelOnRaytraceOn => 7,
            Self::ReflectionOnRaytraceOff => 8,
            Self::TransparencyGlassOnRaytraceOff => 9,
            Self::CastsShadowsOntoInvisibleSurfaces => 10,
            Self::Unknown(n) => n,
        }
    }
}

/// An (r, g, b) color with components in `[0, 255]`.
pub type Rgb = (u8, u8, u8);

/// A material descriptor, shared by every chunk that references it.
///
/// Once a chunk has been emitted with a material attached, that material's
/// fields never change; the loader only ever hands out `Arc<Material>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Material {
    pub id: i32,
    pub name: Option<String>,
    pub ambient: Option<Rgb>,
    pub diffuse: Option<Rgb>,
    pub specular: Option<Rgb>,
    pub specular_coefficient: Option<f32>,
    pub transparency: Option<u8>,
    pub illumination: Option<Illumination>,
    pub ambient_map: Option<Arc<Texture>>,
    pub diffuse_map: Option<Arc<Texture>>,
    pub specular_map: Option<Arc<Texture>>,
    pub alpha_map: Option<Arc<Texture>>,
    pub bump_map: Option<Arc<Texture>>,
}

impl Material {
    pub fn new(id: i32, name: impl Into<Option<String>>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Scale a `[0,1]` MTL float channel into a `[0,255]` byte, saturating.
pub fn unit_float_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illumination_round_trips() {
        for n in 0..=10 {
            assert_eq!(Illumination::from_raw(n).to_raw(), n);
        }
        assert_eq!(Illumination::from_raw(42).to_raw(), 42);
    }

    #[test]
    fn unit_float_scaling_saturates() {
        assert_eq!(unit_float_to_u8(-1.0), 0);
        assert_eq!(unit_float_to_u8(0.0), 0);
        assert_eq!(unit_float_to_u8(1.0), 255);
        assert_eq!(unit_float_to_u8(2.0), 255);
        assert_eq!(unit_float_to_u8(0.5), 128);
    }
}
