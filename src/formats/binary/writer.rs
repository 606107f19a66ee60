//! Encoding [`DataChunk`]s and texture payloads into the V2 container
//! format (`SPEC_FULL.md` §4.5).

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use crate::error::Error;
use crate::model::{BoundingBox, DataChunk, Material};
use crate::stream::{self, ByteStream, Endian, HeapByteStream};
use crate::Result;

const VERSION: u8 = 2;

/// Writes a V2 container to a file, one texture record or chunk at a time.
///
/// Texture records must all be written before the first call to
/// [`write_chunk`](Self::write_chunk); the no-more-textures marker is
/// written automatically at that point if it hasn't been already.
pub struct BinaryWriter {
    stream: HeapByteStream<File>,
    textures_finished: bool,
}

impl BinaryWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let mut stream = stream::create(path)?;
        stream.write_u8(VERSION)?;
        Ok(Self { stream, textures_finished: false })
    }

    /// Append one texture record. Must be called before the first
    /// [`write_chunk`](Self::write_chunk).
    pub fn write_texture(&mut self, tex_id: i32, width: u32, height: u32, data: &[u8]) -> Result<()> {
        if self.textures_finished {
            return Err(Error::Malformed("texture written after texture list was closed"));
        }
        self.stream.write_u8(0x01)?;
        self.stream.write_i32(tex_id, Endian::Big)?;
        self.stream.write_i32(width as i32, Endian::Big)?;
        self.stream.write_i32(height as i32, Endian::Big)?;
        self.stream.write_i64(data.len() as i64, Endian::Big)?;
        self.stream.write_all(data)?;
        Ok(())
    }

    /// Write the no-more-textures marker. Idempotent; [`write_chunk`](Self::write_chunk)
    /// calls this automatically if it hasn't run yet.
    pub fn finish_textures(&mut self) -> Result<()> {
        if !self.textures_finished {
            self.stream.write_u8(0x00)?;
            self.textures_finished = true;
        }
        Ok(())
    }

    pub fn write_chunk(&mut self, chunk: &DataChunk) -> Result<()> {
        self.finish_textures()?;

        let mut body = HeapByteStream::new(Cursor::new(Vec::new()))?;
        write_material(&mut body, chunk.material.as_deref())?;
        write_f32_array(&mut body, &chunk.coords)?;
        write_colors(&mut body, &chunk.colors, chunk.color_components)?;
        write_indices(&mut body, &chunk.indices)?;
        write_f32_array(&mut body, &chunk.texcoords)?;
        write_f32_array(&mut body, &chunk.normals)?;
        write_bbox(&mut body, chunk.bbox.unwrap_or(BoundingBox { min: [0.0; 3], max: [0.0; 3] }))?;

        let bytes = body.into_inner().into_inner();
        self.stream.write_i32(bytes.len() as i32, Endian::Big)?;
        self.stream.write_all(&bytes)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.finish_textures()?;
        self.stream.close()
    }
}

fn write_optional_rgb(stream: &mut dyn ByteStream, rgb: Option<(u8, u8, u8)>) -> Result<()> {
    match rgb {
        None => stream.write_u8(0),
        Some((r, g, b)) => {
            stream.write_u8(1)?;
            stream.write_u8(r)?;
            stream.write_u8(g)?;
            stream.write_u8(b)
        }
    }
}

fn write_optional_f32(stream: &mut dyn ByteStream, v: Option<f32>) -> Result<()> {
    match v {
        None => stream.write_u8(0),
        Some(v) => {
            stream.write_u8(1)?;
            stream.write_f32(v, Endian::Big)
        }
    }
}

fn write_optional_u8(stream: &mut dyn ByteStream, v: Option<u8>) -> Result<()> {
    match v {
        None => stream.write_u8(0),
        Some(v) => {
            stream.write_u8(1)?;
            stream.write_u8(v)
        }
    }
}

fn write_optional_i32(stream: &mut dyn ByteStream, v: Option<i32>) -> Result<()> {
    match v {
        None => stream.write_u8(0),
        Some(v) => {
            stream.write_u8(1)?;
            stream.write_i32(v, Endian::Big)
        }
    }
}

fn write_optional_texture(stream: &mut dyn ByteStream, texture: Option<&crate::model::Texture>) -> Result<()> {
    match texture {
        None => stream.write_u8(0),
        Some(t) => {
            stream.write_u8(1)?;
            stream.write_i32(t.id, Endian::Big)?;
            stream.write_i32(t.width as i32, Endian::Big)?;
            stream.write_i32(t.height as i32, Endian::Big)
        }
    }
}

fn write_material(stream: &mut dyn ByteStream, material: Option<&Material>) -> Result<()> {
    let material = match material {
        None => return stream.write_u8(0),
        Some(m) => m,
    };
    stream.write_u8(1)?;
    stream.write_i32(material.id, Endian::Big)?;
    write_optional_rgb(stream, material.ambient)?;
    write_optional_rgb(stream, material.diffuse)?;
    write_optional_rgb(stream, material.specular)?;
    write_optional_f32(stream, material.specular_coefficient)?;
    write_optional_texture(stream, material.ambient_map.as_deref())?;
    write_optional_texture(stream, material.diffuse_map.as_deref())?;
    write_optional_texture(stream, material.specular_map.as_deref())?;
    write_optional_texture(stream, material.alpha_map.as_deref())?;
    write_optional_texture(stream, material.bump_map.as_deref())?;
    write_optional_u8(stream, material.transparency)?;
    write_optional_i32(stream, material.illumination.map(|i| i.to_raw()))
}

fn write_f32_array(stream: &mut dyn ByteStream, values: &[f32]) -> Result<()> {
    stream.write_i32((values.len() * 4) as i32, Endian::Big)?;
    for &v in values {
        stream.write_f32(v, Endian::Big)?;
    }
    Ok(())
}

fn write_colors(stream: &mut dyn ByteStream, colors: &[u8], components: u8) -> Result<()> {
    stream.write_i32(colors.len() as i32, Endian::Big)?;
    stream.write_all(colors)?;
    if !colors.is_empty() {
        stream.write_i32(components as i32, Endian::Big)?;
    }
    Ok(())
}

fn write_indices(stream: &mut dyn ByteStream, indices: &[u32]) -> Result<()> {
    stream.write_i32((indices.len() * 2) as i32, Endian::Big)?;
    for &i in indices {
        stream.write_u16(i as u16, Endian::Big)?;
    }
    Ok(())
}

fn write_bbox(stream: &mut dyn ByteStream, bbox: BoundingBox) -> Result<()> {
    for v in bbox.min {
        stream.write_f32(v, Endian::Big)?;
    }
    for v in bbox.max {
        stream.write_f32(v, Endian::Big)?;
    }
    Ok(())
}
