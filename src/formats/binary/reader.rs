//! Decoding the V2 container body: texture records and chunk frames
//! (`SPEC_FULL.md` §4.5).

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Error;
use crate::listener::{BinaryListener, LoadListener};
use crate::loader::{ChunkIterator, LockGuard};
use crate::model::{BoundingBox, DataChunk, Illumination, Material, Rgb, Texture};
use crate::stream::{ByteStream, Endian};
use crate::Result;

const VERSION: u8 = 2;
const TEXTURE_MARKER: u8 = 0x01;
const NO_MORE_TEXTURES: u8 = 0x00;

/// Consume the version byte and the texture-record list, dispatching each
/// payload through `listener`. Leaves the cursor at the start of the first
/// chunk.
pub(super) fn read_prologue(
    stream: &mut dyn ByteStream,
    listener: Option<&mut (dyn BinaryListener + 'static)>,
) -> Result<()> {
    let version = stream.read_u8()?;
    if version != VERSION {
        return Err(Error::Malformed("binary container version is not 2"));
    }

    let mut listener = listener;
    loop {
        let marker = stream.read_u8()?;
        match marker {
            NO_MORE_TEXTURES => break,
            TEXTURE_MARKER => {
                let tex_id = stream.read_i32(Endian::Big)?;
                let width = stream.read_i32(Endian::Big)? as u32;
                let height = stream.read_i32(Endian::Big)? as u32;
                let length = stream.read_i64(Endian::Big)?;
                if length < 0 || (length as u64) > stream.len().saturating_sub(stream.position()) {
                    return Err(Error::Malformed("texture payload length exceeds remaining file length"));
                }
                let dest = listener.as_deref_mut().and_then(|l| l.texture_received(tex_id, width, height));
                match dest {
                    Some(path) => {
                        copy_payload_to_file(stream, length as u64, &path)?;
                        let ok = listener
                            .as_deref_mut()
                            .map_or(true, |l| l.texture_data_available(&path, tex_id, width, height));
                        if !ok {
                            tracing::warn!(tex_id, "binary texture payload rejected by listener");
                            return Err(Error::Malformed("texture payload rejected by listener"));
                        }
                    }
                    None => stream.skip(length)?,
                }
            }
            _ => return Err(Error::Malformed("unrecognized texture-list marker byte")),
        }
    }
    Ok(())
}

fn copy_payload_to_file(stream: &mut dyn ByteStream, length: u64, dest: &PathBuf) -> Result<()> {
    use std::io::Write;
    let mut file = std::fs::File::create(dest)?;
    const BUF: u64 = 64 * 1024;
    let mut remaining = length;
    while remaining > 0 {
        let take = remaining.min(BUF) as usize;
        let bytes = stream.read_bytes(take)?;
        file.write_all(&bytes)?;
        remaining -= take as u64;
    }
    Ok(())
}

/// Chunk iterator returned by [`BinaryLoader::load`](super::BinaryLoader::load).
pub struct BinaryChunks {
    pub(super) stream: Box<dyn ByteStream>,
    pub(super) load_listener: Option<Box<dyn LoadListener>>,
    pub(super) lock: Option<LockGuard>,
    pub(super) finished: bool,
}

impl BinaryChunks {
    fn finish(&mut self) -> Result<()> {
        if !self.finished {
            if let Some(listener) = &mut self.load_listener {
                listener.on_load_end();
            }
            self.stream.close()?;
            if let Some(lock) = &mut self.lock {
                lock.release();
            }
            self.finished = true;
        }
        Ok(())
    }
}

impl ChunkIterator for BinaryChunks {
    fn next_chunk(&mut self) -> Result<DataChunk> {
        if self.finished || self.stream.eof() {
            self.finish()?;
            return Err(Error::NotAvailable);
        }

        let size = self.stream.read_i32(Endian::Big)?;
        if size < 0 {
            return Err(Error::Malformed("chunk size is negative"));
        }
        let chunk_start = self.stream.position();
        let chunk_end = chunk_start
            .checked_add(size as u64)
            .filter(|&e| e <= self.stream.len())
            .ok_or(Error::Malformed("chunk size exceeds remaining file length"))?;

        let material = read_material(self.stream.as_mut())?;
        let coords = read_f32_array(self.stream.as_mut(), chunk_end)?;
        let (colors, color_components) = read_colors(self.stream.as_mut(), chunk_end)?;
        let indices = read_indices(self.stream.as_mut(), chunk_end)?;
        let texcoords = read_f32_array(self.stream.as_mut(), chunk_end)?;
        let normals = read_f32_array(self.stream.as_mut(), chunk_end)?;
        let bbox = read_bbox(self.stream.as_mut())?;

        if self.stream.position() != chunk_end {
            return Err(Error::Malformed("chunk body size does not match its declared size"));
        }

        Ok(DataChunk {
            coords,
            normals,
            texcoords,
            colors,
            color_components,
            indices,
            bbox: Some(bbox),
            material,
        })
    }
}

impl Iterator for BinaryChunks {
    type Item = Result<DataChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(chunk) => Some(Ok(chunk)),
            Err(Error::NotAvailable) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Drop for BinaryChunks {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

fn remaining(stream: &dyn ByteStream, chunk_end: u64) -> u64 {
    chunk_end.saturating_sub(stream.position())
}

fn read_f32_array(stream: &mut dyn ByteStream, chunk_end: u64) -> Result<Vec<f32>> {
    let size_bytes = stream.read_i32(Endian::Big)?;
    if size_bytes < 0 || size_bytes % 4 != 0 {
        return Err(Error::Malformed("f32 array size is not a non-negative multiple of 4"));
    }
    if size_bytes as u64 > remaining(stream, chunk_end) {
        return Err(Error::Malformed("f32 array size exceeds remaining chunk size"));
    }
    let count = size_bytes as usize / 4;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(stream.read_f32(Endian::Big)?);
    }
    Ok(out)
}

fn read_colors(stream: &mut dyn ByteStream, chunk_end: u64) -> Result<(Vec<u8>, u8)> {
    let size_bytes = stream.read_i32(Endian::Big)?;
    if size_bytes < 0 || size_bytes as u64 > remaining(stream, chunk_end) {
        return Err(Error::Malformed("colors size is invalid"));
    }
    let bytes = stream.read_bytes(size_bytes as usize)?;
    let components = if size_bytes > 0 { stream.read_i32(Endian::Big)? as u8 } else { 0 };
    Ok((bytes, components))
}

fn read_indices(stream: &mut dyn ByteStream, chunk_end: u64) -> Result<Vec<u32>> {
    let size_bytes = stream.read_i32(Endian::Big)?;
    if size_bytes < 0 || size_bytes % 2 != 0 {
        return Err(Error::Malformed("indices size is not a non-negative multiple of 2"));
    }
    if size_bytes as u64 > remaining(stream, chunk_end) {
        return Err(Error::Malformed("indices size exceeds remaining chunk size"));
    }
    let count = size_bytes as usize / 2;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(stream.read_u16(Endian::Big)? as u32);
    }
    Ok(out)
}

fn read_bbox(stream: &mut dyn ByteStream) -> Result<BoundingBox> {
    let min = [stream.read_f32(Endian::Big)?, stream.read_f32(Endian::Big)?, stream.read_f32(Endian::Big)?];
    let max = [stream.read_f32(Endian::Big)?, stream.read_f32(Endian::Big)?, stream.read_f32(Endian::Big)?];
    Ok(BoundingBox { min, max })
}

fn read_optional_rgb(stream: &mut dyn ByteStream) -> Result<Option<Rgb>> {
    if stream.read_u8()? == 0 {
        return Ok(None);
    }
    Ok(Some((stream.read_u8()?, stream.read_u8()?, stream.read_u8()?)))
}

fn read_optional_f32(stream: &mut dyn ByteStream) -> Result<Option<f32>> {
    if stream.read_u8()? == 0 {
        return Ok(None);
    }
    Ok(Some(stream.read_f32(Endian::Big)?))
}

fn read_optional_u8(stream: &mut dyn ByteStream) -> Result<Option<u8>> {
    if stream.read_u8()? == 0 {
        return Ok(None);
    }
    Ok(Some(stream.read_u8()?))
}

fn read_optional_i32(stream: &mut dyn ByteStream) -> Result<Option<i32>> {
    if stream.read_u8()? == 0 {
        return Ok(None);
    }
    Ok(Some(stream.read_i32(Endian::Big)?))
}

fn read_optional_texture(stream: &mut dyn ByteStream) -> Result<Option<Arc<Texture>>> {
    if stream.read_u8()? == 0 {
        return Ok(None);
    }
    let id = stream.read_i32(Endian::Big)?;
    let width = stream.read_i32(Endian::Big)? as u32;
    let height = stream.read_i32(Endian::Big)? as u32;
    Ok(Some(Arc::new(Texture { id, filename: None, width, height })))
}

fn read_material(stream: &mut dyn ByteStream) -> Result<Option<Arc<Material>>> {
    if stream.read_u8()? == 0 {
        return Ok(None);
    }
    let id = stream.read_i32(Endian::Big)?;
    let mut material = Material::new(id, None);
    material.ambient = read_optional_rgb(stream)?;
    material.diffuse = read_optional_rgb(stream)?;
    material.specular = read_optional_rgb(stream)?;
    material.specular_coefficient = read_optional_f32(stream)?;
    material.ambient_map = read_optional_texture(stream)?;
    material.diffuse_map = read_optional_texture(stream)?;
    material.specular_map = read_optional_texture(stream)?;
    material.alpha_map = read_optional_texture(stream)?;
    material.bump_map = read_optional_texture(stream)?;
    material.transparency = read_optional_u8(stream)?;
    material.illumination = read_optional_i32(stream)?.map(Illumination::from_raw);
    Ok(Some(Arc::new(material)))
}
