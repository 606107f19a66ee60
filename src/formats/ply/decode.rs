//! Reading one element instance ("row") in either PLY body encoding
//! (`SPEC_FULL.md` §4.4 "Body parsing per encoding").

use super::schema::{PlyFormat, PlyType, Property};
use crate::error::Error;
use crate::stream::{ByteStream, Endian};
use crate::Result;

/// A decoded property value, read as `f64` regardless of its declared
/// wire type. List length (and PLY's widest integer type) both fit
/// comfortably; geometry only ever needs a handful of significant digits.
#[derive(Clone, Debug, PartialEq)]
pub enum PlyValue {
    Scalar(f64),
    List(Vec<f64>),
}

impl PlyValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            PlyValue::Scalar(v) => *v,
            PlyValue::List(_) => 0.0,
        }
    }

    pub fn as_list(&self) -> &[f64] {
        match self {
            PlyValue::List(v) => v,
            PlyValue::Scalar(_) => &[],
        }
    }
}

fn endian_of(format: PlyFormat) -> Endian {
    match format {
        PlyFormat::BinaryBigEndian => Endian::Big,
        PlyFormat::BinaryLittleEndian | PlyFormat::Ascii => Endian::Little,
    }
}

fn read_scalar_binary(stream: &mut dyn ByteStream, ty: PlyType, endian: Endian) -> Result<f64> {
    Ok(match ty {
        PlyType::I8 => stream.read_i8()? as f64,
        PlyType::U8 => stream.read_u8()? as f64,
        PlyType::I16 => stream.read_i16(endian)? as f64,
        PlyType::U16 => stream.read_u16(endian)? as f64,
        PlyType::I32 => stream.read_i32(endian)? as f64,
        PlyType::U32 => stream.read_u32(endian)? as f64,
        PlyType::F32 => stream.read_f32(endian)? as f64,
        PlyType::F64 => stream.read_f64(endian)?,
    })
}

fn parse_scalar_ascii(token: &str, _ty: PlyType) -> Result<f64> {
    token.parse().map_err(|_| Error::Malformed("failed to parse PLY ASCII property value"))
}

/// Decode one instance of `properties` from `stream`, dispatching on
/// `format`.
pub fn decode_row(stream: &mut dyn ByteStream, format: PlyFormat, properties: &[(String, Property)]) -> Result<Vec<PlyValue>> {
    match format {
        PlyFormat::Ascii => {
            let line = stream
                .read_line()?
                .ok_or(Error::Malformed("PLY body ended before all declared elements were read"))?;
            let mut tokens = line.trim().split_whitespace();
            let mut row = Vec::with_capacity(properties.len());
            for (_name, property) in properties {
                row.push(match property {
                    Property::Scalar(ty) => {
                        let tok = tokens.next().ok_or(Error::Malformed("PLY ASCII row has too few tokens"))?;
                        PlyValue::Scalar(parse_scalar_ascii(tok, *ty)?)
                    }
                    Property::List { count, elem } => {
                        let count_tok = tokens.next().ok_or(Error::Malformed("PLY ASCII list missing its count"))?;
                        let n = parse_scalar_ascii(count_tok, *count)? as usize;
                        let mut values = Vec::with_capacity(n);
                        for _ in 0..n {
                            let tok = tokens.next().ok_or(Error::Malformed("PLY ASCII list shorter than declared"))?;
                            values.push(parse_scalar_ascii(tok, *elem)?);
                        }
                        PlyValue::List(values)
                    }
                });
            }
            Ok(row)
        }
        PlyFormat::BinaryLittleEndian | PlyFormat::BinaryBigEndian => {
            let endian = endian_of(format);
            let mut row = Vec::with_capacity(properties.len());
            for (_name, property) in properties {
                row.push(match property {
                    Property::Scalar(ty) => PlyValue::Scalar(read_scalar_binary(stream, *ty, endian)?),
                    Property::List { count, elem } => {
                        let n = read_scalar_binary(stream, *count, endian)? as usize;
                        let mut values = Vec::with_capacity(n);
                        for _ in 0..n {
                            values.push(read_scalar_binary(stream, *elem, endian)?);
                        }
                        PlyValue::List(values)
                    }
                });
            }
            Ok(row)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::HeapByteStream;
    use std::io::Cursor;

    #[test]
    fn decodes_an_ascii_row_with_a_list_property() {
        let props = vec![
            ("x".to_string(), Property::Scalar(PlyType::F32)),
            ("idx".to_string(), Property::List { count: PlyType::U8, elem: PlyType::I32 }),
        ];
        let mut stream = HeapByteStream::new(Cursor::new(b"1.5 3 0 1 2\n".to_vec())).unwrap();
        let row = decode_row(&mut stream, PlyFormat::Ascii, &props).unwrap();
        assert_eq!(row[0], PlyValue::Scalar(1.5));
        assert_eq!(row[1], PlyValue::List(vec![0.0, 1.0, 2.0]));
    }

    #[test]
    fn decodes_a_binary_little_endian_row() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.push(2); // list count
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.extend_from_slice(&9i32.to_le_bytes());
        let props = vec![
            ("x".to_string(), Property::Scalar(PlyType::F32)),
            ("idx".to_string(), Property::List { count: PlyType::U8, elem: PlyType::I32 }),
        ];
        let mut stream = HeapByteStream::new(Cursor::new(bytes)).unwrap();
        let row = decode_row(&mut stream, PlyFormat::BinaryLittleEndian, &props).unwrap();
        assert_eq!(row[0], PlyValue::Scalar(1.5));
        assert_eq!(row[1], PlyValue::List(vec![7.0, 9.0]));
    }
}
