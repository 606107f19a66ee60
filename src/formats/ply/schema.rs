//! PLY header parsing: element/property schema (`SPEC_FULL.md` §4.4).

use crate::error::Error;
use crate::stream::ByteStream;
use crate::Result;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlyType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl PlyType {
    pub fn byte_len(self) -> usize {
        match self {
            PlyType::I8 | PlyType::U8 => 1,
            PlyType::I16 | PlyType::U16 => 2,
            PlyType::I32 | PlyType::U32 | PlyType::F32 => 4,
            PlyType::F64 => 8,
        }
    }

    fn parse(name: &str) -> Result<Self> {
        match name {
            "int8" | "char" => Ok(PlyType::I8),
            "uint8" | "uchar" => Ok(PlyType::U8),
            "int16" | "short" => Ok(PlyType::I16),
            "uint16" | "ushort" => Ok(PlyType::U16),
            "int32" | "int" => Ok(PlyType::I32),
            "uint32" | "uint" => Ok(PlyType::U32),
            "float32" | "float" => Ok(PlyType::F32),
            "float64" | "double" => Ok(PlyType::F64),
            other => Err(Error::Unsupported(unsupported_type_name(other))),
        }
    }
}

fn unsupported_type_name(_name: &str) -> &'static str {
    "unrecognized PLY property type"
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Property {
    Scalar(PlyType),
    List { count: PlyType, elem: PlyType },
}

#[derive(Clone, Debug)]
pub struct ElementDef {
    pub name: String,
    pub count: u64,
    pub properties: Vec<(String, Property)>,
}

impl ElementDef {
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|(n, _)| n == name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Clone, Debug)]
pub struct Schema {
    pub format: PlyFormat,
    pub elements: Vec<ElementDef>,
    pub comments: Vec<String>,
}

/// Parse the header from `stream`'s current position (expected to be byte 0)
/// through `end_header`, leaving the cursor at the start of the body.
pub fn parse_header(stream: &mut dyn ByteStream) -> Result<Schema> {
    let mut format = None;
    let mut elements: Vec<ElementDef> = Vec::new();
    let mut comments = Vec::new();

    loop {
        let line = stream
            .read_line()?
            .ok_or(Error::Malformed("PLY file ended before end_header"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let keyword = tokens.next().unwrap_or("");
        match keyword {
            "ply" => {}
            "format" => {
                let kind = tokens.next().ok_or(Error::Malformed("missing format kind"))?;
                format = Some(match kind {
                    "ascii" => PlyFormat::Ascii,
                    "binary_little_endian" => PlyFormat::BinaryLittleEndian,
                    "binary_big_endian" => PlyFormat::BinaryBigEndian,
                    other => return Err(Error::Unsupported(unsupported_format_name(other))),
                });
            }
            "comment" => comments.push(trimmed["comment".len()..].trim().to_string()),
            "obj_info" => comments.push(trimmed["obj_info".len()..].trim().to_string()),
            "element" => {
                let name = tokens.next().ok_or(Error::Malformed("element missing a name"))?;
                let count: u64 = tokens
                    .next()
                    .ok_or(Error::Malformed("element missing a count"))?
                    .parse()
                    .map_err(|_| Error::Malformed("element count is not a valid integer"))?;
                elements.push(ElementDef {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            "property" => {
                let element = elements.last_mut().ok_or(Error::Malformed("property before any element"))?;
                let second = tokens.next().ok_or(Error::Malformed("property missing a type"))?;
                if second == "list" {
                    let count_ty = PlyType::parse(tokens.next().ok_or(Error::Malformed("list property missing count type"))?)?;
                    let elem_ty = PlyType::parse(tokens.next().ok_or(Error::Malformed("list property missing element type"))?)?;
                    let name = tokens.next().ok_or(Error::Malformed("list property missing a name"))?;
                    element.properties.push((name.to_string(), Property::List { count: count_ty, elem: elem_ty }));
                } else {
                    let ty = PlyType::parse(second)?;
                    let name = tokens.next().ok_or(Error::Malformed("property missing a name"))?;
                    element.properties.push((name.to_string(), Property::Scalar(ty)));
                }
            }
            "end_header" => break,
            _ => {}
        }
    }

    Ok(Schema {
        format: format.ok_or(Error::Malformed("PLY header missing a format line"))?,
        elements,
        comments,
    })
}

fn unsupported_format_name(_name: &str) -> &'static str {
    "unrecognized PLY format kind"
}
