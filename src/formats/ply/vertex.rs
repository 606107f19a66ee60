//! Interpreting a `vertex` element's decoded rows as geometry
//! (`SPEC_FULL.md` §4.4: "the `vertex` element is interpreted as geometry
//! when it carries properties named ...").

use super::decode::PlyValue;
use super::schema::ElementDef;
use crate::error::Error;
use crate::Result;

/// Column indices, resolved once from the element's property list, used to
/// pull named attributes out of every decoded row for that element.
struct VertexColumns {
    x: usize,
    y: usize,
    z: usize,
    normal: Option<(usize, usize, usize)>,
    texcoord: Option<(usize, usize)>,
    color: Option<(usize, usize, usize, Option<usize>)>,
}

impl VertexColumns {
    fn resolve(element: &ElementDef) -> Result<Self> {
        let x = element.property_index("x");
        let y = element.property_index("y");
        let z = element.property_index("z");
        let (x, y, z) = match (x, y, z) {
            (Some(x), Some(y), Some(z)) => (x, y, z),
            _ => return Err(Error::Malformed("PLY vertex element has no x/y/z properties")),
        };

        let normal = match (
            element.property_index("nx"),
            element.property_index("ny"),
            element.property_index("nz"),
        ) {
            (Some(a), Some(b), Some(c)) => Some((a, b, c)),
            _ => None,
        };

        let texcoord = match (element.property_index("s"), element.property_index("t")) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => match (element.property_index("u"), element.property_index("v")) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            },
        };

        let color = match (
            element.property_index("red"),
            element.property_index("green"),
            element.property_index("blue"),
        ) {
            (Some(r), Some(g), Some(b)) => Some((r, g, b, element.property_index("alpha"))),
            _ => None,
        };

        Ok(Self { x, y, z, normal, texcoord, color })
    }
}

/// Every vertex attribute materialized from the `vertex` element's rows,
/// indexed by its 0-based position in that element's stream.
#[derive(Default)]
pub struct VertexTable {
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    texcoords: Option<Vec<[f32; 2]>>,
    colors: Option<(Vec<u8>, u8)>,
}

impl VertexTable {
    pub fn from_rows(element: &ElementDef, rows: &[Vec<PlyValue>]) -> Result<Self> {
        let columns = VertexColumns::resolve(element)?;
        let mut positions = Vec::with_capacity(rows.len());
        let mut normals = columns.normal.map(|_| Vec::with_capacity(rows.len()));
        let mut texcoords = columns.texcoord.map(|_| Vec::with_capacity(rows.len()));
        let mut colors = columns.color.map(|(_, _, _, alpha)| (Vec::with_capacity(rows.len() * if alpha.is_some() { 4 } else { 3 }), if alpha.is_some() { 4u8 } else { 3u8 }));

        for row in rows {
            positions.push([row[columns.x].as_f64() as f32, row[columns.y].as_f64() as f32, row[columns.z].as_f64() as f32]);
            if let (Some((nx, ny, nz)), Some(out)) = (columns.normal, normals.as_mut()) {
                out.push([row[nx].as_f64() as f32, row[ny].as_f64() as f32, row[nz].as_f64() as f32]);
            }
            if let (Some((s, t)), Some(out)) = (columns.texcoord, texcoords.as_mut()) {
                out.push([row[s].as_f64() as f32, row[t].as_f64() as f32]);
            }
            if let (Some((r, g, b, a)), Some((out, _))) = (columns.color, colors.as_mut()) {
                out.push(row[r].as_f64() as u8);
                out.push(row[g].as_f64() as u8);
                out.push(row[b].as_f64() as u8);
                if let Some(a) = a {
                    out.push(row[a].as_f64() as u8);
                }
            }
        }

        Ok(Self { positions, normals, texcoords, colors })
    }

    pub fn position(&self, index: u64) -> Result<[f32; 3]> {
        self.positions
            .get(index as usize)
            .copied()
            .ok_or(Error::Malformed("face references a vertex index out of range"))
    }

    pub fn normal(&self, index: u64) -> Option<[f32; 3]> {
        self.normals.as_ref().and_then(|v| v.get(index as usize)).copied()
    }

    pub fn texcoord(&self, index: u64) -> Option<[f32; 2]> {
        self.texcoords.as_ref().and_then(|v| v.get(index as usize)).copied()
    }

    pub fn color(&self, index: u64) -> Option<Vec<u8>> {
        let (flat, components) = self.colors.as_ref()?;
        let start = index as usize * *components as usize;
        flat.get(start..start + *components as usize).map(|s| s.to_vec())
    }
}
