//! Line-level parsing helpers shared by the preflight and streaming passes
//! (`SPEC_FULL.md` §4.3).

use crate::error::Error;
use crate::Result;

/// The first whitespace-delimited token, or `""` for a blank line.
pub fn first_token(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

fn parse_f32_token(s: &str) -> Result<f32> {
    if s.is_empty() {
        return Err(Error::Malformed("empty coordinate component"));
    }
    s.parse().map_err(|_| Error::Malformed("failed to parse OBJ coordinate"))
}

/// Parse a `v x y z [w]` line's tokens after the directive. A homogeneous
/// (4-token) vertex divides `x, y, z` by `w`; a 3-token vertex is used as-is.
pub fn parse_vertex_line(line: &str) -> Result<[f32; 3]> {
    let mut tokens = line.split_whitespace();
    tokens.next();
    let x = parse_f32_token(tokens.next().unwrap_or(""))?;
    let y = parse_f32_token(tokens.next().unwrap_or(""))?;
    let z = parse_f32_token(tokens.next().unwrap_or(""))?;
    match tokens.next() {
        Some(w_tok) => {
            let w = parse_f32_token(w_tok)?;
            Ok([x / w, y / w, z / w])
        }
        None => Ok([x, y, z]),
    }
}

/// Parse a `vt u v [w]` line. `w` divides `u, v` only when it is present,
/// finite, and non-zero; otherwise `u, v` are used unchanged.
pub fn parse_texcoord_line(line: &str) -> Result<[f32; 2]> {
    let mut tokens = line.split_whitespace();
    tokens.next();
    let u = parse_f32_token(tokens.next().unwrap_or(""))?;
    let v = parse_f32_token(tokens.next().unwrap_or(""))?;
    match tokens.next() {
        Some(w_tok) => {
            let w = parse_f32_token(w_tok)?;
            if w == 0.0 || !w.is_finite() {
                Ok([u, v])
            } else {
                Ok([u / w, v / w])
            }
        }
        None => Ok([u, v]),
    }
}

/// Parse a `vn x y z` line. Normals are never rescaled.
pub fn parse_normal_line(line: &str) -> Result<[f32; 3]> {
    let mut tokens = line.split_whitespace();
    tokens.next();
    let x = parse_f32_token(tokens.next().unwrap_or(""))?;
    let y = parse_f32_token(tokens.next().unwrap_or(""))?;
    let z = parse_f32_token(tokens.next().unwrap_or(""))?;
    Ok([x, y, z])
}

/// One `V[/[T][/N]]` face-vertex token, as 0-based original indices.
pub fn parse_face_vertex_token(token: &str) -> Result<(u64, Option<u64>, Option<u64>)> {
    let mut parts = token.split('/');
    let v_str = parts.next().filter(|s| !s.is_empty());
    let v_str = v_str.ok_or(Error::Malformed("missing vertex index in face token"))?;
    let v: i64 = v_str.parse().map_err(|_| Error::Malformed("bad vertex index in face token"))?;
    if v < 1 {
        return Err(Error::Unsupported("non-positive/relative face indices"));
    }
    let v0 = (v - 1) as u64;

    let t = match parts.next() {
        Some(s) if !s.is_empty() => {
            let i: i64 = s.parse().map_err(|_| Error::Malformed("bad texcoord index in face token"))?;
            if i < 1 {
                return Err(Error::Unsupported("non-positive/relative face indices"));
            }
            Some((i - 1) as u64)
        }
        _ => None,
    };

    let n = match parts.next() {
        Some(s) if !s.is_empty() => {
            let i: i64 = s.parse().map_err(|_| Error::Malformed("bad normal index in face token"))?;
            if i < 1 {
                return Err(Error::Unsupported("non-positive/relative face indices"));
            }
            Some((i - 1) as u64)
        }
        _ => None,
    };

    Ok((v0, t, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homogeneous_vertex_divides_by_w() {
        assert_eq!(parse_vertex_line("v 2 4 6 2").unwrap(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn inhomogeneous_vertex_is_used_as_is() {
        assert_eq!(parse_vertex_line("v 1 2 3").unwrap(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn texcoord_skips_division_by_zero_w() {
        assert_eq!(parse_texcoord_line("vt 0.5 0.5 0").unwrap(), [0.5, 0.5]);
        assert_eq!(parse_texcoord_line("vt 1.0 2.0 2.0").unwrap(), [0.5, 1.0]);
    }

    #[test]
    fn face_token_variants() {
        assert_eq!(parse_face_vertex_token("3").unwrap(), (2, None, None));
        assert_eq!(parse_face_vertex_token("3/4").unwrap(), (2, Some(3), None));
        assert_eq!(parse_face_vertex_token("3//5").unwrap(), (2, None, Some(4)));
        assert_eq!(parse_face_vertex_token("3/4/5").unwrap(), (2, Some(3), Some(4)));
    }

    #[test]
    fn missing_vertex_component_is_malformed() {
        assert!(parse_vertex_line("v 1 2").is_err());
    }
}
