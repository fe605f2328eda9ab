use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;

use crate::mesh::Mesh;

/// Parses a Wavefront OBJ document into an interleaved [`Mesh`].
///
/// Only positions, normals and faces are read; polygons are fan-triangulated
/// and missing normals are generated from the faces.
pub fn load_obj_from_str(data: &str) -> Result<Mesh> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut mesh = Mesh::default();
    let mut lookup: HashMap<(usize, Option<usize>), u32> = HashMap::new();
    let mut missing_normals = false;

    for (line_no, line) in data.lines().enumerate() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => positions.push(
                parse_vec3(parts).with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            Some("vn") => normals.push(
                parse_vec3(parts).with_context(|| format!("invalid normal on line {}", line_no + 1))?,
            ),
            Some("f") => {
                let corners = parts
                    .map(|corner| resolve_corner(corner, positions.len(), normals.len()))
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                if corners.len() < 3 {
                    return Err(anyhow!(
                        "face on line {} references fewer than 3 vertices",
                        line_no + 1
                    ));
                }
                let polygon: Vec<u32> = corners
                    .iter()
                    .map(|&corner| {
                        *lookup.entry(corner).or_insert_with(|| {
                            let normal = match corner.1 {
                                Some(index) => normals[index],
                                None => {
                                    missing_normals = true;
                                    Vec3::ZERO
                                }
                            };
                            mesh.push_vertex(positions[corner.0], normal)
                        })
                    })
                    .collect();
                for pair in polygon[1..].windows(2) {
                    mesh.indices.extend_from_slice(&[polygon[0], pair[0], pair[1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }
    if missing_normals {
        mesh.compute_normals();
    }
    Ok(mesh)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut component = || -> Result<f32> {
        let text = parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?;
        Ok(text.parse::<f32>()?)
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

/// Resolves `v`, `v/vt`, `v//vn` or `v/vt/vn` into zero-based indices.
fn resolve_corner(corner: &str, positions: usize, normals: usize) -> Result<(usize, Option<usize>)> {
    let mut segments = corner.split('/');
    let position = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("missing vertex index in `{corner}`"))?
        .parse::<i64>()?;
    let position = fix_index(position, positions)
        .ok_or_else(|| anyhow!("vertex index {position} out of range"))?;
    let _texcoord = segments.next();
    let normal = match segments.next().filter(|s| !s.is_empty()) {
        Some(text) => {
            let index = text.parse::<i64>()?;
            Some(fix_index(index, normals).ok_or_else(|| anyhow!("normal index {index} out of range"))?)
        }
        None => None,
    };
    Ok((position, normal))
}

fn fix_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let zero_based = match index {
        i if i > 0 => i - 1,
        i if i < 0 => len + i,
        _ => return None,
    };
    (0..len).contains(&zero_based).then_some(zero_based as usize)
}
