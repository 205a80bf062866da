/// STL file parser for binary and ASCII formats
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::many0,
    number::complete::double,
    sequence::preceded,
    IResult,
};

use crate::geometry::{face_normal, MeshGeometry};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// One STL facet: a stored normal and three corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facet {
    pub normal: Vector3<f64>,
    pub vertices: [Point3<f64>; 3],
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Vec<Facet>, String> {
    if data.len() < HEADER_LEN + 4 {
        return Err("File too small to be a valid STL".to_string());
    }

    let triangle_count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    let body = &data[HEADER_LEN + 4..];
    let expected = triangle_count
        .checked_mul(FACET_LEN)
        .ok_or_else(|| format!("Triangle count {} overflows", triangle_count))?;
    if body.len() < expected {
        return Err(format!(
            "Unexpected end of file: {} triangles need {} bytes, found {}",
            triangle_count,
            expected,
            body.len()
        ));
    }

    let facets = body
        .chunks_exact(FACET_LEN)
        .take(triangle_count)
        .map(|chunk| {
            // normal, three corners, then a 2-byte attribute count we ignore
            Facet {
                normal: read_vec3(chunk, 0),
                vertices: [
                    Point3::from(read_vec3(chunk, 12)),
                    Point3::from(read_vec3(chunk, 24)),
                    Point3::from(read_vec3(chunk, 36)),
                ],
            }
        })
        .collect();

    Ok(facets)
}

fn read_f32(data: &[u8], offset: usize) -> f64 {
    f32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]) as f64
}

fn read_vec3(data: &[u8], offset: usize) -> Vector3<f64> {
    Vector3::new(
        read_f32(data, offset),
        read_f32(data, offset + 4),
        read_f32(data, offset + 8),
    )
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Vec<Facet>, String> {
    match parse_ascii_stl_impl(input) {
        Ok((_, facets)) => Ok(facets),
        Err(e) => Err(format!("Failed to parse ASCII STL: {:?}", e)),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Vec<Facet>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, facets) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    Ok((input, facets))
}

fn parse_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input)?;
    let (input, v2) = parse_vertex(input)?;
    let (input, v3) = parse_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((
        input,
        Facet {
            normal,
            vertices: [v1, v2, v3],
        },
    ))
}

fn parse_vertex(input: &str) -> IResult<&str, Point3<f64>> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, v) = parse_vector3(input)?;
    Ok((input, Point3::from(v)))
}

fn parse_vector3(input: &str) -> IResult<&str, Vector3<f64>> {
    let (input, _) = multispace0(input)?;
    let (input, x) = double(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = double(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = double(input)?;
    Ok((input, Vector3::new(x, y, z)))
}

/// Detect and parse STL data (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Vec<Facet>, String> {
    // Binary files may also start with "solid", so fall back on failure
    if data.len() > 5 && &data[0..5] == b"solid" {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(facets) = parse_ascii_stl(text) {
                return Ok(facets);
            }
        }
    }

    parse_binary_stl(data)
}

/// Unindexed triangle soup: three vertices per facet.
///
/// A zero stored normal is replaced by the winding normal.
pub fn facets_to_geometry(facets: &[Facet]) -> MeshGeometry {
    let mut positions = Vec::with_capacity(facets.len() * 3);
    let mut normals = Vec::with_capacity(facets.len() * 3);
    let mut indices = Vec::with_capacity(facets.len() * 3);

    for facet in facets {
        let normal = facet
            .normal
            .try_normalize(1e-12)
            .or_else(|| face_normal(&facet.vertices))
            .unwrap_or_else(Vector3::zeros);
        for vertex in facet.vertices {
            indices.push(positions.len() as u32);
            positions.push(vertex);
            normals.push(normal);
        }
    }

    MeshGeometry::new(positions, normals, Vec::new(), indices)
}
