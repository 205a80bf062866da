/// Wavefront OBJ import through `tobj`
///
/// Every OBJ object becomes one geometry leaf under a root group. Leaves that
/// reference the same `.mtl` material share its brushes until freezing.
use log::warn;
use nalgebra::{Point2, Point3, Vector3};
use std::path::Path;

use crate::error::ImportError;
use crate::geometry::MeshGeometry;
use crate::graph::{Brush, Color, GeometryNode, Material, ModelNode, Resource};

pub fn load_obj(path: &Path) -> Result<ModelNode, ImportError> {
    let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)?;
    let materials = materials.unwrap_or_else(|e| {
        warn!("Ignoring materials for {}: {}", path.display(), e);
        Vec::new()
    });
    let materials: Vec<Material> = materials.iter().map(convert_material).collect();

    let children = models
        .into_iter()
        .map(|model| {
            let material = model
                .mesh
                .material_id
                .and_then(|id| materials.get(id).cloned())
                .unwrap_or_else(Material::default_surface);
            GeometryNode::new(model.name, convert_mesh(&model.mesh))
                .with_material(material)
                .into()
        })
        .collect();

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ModelNode::group(name, children))
}

fn convert_mesh(mesh: &tobj::Mesh) -> MeshGeometry {
    let positions = mesh
        .positions
        .chunks_exact(3)
        .map(|p| Point3::new(p[0] as f64, p[1] as f64, p[2] as f64))
        .collect();
    let normals = mesh
        .normals
        .chunks_exact(3)
        .map(|n| Vector3::new(n[0] as f64, n[1] as f64, n[2] as f64))
        .collect();
    let texture_coordinates = mesh
        .texcoords
        .chunks_exact(2)
        .map(|t| Point2::new(t[0] as f64, t[1] as f64))
        .collect();
    MeshGeometry::new(positions, normals, texture_coordinates, mesh.indices.clone())
}

fn convert_material(material: &tobj::Material) -> Material {
    let opacity = material.dissolve.map_or(1.0, f64::from);
    let brush = |rgb: [f32; 3]| {
        Resource::new(Brush {
            color: Color::rgb(rgb[0], rgb[1], rgb[2]),
            opacity,
        })
    };

    let mut layers = Vec::new();
    if let Some(diffuse) = material.diffuse {
        layers.push(Material::Diffuse(brush(diffuse)));
    }
    if let Some(specular) = material.specular {
        layers.push(Material::Specular {
            brush: brush(specular),
            power: material.shininess.map_or(0.0, f64::from),
        });
    }
    if let Some(emissive) = material.unknown_param.get("Ke").and_then(|v| parse_rgb(v)) {
        layers.push(Material::Emissive(brush(emissive)));
    }

    match layers.len() {
        0 => Material::default_surface(),
        1 => layers.remove(0),
        _ => Material::Group(layers),
    }
}

fn parse_rgb(value: &str) -> Option<[f32; 3]> {
    let mut parts = value.split_whitespace().map(str::parse::<f32>);
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;
    Some([r, g, b])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(diffuse: Option<[f32; 3]>, specular: Option<[f32; 3]>) -> tobj::Material {
        tobj::Material {
            diffuse,
            specular,
            shininess: Some(32.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_rgb() {
        assert_eq!(parse_rgb("0.5 1 0"), Some([0.5, 1.0, 0.0]));
        assert_eq!(parse_rgb("0.5 x 0"), None);
        assert_eq!(parse_rgb("0.5"), None);
    }

    #[test]
    fn test_single_layer_material() {
        match convert_material(&material(Some([1.0, 0.0, 0.0]), None)) {
            Material::Diffuse(brush) => assert_eq!(brush.read().color, Color::rgb(1.0, 0.0, 0.0)),
            other => panic!("unexpected material {:?}", other),
        }
    }

    #[test]
    fn test_layered_material_becomes_group() {
        match convert_material(&material(Some([1.0, 1.0, 1.0]), Some([0.5, 0.5, 0.5]))) {
            Material::Group(layers) => {
                assert_eq!(layers.len(), 2);
                assert!(matches!(layers[1], Material::Specular { power, .. } if power == 32.0));
            }
            other => panic!("unexpected material {:?}", other),
        }
    }

    #[test]
    fn test_empty_material_falls_back_to_default() {
        let converted = convert_material(&tobj::Material::default());
        assert!(matches!(converted, Material::Diffuse(_)));
    }
}
