/// Mesh metrics: triangle counts, centers of mass, bounds and axis alignment
use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};
use std::time::Duration;

use crate::geometry::{Aabb, MeshGeometry};
use crate::graph::ModelNode;

/// Cross products with a squared norm below this are treated as zero.
const PARALLEL_EPSILON: f64 = 1e-12;

pub fn triangle_count(mesh: &MeshGeometry) -> usize {
    mesh.triangle_indices.read().len() / 3
}

/// Arithmetic mean of the vertex positions; the origin for an empty mesh.
pub fn center_of_mass(mesh: &MeshGeometry) -> Point3<f64> {
    let positions = mesh.positions.read();
    if positions.is_empty() {
        return Point3::origin();
    }
    let sum = positions
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / positions.len() as f64)
}

pub fn bounding_box(graph: &ModelNode) -> Option<Aabb> {
    graph.bounds()
}

/// Coordinate axis of the largest extent. Ties resolve X, then Y, then Z.
pub fn principal_axis(bounds: &Aabb) -> Unit<Vector3<f64>> {
    let (x, y, z) = (bounds.size.x, bounds.size.y, bounds.size.z);
    if x >= y && x >= z {
        Vector3::x_axis()
    } else if y >= z {
        Vector3::y_axis()
    } else {
        Vector3::z_axis()
    }
}

/// A rotation given as unit axis plus angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAngle {
    pub axis: Unit<Vector3<f64>>,
    pub angle_degrees: f64,
}

impl AxisAngle {
    pub fn identity() -> Self {
        Self {
            axis: Vector3::x_axis(),
            angle_degrees: 0.0,
        }
    }

    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&self.axis, self.angle_degrees.to_radians())
    }
}

/// Minimal rotation taking `from` onto `to`.
///
/// Returns `None` when either vector has no direction.
pub fn align_vector_to(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<AxisAngle> {
    let from = from.try_normalize(f64::EPSILON)?;
    let to = to.try_normalize(f64::EPSILON)?;
    let axis = from.cross(&to);
    let dot = from.dot(&to);

    if axis.norm_squared() < PARALLEL_EPSILON {
        if dot > 0.0 {
            return Some(AxisAngle::identity());
        }
        let helper = least_aligned_axis(&from);
        let ortho = Unit::new_normalize(from.cross(&helper));
        return Some(AxisAngle {
            axis: ortho,
            angle_degrees: 180.0,
        });
    }

    Some(AxisAngle {
        axis: Unit::new_normalize(axis),
        angle_degrees: dot.clamp(-1.0, 1.0).acos().to_degrees(),
    })
}

/// Coordinate axis with the smallest absolute component in `v`.
fn least_aligned_axis(v: &Vector3<f64>) -> Vector3<f64> {
    let (ax, ay, az) = (v.x.abs(), v.y.abs(), v.z.abs());
    if ax <= ay && ax <= az {
        Vector3::x()
    } else if ay <= az {
        Vector3::y()
    } else {
        Vector3::z()
    }
}

/// Metrics computed once per load.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetrics {
    pub file_name: String,
    pub load_duration: Duration,
    pub triangle_count: usize,
    pub bounding_box: Option<Aabb>,
    pub center_of_mass: Point3<f64>,
}

impl ModelMetrics {
    /// Measure a graph.
    ///
    /// The center of mass is the unweighted mean of each geometry leaf's own
    /// center, so a small submesh weighs as much as a large one.
    pub fn measure(file_name: impl Into<String>, load_duration: Duration, graph: &ModelNode) -> Self {
        let mut triangles = 0;
        let mut com_sum = Vector3::zeros();
        let mut com_samples = 0usize;

        graph.visit_geometry(&mut |leaf, _| {
            triangles += triangle_count(&leaf.geometry);
            com_sum += center_of_mass(&leaf.geometry).coords;
            com_samples += 1;
        });

        let center_of_mass = if com_samples > 0 {
            Point3::from(com_sum / com_samples as f64)
        } else {
            Point3::origin()
        };

        Self {
            file_name: file_name.into(),
            load_duration,
            triangle_count: triangles,
            bounding_box: bounding_box(graph),
            center_of_mass,
        }
    }

    pub fn extents(&self) -> Vector3<f64> {
        self.bounding_box.map_or_else(Vector3::zeros, |b| b.size)
    }

    pub fn bounding_box_summary(&self) -> String {
        let size = self.extents();
        format!(
            "Bounding Box (mm): X={:.3}  Y={:.3}  Z={:.3}",
            size.x, size.y, size.z
        )
    }

    pub fn load_duration_summary(&self) -> String {
        format!("Load: {:.1} ms", self.load_duration.as_secs_f64() * 1000.0)
    }

    pub fn center_of_mass_summary(&self) -> String {
        let c = self.center_of_mass;
        format!("COM (mm): {:.3}, {:.3}, {:.3}", c.x, c.y, c.z)
    }
}
