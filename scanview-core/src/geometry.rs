/// Mesh buffers and axis-aligned bounding boxes
use nalgebra::{Matrix4, Point2, Point3, Vector3};

use crate::graph::Resource;

/// Indexed triangle mesh. Each buffer is a separately freezable resource.
///
/// `triangle_indices.len()` is always a multiple of 3 for meshes built by
/// the importers in this crate.
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    pub positions: Resource<Vec<Point3<f64>>>,
    pub normals: Resource<Vec<Vector3<f64>>>,
    pub texture_coordinates: Resource<Vec<Point2<f64>>>,
    pub triangle_indices: Resource<Vec<u32>>,
}

impl MeshGeometry {
    pub fn new(
        positions: Vec<Point3<f64>>,
        normals: Vec<Vector3<f64>>,
        texture_coordinates: Vec<Point2<f64>>,
        triangle_indices: Vec<u32>,
    ) -> Self {
        Self {
            positions: Resource::new(positions),
            normals: Resource::new(normals),
            texture_coordinates: Resource::new(texture_coordinates),
            triangle_indices: Resource::new(triangle_indices),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    pub fn is_frozen(&self) -> bool {
        self.positions.is_frozen()
            && self.normals.is_frozen()
            && self.texture_coordinates.is_frozen()
            && self.triangle_indices.is_frozen()
    }

    /// Resolve the index buffer into world-space triangles.
    ///
    /// Indices that point past the position buffer are skipped.
    pub fn triangles(&self, world: &Matrix4<f64>) -> Vec<[Point3<f64>; 3]> {
        let positions = self.positions.read();
        let indices = self.triangle_indices.read();
        indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let a = positions.get(tri[0] as usize)?;
                let b = positions.get(tri[1] as usize)?;
                let c = positions.get(tri[2] as usize)?;
                Some([
                    world.transform_point(a),
                    world.transform_point(b),
                    world.transform_point(c),
                ])
            })
            .collect()
    }

    /// Create a cube centered at the origin: 24 vertices, 12 triangles.
    pub fn cube(size: f64) -> Self {
        let half = size / 2.0;
        // (normal, u axis, v axis) per face; corners are normal*half ± u*half ± v*half
        let faces = [
            (Vector3::z(), Vector3::x(), Vector3::y()),
            (-Vector3::z(), Vector3::y(), Vector3::x()),
            (Vector3::y(), Vector3::z(), Vector3::x()),
            (-Vector3::y(), Vector3::x(), Vector3::z()),
            (Vector3::x(), Vector3::y(), Vector3::z()),
            (-Vector3::x(), Vector3::z(), Vector3::y()),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (normal + u * su + v * sv) * half;
                positions.push(Point3::from(p));
                normals.push(normal);
                uvs.push(Point2::new((su + 1.0) / 2.0, (sv + 1.0) / 2.0));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(positions, normals, uvs, indices)
    }
}

/// Face normal of a triangle, or `None` when it is degenerate.
pub fn face_normal(tri: &[Point3<f64>; 3]) -> Option<Vector3<f64>> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    edge1.cross(&edge2).try_normalize(1e-12)
}

/// Axis-aligned box stored as min corner plus extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub size: Vector3<f64>,
}

impl Aabb {
    pub fn new(min: Point3<f64>, size: Vector3<f64>) -> Self {
        Self { min, size }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        });
        Some(Self::new(min, max - min))
    }

    pub fn max(&self) -> Point3<f64> {
        self.min + self.size
    }

    pub fn center(&self) -> Point3<f64> {
        self.min + self.size / 2.0
    }

    pub fn diagonal(&self) -> f64 {
        self.size.norm()
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let min = self.min.inf(&other.min);
        let max = self.max().sup(&other.max());
        Self::new(min, max - min)
    }

    pub fn corners(&self) -> [Point3<f64>; 8] {
        let (lo, hi) = (self.min, self.max());
        [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Bounds of this box after an affine transform.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Aabb {
        let corners = self.corners().map(|c| matrix.transform_point(&c));
        // from_points only returns None for an empty iterator
        Aabb::from_points(corners).unwrap_or(*self)
    }

    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.size.iter()).all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_counts() {
        let cube = MeshGeometry::cube(2.0);
        assert_eq!(cube.positions.read().len(), 24);
        assert_eq!(cube.triangle_indices.read().len(), 36);
        assert_eq!(cube.triangles(&Matrix4::identity()).len(), 12);
    }

    #[test]
    fn test_cube_normals_point_outwards() {
        let cube = MeshGeometry::cube(2.0);
        for tri in cube.triangles(&Matrix4::identity()) {
            let normal = face_normal(&tri).unwrap();
            let centroid = (tri[0].coords + tri[1].coords + tri[2].coords) / 3.0;
            assert!(normal.dot(&centroid) > 0.0);
        }
    }

    #[test]
    fn test_aabb_from_points() {
        let bounds = Aabb::from_points([
            Point3::new(-1.0, 2.0, 0.0),
            Point3::new(3.0, -2.0, 1.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.size, Vector3::new(4.0, 4.0, 1.0));
        assert_eq!(bounds.center(), Point3::new(1.0, 0.0, 0.5));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_aabb_union() {
        let a = Aabb::new(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(2.0, -1.0, 0.5), Vector3::new(1.0, 1.0, 1.0));
        let u = a.union(&b);
        assert_eq!(u.min, Point3::new(0.0, -1.0, 0.0));
        assert_eq!(u.max(), Point3::new(3.0, 1.0, 1.5));
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        let mesh = MeshGeometry::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            Vec::new(),
            Vec::new(),
            vec![0, 1, 2, 0, 1, 7],
        );
        assert_eq!(mesh.triangles(&Matrix4::identity()).len(), 1);
    }
}
