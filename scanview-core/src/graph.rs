/// Mesh graph: groups of geometry leaves with materials and transforms
///
/// Every resource a node owns lives in a [`Resource`] slot. Importers create
/// slots in the mutable state; [`crate::freeze`] moves them to the frozen
/// state, after which the graph is only ever read.
use nalgebra::Matrix4;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::geometry::{Aabb, MeshGeometry};
use crate::transform::TransformChain;

/// A resource slot that is either still mutable or frozen for shared reads.
///
/// Cloning a slot shares the underlying resource; it never copies it.
#[derive(Debug)]
pub enum Resource<T> {
    Mutable(Arc<Mutex<T>>),
    Frozen(Arc<T>),
}

impl<T> Resource<T> {
    pub fn new(value: T) -> Self {
        Resource::Mutable(Arc::new(Mutex::new(value)))
    }

    pub fn frozen(value: T) -> Self {
        Resource::Frozen(Arc::new(value))
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Resource::Frozen(_))
    }

    /// Borrow the value for reading.
    ///
    /// A poisoned lock is still readable: the reader sees whatever the
    /// panicking writer left behind.
    pub fn read(&self) -> ResourceRef<'_, T> {
        match self {
            Resource::Frozen(value) => ResourceRef::Frozen(value),
            Resource::Mutable(cell) => {
                ResourceRef::Locked(cell.lock().unwrap_or_else(PoisonError::into_inner))
            }
        }
    }

    /// Mutate the value in place. Returns `None` once the slot is frozen.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        match self {
            Resource::Frozen(_) => None,
            Resource::Mutable(cell) => {
                let mut guard = cell.lock().unwrap_or_else(PoisonError::into_inner);
                Some(f(&mut guard))
            }
        }
    }
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        match self {
            Resource::Mutable(cell) => Resource::Mutable(Arc::clone(cell)),
            Resource::Frozen(value) => Resource::Frozen(Arc::clone(value)),
        }
    }
}

/// Read access to a [`Resource`].
pub enum ResourceRef<'a, T> {
    Frozen(&'a T),
    Locked(MutexGuard<'a, T>),
}

impl<T> Deref for ResourceRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            ResourceRef::Frozen(value) => value,
            ResourceRef::Locked(guard) => guard,
        }
    }
}

/// Linear RGB colour; transparency lives on the [`Brush`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Solid colour brush used by every material kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub color: Color,
    pub opacity: f64,
}

impl Brush {
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            opacity: 1.0,
        }
    }
}

/// Surface material of a geometry leaf.
#[derive(Debug, Clone)]
pub enum Material {
    Diffuse(Resource<Brush>),
    Specular { brush: Resource<Brush>, power: f64 },
    Emissive(Resource<Brush>),
    Group(Vec<Material>),
}

impl Material {
    pub fn diffuse(color: Color) -> Self {
        Material::Diffuse(Resource::new(Brush::solid(color)))
    }

    /// Grey material assigned to meshes that carry none of their own.
    pub fn default_surface() -> Self {
        Self::diffuse(Color::rgb(0.75, 0.75, 0.75))
    }

    /// Visit every brush slot in the material tree.
    pub fn for_each_brush(&self, f: &mut impl FnMut(&Resource<Brush>)) {
        match self {
            Material::Diffuse(brush) | Material::Emissive(brush) => f(brush),
            Material::Specular { brush, .. } => f(brush),
            Material::Group(children) => {
                for child in children {
                    child.for_each_brush(f);
                }
            }
        }
    }
}

/// Interior node of the mesh graph.
#[derive(Debug, Clone, Default)]
pub struct GroupNode {
    pub name: String,
    pub children: Vec<ModelNode>,
    pub transform: Option<Resource<TransformChain>>,
}

/// Leaf node holding mesh buffers and their materials.
#[derive(Debug, Clone)]
pub struct GeometryNode {
    pub name: String,
    pub geometry: MeshGeometry,
    pub material: Option<Material>,
    pub back_material: Option<Material>,
    pub transform: Option<Resource<TransformChain>>,
}

impl GeometryNode {
    pub fn new(name: impl Into<String>, geometry: MeshGeometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            material: Some(Material::default_surface()),
            back_material: None,
            transform: None,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }
}

#[derive(Debug, Clone)]
pub enum ModelNode {
    Group(GroupNode),
    Geometry(GeometryNode),
}

impl ModelNode {
    pub fn group(name: impl Into<String>, children: Vec<ModelNode>) -> Self {
        ModelNode::Group(GroupNode {
            name: name.into(),
            children,
            transform: None,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            ModelNode::Group(group) => &group.name,
            ModelNode::Geometry(leaf) => &leaf.name,
        }
    }

    pub fn transform(&self) -> Option<&Resource<TransformChain>> {
        match self {
            ModelNode::Group(group) => group.transform.as_ref(),
            ModelNode::Geometry(leaf) => leaf.transform.as_ref(),
        }
    }

    /// Visit every geometry leaf depth-first together with its world matrix.
    pub fn visit_geometry(&self, f: &mut impl FnMut(&GeometryNode, &Matrix4<f64>)) {
        self.visit_with(&Matrix4::identity(), f);
    }

    fn visit_with(&self, parent: &Matrix4<f64>, f: &mut impl FnMut(&GeometryNode, &Matrix4<f64>)) {
        let world = match self.transform() {
            Some(chain) => parent * chain.read().matrix(),
            None => *parent,
        };
        match self {
            ModelNode::Group(group) => {
                for child in &group.children {
                    child.visit_with(&world, f);
                }
            }
            ModelNode::Geometry(leaf) => f(leaf, &world),
        }
    }

    /// World-space bounds of all geometry leaves, `None` when there is no vertex.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        self.visit_geometry(&mut |leaf, world| {
            let positions = leaf.geometry.positions.read();
            let local = Aabb::from_points(positions.iter().copied());
            if let Some(local) = local {
                let placed = local.transformed(world);
                bounds = Some(match bounds {
                    Some(acc) => acc.union(&placed),
                    None => placed,
                });
            }
        });
        bounds
    }

    /// Whether every slot in the subgraph is frozen.
    pub fn is_frozen(&self) -> bool {
        let mut frozen = true;
        let transforms_frozen = |node: &ModelNode| node.transform().map_or(true, Resource::is_frozen);
        self.walk(&mut |node| {
            frozen &= transforms_frozen(node);
            if let ModelNode::Geometry(leaf) = node {
                frozen &= leaf.geometry.is_frozen();
                for material in leaf.material.iter().chain(leaf.back_material.iter()) {
                    material.for_each_brush(&mut |brush| frozen &= brush.is_frozen());
                }
            }
        });
        frozen
    }

    fn walk(&self, f: &mut impl FnMut(&ModelNode)) {
        f(self);
        if let ModelNode::Group(group) = self {
            for child in &group.children {
                child.walk(f);
            }
        }
    }
}

impl From<GeometryNode> for ModelNode {
    fn from(leaf: GeometryNode) -> Self {
        ModelNode::Geometry(leaf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform3D;
    use nalgebra::Vector3;

    #[test]
    fn test_resource_clone_shares_value() {
        let slot = Resource::new(vec![1u32, 2, 3]);
        let shared = slot.clone();
        slot.modify(|v| v.push(4));
        assert_eq!(shared.read().len(), 4);
    }

    #[test]
    fn test_frozen_resource_rejects_modify() {
        let slot = Resource::frozen(1.0f64);
        assert!(slot.modify(|v| *v = 2.0).is_none());
        assert_eq!(*slot.read(), 1.0);
    }

    #[test]
    fn test_bounds_apply_group_transform() {
        let mut group = GroupNode {
            name: "root".into(),
            children: vec![GeometryNode::new("cube", MeshGeometry::cube(2.0)).into()],
            transform: None,
        };
        let mut chain = TransformChain::new();
        chain.push(Transform3D::Translation(Vector3::new(10.0, 0.0, 0.0)));
        group.transform = Some(Resource::new(chain));

        let bounds = ModelNode::Group(group).bounds().unwrap();
        assert!((bounds.min.x - 9.0).abs() < 1e-12);
        assert!((bounds.size.x - 2.0).abs() < 1e-12);
        assert!((bounds.center().x - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_group_has_no_bounds() {
        let node = ModelNode::group("empty", Vec::new());
        assert!(node.bounds().is_none());
    }
}
