/// Best-effort conversion of a mesh graph into its frozen, shareable form
///
/// Freezing walks the graph post-order. Each resource slot is first frozen in
/// place, which moves the value out of its lock without copying. A slot that
/// is still shared with another owner is cloned and the clone frozen instead.
/// A slot whose lock is poisoned cannot be cloned safely and is left mutable.
/// None of these outcomes is an error; they are counted in a [`FreezeReport`].
use log::{debug, warn};
use std::sync::{Arc, Mutex};

use crate::geometry::{Aabb, MeshGeometry};
use crate::graph::{GeometryNode, GroupNode, Material, ModelNode, Resource};

/// Outcome counts of one freeze pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FreezeReport {
    pub frozen_in_place: usize,
    pub cloned: usize,
    pub left_mutable: usize,
    pub already_frozen: usize,
}

impl FreezeReport {
    /// Whether every slot ended up frozen.
    pub fn is_complete(&self) -> bool {
        self.left_mutable == 0
    }

    pub fn total(&self) -> usize {
        self.frozen_in_place + self.cloned + self.left_mutable + self.already_frozen
    }
}

/// An immutable mesh graph that may be read from any thread.
///
/// Cloning shares the graph. Bounds are computed once at construction.
#[derive(Debug, Clone)]
pub struct FrozenModel {
    root: Arc<ModelNode>,
    bounds: Option<Aabb>,
}

impl FrozenModel {
    pub fn root(&self) -> &ModelNode {
        &self.root
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }
}

/// Freeze an entire graph. Never fails; see [`FreezeReport`] for what happened.
pub fn freeze(root: ModelNode) -> (FrozenModel, FreezeReport) {
    let mut report = FreezeReport::default();
    let root = freeze_node(root, &mut report);
    if report.is_complete() {
        debug!(
            "Froze graph '{}': in_place={} cloned={} already={}",
            root.name(),
            report.frozen_in_place,
            report.cloned,
            report.already_frozen
        );
    } else {
        warn!(
            "Graph '{}' only partially frozen: {} resource(s) left mutable",
            root.name(),
            report.left_mutable
        );
    }
    let bounds = root.bounds();
    (
        FrozenModel {
            root: Arc::new(root),
            bounds,
        },
        report,
    )
}

/// Freeze one node: children and owned resources first, then the node.
pub fn freeze_node(node: ModelNode, report: &mut FreezeReport) -> ModelNode {
    match node {
        ModelNode::Group(group) => {
            let children = group
                .children
                .into_iter()
                .map(|child| freeze_node(child, report))
                .collect();
            ModelNode::Group(GroupNode {
                name: group.name,
                children,
                transform: group.transform.map(|t| freeze_resource(t, report)),
            })
        }
        ModelNode::Geometry(leaf) => ModelNode::Geometry(GeometryNode {
            name: leaf.name,
            geometry: freeze_geometry(leaf.geometry, report),
            material: leaf.material.map(|m| freeze_material(m, report)),
            back_material: leaf.back_material.map(|m| freeze_material(m, report)),
            transform: leaf.transform.map(|t| freeze_resource(t, report)),
        }),
    }
}

fn freeze_geometry(geometry: MeshGeometry, report: &mut FreezeReport) -> MeshGeometry {
    MeshGeometry {
        positions: freeze_resource(geometry.positions, report),
        normals: freeze_resource(geometry.normals, report),
        texture_coordinates: freeze_resource(geometry.texture_coordinates, report),
        triangle_indices: freeze_resource(geometry.triangle_indices, report),
    }
}

fn freeze_material(material: Material, report: &mut FreezeReport) -> Material {
    match material {
        Material::Group(children) => Material::Group(
            children
                .into_iter()
                .map(|child| freeze_material(child, report))
                .collect(),
        ),
        Material::Diffuse(brush) => Material::Diffuse(freeze_resource(brush, report)),
        Material::Specular { brush, power } => Material::Specular {
            brush: freeze_resource(brush, report),
            power,
        },
        Material::Emissive(brush) => Material::Emissive(freeze_resource(brush, report)),
    }
}

/// Freeze one slot: in place, else via clone, else leave it mutable.
pub fn freeze_resource<T: Clone>(slot: Resource<T>, report: &mut FreezeReport) -> Resource<T> {
    let cell = match slot {
        Resource::Frozen(value) => {
            report.already_frozen += 1;
            return Resource::Frozen(value);
        }
        Resource::Mutable(cell) => cell,
    };

    let cell = if cell.is_poisoned() {
        cell
    } else {
        match Arc::try_unwrap(cell) {
            Ok(mutex) => match mutex.into_inner() {
                Ok(value) => {
                    report.frozen_in_place += 1;
                    return Resource::Frozen(Arc::new(value));
                }
                Err(poisoned) => Arc::new(Mutex::new(poisoned.into_inner())),
            },
            Err(shared) => shared,
        }
    };

    // the guard must be released before `cell` can move back into the slot
    let cloned = cell.lock().map(|guard| guard.clone()).ok();
    match cloned {
        Some(value) => {
            report.cloned += 1;
            Resource::Frozen(Arc::new(value))
        }
        None => {
            report.left_mutable += 1;
            Resource::Mutable(cell)
        }
    }
}
