/// 3D transforms and ordered transform chains
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

/// A single affine transform step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform3D {
    Translation(Vector3<f64>),
    Rotation(UnitQuaternion<f64>),
    Scale(Vector3<f64>),
}

impl Transform3D {
    pub fn matrix(&self) -> Matrix4<f64> {
        match self {
            Transform3D::Translation(offset) => Matrix4::new_translation(offset),
            Transform3D::Rotation(rotation) => rotation.to_homogeneous(),
            Transform3D::Scale(factors) => Matrix4::new_nonuniform_scaling(factors),
        }
    }
}

/// Ordered list of transforms. Later steps apply after earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformChain {
    steps: Vec<Transform3D>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step; it is composed after every existing step.
    pub fn push(&mut self, step: Transform3D) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        self.steps
            .iter()
            .fold(Matrix4::identity(), |acc, step| step.matrix() * acc)
    }

    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.matrix().transform_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = TransformChain::new();
        assert!((chain.matrix() - Matrix4::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_steps_compose_in_order() {
        let mut chain = TransformChain::new();
        chain.push(Transform3D::Translation(Vector3::new(1.0, 0.0, 0.0)));
        chain.push(Transform3D::Rotation(UnitQuaternion::from_axis_angle(
            &Vector3::z_axis(),
            std::f64::consts::FRAC_PI_2,
        )));

        // translate first, then rotate about Z: (1,0,0) -> (0,1,0)
        let p = chain.transform_point(&Point3::origin());
        assert!((p - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_scale_step() {
        let step = Transform3D::Scale(Vector3::new(2.0, 3.0, 4.0));
        let p = step.matrix().transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Point3::new(2.0, 3.0, 4.0));
    }
}
