/// Alignment of a model's principal axis to the calibration target
use log::info;
use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AlignmentError;
use crate::geometry::Aabb;
use crate::metrics::{align_vector_to, principal_axis, AxisAngle};
use crate::scene::ActiveModel;
use crate::transform::Transform3D;

/// Reference axes and the target direction, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationData {
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
    pub z_axis: Vector3<f64>,
    pub target: Vector3<f64>,
}

impl CalibrationData {
    pub fn summary(&self) -> String {
        format!(
            "Ref Axes => X{}  Y{}  Z{}; Target: {}",
            fmt_vector(&self.x_axis),
            fmt_vector(&self.y_axis),
            fmt_vector(&self.z_axis),
            fmt_vector(&self.target)
        )
    }
}

impl Default for CalibrationData {
    fn default() -> Self {
        Self {
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
            z_axis: Vector3::z(),
            target: Vector3::z(),
        }
    }
}

fn fmt_vector(v: &Vector3<f64>) -> String {
    format!("({},{},{})", v.x, v.y, v.z)
}

/// XYZ angles in degrees, displayed as pitch about X, yaw about Y and
/// roll about Z.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerAngles {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl EulerAngles {
    pub fn from_quaternion(q: &UnitQuaternion<f64>) -> Self {
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);

        let about_x = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        // gimbal lock pushes this just outside [-1, 1]
        let about_y = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
        let about_z = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

        Self {
            pitch: about_x.to_degrees(),
            yaw: about_y.to_degrees(),
            roll: about_z.to_degrees(),
        }
    }
}

impl fmt::Display for EulerAngles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pitch: {:.3}  Yaw: {:.3}  Roll: {:.3}",
            self.pitch, self.yaw, self.roll
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentResult {
    pub principal_axis: Unit<Vector3<f64>>,
    pub rotation: AxisAngle,
    pub quaternion: UnitQuaternion<f64>,
    pub euler: EulerAngles,
}

impl AlignmentResult {
    pub fn angle_degrees(&self) -> f64 {
        self.rotation.angle_degrees
    }

    pub fn summary(&self) -> String {
        format!(
            "Aligned principal axis to Target; Δθ≈{:.3}°",
            self.angle_degrees()
        )
    }
}

/// Rotation taking the dominant axis of `bounds` onto the calibration target.
pub fn compute_alignment(
    bounds: &Aabb,
    calibration: &CalibrationData,
) -> Result<AlignmentResult, AlignmentError> {
    if !bounds.is_finite() {
        return Err(AlignmentError::Failure(format!(
            "model bounds are not finite: {:?}",
            bounds
        )));
    }
    let axis = principal_axis(bounds);
    let rotation = align_vector_to(&axis, &calibration.target).ok_or_else(|| {
        AlignmentError::Failure(format!(
            "cannot align {} to target {}",
            fmt_vector(&axis),
            fmt_vector(&calibration.target)
        ))
    })?;
    let quaternion = rotation.quaternion();

    Ok(AlignmentResult {
        principal_axis: axis,
        rotation,
        quaternion,
        euler: EulerAngles::from_quaternion(&quaternion),
    })
}

/// Align the active model and append the rotation to its transform chain.
pub fn align_active_model(
    model: Option<&mut ActiveModel>,
    calibration: &CalibrationData,
) -> Result<AlignmentResult, AlignmentError> {
    let model = model.ok_or(AlignmentError::NoActiveModel)?;
    let bounds = model
        .bounds()
        .ok_or_else(|| AlignmentError::Failure("active model has no geometry".to_string()))?;
    let result = compute_alignment(&bounds, calibration)?;

    model
        .transform_mut()
        .push(Transform3D::Rotation(result.quaternion));
    info!(
        "AlignDevice principal={} target={} angle={:.3}",
        fmt_vector(&result.principal_axis),
        fmt_vector(&calibration.target),
        result.angle_degrees()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn bounds_with_size(x: f64, y: f64, z: f64) -> Aabb {
        Aabb::new(Point3::origin(), Vector3::new(x, y, z))
    }

    #[test]
    fn test_x_principal_to_z_target_is_quarter_turn() {
        let result =
            compute_alignment(&bounds_with_size(10.0, 5.0, 2.0), &CalibrationData::default()).unwrap();
        assert_eq!(result.principal_axis, Vector3::x_axis());
        assert!((result.angle_degrees() - 90.0).abs() < 1e-9);
        assert!((result.quaternion * Vector3::x() - Vector3::z()).norm() < 1e-9);
        assert_eq!(result.summary(), "Aligned principal axis to Target; Δθ≈90.000°");
    }

    #[test]
    fn test_already_aligned() {
        let result =
            compute_alignment(&bounds_with_size(1.0, 2.0, 9.0), &CalibrationData::default()).unwrap();
        assert_eq!(result.angle_degrees(), 0.0);
        assert_eq!(result.euler, EulerAngles { pitch: 0.0, yaw: 0.0, roll: 0.0 });
    }

    #[test]
    fn test_non_finite_bounds_fail() {
        let bounds = Aabb::new(Point3::origin(), Vector3::new(f64::NAN, 1.0, 1.0));
        assert!(matches!(
            compute_alignment(&bounds, &CalibrationData::default()),
            Err(AlignmentError::Failure(_))
        ));
    }

    #[test]
    fn test_zero_target_fails() {
        let calibration = CalibrationData {
            target: Vector3::zeros(),
            ..Default::default()
        };
        assert!(matches!(
            compute_alignment(&bounds_with_size(1.0, 1.0, 1.0), &calibration),
            Err(AlignmentError::Failure(_))
        ));
    }

    #[test]
    fn test_no_active_model() {
        assert_eq!(
            align_active_model(None, &CalibrationData::default()),
            Err(AlignmentError::NoActiveModel)
        );
    }

    #[test]
    fn test_euler_single_axis_rotations() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 20f64.to_radians());
        let euler = EulerAngles::from_quaternion(&q);
        assert!((euler.pitch - 20.0).abs() < 1e-9);
        assert!(euler.yaw.abs() < 1e-9 && euler.roll.abs() < 1e-9);

        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -90f64.to_radians());
        let euler = EulerAngles::from_quaternion(&q);
        assert!((euler.yaw + 90.0).abs() < 1e-6);

        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 30f64.to_radians());
        let euler = EulerAngles::from_quaternion(&q);
        assert!((euler.roll - 30.0).abs() < 1e-9);
        assert!(euler.pitch.abs() < 1e-9 && euler.yaw.abs() < 1e-9);
        assert_eq!(euler.to_string(), "Pitch: 0.000  Yaw: 0.000  Roll: 30.000");
    }

    #[test]
    fn test_x_principal_to_z_target_readout() {
        let result =
            compute_alignment(&bounds_with_size(10.0, 5.0, 2.0), &CalibrationData::default()).unwrap();
        assert_eq!(result.euler.to_string(), "Pitch: 0.000  Yaw: -90.000  Roll: 0.000");
    }

    #[test]
    fn test_calibration_summary() {
        assert_eq!(
            CalibrationData::default().summary(),
            "Ref Axes => X(1,0,0)  Y(0,1,0)  Z(0,0,1); Target: (0,0,1)"
        );
    }
}
