/// Keyboard-driven orbit camera
///
/// Every navigation key maps to one [`CameraCommand`]. A command is a pure
/// function of the camera state, the orbit target and a magnitude; the
/// [`OrbitController`] only looks up the command, picks the magnitude and
/// commits the result.
use nalgebra::{Point3, Unit, Vector3};

use crate::config::NavigationConfig;
use crate::geometry::Aabb;

/// Axes with a squared length below this do not rotate anything.
const DEGENERATE_AXIS_EPSILON: f64 = 1e-12;
const COINCIDENT_DISTANCE: f64 = 1e-9;
const MIN_DOLLY_DISTANCE: f64 = 0.1;
/// Field of view used when framing a model.
const FRAMING_FOV_DEGREES: f64 = 45.0;

/// Rotate `v` about `axis` by `angle_degrees` (Rodrigues' rotation formula).
pub fn rotate_around(v: &Vector3<f64>, axis: &Vector3<f64>, angle_degrees: f64) -> Vector3<f64> {
    if axis.norm_squared() < DEGENERATE_AXIS_EPSILON {
        return *v;
    }
    let axis = axis.normalize();
    let (s, c) = angle_degrees.to_radians().sin_cos();
    v * c + axis.cross(v) * s + axis * axis.dot(v) * (1.0 - c)
}

/// Camera position plus an orthonormal look/up basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    position: Point3<f64>,
    look: Unit<Vector3<f64>>,
    up: Unit<Vector3<f64>>,
}

impl CameraState {
    /// Build a camera, orthogonalizing `up` against `look`.
    ///
    /// Returns `None` if `look` has no direction or is parallel to `up`.
    pub fn new(position: Point3<f64>, look: Vector3<f64>, up: Vector3<f64>) -> Option<Self> {
        let look = look.try_normalize(DEGENERATE_AXIS_EPSILON)?;
        let right = look.cross(&up).try_normalize(DEGENERATE_AXIS_EPSILON)?;
        Some(Self {
            position,
            look: Unit::new_unchecked(look),
            up: Unit::new_normalize(right.cross(&look)),
        })
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn look(&self) -> Unit<Vector3<f64>> {
        self.look
    }

    pub fn up(&self) -> Unit<Vector3<f64>> {
        self.up
    }

    pub fn right(&self) -> Unit<Vector3<f64>> {
        Unit::new_normalize(self.look.cross(&self.up.into_inner()))
    }

    /// Commit a raw basis: renormalize, then re-orthogonalize `up`.
    ///
    /// Falls back to the previous look when `look` collapses, and to the
    /// previous right vector when `look` and `up` become parallel.
    fn with_basis(&self, position: Point3<f64>, look: Vector3<f64>, up: Vector3<f64>) -> Self {
        let look = look
            .try_normalize(DEGENERATE_AXIS_EPSILON)
            .unwrap_or_else(|| self.look.into_inner());
        let right = look
            .cross(&up)
            .try_normalize(DEGENERATE_AXIS_EPSILON)
            .unwrap_or_else(|| self.right().into_inner());
        Self {
            position,
            look: Unit::new_normalize(look),
            up: Unit::new_normalize(right.cross(&look)),
        }
    }

    /// `CamPos: x,y,z  LookDir: x,y,z` with three decimals.
    pub fn readout(&self) -> String {
        let p = self.position;
        let l = self.look;
        format!(
            "CamPos: {:.3},{:.3},{:.3}  LookDir: {:.3},{:.3},{:.3}",
            p.x, p.y, p.z, l.x, l.y, l.z
        )
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 10.0),
            look: Unit::new_unchecked(Vector3::new(0.0, 0.0, -1.0)),
            up: Vector3::y_axis(),
        }
    }
}

/// Pivot point that orbit commands rotate around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitTarget(pub Point3<f64>);

impl Default for OrbitTarget {
    fn default() -> Self {
        Self(Point3::origin())
    }
}

/// Keys the navigation layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Plus,
    Minus,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCommand {
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
    RollCounterClockwise,
    RollClockwise,
    DollyIn,
    DollyOut,
    PanLeft,
    PanRight,
    PanDown,
    PanUp,
}

impl CameraCommand {
    pub fn from_key(key: NavKey) -> Option<Self> {
        let command = match key {
            NavKey::Left => CameraCommand::YawLeft,
            NavKey::Right => CameraCommand::YawRight,
            NavKey::Up => CameraCommand::PitchUp,
            NavKey::Down => CameraCommand::PitchDown,
            NavKey::PageUp => CameraCommand::RollCounterClockwise,
            NavKey::PageDown => CameraCommand::RollClockwise,
            NavKey::Plus => CameraCommand::DollyIn,
            NavKey::Minus => CameraCommand::DollyOut,
            NavKey::Char(c) => match c.to_ascii_lowercase() {
                'w' => CameraCommand::DollyIn,
                's' => CameraCommand::DollyOut,
                'a' => CameraCommand::PanLeft,
                'd' => CameraCommand::PanRight,
                'q' => CameraCommand::PanDown,
                'e' => CameraCommand::PanUp,
                _ => return None,
            },
        };
        Some(command)
    }

    /// Whether the magnitude is a distance rather than an angle.
    pub fn is_translation(&self) -> bool {
        matches!(
            self,
            CameraCommand::DollyIn
                | CameraCommand::DollyOut
                | CameraCommand::PanLeft
                | CameraCommand::PanRight
                | CameraCommand::PanDown
                | CameraCommand::PanUp
        )
    }

    /// Apply the command. `magnitude` is in degrees for rotations and model
    /// units for translations.
    pub fn apply(
        self,
        camera: &CameraState,
        target: &OrbitTarget,
        magnitude: f64,
    ) -> (CameraState, OrbitTarget) {
        let pivot = target.0;
        let mut look = camera.look.into_inner();
        let mut up = camera.up.into_inner();
        let right = camera.right().into_inner();
        let mut position = camera.position;
        let mut pivot_after = pivot;

        let mut to_camera = position - pivot;
        let mut distance = to_camera.norm();
        if distance < COINCIDENT_DISTANCE {
            to_camera = -look;
            distance = to_camera.norm().max(1.0);
        }

        let orbit = |axis: &Vector3<f64>, angle: f64| {
            let rotated = rotate_around(&to_camera, axis, angle);
            let position = pivot + rotated;
            (position, pivot - position)
        };

        match self {
            CameraCommand::YawLeft | CameraCommand::YawRight => {
                let sign = if self == CameraCommand::YawLeft { 1.0 } else { -1.0 };
                (position, look) = orbit(&up, sign * magnitude);
            }
            CameraCommand::PitchUp | CameraCommand::PitchDown => {
                let sign = if self == CameraCommand::PitchUp { 1.0 } else { -1.0 };
                (position, look) = orbit(&right, sign * magnitude);
                let new_right = look
                    .cross(&up)
                    .try_normalize(DEGENERATE_AXIS_EPSILON)
                    .unwrap_or(right);
                up = new_right.cross(&look);
            }
            CameraCommand::RollCounterClockwise => up = rotate_around(&up, &look, magnitude),
            CameraCommand::RollClockwise => up = rotate_around(&up, &look, -magnitude),
            CameraCommand::DollyIn | CameraCommand::DollyOut => {
                let new_distance = if self == CameraCommand::DollyIn {
                    (distance - magnitude).max(MIN_DOLLY_DISTANCE)
                } else {
                    (distance + magnitude).max(MIN_DOLLY_DISTANCE)
                };
                let toward_target = -to_camera.normalize();
                position = pivot - toward_target * new_distance;
                look = pivot - position;
            }
            CameraCommand::PanLeft => (position, pivot_after) = (position - right * magnitude, pivot - right * magnitude),
            CameraCommand::PanRight => (position, pivot_after) = (position + right * magnitude, pivot + right * magnitude),
            CameraCommand::PanDown => (position, pivot_after) = (position - up * magnitude, pivot - up * magnitude),
            CameraCommand::PanUp => (position, pivot_after) = (position + up * magnitude, pivot + up * magnitude),
        }

        (camera.with_basis(position, look, up), OrbitTarget(pivot_after))
    }
}

/// Outcome of a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyResponse {
    /// The key moved the camera; carries the new orientation readout.
    Handled(String),
    Ignored,
}

impl KeyResponse {
    pub fn is_handled(&self) -> bool {
        matches!(self, KeyResponse::Handled(_))
    }
}

/// Owns the camera state and orbit target on the main context.
#[derive(Debug, Clone)]
pub struct OrbitController {
    camera: CameraState,
    target: OrbitTarget,
    navigation: NavigationConfig,
}

impl OrbitController {
    pub fn new(navigation: NavigationConfig) -> Self {
        Self {
            camera: CameraState::default(),
            target: OrbitTarget::default(),
            navigation,
        }
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn target(&self) -> &OrbitTarget {
        &self.target
    }

    pub fn set_camera(&mut self, camera: CameraState) {
        self.camera = camera;
    }

    pub fn set_target(&mut self, target: Point3<f64>) {
        self.target = OrbitTarget(target);
    }

    pub fn handle_key(&mut self, key: NavKey, fast: bool) -> KeyResponse {
        match CameraCommand::from_key(key) {
            Some(command) => KeyResponse::Handled(self.execute(command, fast)),
            None => KeyResponse::Ignored,
        }
    }

    /// Run one command and return the orientation readout.
    pub fn execute(&mut self, command: CameraCommand, fast: bool) -> String {
        let magnitude = if command.is_translation() {
            self.navigation.move_step(fast)
        } else {
            self.navigation.rotation_step(fast)
        };
        let (camera, target) = command.apply(&self.camera, &self.target, magnitude);
        self.camera = camera;
        self.target = target;
        self.camera.readout()
    }

    /// Keep the view direction, aim at the box center and back off until the
    /// bounding sphere fits the framing field of view.
    pub fn frame_bounds(&mut self, bounds: &Aabb) {
        let center = bounds.center();
        let radius = (bounds.diagonal() / 2.0).max(0.5);
        let distance = radius / (FRAMING_FOV_DEGREES.to_radians() / 2.0).sin();
        self.camera.position = center - self.camera.look.into_inner() * distance;
        self.target = OrbitTarget(center);
    }

    /// Default orientation, framed on `bounds` if there are any.
    pub fn reset(&mut self, bounds: Option<&Aabb>) {
        self.camera = CameraState::default();
        self.target = OrbitTarget::default();
        if let Some(bounds) = bounds {
            self.frame_bounds(bounds);
        }
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}
