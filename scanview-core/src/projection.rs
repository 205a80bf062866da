/// View and projection matrices for a camera state
use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

use crate::camera::CameraState;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    Orthographic,
    #[default]
    Perspective,
}

/// Screen-space lens around a [`CameraState`].
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub mode: ProjectionMode,
}

impl Projection {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            fov: std::f64::consts::FRAC_PI_4,
            aspect: width as f64 / height.max(1) as f64,
            near: 0.1,
            far: 10_000.0,
            mode: ProjectionMode::Perspective,
        }
    }

    pub fn with_mode(mut self, mode: ProjectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f64 / height.max(1) as f64;
    }

    pub fn view_matrix(camera: &CameraState) -> Matrix4<f64> {
        let eye = camera.position();
        Matrix4::look_at_rh(
            &eye,
            &(eye + camera.look().into_inner()),
            &camera.up().into_inner(),
        )
    }

    /// `distance` sizes the orthographic volume; ignored in perspective.
    pub fn projection_matrix(&self, distance: f64) -> Matrix4<f64> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = distance.max(self.near);
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Project a world-space point to `(x, y, depth)` in pixels.
    ///
    /// Returns `None` for points behind the camera or outside the viewport.
    pub fn project_to_screen(
        &self,
        camera: &CameraState,
        orbit_distance: f64,
        point: &Point3<f64>,
        width: u32,
        height: u32,
    ) -> Option<(f64, f64, f64)> {
        let view_space = Self::view_matrix(camera).transform_point(point);
        // right-handed view space looks down -Z
        if view_space.z > -self.near {
            return None;
        }
        let ndc = self
            .projection_matrix(orbit_distance)
            .transform_point(&view_space);

        if !(-1.0..=1.0).contains(&ndc.x) || !(-1.0..=1.0).contains(&ndc.y) {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f64;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f64;
        Some((screen_x, screen_y, -view_space.z))
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
