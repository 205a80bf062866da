/// Viewer configuration read once at startup
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::alignment::CalibrationData;
use crate::error::ConfigError;
use crate::projection::ProjectionMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub calibration: CalibrationData,
    pub navigation: NavigationConfig,
    pub projection: ProjectionMode,
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Per key-press deltas for camera navigation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Millimetres per pan/dolly key press.
    pub base_move: f64,
    /// Degrees per yaw/pitch/roll key press.
    pub base_rotation_degrees: f64,
    pub fast_move_multiplier: f64,
    pub fast_rotation_multiplier: f64,
}

impl NavigationConfig {
    /// Translation delta for one key press.
    pub fn move_step(&self, fast: bool) -> f64 {
        if fast {
            self.base_move * self.fast_move_multiplier
        } else {
            self.base_move
        }
    }

    /// Rotation delta in degrees for one key press.
    pub fn rotation_step(&self, fast: bool) -> f64 {
        if fast {
            self.base_rotation_degrees * self.fast_rotation_multiplier
        } else {
            self.base_rotation_degrees
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            base_move: 5.0,
            base_rotation_degrees: 2.0,
            fast_move_multiplier: 5.0,
            fast_rotation_multiplier: 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = ViewerConfig::from_json("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.calibration.target, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_partial_override() {
        let config = ViewerConfig::from_json(
            r#"{ "calibration": { "target": [1.0, 0.0, 0.0] }, "navigation": { "base_move": 2.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.calibration.target, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(config.calibration.x_axis, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(config.navigation.base_move, 2.5);
        assert_eq!(config.navigation.base_rotation_degrees, 2.0);
    }

    #[test]
    fn test_projection_mode() {
        assert_eq!(ViewerConfig::default().projection, ProjectionMode::Perspective);
        let config = ViewerConfig::from_json(r#"{ "projection": "orthographic" }"#).unwrap();
        assert_eq!(config.projection, ProjectionMode::Orthographic);
    }

    #[test]
    fn test_fast_modifier_steps() {
        let nav = NavigationConfig::default();
        assert_eq!(nav.move_step(false), 5.0);
        assert_eq!(nav.move_step(true), 25.0);
        assert_eq!(nav.rotation_step(false), 2.0);
        assert_eq!(nav.rotation_step(true), 6.0);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            ViewerConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
