/// Per-frame bookkeeping: frame rate and the camera orientation readout
use std::time::{Duration, Instant};

use crate::camera::CameraState;

/// Frame rate is recomputed once this much time has accumulated.
pub const FPS_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Set only on frames that close an FPS window.
    pub fps: Option<f64>,
    pub orientation: String,
}

#[derive(Debug, Clone)]
pub struct FrameMonitor {
    window_start: Instant,
    frames: u32,
}

impl FrameMonitor {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    /// Count one rendered frame.
    pub fn tick(&mut self, now: Instant, camera: &CameraState) -> FrameReport {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        let fps = if elapsed >= FPS_WINDOW {
            let fps = self.frames as f64 / elapsed.as_secs_f64();
            self.frames = 0;
            self.window_start = now;
            Some(fps)
        } else {
            None
        };

        FrameReport {
            fps,
            orientation: camera.readout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_reported_after_window() {
        let start = Instant::now();
        let camera = CameraState::default();
        let mut monitor = FrameMonitor::new(start);

        for i in 1..30 {
            let report = monitor.tick(start + Duration::from_millis(i * 10), &camera);
            assert_eq!(report.fps, None);
        }
        let report = monitor.tick(start + Duration::from_millis(500), &camera);
        let fps = report.fps.unwrap();
        assert!((fps - 60.0).abs() < 1e-9);

        // window restarts
        let report = monitor.tick(start + Duration::from_millis(510), &camera);
        assert_eq!(report.fps, None);
    }

    #[test]
    fn test_orientation_every_frame() {
        let start = Instant::now();
        let camera = CameraState::default();
        let mut monitor = FrameMonitor::new(start);
        let report = monitor.tick(start, &camera);
        assert_eq!(
            report.orientation,
            "CamPos: 0.000,0.000,10.000  LookDir: 0.000,0.000,-1.000"
        );
    }
}
