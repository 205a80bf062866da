/// The live scene owned by the main context
///
/// The scene holds a single active-model slot. A successful load replaces the
/// slot in one assignment; a failed load leaves it untouched. The frozen graph
/// inside the slot is shared read-only with whoever renders it, while the
/// transform chain wrapped around it stays mutable and owned by the scene.
use log::{error, info, warn};
use nalgebra::Point3;
use std::path::PathBuf;

use crate::alignment::{align_active_model, AlignmentResult, CalibrationData};
use crate::camera::{CameraState, KeyResponse, NavKey, OrbitController};
use crate::config::ViewerConfig;
use crate::error::{AlignmentError, LoadError};
use crate::frame::FrameReport;
use crate::freeze::FrozenModel;
use crate::geometry::Aabb;
use crate::loader::{LoadHandle, LoadedModel, ModelLoader};
use crate::metrics::ModelMetrics;
use crate::transform::TransformChain;

const ZERO_POSITION: &str = "X: 0.000  Y: 0.000  Z: 0.000";
const ZERO_ROTATION: &str = "Pitch: 0.000  Yaw: 0.000  Roll: 0.000";

/// A loaded model wrapped in a mutable transform chain.
#[derive(Debug, Clone)]
pub struct ActiveModel {
    model: FrozenModel,
    metrics: ModelMetrics,
    transform: TransformChain,
}

impl ActiveModel {
    pub fn new(model: FrozenModel, metrics: ModelMetrics) -> Self {
        Self {
            model,
            metrics,
            transform: TransformChain::new(),
        }
    }

    pub fn model(&self) -> &FrozenModel {
        &self.model
    }

    pub fn metrics(&self) -> &ModelMetrics {
        &self.metrics
    }

    pub fn transform(&self) -> &TransformChain {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut TransformChain {
        &mut self.transform
    }

    /// Bounds of the frozen graph after the wrapper transform chain.
    pub fn bounds(&self) -> Option<Aabb> {
        let matrix = self.transform.matrix();
        self.model.bounds().map(|b| b.transformed(&matrix))
    }
}

/// Human-readable status strings for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Readouts {
    pub status: String,
    pub active_model_name: String,
    pub triangle_count: usize,
    pub bounding_box: String,
    pub load_duration: String,
    pub center_of_mass: String,
    pub position: String,
    pub rotation: String,
    pub orientation: String,
    pub calibration: String,
    pub alignment: String,
    pub fps: f64,
}

impl Readouts {
    fn new(calibration: &CalibrationData) -> Self {
        Self {
            status: "Ready".to_string(),
            active_model_name: "(none)".to_string(),
            triangle_count: 0,
            bounding_box: "Bounding Box: -".to_string(),
            load_duration: "Load: -".to_string(),
            center_of_mass: "COM: -".to_string(),
            position: ZERO_POSITION.to_string(),
            rotation: ZERO_ROTATION.to_string(),
            orientation: "Orientation: -".to_string(),
            calibration: calibration.summary(),
            alignment: String::new(),
            fps: 0.0,
        }
    }

    fn show_metrics(&mut self, metrics: &ModelMetrics) {
        self.active_model_name = metrics.file_name.clone();
        self.triangle_count = metrics.triangle_count;
        self.bounding_box = metrics.bounding_box_summary();
        self.load_duration = metrics.load_duration_summary();
        self.center_of_mass = metrics.center_of_mass_summary();
        self.position = ZERO_POSITION.to_string();
        self.rotation = ZERO_ROTATION.to_string();
    }

    /// Per-frame update from the render loop.
    pub fn record_frame(&mut self, report: &FrameReport) {
        if let Some(fps) = report.fps {
            self.fps = fps;
        }
        self.orientation = report.orientation.clone();
    }
}

pub struct Scene {
    active: Option<ActiveModel>,
    pending: Option<LoadHandle>,
    loader: ModelLoader,
    controller: OrbitController,
    calibration: CalibrationData,
    readouts: Readouts,
}

impl Scene {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            active: None,
            pending: None,
            loader: ModelLoader::new(),
            controller: OrbitController::new(config.navigation),
            calibration: config.calibration,
            readouts: Readouts::new(&config.calibration),
        }
    }

    pub fn active(&self) -> Option<&ActiveModel> {
        self.active.as_ref()
    }

    pub fn camera(&self) -> &CameraState {
        self.controller.camera()
    }

    pub fn controller(&self) -> &OrbitController {
        &self.controller
    }

    pub fn calibration(&self) -> &CalibrationData {
        &self.calibration
    }

    pub fn readouts(&self) -> &Readouts {
        &self.readouts
    }

    pub fn readouts_mut(&mut self) -> &mut Readouts {
        &mut self.readouts
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Start loading `path` in the background.
    ///
    /// A load that is still pending is cancelled and its result discarded,
    /// so only the most recent request can replace the active model.
    pub fn request_load(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if let Some(previous) = self.pending.take() {
            previous.cancel();
            info!(
                "Superseding pending load #{} of {} with {}",
                previous.id(),
                previous.path().display(),
                path.display()
            );
        }
        let handle = self.loader.load_async(path);
        info!("LoadModel start\tfile={}\tload={}", handle.path().display(), handle.id());
        self.readouts.status = "Loading model...".to_string();
        self.pending = Some(handle);
    }

    /// Check the pending load without blocking and apply it if finished.
    ///
    /// Returns `None` while nothing has completed.
    pub fn poll_pending_load(&mut self) -> Option<Result<(), LoadError>> {
        let result = self.pending.as_mut()?.try_take()?;
        self.pending = None;
        Some(self.apply_load_result(result))
    }

    /// Install a load result, or log and report its failure.
    pub fn apply_load_result(&mut self, result: Result<LoadedModel, LoadError>) -> Result<(), LoadError> {
        match result {
            Ok(loaded) => {
                self.install(loaded);
                Ok(())
            }
            Err(e) => {
                error!("LoadModel failed: {}", e);
                self.readouts.status = format!("Error loading model: {}", e);
                Err(e)
            }
        }
    }

    /// Replace the active model and frame it.
    pub fn install(&mut self, loaded: LoadedModel) {
        let LoadedModel {
            model,
            metrics,
            freeze_report,
        } = loaded;
        if !freeze_report.is_complete() {
            warn!(
                "{}: {} resource(s) could not be frozen",
                metrics.file_name, freeze_report.left_mutable
            );
        }

        self.readouts.show_metrics(&metrics);
        self.readouts.status = "Model loaded.".to_string();
        let size = metrics.extents();
        info!(
            "LoadModel complete\tfile={}\ttri={}\tbbox=({:.3},{:.3},{:.3})\tloadms={:.1}",
            metrics.file_name,
            metrics.triangle_count,
            size.x,
            size.y,
            size.z,
            metrics.load_duration.as_secs_f64() * 1000.0
        );

        let active = ActiveModel::new(model, metrics);
        match active.bounds() {
            Some(bounds) => self.controller.frame_bounds(&bounds),
            None => self.controller.set_target(Point3::origin()),
        }
        self.active = Some(active);
        self.readouts.orientation = self.controller.camera().readout();
    }

    /// Default camera framed on the active model, pivot at its center.
    pub fn reset_view(&mut self) {
        let bounds = self.active.as_ref().and_then(ActiveModel::bounds);
        self.controller.reset(bounds.as_ref());
        self.readouts.orientation = self.controller.camera().readout();
        self.readouts.status = "View reset.".to_string();
        info!("ResetView invoked.");
    }

    pub fn handle_key(&mut self, key: NavKey, fast: bool) -> KeyResponse {
        let response = self.controller.handle_key(key, fast);
        if let KeyResponse::Handled(readout) = &response {
            self.readouts.orientation = readout.clone();
        }
        response
    }

    pub fn align_active_model(&mut self) -> Result<AlignmentResult, AlignmentError> {
        match align_active_model(self.active.as_mut(), &self.calibration) {
            Ok(result) => {
                self.readouts.rotation = result.euler.to_string();
                self.readouts.alignment = result.summary();
                self.readouts.status = "Device aligned to target.".to_string();
                Ok(result)
            }
            Err(e) => {
                error!("AlignDevice error: {}", e);
                self.readouts.status = e.to_string();
                Err(e)
            }
        }
    }
}
