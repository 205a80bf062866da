/// ScanView Core Library - mesh import, metrics, freezing and camera logic
///
/// This library provides everything the viewer needs short of drawing:
/// STL/OBJ import into a mesh graph, per-load metrics, freezing the graph for
/// cross-thread sharing, background loading, keyboard orbit navigation and
/// principal-axis alignment to a calibration target.

pub mod alignment;
pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod freeze;
pub mod geometry;
pub mod graph;
pub mod import;
pub mod loader;
pub mod metrics;
pub mod obj;
pub mod projection;
pub mod scene;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use alignment::{AlignmentResult, CalibrationData, EulerAngles};
pub use camera::{CameraCommand, CameraState, KeyResponse, NavKey, OrbitController, OrbitTarget};
pub use config::{NavigationConfig, ViewerConfig};
pub use error::{AlignmentError, ConfigError, ImportError, LoadError};
pub use frame::{FrameMonitor, FrameReport};
pub use freeze::{FreezeReport, FrozenModel};
pub use geometry::{Aabb, MeshGeometry};
pub use graph::{GeometryNode, Material, ModelNode};
pub use loader::{LoadHandle, LoadedModel, ModelLoader};
pub use metrics::ModelMetrics;
pub use projection::{Projection, ProjectionMode};
pub use scene::{ActiveModel, Readouts, Scene};
pub use transform::{Transform3D, TransformChain};
