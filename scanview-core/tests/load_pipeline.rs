use futures::executor::block_on;
use nalgebra::{Matrix4, Vector3};
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use scanview_core::{LoadError, MeshGeometry, ModelLoader, Scene, ViewerConfig};

fn fixture_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scanview-{}-{}", std::process::id(), test));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Binary STL of an axis-aligned box centered on the origin.
fn write_box_stl(path: &PathBuf, size: Vector3<f64>) {
    let scale = Matrix4::new_nonuniform_scaling(&size);
    let triangles = MeshGeometry::cube(1.0).triangles(&scale);

    let mut data = vec![0u8; 80];
    data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for tri in &triangles {
        for _ in 0..3 {
            data.extend_from_slice(&0f32.to_le_bytes());
        }
        for vertex in tri {
            for c in [vertex.x, vertex.y, vertex.z] {
                data.extend_from_slice(&(c as f32).to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    fs::write(path, data).unwrap();
}

const QUAD_CUBE_OBJ: &str = "\
o cube
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 2 3 7 6
f 3 4 8 7
f 4 1 5 8
";

fn wait_for_load(scene: &mut Scene) -> Result<(), LoadError> {
    for _ in 0..500 {
        if let Some(result) = scene.poll_pending_load() {
            return result;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("load did not finish");
}

#[test]
fn test_stl_cube_load() {
    let dir = fixture_dir("stl-cube");
    let path = dir.join("cube.stl");
    write_box_stl(&path, Vector3::new(2.0, 2.0, 2.0));

    let loaded = block_on(ModelLoader::new().load_async(&path)).unwrap();
    assert_eq!(loaded.metrics.triangle_count, 12);
    assert_eq!(loaded.metrics.file_name, "cube.stl");
    assert!(loaded.model.root().is_frozen());
    assert!(loaded.freeze_report.is_complete());

    let bounds = loaded.model.bounds().unwrap();
    assert!((bounds.size - Vector3::new(2.0, 2.0, 2.0)).norm() < 1e-6);
    assert_eq!(
        loaded.metrics.bounding_box_summary(),
        "Bounding Box (mm): X=2.000  Y=2.000  Z=2.000"
    );
}

#[test]
fn test_obj_quads_are_triangulated() {
    let dir = fixture_dir("obj-cube");
    let path = dir.join("cube.obj");
    fs::write(&path, QUAD_CUBE_OBJ).unwrap();

    let loaded = block_on(ModelLoader::new().load_async(&path)).unwrap();
    assert_eq!(loaded.metrics.triangle_count, 12);
    assert!(loaded.model.root().is_frozen());
    assert!((loaded.metrics.center_of_mass.coords).norm() < 1e-9);
}

#[test]
fn test_unsupported_file_keeps_previous_model() {
    let dir = fixture_dir("unsupported");
    let cube = dir.join("cube.stl");
    write_box_stl(&cube, Vector3::new(1.0, 1.0, 1.0));
    let ply = dir.join("scan.ply");
    fs::write(&ply, b"ply\n").unwrap();

    let mut scene = Scene::new(&ViewerConfig::default());
    scene.request_load(&cube);
    wait_for_load(&mut scene).unwrap();
    assert_eq!(scene.readouts().status, "Model loaded.");

    scene.request_load(&ply);
    assert!(matches!(
        wait_for_load(&mut scene),
        Err(LoadError::UnsupportedFormat { .. })
    ));
    assert_eq!(
        scene.readouts().status,
        "Error loading model: Unsupported model format: .ply"
    );
    assert_eq!(scene.active().unwrap().metrics().file_name, "cube.stl");
}

#[test]
fn test_latest_request_wins() {
    let dir = fixture_dir("supersede");
    let first = dir.join("first.stl");
    let second = dir.join("second.stl");
    write_box_stl(&first, Vector3::new(1.0, 1.0, 1.0));
    write_box_stl(&second, Vector3::new(3.0, 1.0, 1.0));

    let mut scene = Scene::new(&ViewerConfig::default());
    scene.request_load(&first);
    scene.request_load(&second);
    wait_for_load(&mut scene).unwrap();

    assert!(!scene.is_loading());
    assert_eq!(scene.active().unwrap().metrics().file_name, "second.stl");
}

#[test]
fn test_load_then_align_to_target() {
    let dir = fixture_dir("align");
    let path = dir.join("rod.stl");
    write_box_stl(&path, Vector3::new(10.0, 5.0, 2.0));

    let mut scene = Scene::new(&ViewerConfig::default());
    scene.request_load(&path);
    wait_for_load(&mut scene).unwrap();

    let result = scene.align_active_model().unwrap();
    assert!((result.angle_degrees() - 90.0).abs() < 1e-6);

    let active = scene.active().unwrap();
    assert_eq!(active.transform().len(), 1);
    let bounds = active.bounds().unwrap();
    assert!((bounds.size.z - 10.0).abs() < 1e-5);
    // the frozen graph itself is untouched
    assert!((active.model().bounds().unwrap().size.x - 10.0).abs() < 1e-5);
}
