/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Point3, Vector3};
use scanview_core::geometry::face_normal;
use scanview_core::graph::Material;
use scanview_core::{ActiveModel, CameraState, Projection};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Surface colour of a leaf without a readable material.
const DEFAULT_SURFACE: Color = Color::Grey;

/// Everything the rasterizer needs to place a triangle on screen.
pub struct View<'a> {
    pub camera: &'a CameraState,
    pub projection: &'a Projection,
    pub orbit_distance: f64,
}

/// ASCII renderer that converts the active model to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f64>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f64::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![DEFAULT_SURFACE; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f64::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(DEFAULT_SURFACE);
    }

    /// Draw every geometry leaf of the frozen graph through the model's
    /// wrapper transform chain.
    pub fn render_model(&mut self, model: &ActiveModel, view: &View<'_>) {
        let wrapper = model.transform().matrix();
        model.model().root().visit_geometry(&mut |leaf, local| {
            let world: Matrix4<f64> = wrapper * local;
            let front = leaf.material.as_ref().map_or(DEFAULT_SURFACE, surface_color);
            let back = leaf.back_material.as_ref().map(surface_color);
            for triangle in leaf.geometry.triangles(&world) {
                self.render_triangle(&triangle, front, back, view);
            }
        });
    }

    fn render_triangle(
        &mut self,
        triangle: &[Point3<f64>; 3],
        front: Color,
        back: Option<Color>,
        view: &View<'_>,
    ) {
        let Some(normal) = face_normal(triangle) else {
            return;
        };

        // Headlight shading: light travels along the view direction
        let to_viewer: Vector3<f64> = -view.camera.look().into_inner();
        let facing = normal.dot(&to_viewer);
        let (brightness, color) = match (facing >= 0.0, back) {
            (true, _) => (facing, front),
            (false, Some(back)) => (-facing, back),
            // back faces without a back material are culled
            (false, None) => return,
        };

        // Project vertices to screen space
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen_coords.iter_mut().zip(triangle) {
            match view.projection.project_to_screen(
                view.camera,
                view.orbit_distance,
                vertex,
                self.width as u32,
                self.height as u32,
            ) {
                Some(projected) => *slot = projected,
                None => return, // Triangle is clipped
            }
        }

        // Map brightness to character
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f64) as usize;
        let character = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];

        self.rasterize_triangle(&screen_coords, character, color);
    }

    fn rasterize_triangle(&mut self, coords: &[(f64, f64, f64); 3], character: char, color: Color) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box, clipped to screen bounds
        let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i64).max(0);
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i64).min(self.width as i64 - 1);
        let min_y = (v0.1.min(v1.1).min(v2.1).floor() as i64).max(0);
        let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i64).min(self.height as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f64 + 0.5, y as f64 + 0.5);
                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), p)
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = character;
                    self.color_buffer[idx] = color;
                }
            }
        }
    }

    /// Rasterized character at a cell, for inspection.
    pub fn cell(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                writer.queue(SetForegroundColor(self.color_buffer[idx]))?;
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Terminal colour of the first readable brush in a material tree.
fn surface_color(material: &Material) -> Color {
    let mut color = None;
    material.for_each_brush(&mut |brush| {
        if color.is_none() {
            let c = brush.read().color;
            color = Some(Color::Rgb {
                r: to_channel(c.r),
                g: to_channel(c.g),
                b: to_channel(c.b),
            });
        }
    });
    color.unwrap_or(DEFAULT_SURFACE)
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f64, f64),
    v1: (f64, f64),
    v2: (f64, f64),
    p: (f64, f64),
) -> Option<(f64, f64, f64)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-9 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanview_core::freeze::freeze;
    use scanview_core::graph::{Color as SurfaceColor, GeometryNode, ModelNode};
    use scanview_core::{MeshGeometry, ModelMetrics, OrbitController};
    use std::time::Duration;

    fn active_cube() -> ActiveModel {
        let leaf = GeometryNode::new("cube", MeshGeometry::cube(2.0))
            .with_material(Material::diffuse(SurfaceColor::rgb(1.0, 0.0, 0.0)));
        let graph = ModelNode::group("cube", vec![leaf.into()]);
        let metrics = ModelMetrics::measure("cube.stl", Duration::ZERO, &graph);
        let (model, _) = freeze(graph);
        ActiveModel::new(model, metrics)
    }

    #[test]
    fn test_barycentric_inside() {
        let (w0, w1, w2) =
            barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!(w0 > 0.0 && w1 > 0.0 && w2 > 0.0);
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_triangle_has_no_barycentric() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
    }

    #[test]
    fn test_cube_covers_screen_center() {
        let model = active_cube();
        let mut controller = OrbitController::default();
        controller.frame_bounds(&model.bounds().unwrap());
        let projection = Projection::new(40, 20);
        let distance = (controller.camera().position() - controller.target().0).norm();

        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render_model(
            &model,
            &View {
                camera: controller.camera(),
                projection: &projection,
                orbit_distance: distance,
            },
        );

        // the front face looks straight at the camera: full brightness
        assert_eq!(renderer.cell(20, 10), Some('@'));
        assert_eq!(renderer.cell(0, 0), Some(' '));
    }

    #[test]
    fn test_surface_color_from_material() {
        let material = Material::diffuse(SurfaceColor::rgb(1.0, 0.5, 0.0));
        assert_eq!(surface_color(&material), Color::Rgb { r: 255, g: 128, b: 0 });
    }
}
