//! Nannou side of the scene graph.
//!
//! `present` runs in the update callback: it projects every primitive through
//! the camera into a flat display list. `draw` replays that list in `view`.

pub mod camera;

use glam::{Vec2, Vec3};
use marble_viz_core::effects::FluidShader;
use marble_viz_core::scene::{Geometry, Primitive, ShaderUniforms, Transform};
use marble_viz_core::{Color, Presenter, SceneGraph};
use nannou::prelude::*;

pub use camera::Camera;

/// Horizontal resolution of the fluid backdrop, in cells
const FLUID_COLUMNS: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Disc { center: Vec2, radius: f32 },
    Polygon { points: Vec<Vec2> },
    Segment { from: Vec2, to: Vec2, weight: f32 },
    Polyline { points: Vec<Vec2>, weight: f32 },
    Cell { center: Vec2, size: Vec2 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    pub shape: Shape,
    /// Straight RGBA
    pub color: [f32; 4],
}

fn rgba_of(color: Color, alpha: f32) -> [f32; 4] {
    [color.r, color.g, color.b, alpha]
}

pub struct NannouPresenter {
    camera: Camera,
    background: Color,
    viewport: Vec2,
    commands: Vec<DrawCommand>,
}

impl NannouPresenter {
    pub fn new() -> Self {
        Self {
            camera: Camera::default(),
            background: Color::BLACK,
            viewport: Vec2::new(1280.0, 720.0),
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    fn push(&mut self, shape: Shape, color: [f32; 4]) {
        self.commands.push(DrawCommand { shape, color });
    }

    fn project(&self, transform: &Transform, local: Vec3) -> Option<(Vec2, f32)> {
        self.camera
            .project(transform.apply(local), self.viewport.y)
    }

    fn primitive(&mut self, prim: &Primitive) {
        let color = rgba_of(prim.color, prim.opacity);
        let t = &prim.transform;

        match &prim.geometry {
            Geometry::Sphere { radius } => {
                if let Some((center, scale)) = self.project(t, Vec3::ZERO) {
                    let radius = radius * t.scale * scale;
                    self.push(Shape::Disc { center, radius }, color);
                }
            }
            Geometry::Cuboid { size } => self.cuboid(t, *size, prim.color, prim.opacity),
            Geometry::Mesh {
                vertices,
                edges,
                point_size,
            } => {
                let projected: Vec<Option<(Vec2, f32)>> =
                    vertices.iter().map(|v| self.project(t, *v)).collect();
                for [a, b] in edges {
                    let ends = (
                        projected.get(*a as usize).copied().flatten(),
                        projected.get(*b as usize).copied().flatten(),
                    );
                    if let (Some((from, _)), Some((to, _))) = ends {
                        self.push(Shape::Segment { from, to, weight: 1.0 }, color);
                    }
                }
                if *point_size > 0.0 {
                    for (center, scale) in projected.into_iter().flatten() {
                        let radius = (point_size * scale).max(1.0);
                        self.push(Shape::Disc { center, radius }, color);
                    }
                }
            }
            Geometry::Points {
                positions,
                colors,
                point_size,
            } => {
                for (i, p) in positions.iter().enumerate() {
                    if let Some((center, scale)) = self.project(t, *p) {
                        let c = colors.get(i).copied().unwrap_or(prim.color);
                        let radius = (point_size * scale * 0.5).max(0.75);
                        self.push(Shape::Disc { center, radius }, rgba_of(c, prim.opacity));
                    }
                }
            }
            Geometry::Line { points, weight } => {
                let points: Vec<Vec2> = points
                    .iter()
                    .filter_map(|p| self.project(t, *p).map(|(s, _)| s))
                    .collect();
                if points.len() >= 2 {
                    self.push(Shape::Polyline { points, weight: *weight }, color);
                }
            }
            Geometry::ShaderQuad { uniforms } => self.fluid(uniforms, prim.opacity),
        }
    }

    /// Front and top faces, the only ones the fixed camera can see well
    fn cuboid(&mut self, t: &Transform, size: Vec3, color: Color, opacity: f32) {
        let h = size * 0.5;
        let front = [
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let top = [
            Vec3::new(-h.x, h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
        ];

        let faces = [
            (top, color.lerp(Color::WHITE, 0.3)),
            (front, color),
        ];
        for (corners, shade) in faces {
            let points: Option<Vec<Vec2>> = corners
                .iter()
                .map(|c| self.project(t, *c).map(|(s, _)| s))
                .collect();
            if let Some(points) = points {
                self.push(Shape::Polygon { points }, rgba_of(shade, opacity));
            }
        }
    }

    /// Evaluates the fluid shader once per cell across the whole viewport
    fn fluid(&mut self, uniforms: &ShaderUniforms, opacity: f32) {
        let cols = FLUID_COLUMNS;
        let rows = ((cols as f32 * self.viewport.y / self.viewport.x).round() as usize).max(1);
        let size = Vec2::new(self.viewport.x / cols as f32, self.viewport.y / rows as f32);
        let origin = -self.viewport * 0.5;

        for row in 0..rows {
            for col in 0..cols {
                let uv = Vec2::new(
                    (col as f32 + 0.5) / cols as f32,
                    (row as f32 + 0.5) / rows as f32,
                );
                let center = origin + uv * self.viewport;
                let shade = FluidShader::shade(uv, uniforms);
                self.push(Shape::Cell { center, size }, rgba_of(shade, opacity));
            }
        }
    }

    pub fn draw(&self, draw: &Draw) {
        let bg = self.background;
        draw.background().color(rgb(bg.r, bg.g, bg.b));

        for command in &self.commands {
            let [r, g, b, a] = command.color;
            let color = rgba(r, g, b, a);
            match &command.shape {
                Shape::Disc { center, radius } => {
                    draw.ellipse()
                        .x_y(center.x, center.y)
                        .radius(*radius)
                        .color(color);
                }
                Shape::Polygon { points } => {
                    let points: Vec<Point2> = points.iter().map(|p| pt2(p.x, p.y)).collect();
                    draw.polygon().points(points).color(color);
                }
                Shape::Segment { from, to, weight } => {
                    draw.line()
                        .start(pt2(from.x, from.y))
                        .end(pt2(to.x, to.y))
                        .weight(*weight)
                        .color(color);
                }
                Shape::Polyline { points, weight } => {
                    let points: Vec<Point2> = points.iter().map(|p| pt2(p.x, p.y)).collect();
                    draw.polyline().weight(*weight).points(points).color(color);
                }
                Shape::Cell { center, size } => {
                    draw.rect()
                        .x_y(center.x, center.y)
                        .w_h(size.x, size.y)
                        .color(color);
                }
            }
        }
    }
}

impl Default for NannouPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for NannouPresenter {
    fn present(&mut self, scene: &SceneGraph) {
        self.commands.clear();
        self.background = scene.background();
        let (w, h) = scene.size();
        self.viewport = Vec2::new(w as f32, h as f32);

        for (_, prim) in scene.iter() {
            if prim.opacity <= 0.0 {
                continue;
            }
            self.primitive(prim);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marble_viz_core::scene::layer;

    #[test]
    fn test_sphere_at_origin_is_centered_disc() {
        let mut scene = SceneGraph::new(1280, 720);
        scene.add(Primitive::new(Geometry::Sphere { radius: 1.0 }, Color::WHITE));

        let mut presenter = NannouPresenter::new();
        presenter.present(&scene);

        let focal = Camera::default().focal(720.0);
        match &presenter.commands()[0].shape {
            Shape::Disc { center, radius } => {
                assert_eq!(*center, Vec2::ZERO);
                assert!((radius - focal / 22.0).abs() < 1e-3);
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_layers_and_hidden_primitives() {
        let mut scene = SceneGraph::new(640, 360);
        scene.add(
            Primitive::new(Geometry::Sphere { radius: 0.3 }, Color::WHITE).with_layer(layer::BURST),
        );
        scene.add(
            Primitive::new(Geometry::Cuboid { size: Vec3::ONE }, Color::WHITE)
                .with_layer(layer::BODY),
        );
        scene.add(
            Primitive::new(Geometry::Sphere { radius: 0.3 }, Color::WHITE).with_opacity(0.0),
        );

        let mut presenter = NannouPresenter::new();
        presenter.present(&scene);

        let shapes: Vec<_> = presenter.commands().iter().map(|c| &c.shape).collect();
        assert_eq!(shapes.len(), 3);
        assert!(matches!(shapes[0], Shape::Polygon { .. }));
        assert!(matches!(shapes[1], Shape::Polygon { .. }));
        assert!(matches!(shapes[2], Shape::Disc { .. }));
    }

    #[test]
    fn test_fluid_fills_viewport_with_cells() {
        let mut scene = SceneGraph::new(1280, 720);
        let uniforms = ShaderUniforms {
            time: 1.0,
            intensity: 0.5,
            volume: 0.5,
            speed: 1.0,
            color: Color::WHITE,
        };
        scene.add(Primitive::new(Geometry::ShaderQuad { uniforms }, Color::WHITE));

        let mut presenter = NannouPresenter::new();
        presenter.present(&scene);

        // 64 columns, 36 rows at 16:9
        assert_eq!(presenter.commands().len(), 64 * 36);
        assert!(presenter
            .commands()
            .iter()
            .all(|c| c.color.iter().all(|v| (0.0..=1.0).contains(v))));
    }

    #[test]
    fn test_present_replaces_previous_frame() {
        let mut scene = SceneGraph::new(1280, 720);
        let id = scene.add(Primitive::new(Geometry::Sphere { radius: 0.3 }, Color::WHITE));
        let mut presenter = NannouPresenter::new();
        presenter.present(&scene);
        assert_eq!(presenter.commands().len(), 1);

        scene.remove(id);
        scene.set_background(Color::WHITE);
        presenter.present(&scene);
        assert!(presenter.commands().is_empty());
        assert_eq!(presenter.background, Color::WHITE);
    }
}
