//! Retained scene graph: the rendering capability the engine draws into.
//!
//! Components create primitives, mutate their vertex/uniform data every tick
//! and release them when the owning entity goes away. A [`Presenter`] turns
//! the graph into pixels; the engine never talks to a GPU directly.

use glam::Vec3;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Linear RGB color, 0.0-1.0 per channel
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    /// Parse `#rrggbb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(Error::InvalidColor(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| Error::InvalidColor(hex.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }

    /// Hue in degrees, saturation and value 0-1
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let hue = hue.rem_euclid(360.0);
        let c = value * saturation;
        let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
        let m = value - c;

        let (r1, g1, b1) = if hue < 60.0 {
            (c, x, 0.0)
        } else if hue < 120.0 {
            (x, c, 0.0)
        } else if hue < 180.0 {
            (0.0, c, x)
        } else if hue < 240.0 {
            (0.0, x, c)
        } else if hue < 300.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };

        Self::rgb(r1 + m, g1 + m, b1 + m)
    }

    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::rgb(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }
}

/// Handle to a primitive owned by the scene graph
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveId(u64);

/// Uniform block fed to the fluid shader
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShaderUniforms {
    pub time: f32,
    pub intensity: f32,
    pub volume: f32,
    pub speed: f32,
    pub color: Color,
}

/// Geometry payload of a primitive
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Sphere {
        radius: f32,
    },
    Cuboid {
        size: Vec3,
    },
    /// Wireframe; `point_size > 0` also draws a dot on every vertex
    Mesh {
        vertices: Vec<Vec3>,
        edges: Vec<[u32; 2]>,
        point_size: f32,
    },
    Points {
        positions: Vec<Vec3>,
        colors: Vec<Color>,
        point_size: f32,
    },
    Line {
        points: Vec<Vec3>,
        weight: f32,
    },
    ShaderQuad {
        uniforms: ShaderUniforms,
    },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians, applied X then Y then Z
    pub rotation: Vec3,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    /// Map a local-space point into world space
    pub fn apply(&self, point: Vec3) -> Vec3 {
        let rotation = glam::Quat::from_euler(
            glam::EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        rotation * (point * self.scale) + self.translation
    }
}

/// Draw layers, back to front
pub mod layer {
    pub const BACKDROP: i32 = -20;
    pub const EFFECT: i32 = -10;
    pub const TRAIL: i32 = -1;
    pub const BODY: i32 = 0;
    pub const BURST: i32 = 10;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    pub geometry: Geometry,
    pub transform: Transform,
    pub color: Color,
    /// 0-1
    pub opacity: f32,
    pub layer: i32,
}

impl Primitive {
    pub fn new(geometry: Geometry, color: Color) -> Self {
        Self {
            geometry,
            transform: Transform::default(),
            color,
            opacity: 1.0,
            layer: layer::BODY,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

/// Surface that turns a scene graph into a presented frame
pub trait Presenter {
    fn present(&mut self, scene: &SceneGraph);
}

/// Owner of every live primitive plus the surface settings
pub struct SceneGraph {
    primitives: BTreeMap<PrimitiveId, Primitive>,
    next_id: u64,
    background: Color,
    size: (u32, u32),
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl SceneGraph {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            primitives: BTreeMap::new(),
            next_id: 1,
            background: Color::BLACK,
            size: (width.max(1), height.max(1)),
        }
    }

    pub fn add(&mut self, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId(self.next_id);
        self.next_id += 1;
        self.primitives.insert(id, primitive);
        id
    }

    /// Release a primitive. Releasing an unknown id is a no-op.
    pub fn remove(&mut self, id: PrimitiveId) -> Option<Primitive> {
        self.primitives.remove(&id)
    }

    pub fn get(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(&id)
    }

    pub fn get_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        self.primitives.get_mut(&id)
    }

    pub fn contains(&self, id: PrimitiveId) -> bool {
        self.primitives.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Primitives in draw order (layer, then creation order)
    pub fn iter(&self) -> impl Iterator<Item = (PrimitiveId, &Primitive)> {
        let mut ordered: Vec<_> = self.primitives.iter().map(|(id, p)| (*id, p)).collect();
        ordered.sort_by_key(|(id, p)| (p.layer, *id));
        ordered.into_iter()
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        let c = Color::from_hex("#ff8000").unwrap();
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.to_hex(), "#ff8000");

        assert!(Color::from_hex("00ff00").is_ok());
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
    }

    #[test]
    fn test_hsv_primaries() {
        let red = Color::from_hsv(0.0, 1.0, 1.0);
        assert_eq!(red, Color::rgb(1.0, 0.0, 0.0));
        let blue = Color::from_hsv(240.0, 1.0, 1.0);
        assert_eq!(blue, Color::rgb(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_add_remove_and_order() {
        let mut scene = SceneGraph::new(640, 480);
        let front = scene.add(
            Primitive::new(Geometry::Sphere { radius: 1.0 }, Color::WHITE).with_layer(layer::BURST),
        );
        let back = scene.add(
            Primitive::new(Geometry::Sphere { radius: 1.0 }, Color::WHITE)
                .with_layer(layer::BACKDROP),
        );
        assert_eq!(scene.len(), 2);

        let order: Vec<_> = scene.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![back, front]);

        assert!(scene.remove(front).is_some());
        assert!(scene.remove(front).is_none());
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_transform_apply() {
        let t = Transform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            rotation: Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            scale: 2.0,
        };
        let p = t.apply(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }
}
