//! Full-screen procedural fluid. Only uniforms change on the CPU side; the
//! presenter evaluates [`FluidShader::shade`] per pixel (or per cell).

use glam::{Vec2, Vec3};

use super::{opacity, Effect, EffectInstance};
use crate::audio::FeatureVector;
use crate::scene::{layer, Color, Geometry, Primitive, PrimitiveId, SceneGraph, ShaderUniforms};

pub struct FluidSurface {
    primitive: PrimitiveId,
}

impl FluidSurface {
    pub fn new(instance: &EffectInstance, scene: &mut SceneGraph) -> Self {
        let uniforms = ShaderUniforms {
            time: 0.0,
            intensity: 0.0,
            volume: 0.0,
            speed: instance.speed,
            color: instance.color,
        };
        let primitive = scene.add(
            Primitive::new(Geometry::ShaderQuad { uniforms }, instance.color)
                .with_layer(layer::BACKDROP)
                .with_opacity(opacity(instance)),
        );
        Self { primitive }
    }
}

impl Effect for FluidSurface {
    fn update(&mut self, features: &FeatureVector, elapsed: f32, scene: &mut SceneGraph) {
        if let Some(prim) = scene.get_mut(self.primitive) {
            if let Geometry::ShaderQuad { uniforms } = &mut prim.geometry {
                uniforms.time = elapsed;
                uniforms.intensity = features.mid_level;
                uniforms.volume = features.volume;
            }
        }
    }

    fn primitive(&self) -> PrimitiveId {
        self.primitive
    }
}

/// Interference-pattern plasma, tinted by the effect color
pub struct FluidShader;

impl FluidShader {
    /// Color at `uv` (0-1 on both axes)
    pub fn shade(uv: Vec2, u: &ShaderUniforms) -> Color {
        let t = u.time * u.speed;
        let p = (uv - Vec2::splat(0.5)) * 8.0;

        let mut v = (p.x + t).sin();
        v += (p.y * 1.3 - t * 0.8).sin();
        v += ((p.x + p.y) * 0.7 + t * 1.1).sin();
        v += (p.length() * (1.5 + u.intensity) - t * 1.7).sin();
        // -4..4 into 0..1
        let flow = v / 8.0 + 0.5;

        let brightness = (0.25 + 0.5 * u.intensity + 0.5 * u.volume).min(1.0);
        let tint = Vec3::new(u.color.r, u.color.g, u.color.b);
        let shifted = Vec3::new(
            (flow * std::f32::consts::TAU).cos() * 0.5 + 0.5,
            (flow * std::f32::consts::TAU + 2.0).cos() * 0.5 + 0.5,
            (flow * std::f32::consts::TAU + 4.0).cos() * 0.5 + 0.5,
        );
        let c = tint.lerp(shifted, 0.35) * flow * brightness;

        Color::rgb(c.x.clamp(0.0, 1.0), c.y.clamp(0.0, 1.0), c.z.clamp(0.0, 1.0))
    }
}
