//! Undulating wireframe grid that swells with the bass.

use glam::Vec3;

use super::{opacity, Effect, EffectInstance};
use crate::audio::FeatureVector;
use crate::scene::{layer, Geometry, Primitive, PrimitiveId, SceneGraph, Transform};

/// Vertices per side
const GRID_RESOLUTION: usize = 32;
/// Side length per unit of effect size
const GRID_EXTENT: f32 = 20.0;
const WAVE_FREQUENCY: f32 = 0.1;
const WAVE_AMPLITUDE: f32 = 2.0;

pub struct WaveField {
    primitive: PrimitiveId,
    /// Flat grid coordinates, z is recomputed each tick
    base: Vec<Vec3>,
}

impl WaveField {
    pub fn new(instance: &EffectInstance, scene: &mut SceneGraph) -> Self {
        let extent = GRID_EXTENT * instance.size.max(0.01);
        let step = extent / (GRID_RESOLUTION - 1) as f32;
        let half = extent / 2.0;

        let mut base = Vec::with_capacity(GRID_RESOLUTION * GRID_RESOLUTION);
        for row in 0..GRID_RESOLUTION {
            for col in 0..GRID_RESOLUTION {
                base.push(Vec3::new(
                    col as f32 * step - half,
                    row as f32 * step - half,
                    0.0,
                ));
            }
        }

        let mut edges = Vec::new();
        for row in 0..GRID_RESOLUTION {
            for col in 0..GRID_RESOLUTION {
                let i = (row * GRID_RESOLUTION + col) as u32;
                if col + 1 < GRID_RESOLUTION {
                    edges.push([i, i + 1]);
                }
                if row + 1 < GRID_RESOLUTION {
                    edges.push([i, i + GRID_RESOLUTION as u32]);
                }
            }
        }

        // Tilted back into a floor plane behind the keys
        let transform = Transform {
            translation: Vec3::new(0.0, -6.0, -8.0),
            rotation: Vec3::new(-std::f32::consts::FRAC_PI_3, 0.0, 0.0),
            scale: 1.0,
        };

        let primitive = scene.add(
            Primitive::new(
                Geometry::Mesh {
                    vertices: base.clone(),
                    edges,
                    point_size: 0.0,
                },
                instance.color,
            )
            .with_transform(transform)
            .with_layer(layer::EFFECT)
            .with_opacity(opacity(instance)),
        );

        Self { primitive, base }
    }
}

/// Grid depth at local x for time `t`
pub fn wave_height(x: f32, t: f32, bass: f32) -> f32 {
    (x * WAVE_FREQUENCY + t).sin() * bass * WAVE_AMPLITUDE
}

impl Effect for WaveField {
    fn update(&mut self, features: &FeatureVector, elapsed: f32, scene: &mut SceneGraph) {
        let Some(prim) = scene.get_mut(self.primitive) else {
            return;
        };
        if let Geometry::Mesh { vertices, .. } = &mut prim.geometry {
            for (v, base) in vertices.iter_mut().zip(&self.base) {
                v.z = wave_height(base.x, elapsed, features.bass_level);
            }
        }
    }

    fn primitive(&self) -> PrimitiveId {
        self.primitive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectId, EffectKind};

    #[test]
    fn test_depth_follows_bass() {
        let mut scene = SceneGraph::default();
        let instance = EffectInstance::new(EffectId::new(1), EffectKind::Wave);
        let mut wave = WaveField::new(&instance, &mut scene);

        wave.update(&FeatureVector::with_levels(0.5, 0.0, 0.0, 0.0), 1.3, &mut scene);
        let Geometry::Mesh { vertices, .. } = &scene.get(wave.primitive()).unwrap().geometry else {
            panic!("wave is not a mesh");
        };
        for v in vertices {
            let expected = (v.x * 0.1 + 1.3).sin() * 0.5 * 2.0;
            assert!((v.z - expected).abs() < 1e-6);
        }

        wave.update(&FeatureVector::silent(), 2.0, &mut scene);
        let Geometry::Mesh { vertices, .. } = &scene.get(wave.primitive()).unwrap().geometry else {
            panic!("wave is not a mesh");
        };
        assert!(vertices.iter().all(|v| v.z == 0.0));
    }
}
