//! Point cloud that shivers with volume and recolors on beats.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{opacity, Effect, EffectInstance};
use crate::audio::FeatureVector;
use crate::scene::{layer, Color, Geometry, Primitive, PrimitiveId, SceneGraph};

/// Points per unit of effect size
pub const POINTS_PER_SIZE: f32 = 1000.0;
const SPREAD: Vec3 = Vec3::new(16.0, 10.0, 6.0);
const JITTER: f32 = 10.0;
const POINT_SIZE: f32 = 2.0;

pub struct ParticleCloud {
    primitive: PrimitiveId,
    /// Home height of every point
    base_y: Vec<f32>,
    rng: StdRng,
}

impl ParticleCloud {
    pub fn new(instance: &EffectInstance, seed: u64, scene: &mut SceneGraph) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = (POINTS_PER_SIZE * instance.size.max(0.0)).round() as usize;

        let positions: Vec<Vec3> = (0..count)
            .map(|_| {
                Vec3::new(
                    rng.random_range(-0.5..0.5) * SPREAD.x,
                    rng.random_range(-0.5..0.5) * SPREAD.y,
                    rng.random_range(-1.0..0.0) * SPREAD.z,
                )
            })
            .collect();
        let base_y = positions.iter().map(|p| p.y).collect();

        let primitive = scene.add(
            Primitive::new(
                Geometry::Points {
                    positions,
                    colors: vec![instance.color; count],
                    point_size: POINT_SIZE,
                },
                instance.color,
            )
            .with_layer(layer::EFFECT)
            .with_opacity(opacity(instance)),
        );

        Self {
            primitive,
            base_y,
            rng,
        }
    }
}

impl Effect for ParticleCloud {
    fn update(&mut self, features: &FeatureVector, _elapsed: f32, scene: &mut SceneGraph) {
        let Some(prim) = scene.get_mut(self.primitive) else {
            return;
        };
        let Geometry::Points {
            positions, colors, ..
        } = &mut prim.geometry
        else {
            return;
        };

        for (p, &base) in positions.iter_mut().zip(&self.base_y) {
            p.y = base + (self.rng.random::<f32>() - 0.5) * features.volume * JITTER;
        }

        if features.beat {
            for c in colors.iter_mut() {
                *c = Color::rgb(self.rng.random(), self.rng.random(), self.rng.random());
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

    fn cloud(size: f32, scene: &mut SceneGraph) -> ParticleCloud {
        let mut instance = EffectInstance::new(EffectId::new(1), EffectKind::Particle);
        instance.size = size;
        instance.color = Color::rgb(0.2, 0.4, 0.6);
        ParticleCloud::new(&instance, 11, scene)
    }

    fn points(scene: &SceneGraph, id: PrimitiveId) -> (Vec<Vec3>, Vec<Color>) {
        match &scene.get(id).unwrap().geometry {
            Geometry::Points {
                positions, colors, ..
            } => (positions.clone(), colors.clone()),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_point_count_scales_with_size() {
        let mut scene = SceneGraph::default();
        let c = cloud(2.5, &mut scene);
        assert_eq!(points(&scene, c.primitive()).0.len(), 2500);
    }

    #[test]
    fn test_jitter_is_bounded() {
        let mut scene = SceneGraph::default();
        let mut c = cloud(0.2, &mut scene);
        let base = c.base_y.clone();

        c.update(&FeatureVector::with_levels(0.0, 0.0, 0.0, 0.2), 0.0, &mut scene);
        let (positions, colors) = points(&scene, c.primitive());
        for (p, b) in positions.iter().zip(&base) {
            // |r - 0.5| * 0.2 * 10 <= 1
            assert!((p.y - b).abs() <= 1.0 + 1e-5);
        }
        // Not a beat: colors untouched
        assert!(colors.iter().all(|&c| c == Color::rgb(0.2, 0.4, 0.6)));
    }

    #[test]
    fn test_beat_recolors() {
        let mut scene = SceneGraph::default();
        let mut c = cloud(0.1, &mut scene);
        c.update(&FeatureVector::with_levels(0.0, 0.0, 0.0, 0.5), 0.0, &mut scene);
        let (_, colors) = points(&scene, c.primitive());
        assert!(colors.iter().any(|&c| c != Color::rgb(0.2, 0.4, 0.6)));
    }
}
