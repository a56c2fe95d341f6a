use glam::Vec3;
use rand::Rng;

use crate::scene::{layer, Color, Geometry, Primitive, PrimitiveId, SceneGraph};

const BURST_PARTICLES: usize = 24;
const BURST_LIFETIME: f32 = 0.6;
const BURST_SPEED: f32 = 3.0;
const BURST_GRAVITY: f32 = -6.0;
const BURST_POINT_SIZE: f32 = 4.0;

/// Short-lived spray of points at a strike
#[derive(Debug)]
pub struct Burst {
    primitive: PrimitiveId,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    age: f32,
}

impl Burst {
    pub fn spawn(origin: Vec3, color: Color, rng: &mut impl Rng, scene: &mut SceneGraph) -> Self {
        let velocities: Vec<Vec3> = (0..BURST_PARTICLES)
            .map(|_| {
                let dir = Vec3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(0.0..1.0),
                    rng.random_range(-1.0..1.0),
                );
                dir.normalize_or_zero() * BURST_SPEED * rng.random_range(0.3..1.0)
            })
            .collect();
        let positions = vec![origin; BURST_PARTICLES];

        let primitive = scene.add(
            Primitive::new(
                Geometry::Points {
                    positions: positions.clone(),
                    colors: vec![color; BURST_PARTICLES],
                    point_size: BURST_POINT_SIZE,
                },
                color,
            )
            .with_layer(layer::BURST),
        );

        Self {
            primitive,
            positions,
            velocities,
            age: 0.0,
        }
    }

    /// Advance the spray. Returns false once it has faded out.
    pub fn update(&mut self, dt: f32, scene: &mut SceneGraph) -> bool {
        self.age += dt;
        if self.age >= BURST_LIFETIME {
            return false;
        }

        for (p, v) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            v.y += BURST_GRAVITY * dt;
            *p += *v * dt;
        }

        if let Some(prim) = scene.get_mut(self.primitive) {
            prim.opacity = 1.0 - self.age / BURST_LIFETIME;
            if let Geometry::Points { positions, .. } = &mut prim.geometry {
                positions.copy_from_slice(&self.positions);
            }
        }
        true
    }

    pub fn release(self, scene: &mut SceneGraph) {
        scene.remove(self.primitive);
    }

    pub fn primitive(&self) -> PrimitiveId {
        self.primitive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_burst_fades_and_releases() {
        let mut scene = SceneGraph::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut burst = Burst::spawn(Vec3::ZERO, Color::WHITE, &mut rng, &mut scene);
        assert_eq!(scene.len(), 1);

        assert!(burst.update(0.1, &mut scene));
        let opacity = scene.get(burst.primitive()).unwrap().opacity;
        assert!(opacity < 1.0 && opacity > 0.0);

        assert!(!burst.update(1.0, &mut scene));
        burst.release(&mut scene);
        assert!(scene.is_empty());
    }
}
