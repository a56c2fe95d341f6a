//! Rotating wireframe solid with a scale pulse on beats.

use glam::Vec3;

use super::{opacity, Effect, EffectInstance};
use crate::audio::FeatureVector;
use crate::scene::{layer, Geometry, Primitive, PrimitiveId, SceneGraph, Transform};

const SPIN_RATE: f32 = 0.05;
const PULSE_PEAK: f32 = 1.2;
const PULSE_RISE: f32 = 0.1;
const PULSE_FALL: f32 = 0.3;
/// Radius per unit of effect size
const SOLID_RADIUS: f32 = 3.0;

/// Scale factor `t` seconds into a beat pulse: linear rise to the peak,
/// ease-out back to 1.0. `None` once the pulse is over.
pub fn pulse_scale(t: f32) -> Option<f32> {
    if t < 0.0 {
        return Some(1.0);
    }
    if t < PULSE_RISE {
        return Some(1.0 + (PULSE_PEAK - 1.0) * t / PULSE_RISE);
    }
    if t < PULSE_RISE + PULSE_FALL {
        let u = (t - PULSE_RISE) / PULSE_FALL;
        let eased = 1.0 - (1.0 - u) * (1.0 - u);
        return Some(PULSE_PEAK - (PULSE_PEAK - 1.0) * eased);
    }
    None
}

pub struct PulsingSolid {
    primitive: PrimitiveId,
    speed: f32,
    rotation: f32,
    /// Start time of the running pulse
    pulse_start: Option<f32>,
}

impl PulsingSolid {
    pub fn new(instance: &EffectInstance, scene: &mut SceneGraph) -> Self {
        let (vertices, edges) = icosahedron(SOLID_RADIUS * instance.size.max(0.01));

        let primitive = scene.add(
            Primitive::new(
                Geometry::Mesh {
                    vertices,
                    edges,
                    point_size: 3.0,
                },
                instance.color,
            )
            .with_transform(Transform::at(Vec3::new(0.0, 5.0, -4.0)))
            .with_layer(layer::EFFECT)
            .with_opacity(opacity(instance)),
        );

        Self {
            primitive,
            speed: instance.speed,
            rotation: 0.0,
            pulse_start: None,
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }
}

impl Effect for PulsingSolid {
    fn update(&mut self, features: &FeatureVector, elapsed: f32, scene: &mut SceneGraph) {
        self.rotation += features.treble_level * SPIN_RATE * self.speed;

        if features.beat && self.pulse_start.is_none() {
            self.pulse_start = Some(elapsed);
        }
        let scale = match self.pulse_start {
            Some(start) => match pulse_scale(elapsed - start) {
                Some(scale) => scale,
                None => {
                    self.pulse_start = None;
                    1.0
                }
            },
            None => 1.0,
        };

        if let Some(prim) = scene.get_mut(self.primitive) {
            prim.transform.rotation.x = self.rotation;
            prim.transform.rotation.y = self.rotation;
            prim.transform.scale = scale;
        }
    }

    fn primitive(&self) -> PrimitiveId {
        self.primitive
    }
}

fn icosahedron(radius: f32) -> (Vec<Vec3>, Vec<[u32; 2]>) {
    let phi = (1.0 + 5.0f32.sqrt()) / 2.0;
    let raw = [
        Vec3::new(-1.0, phi, 0.0),
        Vec3::new(1.0, phi, 0.0),
        Vec3::new(-1.0, -phi, 0.0),
        Vec3::new(1.0, -phi, 0.0),
        Vec3::new(0.0, -1.0, phi),
        Vec3::new(0.0, 1.0, phi),
        Vec3::new(0.0, -1.0, -phi),
        Vec3::new(0.0, 1.0, -phi),
        Vec3::new(phi, 0.0, -1.0),
        Vec3::new(phi, 0.0, 1.0),
        Vec3::new(-phi, 0.0, -1.0),
        Vec3::new(-phi, 0.0, 1.0),
    ];
    let vertices: Vec<Vec3> = raw.iter().map(|v| v.normalize() * radius).collect();

    // Edge length of the unit-normalized icosahedron
    let edge = vertices[0].distance(vertices[1]);
    let mut edges = Vec::new();
    for i in 0..vertices.len() {
        for j in (i + 1)..vertices.len() {
            if (vertices[i].distance(vertices[j]) - edge).abs() < edge * 0.01 {
                edges.push([i as u32, j as u32]);
            }
        }
    }
    (vertices, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectId, EffectKind};

    #[test]
    fn test_icosahedron_edges() {
        let (vertices, edges) = icosahedron(2.0);
        assert_eq!(vertices.len(), 12);
        assert_eq!(edges.len(), 30);
    }

    #[test]
    fn test_pulse_curve() {
        assert_eq!(pulse_scale(0.0), Some(1.0));
        assert!((pulse_scale(0.05).unwrap() - 1.1).abs() < 1e-5);
        assert!((pulse_scale(0.1).unwrap() - 1.2).abs() < 1e-5);
        assert!((pulse_scale(0.3999).unwrap() - 1.0).abs() < 1e-3);
        assert_eq!(pulse_scale(0.41), None);
    }

    #[test]
    fn test_spin_and_pulse() {
        let mut scene = SceneGraph::default();
        let mut instance = EffectInstance::new(EffectId::new(1), EffectKind::Geometric);
        instance.speed = 2.0;
        let mut solid = PulsingSolid::new(&instance, &mut scene);

        let loud = FeatureVector::with_levels(0.0, 0.0, 0.5, 0.5);
        solid.update(&loud, 1.0, &mut scene);
        assert!((solid.rotation() - 0.5 * 0.05 * 2.0).abs() < 1e-6);

        // Mid-rise, the retrigger is ignored
        solid.update(&loud, 1.05, &mut scene);
        let prim = scene.get(solid.primitive()).unwrap();
        assert!((prim.transform.scale - 1.1).abs() < 1e-4);

        let quiet = FeatureVector::silent();
        solid.update(&quiet, 1.5, &mut scene);
        assert_eq!(scene.get(solid.primitive()).unwrap().transform.scale, 1.0);

        // A new beat after the pulse ended starts a fresh one
        solid.update(&loud, 2.0, &mut scene);
        solid.update(&quiet, 2.1, &mut scene);
        let scale = scene.get(solid.primitive()).unwrap().transform.scale;
        assert!((scale - 1.2).abs() < 1e-4);
    }
}
