//! Layered node graph whose depth ripples with bass and treble.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{opacity, Effect, EffectInstance};
use crate::audio::FeatureVector;
use crate::scene::{layer, Geometry, Primitive, PrimitiveId, SceneGraph, Transform};

const LAYERS: usize = 5;
/// Nodes per layer per unit of effect size
const NODES_PER_LAYER: f32 = 12.0;
const LINKS_PER_NODE: usize = 2;
const LAYER_SPACING: f32 = 4.0;
const NODE_SPACING: f32 = 1.2;
const NODE_SIZE: f32 = 6.0;
const RIPPLE: f32 = 0.1;

pub struct NodeGraph {
    primitive: PrimitiveId,
}

impl NodeGraph {
    pub fn new(instance: &EffectInstance, seed: u64, scene: &mut SceneGraph) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let per_layer = ((NODES_PER_LAYER * instance.size).round() as usize).max(1);

        let mut vertices = Vec::with_capacity(LAYERS * per_layer);
        for l in 0..LAYERS {
            let x = (l as f32 - (LAYERS - 1) as f32 / 2.0) * LAYER_SPACING;
            for n in 0..per_layer {
                let y = (n as f32 - (per_layer - 1) as f32 / 2.0) * NODE_SPACING;
                vertices.push(Vec3::new(x, y, 0.0));
            }
        }

        // Each node links forward to a few random nodes in the next layer
        let mut edges = Vec::new();
        for l in 0..LAYERS - 1 {
            for n in 0..per_layer {
                let from = (l * per_layer + n) as u32;
                for _ in 0..LINKS_PER_NODE {
                    let to = ((l + 1) * per_layer + rng.random_range(0..per_layer)) as u32;
                    edges.push([from, to]);
                }
            }
        }

        let primitive = scene.add(
            Primitive::new(
                Geometry::Mesh {
                    vertices,
                    edges,
                    point_size: NODE_SIZE,
                },
                instance.color,
            )
            .with_transform(Transform::at(Vec3::new(0.0, 2.0, -6.0)))
            .with_layer(layer::EFFECT)
            .with_opacity(opacity(instance)),
        );

        Self { primitive }
    }
}

impl Effect for NodeGraph {
    fn update(&mut self, features: &FeatureVector, elapsed: f32, scene: &mut SceneGraph) {
        let depth = features.bass_level + features.treble_level;
        if let Some(prim) = scene.get_mut(self.primitive) {
            if let Geometry::Mesh { vertices, .. } = &mut prim.geometry {
                for (i, v) in vertices.iter_mut().enumerate() {
                    v.z = (i as f32 * RIPPLE + elapsed).sin() * depth;
                }
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
    fn test_node_depth() {
        let mut scene = SceneGraph::default();
        let instance = EffectInstance::new(EffectId::new(2), EffectKind::Neural);
        let mut graph = NodeGraph::new(&instance, 5, &mut scene);

        graph.update(&FeatureVector::with_levels(0.3, 0.9, 0.2, 0.0), 0.75, &mut scene);
        let Geometry::Mesh {
            vertices, edges, ..
        } = &scene.get(graph.primitive()).unwrap().geometry
        else {
            panic!("neural graph is not a mesh");
        };

        assert_eq!(vertices.len(), LAYERS * 12);
        assert_eq!(edges.len(), (LAYERS - 1) * 12 * LINKS_PER_NODE);
        for (i, v) in vertices.iter().enumerate() {
            let expected = (i as f32 * 0.1 + 0.75).sin() * (0.3 + 0.2);
            assert!((v.z - expected).abs() < 1e-6);
        }
    }
}
