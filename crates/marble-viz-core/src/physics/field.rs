//! Marble simulation against the xylophone keys.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::burst::Burst;
use super::key::{xylophone_layout, Key, KEY_DEPTH};
use super::trail::TrailBuffer;
use crate::audio::{FeatureVector, NotePlayer};
use crate::scene::{layer, Color, Geometry, Primitive, PrimitiveId, SceneGraph, Transform};

pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.8, 0.0);
/// Velocity multiplier applied every step
pub const DAMPING: f32 = 0.98;
/// Vertical speed kept after bouncing off a key
pub const RESTITUTION: f32 = 0.7;
/// Marbles below this height are retired
pub const FLOOR_Y: f32 = -10.0;
pub const MARBLE_RADIUS: f32 = 0.3;
pub const MARBLE_MASS: f32 = 1.0;
pub const TRAIL_CAPACITY: usize = 100;

const BASS_NUDGE: f32 = 0.1;
const MID_LIFT_THRESHOLD: f32 = 0.3;
const MID_LIFT: f32 = 0.2;
const TREBLE_NUDGE: f32 = 0.1;
const BOUNCE_SCATTER: f32 = 0.5;
const SPAWN_SPREAD: f32 = 1.0;
const SPAWN_DRIFT: f32 = 0.5;

const AUDIO_SPAWN_VOLUME: f32 = 0.1;
const AUDIO_SPAWN_BASS: f32 = 0.1;
const AUDIO_SPAWN_BASE_HEIGHT: f32 = 8.0;
const AUDIO_SPAWN_BASS_HEIGHT: f32 = 4.0;

const MARBLE_COLOR: Color = Color::rgb(0.85, 0.9, 1.0);
const TRAIL_COLOR: Color = Color::rgb(0.4, 0.6, 1.0);
const TRAIL_WEIGHT: f32 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Marble {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub radius: f32,
    pub mass: f32,
    pub bounce_count: u32,
    pub is_active: bool,
    primitive: PrimitiveId,
}

impl Marble {
    pub fn primitive(&self) -> PrimitiveId {
        self.primitive
    }
}

/// A marble hitting a key during a step
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Strike {
    pub key_index: usize,
    pub frequency: f32,
    /// Note velocity, 0-1
    pub velocity: f32,
    pub position: Vec3,
}

/// Note velocity for a marble arriving with vertical speed `vy`
pub fn strike_velocity(vy: f32) -> f32 {
    (vy.abs() / 10.0).min(1.0)
}

pub struct RigidBodyField {
    marbles: Vec<Marble>,
    keys: Vec<Key>,
    key_primitives: Vec<PrimitiveId>,
    trail: TrailBuffer,
    trail_primitive: PrimitiveId,
    bursts: Vec<Burst>,
    player: Box<dyn NotePlayer>,
    rng: StdRng,
    /// Simulation clock, advanced by `step`
    time: f32,
    max_marbles: Option<usize>,
}

impl RigidBodyField {
    /// Field with the standard seven-key layout
    pub fn new(scene: &mut SceneGraph, player: Box<dyn NotePlayer>) -> Self {
        Self::with_keys(xylophone_layout(), scene, player, StdRng::from_os_rng())
    }

    pub fn with_keys(
        keys: Vec<Key>,
        scene: &mut SceneGraph,
        player: Box<dyn NotePlayer>,
        rng: StdRng,
    ) -> Self {
        let key_primitives = keys
            .iter()
            .map(|key| {
                scene.add(
                    Primitive::new(
                        Geometry::Cuboid {
                            size: Vec3::new(key.width, key.height, KEY_DEPTH),
                        },
                        key.display_color(),
                    )
                    .with_transform(Transform::at(key.position)),
                )
            })
            .collect();

        let trail_primitive = scene.add(
            Primitive::new(
                Geometry::Line {
                    points: Vec::new(),
                    weight: TRAIL_WEIGHT,
                },
                TRAIL_COLOR,
            )
            .with_layer(layer::TRAIL)
            .with_opacity(0.6),
        );

        Self {
            marbles: Vec::new(),
            keys,
            key_primitives,
            trail: TrailBuffer::new(TRAIL_CAPACITY),
            trail_primitive,
            bursts: Vec::new(),
            player,
            rng,
            time: 0.0,
            max_marbles: None,
        }
    }

    /// Cap on simultaneously active marbles; `None` means unbounded
    pub fn set_max_marbles(&mut self, max: Option<usize>) {
        self.max_marbles = max;
    }

    fn at_capacity(&self) -> bool {
        self.max_marbles
            .is_some_and(|max| self.marbles.len() >= max)
    }

    /// Drop a marble at a random x in [-1, 1] with a small sideways drift
    pub fn spawn(&mut self, start_height: f32, scene: &mut SceneGraph) -> bool {
        let x = self.rng.random_range(-SPAWN_SPREAD..=SPAWN_SPREAD);
        let vx = self.rng.random_range(-SPAWN_DRIFT..=SPAWN_DRIFT);
        self.spawn_at(
            Vec3::new(x, start_height, 0.0),
            Vec3::new(vx, 0.0, 0.0),
            scene,
        )
    }

    /// Place a marble exactly. Returns false if the marble cap is reached.
    pub fn spawn_at(&mut self, position: Vec3, velocity: Vec3, scene: &mut SceneGraph) -> bool {
        if self.at_capacity() {
            return false;
        }

        let primitive = scene.add(
            Primitive::new(
                Geometry::Sphere {
                    radius: MARBLE_RADIUS,
                },
                MARBLE_COLOR,
            )
            .with_transform(Transform::at(position)),
        );

        self.marbles.push(Marble {
            position,
            velocity,
            acceleration: Vec3::ZERO,
            radius: MARBLE_RADIUS,
            mass: MARBLE_MASS,
            bounce_count: 0,
            is_active: true,
            primitive,
        });
        true
    }

    /// Spawn one marble, higher for stronger bass, whenever both levels are
    /// above threshold. Fires every call while the condition holds.
    pub fn spawn_from_audio(&mut self, volume: f32, bass_level: f32, scene: &mut SceneGraph) -> bool {
        if volume > AUDIO_SPAWN_VOLUME && bass_level > AUDIO_SPAWN_BASS {
            let height = AUDIO_SPAWN_BASE_HEIGHT + bass_level * AUDIO_SPAWN_BASS_HEIGHT;
            self.spawn(height, scene)
        } else {
            false
        }
    }

    /// Advance every marble by `dt` seconds
    pub fn step(&mut self, dt: f32, features: &FeatureVector, scene: &mut SceneGraph) -> Vec<Strike> {
        self.time += dt;
        let now = self.time;

        for (key, &prim) in self.keys.iter_mut().zip(&self.key_primitives) {
            key.expire(now);
            if let Some(p) = scene.get_mut(prim) {
                p.color = key.display_color();
            }
        }

        let mut strikes = Vec::new();
        let Self {
            marbles,
            keys,
            key_primitives,
            trail,
            bursts,
            player,
            rng,
            ..
        } = self;

        marbles.retain_mut(|marble| {
            marble.acceleration = GRAVITY;

            marble.velocity.x += (rng.random::<f32>() - 0.5) * features.bass_level * BASS_NUDGE;
            if features.mid_level > MID_LIFT_THRESHOLD {
                marble.velocity.y += features.mid_level * MID_LIFT;
            }
            marble.velocity.z += (rng.random::<f32>() - 0.5) * features.treble_level * TREBLE_NUDGE;

            marble.velocity += marble.acceleration * dt;
            marble.velocity *= DAMPING;
            marble.position += marble.velocity * dt;

            // Lowest index wins
            if let Some(index) = keys
                .iter()
                .position(|key| key.overlaps(marble.position, marble.radius))
            {
                let key = &mut keys[index];
                let velocity = strike_velocity(marble.velocity.y);

                marble.velocity.y = marble.velocity.y.abs() * RESTITUTION;
                marble.position.y = key.top() + marble.radius;
                marble.velocity.x += (rng.random::<f32>() - 0.5) * BOUNCE_SCATTER;
                marble.bounce_count += 1;

                key.strike(now);
                if let Some(p) = scene.get_mut(key_primitives[index]) {
                    p.color = key.display_color();
                }

                let impact = Vec3::new(marble.position.x, key.top(), marble.position.z);
                bursts.push(Burst::spawn(impact, key.color, &mut *rng, scene));
                player.play_note(key.frequency, velocity);

                tracing::debug!(note = key.note, velocity, "key struck");
                strikes.push(Strike {
                    key_index: index,
                    frequency: key.frequency,
                    velocity,
                    position: impact,
                });
            }

            trail.push(marble.position);

            if marble.position.y < FLOOR_Y {
                marble.is_active = false;
                scene.remove(marble.primitive);
                return false;
            }

            if let Some(p) = scene.get_mut(marble.primitive) {
                p.transform.translation = marble.position;
            }
            true
        });

        let mut i = 0;
        while i < self.bursts.len() {
            if self.bursts[i].update(dt, scene) {
                i += 1;
            } else {
                self.bursts.swap_remove(i).release(scene);
            }
        }

        self.sync_trail(scene);
        strikes
    }

    fn sync_trail(&self, scene: &mut SceneGraph) {
        if let Some(p) = scene.get_mut(self.trail_primitive) {
            if let Geometry::Line { points, .. } = &mut p.geometry {
                points.clear();
                points.extend(self.trail.iter().copied());
            }
        }
    }

    /// Remove every marble, the trail and any bursts
    pub fn clear(&mut self, scene: &mut SceneGraph) {
        for marble in self.marbles.drain(..) {
            scene.remove(marble.primitive);
        }
        for burst in self.bursts.drain(..) {
            burst.release(scene);
        }
        self.trail.clear();
        self.sync_trail(scene);
    }

    pub fn marbles(&self) -> &[Marble] {
        &self.marbles
    }

    pub fn marble_count(&self) -> usize {
        self.marbles.len()
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn trail(&self) -> &TrailBuffer {
        &self.trail
    }

    pub fn burst_count(&self) -> usize {
        self.bursts.len()
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}
