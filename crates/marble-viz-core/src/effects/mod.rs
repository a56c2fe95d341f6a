//! Audio-driven visual effects.
//!
//! Every [`EffectInstance`] the session holds maps to exactly one live
//! resource here. The marble variant owns no scene primitive; removing it
//! clears the marble field instead.

mod fluid;
mod geometric;
mod neural;
mod particle;
mod wave;

pub use fluid::{FluidShader, FluidSurface};
pub use geometric::{pulse_scale, PulsingSolid};
pub use neural::NodeGraph;
pub use particle::ParticleCloud;
pub use wave::WaveField;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::audio::FeatureVector;
use crate::error::Error;
use crate::physics::RigidBodyField;
use crate::scene::{Color, PrimitiveId, SceneGraph};

/// Unique handle of an effect instance
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Wave,
    Particle,
    Geometric,
    Fluid,
    Neural,
    Marble,
}

impl EffectKind {
    pub const ALL: [EffectKind; 6] = [
        EffectKind::Wave,
        EffectKind::Particle,
        EffectKind::Geometric,
        EffectKind::Fluid,
        EffectKind::Neural,
        EffectKind::Marble,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Wave => "wave",
            EffectKind::Particle => "particle",
            EffectKind::Geometric => "geometric",
            EffectKind::Fluid => "fluid",
            EffectKind::Neural => "neural",
            EffectKind::Marble => "marble",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.name() == tag)
            .ok_or_else(|| Error::UnknownVariant(s.to_string()))
    }
}

/// Tunable parameters shared by every effect kind
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EffectParams {
    /// 0-1, used as opacity
    pub intensity: f32,
    pub color: Color,
    pub speed: f32,
    pub size: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            color: Color::WHITE,
            speed: 1.0,
            size: 1.0,
        }
    }
}

/// User-facing parameters of one effect
#[derive(Clone, Debug, PartialEq)]
pub struct EffectInstance {
    pub id: EffectId,
    pub kind: EffectKind,
    /// 0-1, used as opacity
    pub intensity: f32,
    pub color: Color,
    pub speed: f32,
    pub size: f32,
}

impl EffectInstance {
    pub fn new(id: EffectId, kind: EffectKind) -> Self {
        Self::with_params(id, kind, EffectParams::default())
    }

    pub fn with_params(id: EffectId, kind: EffectKind, params: EffectParams) -> Self {
        Self {
            id,
            kind,
            intensity: params.intensity,
            color: params.color,
            speed: params.speed,
            size: params.size,
        }
    }

    pub fn params(&self) -> EffectParams {
        EffectParams {
            intensity: self.intensity,
            color: self.color,
            speed: self.speed,
            size: self.size,
        }
    }
}

/// A live effect resource
pub trait Effect {
    /// Advance by one tick; `elapsed` is seconds since the session started
    fn update(&mut self, features: &FeatureVector, elapsed: f32, scene: &mut SceneGraph);

    /// Scene primitive this effect draws into
    fn primitive(&self) -> PrimitiveId;
}

pub struct EffectRenderer {
    live: HashMap<EffectId, Box<dyn Effect>>,
    marble_effects: HashSet<EffectId>,
    rng: StdRng,
}

impl Default for EffectRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRenderer {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            live: HashMap::new(),
            marble_effects: HashSet::new(),
            rng,
        }
    }

    /// Build the resource for `instance`. An existing resource with the same
    /// id is released first.
    pub fn add_effect(&mut self, instance: &EffectInstance, scene: &mut SceneGraph) {
        self.release(instance.id, scene);

        let seed: u64 = self.rng.random();
        let effect: Box<dyn Effect> = match instance.kind {
            EffectKind::Wave => Box::new(WaveField::new(instance, scene)),
            EffectKind::Particle => Box::new(ParticleCloud::new(instance, seed, scene)),
            EffectKind::Geometric => Box::new(PulsingSolid::new(instance, scene)),
            EffectKind::Fluid => Box::new(FluidSurface::new(instance, scene)),
            EffectKind::Neural => Box::new(NodeGraph::new(instance, seed, scene)),
            EffectKind::Marble => {
                self.marble_effects.insert(instance.id);
                return;
            }
        };

        tracing::debug!(id = %instance.id, kind = %instance.kind, "effect added");
        self.live.insert(instance.id, effect);
    }

    /// Release the resource for `id`. Removing a marble effect clears the
    /// field. Unknown ids are ignored.
    pub fn remove_effect(
        &mut self,
        id: EffectId,
        scene: &mut SceneGraph,
        field: &mut RigidBodyField,
    ) -> bool {
        if self.marble_effects.remove(&id) {
            field.clear(scene);
            return true;
        }
        self.release(id, scene)
    }

    fn release(&mut self, id: EffectId, scene: &mut SceneGraph) -> bool {
        self.marble_effects.remove(&id);
        match self.live.remove(&id) {
            Some(effect) => {
                scene.remove(effect.primitive());
                true
            }
            None => false,
        }
    }

    pub fn update(&mut self, features: &FeatureVector, elapsed: f32, scene: &mut SceneGraph) {
        for effect in self.live.values_mut() {
            effect.update(features, elapsed, scene);
        }
    }

    pub fn has_marble_effect(&self) -> bool {
        !self.marble_effects.is_empty()
    }

    pub fn contains(&self, id: EffectId) -> bool {
        self.live.contains_key(&id) || self.marble_effects.contains(&id)
    }

    /// Scene primitive of a live effect
    pub fn primitive(&self, id: EffectId) -> Option<PrimitiveId> {
        self.live.get(&id).map(|e| e.primitive())
    }

    pub fn len(&self) -> usize {
        self.live.len() + self.marble_effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Intensity is applied as primitive opacity
pub(crate) fn opacity(instance: &EffectInstance) -> f32 {
    instance.intensity.clamp(0.0, 1.0)
}
