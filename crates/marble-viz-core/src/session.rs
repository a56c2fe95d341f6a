//! Everything one running visualization owns.
//!
//! A `Session` is built explicitly and handed to the frame scheduler. It
//! holds the scene graph, the marble field, the effect renderer and its
//! effect list, plus the audio handles the tick reads from.

use crate::audio::{AudioSource, FeatureExtractor, FeatureVector, ToneSynth, TrackInfo};
use crate::effects::{EffectId, EffectInstance, EffectKind, EffectParams, EffectRenderer};
use crate::error::Result;
use crate::physics::{RigidBodyField, Strike};
use crate::scene::{Color, SceneGraph};

/// Drop height for manually spawned marbles
pub const MANUAL_SPAWN_HEIGHT: f32 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct SessionSettings {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    /// Spawn marbles from the bass while a marble effect is active
    pub auto_spawn: bool,
    pub max_marbles: Option<usize>,
    pub synth_volume: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            background: Color::BLACK,
            auto_spawn: true,
            max_marbles: None,
            synth_volume: 0.5,
        }
    }
}

/// Timing of one tick
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameClock {
    pub frame: u64,
    /// Seconds since the previous tick
    pub dt: f32,
    /// Seconds since the scheduler started
    pub elapsed: f32,
}

pub struct Session {
    scene: SceneGraph,
    field: RigidBodyField,
    effects: EffectRenderer,
    instances: Vec<EffectInstance>,
    next_effect_id: u64,
    extractor: FeatureExtractor,
    audio: AudioSource,
    synth: ToneSynth,
    auto_spawn: bool,
    features: FeatureVector,
}

impl Session {
    pub fn new(audio: AudioSource, synth: ToneSynth, settings: &SessionSettings) -> Self {
        let mut scene = SceneGraph::new(settings.width, settings.height);
        scene.set_background(settings.background);

        synth.set_volume(settings.synth_volume);
        let mut field = RigidBodyField::new(&mut scene, Box::new(synth.clone()));
        field.set_max_marbles(settings.max_marbles);

        Self::from_parts(scene, field, EffectRenderer::new(), audio, synth, settings.auto_spawn)
    }

    /// Assemble a session from pre-built components (seeded field or renderer)
    pub fn from_parts(
        scene: SceneGraph,
        field: RigidBodyField,
        effects: EffectRenderer,
        audio: AudioSource,
        synth: ToneSynth,
        auto_spawn: bool,
    ) -> Self {
        Self {
            scene,
            field,
            effects,
            instances: Vec::new(),
            next_effect_id: 1,
            extractor: FeatureExtractor::new(),
            audio,
            synth,
            auto_spawn,
            features: FeatureVector::silent(),
        }
    }

    /// Decode and load a track, resetting analysis history
    pub fn load_track(&mut self, bytes: Vec<u8>, extension: Option<&str>) -> Result<TrackInfo> {
        let info = self.audio.load_bytes(bytes, extension)?;
        self.extractor.reset();
        Ok(info)
    }

    pub fn add_effect(&mut self, kind: EffectKind, params: EffectParams) -> EffectId {
        let id = EffectId::new(self.next_effect_id);
        self.next_effect_id += 1;

        let instance = EffectInstance::with_params(id, kind, params);
        self.effects.add_effect(&instance, &mut self.scene);
        self.instances.push(instance);
        id
    }

    /// Unknown ids are ignored
    pub fn remove_effect(&mut self, id: EffectId) -> bool {
        let before = self.instances.len();
        self.instances.retain(|e| e.id != id);
        self.effects.remove_effect(id, &mut self.scene, &mut self.field);
        self.instances.len() != before
    }

    /// Replace an existing effect's parameters and rebuild its resource
    pub fn update_effect(&mut self, instance: EffectInstance) -> bool {
        let Some(slot) = self.instances.iter_mut().find(|e| e.id == instance.id) else {
            return false;
        };
        if slot.kind != instance.kind {
            // Kind changes go through remove so a marble effect still clears the field
            self.effects
                .remove_effect(instance.id, &mut self.scene, &mut self.field);
        }
        self.effects.add_effect(&instance, &mut self.scene);
        *slot = instance;
        true
    }

    /// Remove every effect of `kind`, or add one with default parameters if
    /// there is none. Returns whether the kind is now active.
    pub fn toggle_effect(&mut self, kind: EffectKind) -> bool {
        let ids: Vec<EffectId> = self
            .instances
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.id)
            .collect();
        if ids.is_empty() {
            self.add_effect(kind, EffectParams::default());
            true
        } else {
            for id in ids {
                self.remove_effect(id);
            }
            false
        }
    }

    pub fn effects(&self) -> &[EffectInstance] {
        &self.instances
    }

    pub fn spawn_marble(&mut self) -> bool {
        self.field.spawn(MANUAL_SPAWN_HEIGHT, &mut self.scene)
    }

    pub fn clear_marbles(&mut self) {
        self.field.clear(&mut self.scene);
    }

    pub fn set_background(&mut self, color: Color) {
        self.scene.set_background(color);
    }

    pub fn set_synth_volume(&mut self, volume: f32) {
        self.synth.set_volume(volume);
    }

    pub fn synth_volume(&self) -> f32 {
        self.synth.volume()
    }

    pub fn set_auto_spawn(&mut self, enabled: bool) {
        self.auto_spawn = enabled;
    }

    pub fn auto_spawn(&self) -> bool {
        self.auto_spawn
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
    }

    /// Read features at the playback cursor, then run the tick
    pub fn tick(&mut self, clock: FrameClock) -> Vec<Strike> {
        let features = self.extractor.extract(&self.audio);
        self.tick_with(features, clock)
    }

    /// Run one tick on a given feature snapshot:
    /// spawn from audio, physics step, effect update.
    pub fn tick_with(&mut self, features: FeatureVector, clock: FrameClock) -> Vec<Strike> {
        if self.auto_spawn && self.effects.has_marble_effect() {
            self.field
                .spawn_from_audio(features.volume, features.bass_level, &mut self.scene);
        }

        let strikes = self.field.step(clock.dt, &features, &mut self.scene);
        self.effects.update(&features, clock.elapsed, &mut self.scene);

        self.features = features;
        strikes
    }

    /// Features used by the most recent tick
    pub fn features(&self) -> &FeatureVector {
        &self.features
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn field(&self) -> &RigidBodyField {
        &self.field
    }

    pub fn marble_count(&self) -> usize {
        self.field.marble_count()
    }

    pub fn audio(&self) -> &AudioSource {
        &self.audio
    }

    pub fn synth(&self) -> &ToneSynth {
        &self.synth
    }
}
