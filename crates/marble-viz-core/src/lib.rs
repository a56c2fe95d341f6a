//! Audio-reactive marble xylophone engine.
//!
//! Audio features drive a small rigid-body simulation (marbles bouncing on
//! tuned keys) and a set of procedural effects. Everything draws into a
//! retained [`scene::SceneGraph`]; the host application supplies a
//! [`scene::Presenter`] and calls [`scheduler::FrameScheduler::tick`] once per
//! display refresh.

pub mod audio;
pub mod capture;
pub mod effects;
pub mod error;
pub mod physics;
pub mod scene;
pub mod scheduler;
pub mod session;

pub use audio::{AudioOutput, AudioSource, FeatureExtractor, FeatureVector, ToneSynth};
pub use capture::{CaptureSession, CaptureSummary};
pub use effects::{EffectId, EffectInstance, EffectKind, EffectParams, EffectRenderer};
pub use error::{Error, Result};
pub use physics::{RigidBodyField, Strike};
pub use scene::{Color, Presenter, SceneGraph};
pub use scheduler::{FrameScheduler, Pacing, TickReport};
pub use session::{FrameClock, Session, SessionSettings};
