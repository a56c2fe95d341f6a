//! Audio side of the engine: decoding, playback, analysis and synthesis.

pub mod analyzer;
pub mod decoder;
pub mod output;
pub mod playback;
pub mod synth;

pub use analyzer::{FeatureExtractor, FeatureVector};
pub use decoder::DecodedAudio;
pub use output::AudioOutput;
pub use playback::{AudioSource, PlayState, TrackInfo};
pub use synth::{NotePlayer, ToneSynth};
