//! Playback transport for a decoded track.
//!
//! The [`Deck`] is shared between the frame loop (transport commands,
//! analysis reads) and the audio callback (sample pulls). [`AudioSource`] is
//! the cloneable handle the rest of the engine uses.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use super::decoder::{self, DecodedAudio};
use crate::error::Result;

/// Sample rate assumed until an output device reports its own
pub const DEFAULT_OUTPUT_RATE: u32 = 44100;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

/// Transport command issued outside of its valid lifecycle window.
/// Recovered locally, never surfaced to callers.
#[derive(Error, Debug, PartialEq)]
pub enum PlaybackFault {
    #[error("no track loaded")]
    NoTrack,
    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: PlayState,
    },
}

/// Summary of a freshly loaded track
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrackInfo {
    pub duration: f32,
    pub sample_rate: u32,
    pub channels: usize,
}

pub struct Deck {
    track: Option<Arc<DecodedAudio>>,
    /// Read position in track frames (fractional while resampling)
    position: f64,
    state: PlayState,
    volume: f32,
    output_rate: u32,
}

impl Default for Deck {
    fn default() -> Self {
        Self {
            track: None,
            position: 0.0,
            state: PlayState::Stopped,
            volume: 1.0,
            output_rate: DEFAULT_OUTPUT_RATE,
        }
    }
}

impl Deck {
    fn play(&mut self) -> std::result::Result<(), PlaybackFault> {
        if self.track.is_none() {
            return Err(PlaybackFault::NoTrack);
        }
        if self.state == PlayState::Playing {
            return Err(PlaybackFault::InvalidTransition {
                action: "play",
                state: self.state,
            });
        }
        self.state = PlayState::Playing;
        Ok(())
    }

    fn pause(&mut self) -> std::result::Result<(), PlaybackFault> {
        if self.state != PlayState::Playing {
            return Err(PlaybackFault::InvalidTransition {
                action: "pause",
                state: self.state,
            });
        }
        self.state = PlayState::Paused;
        Ok(())
    }

    fn stop(&mut self) -> std::result::Result<(), PlaybackFault> {
        let was = self.state;
        self.state = PlayState::Stopped;
        self.position = 0.0;
        if was == PlayState::Stopped {
            return Err(PlaybackFault::InvalidTransition {
                action: "stop",
                state: was,
            });
        }
        Ok(())
    }

    /// Pull one output-rate sample. Called from the audio callback.
    pub fn next_sample(&mut self) -> f32 {
        if self.state != PlayState::Playing {
            return 0.0;
        }
        let Some(track) = self.track.as_ref() else {
            return 0.0;
        };

        let idx = self.position as usize;
        if idx >= track.samples.len() {
            // End of track: rewind and stop
            self.state = PlayState::Stopped;
            self.position = 0.0;
            return 0.0;
        }

        // Linear interpolation between neighbouring track frames
        let frac = (self.position - idx as f64) as f32;
        let a = track.samples[idx];
        let b = track.samples.get(idx + 1).copied().unwrap_or(a);
        let sample = a + (b - a) * frac;

        self.position += track.sample_rate as f64 / self.output_rate as f64;
        sample * self.volume
    }

    /// Fill `out` with the track samples ending at the cursor.
    /// Samples before the start of the track are zero. A paused or stopped
    /// deck is heard as silence and returns `false`.
    pub fn recent(&self, out: &mut [f32]) -> bool {
        let track = match self.track.as_ref() {
            Some(track) if self.state == PlayState::Playing => track,
            _ => {
                out.fill(0.0);
                return false;
            }
        };

        let end = (self.position as usize).min(track.samples.len());
        let len = out.len();
        for (i, slot) in out.iter_mut().enumerate() {
            // i == len - 1 is the most recent sample
            let back = len - i;
            *slot = if back <= end {
                track.samples[end - back]
            } else {
                0.0
            };
        }
        true
    }

    fn current_time(&self) -> f32 {
        match self.track.as_ref() {
            Some(track) => (self.position / track.sample_rate as f64) as f32,
            None => 0.0,
        }
    }
}

/// Cloneable handle to the playback deck
#[derive(Clone, Default)]
pub struct AudioSource {
    deck: Arc<Mutex<Deck>>,
}

impl AudioSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn deck(&self) -> MutexGuard<'_, Deck> {
        self.deck.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn shared(&self) -> Arc<Mutex<Deck>> {
        Arc::clone(&self.deck)
    }

    /// Decode and install a new track, stopped at position zero.
    /// On failure the previously loaded track is kept.
    pub fn load_bytes(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<TrackInfo> {
        let decoded = decoder::decode(bytes, extension)?;
        let info = TrackInfo {
            duration: decoded.duration(),
            sample_rate: decoded.sample_rate,
            channels: decoded.channels,
        };

        let mut deck = self.deck();
        deck.track = Some(Arc::new(decoded));
        deck.position = 0.0;
        deck.state = PlayState::Stopped;

        tracing::info!(
            duration = info.duration,
            sample_rate = info.sample_rate,
            channels = info.channels,
            "track loaded"
        );
        Ok(info)
    }

    pub fn is_loaded(&self) -> bool {
        self.deck().track.is_some()
    }

    pub fn play(&self) {
        let mut deck = self.deck();
        if let Err(fault) = deck.play() {
            tracing::debug!(%fault, "ignored play command");
        }
    }

    pub fn pause(&self) {
        let mut deck = self.deck();
        if let Err(fault) = deck.pause() {
            tracing::debug!(%fault, "ignored pause command");
        }
    }

    pub fn stop(&self) {
        let mut deck = self.deck();
        if let Err(fault) = deck.stop() {
            tracing::debug!(%fault, "ignored stop command");
        }
    }

    /// Play when paused/stopped, pause when playing
    pub fn toggle(&self) {
        let playing = self.deck().state == PlayState::Playing;
        if playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the cursor, clamped to the track
    pub fn seek(&self, seconds: f32) {
        let mut deck = self.deck();
        let Some(track) = deck.track.clone() else {
            tracing::debug!(fault = %PlaybackFault::NoTrack, "ignored seek command");
            return;
        };
        let frame = (seconds.max(0.0) as f64 * track.sample_rate as f64)
            .min(track.samples.len() as f64);
        deck.position = frame;
    }

    pub fn set_volume(&self, volume: f32) {
        self.deck().volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.deck().volume
    }

    pub fn state(&self) -> PlayState {
        self.deck().state
    }

    pub fn current_time(&self) -> f32 {
        self.deck().current_time()
    }

    pub fn duration(&self) -> f32 {
        self.deck()
            .track
            .as_ref()
            .map(|t| t.duration())
            .unwrap_or(0.0)
    }

    pub fn set_output_rate(&self, rate: u32) {
        self.deck().output_rate = rate.max(1);
    }

    /// Copy the analysis window ending at the playback cursor into `out`.
    /// Returns false (and zeroes `out`) when nothing is loaded.
    pub fn analysis_window(&self, out: &mut [f32]) -> bool {
        self.deck().recent(out)
    }

    /// Pull output samples directly, bypassing the device (offline rendering)
    pub fn render(&self, out: &mut [f32]) {
        let mut deck = self.deck();
        for s in out.iter_mut() {
            *s = deck.next_sample();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decoder::tests::wav_bytes;

    fn ramp_source(frames: usize) -> AudioSource {
        let samples: Vec<i16> = (0..frames).map(|i| (i % 1000) as i16 * 16).collect();
        let source = AudioSource::new();
        source
            .load_bytes(wav_bytes(&samples, 44100, 1), Some("wav"))
            .unwrap();
        source
    }

    #[test]
    fn test_transport_lifecycle() {
        let source = ramp_source(44100);
        assert_eq!(source.state(), PlayState::Stopped);

        source.play();
        assert_eq!(source.state(), PlayState::Playing);
        source.pause();
        assert_eq!(source.state(), PlayState::Paused);
        source.toggle();
        assert_eq!(source.state(), PlayState::Playing);

        source.stop();
        // Double stop is a swallowed fault
        source.stop();
        assert_eq!(source.state(), PlayState::Stopped);
        assert_eq!(source.current_time(), 0.0);
    }

    #[test]
    fn test_commands_without_track_are_noops() {
        let source = AudioSource::new();
        source.play();
        source.pause();
        source.seek(3.0);
        assert_eq!(source.state(), PlayState::Stopped);
        assert!(!source.is_loaded());

        let mut window = [1.0f32; 8];
        assert!(!source.analysis_window(&mut window));
        assert!(window.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_advances_cursor() {
        let source = ramp_source(44100);
        source.play();

        let mut out = vec![0.0f32; 4410];
        source.render(&mut out);
        assert!((source.current_time() - 0.1).abs() < 1e-3);

        // Analysis window ends exactly at the last rendered sample
        let mut window = [0.0f32; 4];
        assert!(source.analysis_window(&mut window));
        assert!((window[3] - out[4409]).abs() < 1e-6);
    }

    #[test]
    fn test_paused_deck_is_silent_to_analysis() {
        let source = ramp_source(44100);
        source.play();
        let mut out = vec![0.0f32; 4410];
        source.render(&mut out);

        source.pause();
        let mut window = [1.0f32; 16];
        assert!(!source.analysis_window(&mut window));
        assert!(window.iter().all(|&s| s == 0.0));

        source.play();
        assert!(source.analysis_window(&mut window));
        assert!((window[15] - out[4409]).abs() < 1e-6);
    }

    #[test]
    fn test_end_of_track_stops() {
        let source = ramp_source(100);
        source.play();
        let mut out = vec![0.0f32; 200];
        source.render(&mut out);
        assert_eq!(source.state(), PlayState::Stopped);
        assert!(out[150..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_failed_load_keeps_previous_track() {
        let source = ramp_source(44100);
        assert!(source.load_bytes(vec![0u8; 64], None).is_err());
        assert!(source.is_loaded());
        assert!((source.duration() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_volume_is_clamped() {
        let source = AudioSource::new();
        source.set_volume(3.0);
        assert_eq!(source.volume(), 1.0);
        source.set_volume(-1.0);
        assert_eq!(source.volume(), 0.0);
    }
}
