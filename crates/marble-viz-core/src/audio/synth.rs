//! Percussive tone synthesis for key strikes.
//!
//! Each note is four independent voices: three enveloped sine partials and a
//! band-passed noise transient. Voices live in a [`VoiceBank`] shared with the
//! audio output callback and are dropped as soon as their envelope ends.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type};
use rand::Rng;

/// Partial multiples of the fundamental and their weights
const PARTIALS: [(f32, f32); 3] = [(1.0, 0.8), (2.0, 0.4), (3.0, 0.2)];

const PARTIAL_ATTACK: f32 = 0.010;
const PARTIAL_DECAY_END: f32 = 0.100;
const PARTIAL_SUSTAIN: f32 = 0.3;
const PARTIAL_RELEASE_END: f32 = 0.500;

const NOISE_PEAK: f32 = 0.3;
const NOISE_ATTACK: f32 = 0.001;
const NOISE_DECAY_END: f32 = 0.050;
const NOISE_LENGTH: f32 = 0.100;
const NOISE_CENTER_HZ: f32 = 2000.0;
const NOISE_Q: f32 = 5.0;

/// Level treated as silence by the exponential ramps
const SILENCE: f32 = 0.001;

/// Oldest voices are dropped beyond this
const MAX_VOICES: usize = 256;

/// Anything that can sound a struck key
pub trait NotePlayer {
    fn play_note(&self, frequency: f32, velocity: f32);
}

/// Linear attack followed by exponential ramps, cut at `stop`.
/// After the last ramp the final level is held until the stop time.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    peak: f32,
    attack: f32,
    /// (end time, target level)
    ramps: Vec<(f32, f32)>,
    stop: f32,
}

impl Envelope {
    /// Envelope of one harmonic partial
    pub fn partial(peak: f32) -> Self {
        Self {
            peak,
            attack: PARTIAL_ATTACK,
            ramps: vec![
                (PARTIAL_DECAY_END, peak * PARTIAL_SUSTAIN),
                (PARTIAL_RELEASE_END, SILENCE),
            ],
            stop: PARTIAL_RELEASE_END,
        }
    }

    /// Envelope of the mechanical strike transient
    pub fn transient(peak: f32) -> Self {
        Self {
            peak,
            attack: NOISE_ATTACK,
            ramps: vec![(NOISE_DECAY_END, SILENCE)],
            stop: NOISE_LENGTH,
        }
    }

    pub fn level(&self, t: f32) -> f32 {
        if !(0.0..self.stop).contains(&t) {
            return 0.0;
        }
        if t < self.attack {
            return self.peak * t / self.attack;
        }

        let mut from_t = self.attack;
        let mut from_level = self.peak;
        for &(end, target) in &self.ramps {
            if t < end {
                let frac = (t - from_t) / (end - from_t);
                return exp_ramp(from_level, target, frac);
            }
            from_t = end;
            from_level = target;
        }
        from_level
    }

    pub fn duration(&self) -> f32 {
        self.stop
    }
}

fn exp_ramp(from: f32, to: f32, frac: f32) -> f32 {
    if from <= 0.0 || to <= 0.0 {
        return from + (to - from) * frac;
    }
    from * (to / from).powf(frac)
}

enum Source {
    Sine { frequency: f32 },
    Noise { buffer: Vec<f32>, filter: DirectForm1<f32> },
}

pub struct Voice {
    source: Source,
    envelope: Envelope,
    elapsed: u64,
}

impl Voice {
    fn next(&mut self, sample_rate: f32) -> Option<f32> {
        let t = self.elapsed as f32 / sample_rate;
        if t >= self.envelope.duration() {
            return None;
        }

        let raw = match &mut self.source {
            Source::Sine { frequency } => (std::f32::consts::TAU * *frequency * t).sin(),
            Source::Noise { buffer, filter } => {
                let x = buffer.get(self.elapsed as usize).copied().unwrap_or(0.0);
                filter.run(x)
            }
        };

        self.elapsed += 1;
        Some(raw * self.envelope.level(t))
    }
}

/// Band-pass applied to the strike transient. `None` when the center
/// frequency does not fit below Nyquist.
pub fn noise_filter(sample_rate: f32) -> Option<DirectForm1<f32>> {
    Coefficients::<f32>::from_params(
        Type::BandPass,
        sample_rate.hz(),
        NOISE_CENTER_HZ.hz(),
        NOISE_Q,
    )
    .ok()
    .map(DirectForm1::<f32>::new)
}

/// Build every voice of one note: the harmonic partials plus a fresh noise
/// transient drawn from `rng`.
pub fn note_voices(
    frequency: f32,
    velocity: f32,
    sample_rate: f32,
    rng: &mut impl Rng,
) -> Vec<Voice> {
    let mut voices: Vec<Voice> = PARTIALS
        .iter()
        .map(|&(multiple, weight)| Voice {
            source: Source::Sine {
                frequency: frequency * multiple,
            },
            envelope: Envelope::partial(weight * velocity),
            elapsed: 0,
        })
        .collect();

    match noise_filter(sample_rate) {
        Some(filter) => {
            let len = (NOISE_LENGTH * sample_rate) as usize;
            let buffer: Vec<f32> = (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();
            voices.push(Voice {
                source: Source::Noise { buffer, filter },
                envelope: Envelope::transient(NOISE_PEAK * velocity),
                elapsed: 0,
            });
        }
        None => tracing::debug!(sample_rate, "sample rate too low for the strike transient"),
    }
    voices
}

/// Voices currently sounding plus the shared output gain
pub struct VoiceBank {
    voices: Vec<Voice>,
    gain: f32,
    sample_rate: f32,
}

impl VoiceBank {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            voices: Vec::new(),
            gain: 1.0,
            sample_rate: sample_rate.max(1) as f32,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Add ready-made voices, dropping the oldest beyond the cap
    pub fn push(&mut self, voices: Vec<Voice>) {
        self.voices.extend(voices);
        if self.voices.len() > MAX_VOICES {
            let excess = self.voices.len() - MAX_VOICES;
            self.voices.drain(..excess);
        }
    }

    /// Mix one sample of every live voice, dropping finished ones
    pub fn next_sample(&mut self) -> f32 {
        let sample_rate = self.sample_rate;
        let mut mix = 0.0;
        self.voices.retain_mut(|voice| match voice.next(sample_rate) {
            Some(s) => {
                mix += s;
                true
            }
            None => false,
        });
        mix * self.gain
    }

    pub fn render(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.next_sample();
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

/// Handle used to play notes. A disabled synth accepts every call silently.
#[derive(Clone, Default)]
pub struct ToneSynth {
    bank: Option<Arc<Mutex<VoiceBank>>>,
    /// Copy of the bank's rate so notes can be built without the lock
    sample_rate: f32,
}

impl ToneSynth {
    /// Synth with no audio output behind it
    pub fn disabled() -> Self {
        Self {
            bank: None,
            sample_rate: 0.0,
        }
    }

    /// Synth over a bank that no device pulls from; use [`ToneSynth::render`]
    pub fn detached(sample_rate: u32) -> Self {
        Self::with_bank(Arc::new(Mutex::new(VoiceBank::new(sample_rate))))
    }

    pub(crate) fn with_bank(bank: Arc<Mutex<VoiceBank>>) -> Self {
        let sample_rate = bank
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample_rate();
        Self {
            bank: Some(bank),
            sample_rate,
        }
    }

    fn bank(&self) -> Option<MutexGuard<'_, VoiceBank>> {
        self.bank
            .as_ref()
            .map(|b| b.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_enabled(&self) -> bool {
        self.bank.is_some()
    }

    pub fn play_note(&self, frequency: f32, velocity: f32) {
        if !frequency.is_finite() || frequency <= 0.0 {
            tracing::debug!(frequency, "ignored note with invalid frequency");
            return;
        }
        let velocity = if velocity.is_finite() {
            velocity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if !self.is_enabled() {
            return;
        }
        // Noise generation stays outside the lock the output callback takes
        let voices = note_voices(frequency, velocity, self.sample_rate, &mut rand::rng());
        if let Some(mut bank) = self.bank() {
            bank.push(voices);
        }
    }

    /// Shared output gain, clamped to 0-1. Applies to notes already sounding.
    pub fn set_volume(&self, volume: f32) {
        if let Some(mut bank) = self.bank() {
            bank.gain = volume.clamp(0.0, 1.0);
        }
    }

    /// Current gain; 0 when disabled
    pub fn volume(&self) -> f32 {
        self.bank().map(|b| b.gain).unwrap_or(0.0)
    }

    pub fn active_voices(&self) -> usize {
        self.bank().map(|b| b.len()).unwrap_or(0)
    }

    /// Pull samples straight from the bank (silence when disabled)
    pub fn render(&self, out: &mut [f32]) {
        match self.bank() {
            Some(mut bank) => bank.render(out),
            None => out.fill(0.0),
        }
    }
}

impl NotePlayer for ToneSynth {
    fn play_note(&self, frequency: f32, velocity: f32) {
        ToneSynth::play_note(self, frequency, velocity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;

    #[test]
    fn test_partial_envelope_shape() {
        let env = Envelope::partial(0.8);
        assert_eq!(env.level(0.0), 0.0);
        assert!((env.level(0.005) - 0.4).abs() < 1e-4);
        assert!((env.level(0.01) - 0.8).abs() < 1e-4);
        assert!((env.level(0.0999) - 0.24).abs() < 1e-3);
        assert!(env.level(0.4999) < 0.0011);
        assert_eq!(env.level(0.5), 0.0);
    }

    #[test]
    fn test_transient_envelope_holds_then_stops() {
        let env = Envelope::transient(0.3);
        assert!((env.level(0.001) - 0.3).abs() < 1e-4);
        assert!((env.level(0.07) - SILENCE).abs() < 1e-6);
        assert_eq!(env.level(0.1), 0.0);
    }

    #[test]
    fn test_note_voices_ring_out() {
        let synth = ToneSynth::detached(SR);
        synth.play_note(440.0, 1.0);
        assert_eq!(synth.active_voices(), 4);

        let mut out = vec![0.0f32; SR as usize / 5];
        synth.render(&mut out);
        assert!(out.iter().any(|s| s.abs() > 0.1));
        // Noise voice is gone after 100 ms
        assert_eq!(synth.active_voices(), 3);

        let mut rest = vec![0.0f32; SR as usize / 2];
        synth.render(&mut rest);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn test_volume_applies_to_sounding_notes() {
        let synth = ToneSynth::detached(SR);
        synth.play_note(261.63, 0.8);
        synth.set_volume(0.0);

        let mut out = vec![1.0f32; 1024];
        synth.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));

        synth.set_volume(4.0);
        assert_eq!(synth.volume(), 1.0);
    }

    #[test]
    fn test_disabled_and_invalid_are_noops() {
        let disabled = ToneSynth::disabled();
        disabled.play_note(440.0, 1.0);
        disabled.set_volume(0.5);
        assert_eq!(disabled.active_voices(), 0);
        assert_eq!(disabled.volume(), 0.0);

        let synth = ToneSynth::detached(SR);
        synth.play_note(0.0, 1.0);
        synth.play_note(f32::NAN, 1.0);
        synth.play_note(-20.0, 1.0);
        assert_eq!(synth.active_voices(), 0);
    }

    fn steady_peak(freq: f32) -> f32 {
        let sr = SR as f32;
        let mut filter = noise_filter(sr).unwrap();
        let mut peak = 0.0f32;
        for i in 0..8820 {
            let x = (std::f32::consts::TAU * freq * i as f32 / sr).sin();
            let y = filter.run(x);
            // Skip the settling period
            if i > 4410 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_noise_filter_passes_center_frequency() {
        assert!(steady_peak(2000.0) > 0.5);
    }

    #[test]
    fn test_noise_filter_attenuates_far_frequencies() {
        let center = steady_peak(2000.0);
        assert!(steady_peak(200.0) < center * 0.1);
        assert!(steady_peak(15000.0) < center * 0.1);
    }

    #[test]
    fn test_noise_filter_rejects_low_sample_rate() {
        assert!(noise_filter(3000.0).is_none());
        let voices = note_voices(440.0, 1.0, 3000.0, &mut rand::rng());
        assert_eq!(voices.len(), 3);
    }

    #[test]
    fn test_note_voices_built_without_a_bank() {
        let voices = note_voices(440.0, 1.0, SR as f32, &mut rand::rng());
        assert_eq!(voices.len(), 4);
        match &voices[3].source {
            Source::Noise { buffer, .. } => assert_eq!(buffer.len(), 4410),
            Source::Sine { .. } => panic!("last voice should be the transient"),
        }

        let mut bank = VoiceBank::new(SR);
        bank.push(voices);
        assert_eq!(bank.len(), 4);
    }

    #[test]
    fn test_play_note_pushes_complete_voices() {
        let bank = Arc::new(Mutex::new(VoiceBank::new(SR)));
        let synth = ToneSynth::with_bank(Arc::clone(&bank));
        synth.play_note(440.0, 1.0);
        // Voices arrive complete; the bank only stores them
        let mut guard = bank.lock().unwrap();
        assert_eq!(guard.len(), 4);
        assert!(guard.next_sample().is_finite());
    }

    #[test]
    fn test_voice_cap() {
        let synth = ToneSynth::detached(SR);
        for _ in 0..100 {
            synth.play_note(440.0, 0.5);
        }
        assert_eq!(synth.active_voices(), MAX_VOICES);
    }
}
