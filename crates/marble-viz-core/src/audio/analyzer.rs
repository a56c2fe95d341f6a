//! Audio feature extraction.
//!
//! Runs one windowed FFT per tick over the samples behind the playback
//! cursor and reduces it to a [`FeatureVector`]: three band levels, RMS
//! volume, a beat flag, plus the raw spectrum and time-domain window.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::playback::AudioSource;

/// Analysis window length in samples
pub const WINDOW_SIZE: usize = 2048;

/// Length of both output buffers
pub const BIN_COUNT: usize = WINDOW_SIZE / 2;

/// Temporal smoothing applied to bin magnitudes between ticks
pub const SMOOTHING: f32 = 0.8;

/// `beat` fires whenever volume is above this
pub const BEAT_THRESHOLD: f32 = 0.3;

/// Decibel range mapped onto 0-1 magnitudes
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Band edges as fractions of the bin count
const BASS_END: f32 = 0.1;
const MID_END: f32 = 0.5;

/// Per-tick summary of the audio signal
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    pub bass_level: f32,
    pub mid_level: f32,
    pub treble_level: f32,
    pub volume: f32,
    pub beat: bool,
    /// Normalized bin magnitudes (0-1), `BIN_COUNT` long
    pub frequency_magnitudes: Vec<f32>,
    /// Most recent samples, `BIN_COUNT` long
    pub time_domain_samples: Vec<f32>,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::silent()
    }
}

impl FeatureVector {
    /// All-zero vector, used when nothing is loaded
    pub fn silent() -> Self {
        Self {
            bass_level: 0.0,
            mid_level: 0.0,
            treble_level: 0.0,
            volume: 0.0,
            beat: false,
            frequency_magnitudes: vec![0.0; BIN_COUNT],
            time_domain_samples: vec![0.0; BIN_COUNT],
        }
    }

    /// Derive levels, volume and beat from the two raw buffers
    pub fn from_buffers(frequency_magnitudes: Vec<f32>, time_domain_samples: Vec<f32>) -> Self {
        let (bass_level, mid_level, treble_level) = band_levels(&frequency_magnitudes);
        let volume = rms(&time_domain_samples);
        Self {
            bass_level,
            mid_level,
            treble_level,
            volume,
            beat: is_beat(volume),
            frequency_magnitudes,
            time_domain_samples,
        }
    }

    /// Vector with only the summary levels set (synthetic input for tests and demos)
    pub fn with_levels(bass: f32, mid: f32, treble: f32, volume: f32) -> Self {
        Self {
            bass_level: bass.max(0.0),
            mid_level: mid.max(0.0),
            treble_level: treble.max(0.0),
            volume: volume.max(0.0),
            beat: is_beat(volume),
            ..Self::silent()
        }
    }
}

pub fn is_beat(volume: f32) -> bool {
    volume > BEAT_THRESHOLD
}

/// Mean absolute magnitude over the 0-10%, 10-50% and 50-100% index ranges
pub fn band_levels(magnitudes: &[f32]) -> (f32, f32, f32) {
    let n = magnitudes.len();
    let bass_end = (n as f32 * BASS_END) as usize;
    let mid_end = (n as f32 * MID_END) as usize;

    (
        mean_abs(&magnitudes[..bass_end]),
        mean_abs(&magnitudes[bass_end..mid_end]),
        mean_abs(&magnitudes[mid_end..]),
    )
}

fn mean_abs(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v.abs()).sum::<f32>() / values.len() as f32
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Spectral analyzer with pre-allocated FFT resources
pub struct FeatureExtractor {
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    fft_window: Vec<f32>,
    /// Smoothed linear magnitudes carried between ticks
    smoothed: Vec<f32>,
    /// Scratch buffer for the playback window
    samples: Vec<f32>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(WINDOW_SIZE);

        // Pre-compute Blackman window
        let n = WINDOW_SIZE as f32;
        let fft_window: Vec<f32> = (0..WINDOW_SIZE)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (std::f32::consts::TAU * x).cos()
                    + 0.08 * (2.0 * std::f32::consts::TAU * x).cos()
            })
            .collect();

        Self {
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); WINDOW_SIZE],
            fft_window,
            smoothed: vec![0.0; BIN_COUNT],
            samples: vec![0.0; WINDOW_SIZE],
        }
    }

    /// Features at the current playback cursor, silent when nothing is loaded
    pub fn extract(&mut self, source: &AudioSource) -> FeatureVector {
        let mut window = std::mem::take(&mut self.samples);
        let loaded = source.analysis_window(&mut window);
        let features = if loaded {
            self.analyze(&window)
        } else {
            FeatureVector::silent()
        };
        self.samples = window;
        features
    }

    /// Analyze the most recent `WINDOW_SIZE` samples of `samples`.
    /// Shorter input is treated as preceded by silence.
    pub fn analyze(&mut self, samples: &[f32]) -> FeatureVector {
        let take = samples.len().min(WINDOW_SIZE);
        let recent = &samples[samples.len() - take..];
        let pad = WINDOW_SIZE - take;

        for i in 0..WINDOW_SIZE {
            let s = if i < pad { 0.0 } else { recent[i - pad] };
            self.fft_buffer[i] = Complex::new(s * self.fft_window[i], 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let mut magnitudes = vec![0.0f32; BIN_COUNT];
        for (k, magnitude) in magnitudes.iter_mut().enumerate() {
            let linear = self.fft_buffer[k].norm() / WINDOW_SIZE as f32;
            self.smoothed[k] = SMOOTHING * self.smoothed[k] + (1.0 - SMOOTHING) * linear;

            let db = 20.0 * (self.smoothed[k] + 1e-12).log10();
            *magnitude = ((db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS)).clamp(0.0, 1.0);
        }

        // Time-domain buffer is the newest half of the window
        let mut time_domain = vec![0.0f32; BIN_COUNT];
        let td_take = take.min(BIN_COUNT);
        time_domain[BIN_COUNT - td_take..].copy_from_slice(&recent[take - td_take..]);

        FeatureVector::from_buffers(magnitudes, time_domain)
    }

    /// Forget smoothing history (e.g. after a seek or track change)
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|m| *m = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (std::f32::consts::TAU * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_band_level_ratios() {
        // 100 bins: bass = [0,10), mid = [10,50), treble = [50,100)
        let mut mags = vec![0.0f32; 100];
        mags[..10].iter_mut().for_each(|m| *m = 1.0);
        mags[10..50].iter_mut().for_each(|m| *m = -0.5);
        mags[50..].iter_mut().for_each(|m| *m = 0.25);

        let (bass, mid, treble) = band_levels(&mags);
        assert_eq!(bass, 1.0);
        assert_eq!(mid, 0.5);
        assert_eq!(treble, 0.25);
    }

    #[test]
    fn test_empty_buffers() {
        assert_eq!(band_levels(&[]), (0.0, 0.0, 0.0));
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_silence_yields_zero_features() {
        let mut extractor = FeatureExtractor::new();
        let features = extractor.analyze(&vec![0.0; WINDOW_SIZE]);

        assert_eq!(features.bass_level, 0.0);
        assert_eq!(features.mid_level, 0.0);
        assert_eq!(features.treble_level, 0.0);
        assert_eq!(features.volume, 0.0);
        assert!(!features.beat);
        assert_eq!(features.frequency_magnitudes.len(), BIN_COUNT);
        assert_eq!(features.time_domain_samples.len(), BIN_COUNT);
    }

    #[test]
    fn test_full_scale_sine_is_a_beat() {
        let mut extractor = FeatureExtractor::new();
        let features = extractor.analyze(&sine(440.0, 1.0, WINDOW_SIZE));

        // RMS of a unit sine is 1/sqrt(2)
        assert!((features.volume - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.02);
        assert!(features.beat);
    }

    #[test]
    fn test_quiet_sine_is_not_a_beat() {
        let mut extractor = FeatureExtractor::new();
        let features = extractor.analyze(&sine(440.0, 0.1, WINDOW_SIZE));
        assert!(features.volume < BEAT_THRESHOLD);
        assert!(!features.beat);
    }

    #[test]
    fn test_low_tone_lands_in_bass() {
        let mut extractor = FeatureExtractor::new();
        // Bin width is ~21.5 Hz; 200 Hz is bin ~9, inside the bottom 10%
        let signal = sine(200.0, 0.8, WINDOW_SIZE);
        let mut features = FeatureVector::silent();
        for _ in 0..20 {
            features = extractor.analyze(&signal);
        }
        assert!(features.bass_level > features.treble_level);
        assert!(features.bass_level > 0.0);
    }

    #[test]
    fn test_smoothing_carries_over() {
        let mut extractor = FeatureExtractor::new();
        let loud = sine(1000.0, 1.0, WINDOW_SIZE);
        let first = extractor.analyze(&loud);
        let second = extractor.analyze(&loud);
        // Smoothed magnitudes keep rising toward steady state
        assert!(second.mid_level >= first.mid_level);

        extractor.reset();
        let after_reset = extractor.analyze(&loud);
        assert!((after_reset.mid_level - first.mid_level).abs() < 1e-6);
    }

    #[test]
    fn test_short_input_is_padded() {
        let mut extractor = FeatureExtractor::new();
        let features = extractor.analyze(&[0.5; 16]);
        assert_eq!(features.time_domain_samples.len(), BIN_COUNT);
        assert_eq!(features.time_domain_samples[BIN_COUNT - 1], 0.5);
        assert_eq!(features.time_domain_samples[0], 0.0);
    }

    #[test]
    fn test_extract_without_track_is_silent() {
        let mut extractor = FeatureExtractor::new();
        let features = extractor.extract(&AudioSource::new());
        assert_eq!(features, FeatureVector::silent());
    }
}
