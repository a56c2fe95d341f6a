//! Audio output device.
//!
//! Opens the default cpal output, mixes the playback deck with the synth
//! voice bank and optionally tees the mix into a WAV file.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};

use super::playback::{AudioSource, Deck};
use super::synth::{ToneSynth, VoiceBank};
use crate::error::{Error, Result};

type WavRecorder = hound::WavWriter<BufWriter<File>>;
type SharedRecorder = Arc<Mutex<Option<WavRecorder>>>;

pub struct AudioOutput {
    _stream: Stream,
    synth: ToneSynth,
    sample_rate: u32,
    device_name: String,
    recorder: SharedRecorder,
}

impl AudioOutput {
    /// Open the default output device and start pulling from `source`.
    pub fn start(source: &AudioSource) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Initialization("no output device found".to_string()))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_output_config()
            .map_err(|e| Error::Initialization(format!("failed to get output config: {e}")))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;

        source.set_output_rate(sample_rate);
        let bank = Arc::new(Mutex::new(VoiceBank::new(sample_rate)));
        let recorder: SharedRecorder = Arc::new(Mutex::new(None));

        let deck = source.shared();
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, deck, &bank, &recorder),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, deck, &bank, &recorder),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, deck, &bank, &recorder),
            other => {
                return Err(Error::Initialization(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| Error::Initialization(format!("failed to start output stream: {e}")))?;

        tracing::info!(device = %device_name, sample_rate, "audio output started");

        Ok(Self {
            _stream: stream,
            synth: ToneSynth::with_bank(bank),
            sample_rate,
            device_name,
            recorder,
        })
    }

    /// Synth whose voices are mixed into this output
    pub fn synth(&self) -> ToneSynth {
        self.synth.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Start writing the output mix to a mono 32-bit float WAV file,
    /// replacing (and finalizing) any recording already running.
    pub fn start_recording(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(path, spec)?;

        let previous = self
            .recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(writer);
        if let Some(previous) = previous {
            previous.finalize()?;
        }

        tracing::info!(path = %path.display(), "recording audio");
        Ok(())
    }

    /// Finalize the current WAV file. Returns false when nothing was recording.
    pub fn stop_recording(&self) -> Result<bool> {
        let writer = self
            .recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match writer {
            Some(writer) => {
                writer.finalize()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    deck: Arc<Mutex<Deck>>,
    bank: &Arc<Mutex<VoiceBank>>,
    recorder: &SharedRecorder,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let bank = Arc::clone(bank);
    let recorder = Arc::clone(recorder);

    let err_fn = |err| tracing::warn!("audio stream error: {err}");

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut deck = deck.lock().unwrap_or_else(PoisonError::into_inner);
                let mut bank = bank.lock().unwrap_or_else(PoisonError::into_inner);
                let mut recorder = recorder.lock().unwrap_or_else(PoisonError::into_inner);

                for frame in data.chunks_mut(channels) {
                    let mix = (deck.next_sample() + bank.next_sample()).clamp(-1.0, 1.0);
                    if let Some(writer) = recorder.as_mut() {
                        // A failed write only loses recording data
                        let _ = writer.write_sample(mix);
                    }
                    let value = T::from_sample(mix);
                    for slot in frame.iter_mut() {
                        *slot = value;
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| Error::Initialization(format!("failed to build output stream: {e}")))
}

/// Names of the output devices on the default host
pub fn list_devices() -> Vec<String> {
    let host = cpal::default_host();
    match host.output_devices() {
        Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
        Err(e) => {
            tracing::warn!("failed to enumerate output devices: {e}");
            Vec::new()
        }
    }
}

/// Name of the default output device, if any
pub fn default_device_name() -> Option<String> {
    cpal::default_host()
        .default_output_device()
        .and_then(|d| d.name().ok())
}
