//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "marble-viz")]
#[command(about = "Audio-reactive marble xylophone", long_about = None)]
pub struct Args {
    /// Audio file to load (mp3, aac/m4a, wav)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Run in a window instead of fullscreen
    #[arg(short, long)]
    pub windowed: bool,

    /// Capture PNG frames and the audio mix into DIR
    #[arg(long, value_name = "DIR")]
    pub record: Option<PathBuf>,

    /// Stop capturing after this many seconds
    #[arg(long, value_name = "SECONDS", requires = "record")]
    pub record_seconds: Option<f32>,

    /// Playback volume (0.0-1.0), overrides the config file
    #[arg(long, value_name = "LEVEL")]
    pub volume: Option<f32>,

    /// Print audio device diagnostics and exit
    #[arg(long)]
    pub audio_info: bool,

    /// Only spawn marbles from the keyboard
    #[arg(long)]
    pub no_auto_spawn: bool,
}

impl Args {
    /// Extension hint for the decoder, lowercased
    pub fn file_extension(&self) -> Option<String> {
        self.file
            .as_ref()
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }
}
