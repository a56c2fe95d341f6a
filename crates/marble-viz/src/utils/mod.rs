mod audio_info;
mod config;
mod screensaver;

pub use audio_info::log_audio_info;
pub use config::Config;
pub use screensaver::ScreensaverInhibitor;
