//! Configuration file management.
//!
//! Handles loading and saving user preferences to `~/.marble-viz.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use marble_viz_core::capture::DEFAULT_CAPTURE_FPS;
use marble_viz_core::{Color, EffectKind, EffectParams, SessionSettings};
use serde::{Deserialize, Serialize};

const DEFAULT_SYNTH_VOLUME: f32 = 0.5;
const DEFAULT_PLAYBACK_VOLUME: f32 = 0.8;

const CONFIG_TEMPLATE: &str = r##"# marble-viz configuration file

# Marble note volume, 0.0-1.0 (default: 0.5, saved by +/-)
# synth_volume = 0.5

# Track playback volume, 0.0-1.0 (default: 0.8)
# playback_volume = 0.8

# Background color (default: "#000000")
# background = "#000000"

# Spawn marbles from the bass while the marble effect is active (default: true)
# auto_spawn = true

# Upper bound on live marbles (default: unlimited)
# max_marbles = 200

# Frame rate of --record captures (default: 60)
# capture_fps = 60

# =============================================================================
# Effects active at startup (default: a single marble effect)
# =============================================================================
# variant is one of: wave, particle, geometric, fluid, neural, marble

# [[effects]]
# variant = "marble"
#
# [[effects]]
# variant = "wave"
# intensity = 0.8
# color = "#3fa9f5"
# speed = 1.0
# size = 1.0
"##;

/// One `[[effects]]` table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EffectConfig {
    pub variant: String,
    pub intensity: Option<f32>,
    pub color: Option<String>,
    pub speed: Option<f32>,
    pub size: Option<f32>,
}

impl EffectConfig {
    fn resolve(&self) -> marble_viz_core::Result<(EffectKind, EffectParams)> {
        let kind: EffectKind = self.variant.parse()?;
        let defaults = EffectParams::default();
        let color = match &self.color {
            Some(hex) => Color::from_hex(hex)?,
            None => defaults.color,
        };
        Ok((
            kind,
            EffectParams {
                intensity: self.intensity.unwrap_or(defaults.intensity),
                color,
                speed: self.speed.unwrap_or(defaults.speed),
                size: self.size.unwrap_or(defaults.size),
            },
        ))
    }
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct Config {
    pub synth_volume: Option<f32>,
    pub playback_volume: Option<f32>,
    pub background: Option<String>,
    pub auto_spawn: Option<bool>,
    pub max_marbles: Option<usize>,
    pub capture_fps: Option<u32>,
    pub effects: Option<Vec<EffectConfig>>,
}

impl Config {
    fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".marble-viz.toml"))
    }

    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Read `path`, writing the commented template first if it is missing.
    /// Unreadable or malformed files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            match fs::write(path, CONFIG_TEMPLATE) {
                Ok(()) => tracing::info!("created config template at {}", path.display()),
                Err(e) => tracing::warn!("could not write config template: {e}"),
            }
        }

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("could not read {}: {e}", path.display());
                return Self::default();
            }
        };
        toml::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!("ignoring malformed config {}: {e}", path.display());
            Self::default()
        })
    }

    pub fn save(&self) {
        if let Some(path) = Self::path() {
            self.save_to(&path);
        }
    }

    pub fn save_to(&self, path: &Path) {
        match toml::to_string(self) {
            Ok(content) => match fs::write(path, content) {
                Ok(()) => tracing::info!("config saved to {}", path.display()),
                Err(e) => tracing::warn!("could not save config: {e}"),
            },
            Err(e) => tracing::warn!("could not serialize config: {e}"),
        }
    }

    pub fn synth_volume(&self) -> f32 {
        self.synth_volume
            .unwrap_or(DEFAULT_SYNTH_VOLUME)
            .clamp(0.0, 1.0)
    }

    pub fn playback_volume(&self) -> f32 {
        self.playback_volume
            .unwrap_or(DEFAULT_PLAYBACK_VOLUME)
            .clamp(0.0, 1.0)
    }

    pub fn background(&self) -> Color {
        match self.background.as_deref().map(Color::from_hex) {
            Some(Ok(color)) => color,
            Some(Err(e)) => {
                tracing::warn!("{e}, using black");
                Color::BLACK
            }
            None => Color::BLACK,
        }
    }

    pub fn auto_spawn(&self) -> bool {
        self.auto_spawn.unwrap_or(true)
    }

    pub fn capture_fps(&self) -> u32 {
        self.capture_fps.unwrap_or(DEFAULT_CAPTURE_FPS).max(1)
    }

    /// Startup effects. Entries with an unknown variant or bad color are
    /// logged and skipped.
    pub fn effects(&self) -> Vec<(EffectKind, EffectParams)> {
        let Some(entries) = &self.effects else {
            return vec![(EffectKind::Marble, EffectParams::default())];
        };
        entries
            .iter()
            .filter_map(|entry| match entry.resolve() {
                Ok(effect) => Some(effect),
                Err(e) => {
                    tracing::warn!("skipping configured effect: {e}");
                    None
                }
            })
            .collect()
    }

    pub fn set_synth_volume(&mut self, volume: f32) {
        self.synth_volume = Some(volume.clamp(0.0, 1.0));
        self.save();
    }

    pub fn session_settings(&self, width: u32, height: u32) -> SessionSettings {
        SessionSettings {
            width,
            height,
            background: self.background(),
            auto_spawn: self.auto_spawn(),
            max_marbles: self.max_marbles,
            synth_volume: self.synth_volume(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("marble-viz-config-{}-{}.toml", name, std::process::id()))
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.synth_volume(), 0.5);
        assert_eq!(config.capture_fps(), 60);
        assert!(config.auto_spawn());
        assert_eq!(config.effects(), vec![(EffectKind::Marble, EffectParams::default())]);
    }

    #[test]
    fn test_load_creates_template() {
        let path = temp_path("template");
        fs::remove_file(&path).ok();

        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());
        assert!(fs::read_to_string(&path).unwrap().starts_with("# marble-viz"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_effects_skip_unknown_variants() {
        let config: Config = toml::from_str(
            r##"
            [[effects]]
            variant = "Wave"
            intensity = 0.25
            color = "#ff0000"

            [[effects]]
            variant = "laser"

            [[effects]]
            variant = "fluid"
            color = "not-a-color"

            [[effects]]
            variant = "neural"
            size = 2.0
            "##,
        )
        .unwrap();

        let effects = config.effects();
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0].0, EffectKind::Wave);
        assert_eq!(effects[0].1.intensity, 0.25);
        assert_eq!(effects[0].1.color, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(effects[1].0, EffectKind::Neural);
        assert_eq!(effects[1].1.size, 2.0);
    }

    #[test]
    fn test_empty_effects_list_is_respected() {
        let config: Config = toml::from_str("effects = []").unwrap();
        assert!(config.effects().is_empty());
    }

    #[test]
    fn test_save_round_trips_values() {
        let path = temp_path("save");
        let config = Config {
            synth_volume: Some(0.3),
            background: Some("#102030".into()),
            max_marbles: Some(50),
            ..Config::default()
        };
        config.save_to(&path);

        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
        let settings = loaded.session_settings(800, 600);
        assert_eq!(settings.max_marbles, Some(50));
        assert_eq!(settings.background.to_hex(), "#102030");

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config: Config =
            toml::from_str("synth_volume = 3.0\nbackground = \"zz\"\ncapture_fps = 0").unwrap();
        assert_eq!(config.synth_volume(), 1.0);
        assert_eq!(config.background(), Color::BLACK);
        assert_eq!(config.capture_fps(), 1);
    }
}
