//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Playback and render defaults.
    pub playback: PlaybackDefaults,

    /// Exported document settings.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// How crop rectangles are brought back inside the video bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClampMode {
    /// Clamp both axes on their own.
    #[default]
    IndependentAxes,
    /// Clamp the width, then derive the height from the selected aspect ratio.
    DeriveHeight,
}

/// Default playback parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackDefaults {
    /// Drift between the source position and session time that triggers a seek.
    pub seek_tolerance_secs: f64,

    /// Session time added per autoplay tick.
    pub autoplay_step_secs: f64,

    /// Wall time between autoplay ticks (ms).
    pub autoplay_interval_ms: u64,

    /// Redraw rate of the live render loop (Hz).
    pub refresh_hz: u32,

    /// Output raster width in pixels; height follows the video aspect.
    pub output_width: u32,

    /// Clamp policy used when mapping crops onto the video.
    pub clamp_mode: ClampMode,

    /// Selected crop aspect ratio, e.g. `"9:16"`.
    pub aspect_ratio: String,
}

/// Exported document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Suggested filename for the exported track.
    pub filename: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reframe=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            seek_tolerance_secs: 0.1,
            autoplay_step_secs: 0.1,
            autoplay_interval_ms: 100,
            refresh_hz: 60,
            output_width: 300,
            clamp_mode: ClampMode::IndependentAxes,
            aspect_ratio: "9:16".to_string(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            filename: "recorded_session.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reframe").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_player_policy() {
        let config = AppConfig::default();
        assert!((config.playback.seek_tolerance_secs - 0.1).abs() < 1e-12);
        assert_eq!(config.playback.autoplay_interval_ms, 100);
        assert_eq!(config.playback.output_width, 300);
        assert_eq!(config.export.filename, "recorded_session.json");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.playback.clamp_mode = ClampMode::DeriveHeight;
        config.playback.aspect_ratio = "4:5".to_string();
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.playback.clamp_mode, ClampMode::DeriveHeight);
        assert_eq!(loaded.playback.aspect_ratio, "4:5");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"playback":{"output_width":640}}"#).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.playback.output_width, 640);
        assert_eq!(loaded.playback.refresh_hz, 60);
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn test_garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.playback.output_width, 300);
    }
}
