//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timeline editing defaults.
    pub editor: EditorDefaults,

    /// Preview canvas settings.
    pub preview: PreviewDefaults,

    /// Default export parameters.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Timeline editing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorDefaults {
    /// How long an imported still image is shown (seconds).
    pub image_duration_secs: f64,

    /// Quiet period after the last scroll event before the nearest clip
    /// is selected.
    pub scroll_settle_ms: u64,

    /// Transition applied between clips during playback
    /// (`none`, `fade`, `slide`, `zoom`).
    pub transition: String,

    /// Transition length in milliseconds.
    pub transition_duration_ms: u64,

    /// Granularity of trim edits (seconds).
    pub trim_step_secs: f64,

    /// Width of one clip thumbnail on the timeline strip (pixels).
    pub clip_width_px: f64,

    /// Gap between clip thumbnails on the timeline strip (pixels).
    pub clip_gap_px: f64,
}

/// Preview canvas settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewDefaults {
    /// Canvas width in pixels.
    pub width: u32,

    /// Canvas height in pixels.
    pub height: u32,

    /// Background fill as hex string.
    pub background: String,

    /// TrueType font used for text overlays. When unset, a few common
    /// system locations are probed.
    pub font_path: Option<PathBuf>,

    /// Default overlay text color.
    pub text_color: String,

    /// Default overlay text size in pixels.
    pub text_size_px: u32,

    /// Redraw rate while a video clip plays.
    pub redraw_hz: u32,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Output width.
    pub width: u32,

    /// Output height.
    pub height: u32,

    /// Capture frame rate.
    pub fps: u32,

    /// Target video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Container/codec (`mp4`, `webm`).
    pub format: String,

    /// File name used when no output path is given.
    pub file_name: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "montage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for EditorDefaults {
    fn default() -> Self {
        Self {
            image_duration_secs: 3.0,
            scroll_settle_ms: 150,
            transition: "none".to_string(),
            transition_duration_ms: 1000,
            trim_step_secs: 0.1,
            clip_width_px: 160.0,
            clip_gap_px: 8.0,
        }
    }
}

impl Default for PreviewDefaults {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            background: "#000000".to_string(),
            font_path: None,
            text_color: "#ffffff".to_string(),
            text_size_px: 24,
            redraw_hz: 60,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            video_bitrate_kbps: 8000,
            format: "mp4".to_string(),
            file_name: "montage_export.mp4".to_string(),
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
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("montage").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_editor_contract() {
        let config = AppConfig::default();
        assert!((config.editor.image_duration_secs - 3.0).abs() < 1e-9);
        assert_eq!(config.editor.scroll_settle_ms, 150);
        assert_eq!(config.preview.width, 1280);
        assert_eq!(config.preview.height, 720);
        assert_eq!(config.export.fps, 30);
        assert_eq!(config.export.video_bitrate_kbps, 8000);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"editor":{"image_duration_secs":5.0}}"#).unwrap();
        assert!((parsed.editor.image_duration_secs - 5.0).abs() < 1e-9);
        assert_eq!(parsed.editor.scroll_settle_ms, 150);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_load_from_invalid_file_falls_back() {
        let path = std::env::temp_dir().join("montage_test_bad_config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = AppConfig::load_from(&path);
        assert_eq!(config.export.format, "mp4");
        std::fs::remove_file(&path).ok();
    }
}
