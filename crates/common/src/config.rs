//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where editor sessions are stored.
    pub sessions_dir: PathBuf,

    /// Timeline and playback tolerances.
    #[serde(default)]
    pub editor: EditorDefaults,

    /// Default export parameters.
    #[serde(default)]
    pub export: ExportDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tolerances used by the timeline model and the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorDefaults {
    /// How far before the active clip's start a reported time may sit before
    /// playback force-seeks back into the clip (absorbs seek jitter).
    pub seek_tolerance_secs: f64,

    /// How close to the active clip's end a reported time must be to count
    /// as having reached it.
    pub edge_tolerance_secs: f64,

    /// Minimum distance from either clip edge for a split to be accepted.
    pub split_margin_secs: f64,

    /// Shortest clip a trim handle may produce.
    pub min_clip_secs: f64,
}

/// How the export loop paces itself between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportPacing {
    /// Wait one frame interval of wall-clock time after each frame so a live
    /// capture stream sees a real-time cadence.
    #[default]
    RealTime,
    /// Render as fast as the sink accepts frames.
    Unthrottled,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Output frame rate.
    pub fps: u32,

    /// Raster width used for composed slideshow output.
    pub slideshow_width: u32,

    /// Raster height used for composed slideshow output.
    pub slideshow_height: u32,

    /// Length of the closing watermark sequence in seconds.
    pub closing_secs: f64,

    /// Frame pacing strategy.
    pub pacing: ExportPacing,

    /// Default video codec passed to the encoder.
    pub video_codec: String,

    /// Wordmark drawn by the closing sequence.
    pub wordmark: String,

    /// Font family of the closing wordmark.
    pub wordmark_font: String,

    /// Extra directories searched for fonts before the system font
    /// directories.
    pub font_dirs: Vec<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sessions_dir: dirs_default_sessions(),
            editor: EditorDefaults::default(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EditorDefaults {
    fn default() -> Self {
        Self {
            seek_tolerance_secs: 0.08,
            edge_tolerance_secs: 0.05,
            split_margin_secs: 0.05,
            min_clip_secs: 0.1,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            slideshow_width: 1080,
            slideshow_height: 1920,
            closing_secs: 2.0,
            pacing: ExportPacing::RealTime,
            video_codec: "h264".to_string(),
            wordmark: "CLIPFORGE".to_string(),
            wordmark_font: "sans-serif".to_string(),
            font_dirs: Vec::new(),
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
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
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
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipforge").join("config.json")
}

/// Default sessions directory.
fn dirs_default_sessions() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("clipforge").join("sessions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_defaults_match_playback_tolerances() {
        let editor = EditorDefaults::default();
        assert!((editor.seek_tolerance_secs - 0.08).abs() < 1e-9);
        assert!((editor.edge_tolerance_secs - 0.05).abs() < 1e-9);
        assert!((editor.min_clip_secs - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "sessions_dir": "/tmp/sessions", "export": { "fps": 24 } }"#)
                .unwrap();
        assert_eq!(parsed.export.fps, 24);
        assert_eq!(parsed.export.slideshow_width, 1080);
        assert_eq!(parsed.export.pacing, ExportPacing::RealTime);
        assert_eq!(parsed.export.wordmark_font, "sans-serif");
        assert!(parsed.export.font_dirs.is_empty());
        assert_eq!(parsed.logging.level, "info");
    }
}
