//! Configuration file handling for squat-coach.
//!
//! Loads configuration from `<config_dir>/squat-coach/config.toml` or a custom path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_BASE_URL;
use crate::camera::{CameraSettings, Resolution};
use crate::sampler::{SamplerOptions, DEFAULT_JPEG_QUALITY};
use crate::transport::DEFAULT_WS_BASE_URL;

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_ws_base_url")]
    pub ws_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            ws_base_url: default_ws_base_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: u32,
    #[serde(default)]
    pub mirror: bool,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            mirror: false,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}

impl CameraConfig {
    pub fn settings(&self) -> CameraSettings {
        CameraSettings {
            device_index: self.device,
            resolution: Resolution {
                width: self.width,
                height: self.height,
            },
            fps: self.fps,
            mirror: self.mirror,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SamplerConfig {
    /// Milliseconds between frames.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Milliseconds to wait after the camera is ready before the first frame.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            settle_ms: default_settle_ms(),
            jpeg_quality: default_jpeg_quality(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl SamplerConfig {
    pub fn options(&self) -> SamplerOptions {
        SamplerOptions {
            interval: Duration::from_millis(self.interval_ms.max(1)),
            settle: Duration::from_millis(self.settle_ms),
            target: Resolution {
                width: self.width,
                height: self.height,
            },
            jpeg_quality: self.jpeg_quality,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Identity cache file (default: `<config_dir>/squat-coach/identity.json`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_ws_base_url() -> String {
    DEFAULT_WS_BASE_URL.to_string()
}

fn default_width() -> u32 {
    Resolution::VGA.width
}

fn default_height() -> u32 {
    Resolution::VGA.height
}

fn default_fps() -> u32 {
    30
}

fn default_interval_ms() -> u64 {
    100
}

fn default_settle_ms() -> u64 {
    500
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            log::debug!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Render as TOML, for `config show`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to render config: {0}")]
    RenderError(#[from] toml::ser::Error),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("squat-coach")
        .join("config.toml")
}

/// Contents written by `config init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# squat-coach configuration

[server]
# REST base for session/series calls
api_base_url = "http://localhost:8000/api/analysis"
# Socket base; the user id is appended
ws_base_url = "ws://localhost:8000/analysis/ws"

[camera]
# Camera device index (see `squat-coach list-cameras`)
device = 0
# Mirror horizontally (selfie mode)
mirror = false
width = 640
height = 480
fps = 30

[sampler]
# 100 ms = 10 frames per second
interval_ms = 100
# Wait for the camera to settle before the first frame
settle_ms = 500
jpeg_quality = 70
width = 640
height = 480

[identity]
# path = "/path/to/identity.json"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.sampler.interval_ms, 100);
        assert_eq!(config.sampler.jpeg_quality, 70);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[camera]\ndevice = 2\nmirror = true\n\n[server]\nws_base_url = \"wss://coach.example/analysis/ws\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.camera.device, 2);
        assert!(config.camera.mirror);
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.server.ws_base_url, "wss://coach.example/analysis/ws");
        assert_eq!(config.server.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[camera\ndevice = ").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_toml_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_sampler_options() {
        let options = SamplerConfig {
            interval_ms: 0,
            ..SamplerConfig::default()
        }
        .options();
        assert_eq!(options.interval, Duration::from_millis(1));
        assert_eq!(options.settle, Duration::from_millis(500));
        assert_eq!(options.target, Resolution::VGA);
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config::default();
        let parsed: Config = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_path() {
        assert!(default_path().ends_with("squat-coach/config.toml"));
    }
}
