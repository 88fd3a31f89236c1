//! Configuration file handling for stopmo.
//!
//! Loads configuration from `~/.config/stopmo/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file structure for stopmo.
/// Loaded from ~/.config/stopmo/config.toml (or custom path via --config).
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct SceneConfig {
    /// Default scene directory activated at startup
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PreviewConfig {
    /// Onion-skin blend weight for the live preview (0.0-1.0)
    pub alpha: Option<f32>,
    /// Character set used for terminal rendering (standard, blocks, minimal)
    pub charset: Option<String>,
    /// Invert brightness mapping (for light terminals)
    #[serde(default)]
    pub invert: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct RenderConfig {
    /// Frame rate handed to the video encoder
    pub fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ViewerConfig {
    /// External command used to open the previous frame for inspection
    pub command: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct InputConfig {
    /// Input mode: "single-key" or "text"
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CameraConfig {
    /// Preview frames to capture and discard before trusting one
    pub warmup_frames: Option<u32>,
    /// Camera control binary (defaults to "gphoto2")
    pub program: Option<String>,
}

impl Config {
    /// Load configuration from the default path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_path();
        if path.exists() {
            Self::load_explicit(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from an explicit path.
    /// Unlike `load`, a missing file is an error here: the operator asked
    /// for this file specifically.
    pub fn load_explicit(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(config)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("stopmo")
        .join("config.toml")
}
