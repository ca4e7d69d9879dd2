//! Pipeline configuration loaded from TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Configuration loading error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Re-encode parameters applied when a plan selects the re-encode mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Video codec for re-encoded output
    pub video_codec: String,
    /// Audio codec for re-encoded output
    pub audio_codec: String,
    /// Encoder speed preset
    pub preset: String,
    /// Constant rate factor (0-51, lower is higher quality)
    pub crf: u8,
    /// Audio bitrate, e.g. "128k"
    pub audio_bitrate: String,
    /// Sources taller than this are scaled down to it
    pub height_cap: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "veryfast".to_string(),
            crf: 23,
            audio_bitrate: "128k".to_string(),
            height_cap: 720,
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Explicit path to the ffmpeg binary, otherwise resolved from PATH
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit path to the ffprobe binary, otherwise resolved from PATH
    pub ffprobe_path: Option<PathBuf>,
    /// Bounded wait for metadata extraction, in seconds
    pub probe_timeout_secs: Option<u64>,
    /// Re-encode parameters
    pub encoder: EncoderSettings,
}

impl PipelineConfig {
    /// Default metadata extraction timeout in seconds
    pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Load from an optional path, falling back to defaults on any error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(p) => match Self::load(p) {
                Ok(config) => config,
                Err(e) => {
                    warn!("ignoring config file {}: {}", p.display(), e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    /// Effective probe timeout
    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.probe_timeout_secs
                .unwrap_or(Self::DEFAULT_PROBE_TIMEOUT_SECS),
        )
    }
}
