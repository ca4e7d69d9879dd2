//! ffprobe-backed metadata extraction

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::probe::{ensure_video, MediaAsset, MediaProbe, MediaSource, PreviewHandle, ProbeError};

/// Metadata inspector driving the ffprobe binary.
///
/// ffprobe reads container headers only, so inspection stays cheap and never
/// touches the transcoding engine.
pub struct FfprobeInspector {
    binary: Option<PathBuf>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

impl FfprobeInspector {
    /// Create an inspector from pipeline configuration
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            binary: config.ffprobe_path.clone(),
            timeout: config.probe_timeout(),
        }
    }

    fn unavailable(reason: impl Into<String>) -> ProbeError {
        ProbeError::MetadataUnavailable {
            reason: reason.into(),
        }
    }

    fn resolve_binary(&self) -> Result<PathBuf, ProbeError> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => which::which("ffprobe")
                .map_err(|e| Self::unavailable(format!("ffprobe not found: {e}"))),
        }
    }

    fn parse_seconds(raw: Option<&String>) -> Option<f64> {
        raw.and_then(|s| s.parse::<f64>().ok()).filter(|d| *d > 0.0)
    }
}

#[async_trait]
impl MediaProbe for FfprobeInspector {
    async fn probe(
        &self,
        source: &MediaSource,
    ) -> Result<(MediaAsset, PreviewHandle), ProbeError> {
        ensure_video(source)?;

        let binary = self.resolve_binary()?;

        // Stage the bytes once; the same file backs the preview handle.
        let staged = NamedTempFile::new()
            .map_err(|e| Self::unavailable(format!("failed to stage input: {e}")))?;
        tokio::fs::write(staged.path(), &source.bytes)
            .await
            .map_err(|e| Self::unavailable(format!("failed to stage input: {e}")))?;

        debug!("probing {} with {}", source.name, binary.display());
        let mut command = Command::new(&binary);
        command
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(staged.path())
            .stdin(Stdio::null());

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| Self::unavailable("metadata extraction timed out"))?
            .map_err(|e| Self::unavailable(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::unavailable(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| Self::unavailable(format!("unreadable ffprobe output: {e}")))?;

        let video = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| Self::unavailable("input contains no video stream"))?;

        let (width, height) = match (video.width, video.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(Self::unavailable("video dimensions missing")),
        };

        let duration_seconds = Self::parse_seconds(
            parsed
                .format
                .as_ref()
                .and_then(|f| f.duration.as_ref())
                .or(video.duration.as_ref()),
        )
        .ok_or_else(|| Self::unavailable("no playable duration reported"))?;

        let asset = MediaAsset {
            duration_seconds,
            width,
            height,
            size_bytes: source.bytes.len() as u64,
            display_name: source.name.clone(),
            bytes: source.bytes.clone(),
        };

        info!(
            "probed {}: {:.1}s, {}x{}, {} bytes",
            asset.display_name, asset.duration_seconds, asset.width, asset.height, asset.size_bytes
        );

        Ok((asset, PreviewHandle::new(staged)))
    }
}
