//! Media inspection without the transcoding engine
//!
//! Probing reads duration, pixel dimensions and byte size from a raw input
//! using the lightweight ffprobe tool, so the caller can react immediately
//! while the heavy codec engine loads in the background.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

pub mod inspector;
pub mod mock;

pub use inspector::FfprobeInspector;

/// Probe failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// The input's declared media type is not a video type
    #[error("not a video file (declared type '{content_type}')")]
    NotAVideo {
        /// The declared media type of the rejected input
        content_type: String,
    },

    /// Duration or dimensions could not be read within the bounded wait
    #[error("video metadata could not be read: {reason}")]
    MetadataUnavailable {
        /// What went wrong, for logs
        reason: String,
    },
}

/// Raw input handle as received from the file picker
#[derive(Debug, Clone)]
pub struct MediaSource {
    /// Display name of the selected file
    pub name: String,
    /// Declared media type, e.g. "video/mp4"
    pub content_type: String,
    /// File content
    pub bytes: Bytes,
}

impl MediaSource {
    /// Create a source handle
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Probed input, immutable for the lifetime of the job that owns it
#[derive(Debug, Clone, Serialize)]
pub struct MediaAsset {
    /// Media duration in seconds
    pub duration_seconds: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Input size in bytes
    pub size_bytes: u64,
    /// Display name carried over from the source
    pub display_name: String,
    /// File content, staged into the engine at submission
    #[serde(skip)]
    pub bytes: Bytes,
}

/// Playable handle to the staged input file.
///
/// The handle keeps the staged copy alive for as long as a display layer
/// needs it. Release it (or drop it) once the preview is no longer shown.
#[derive(Debug)]
pub struct PreviewHandle {
    file: Option<NamedTempFile>,
}

impl PreviewHandle {
    pub(crate) fn new(file: NamedTempFile) -> Self {
        Self { file: Some(file) }
    }

    /// Handle without a backing file, used by probe test doubles
    pub(crate) fn detached() -> Self {
        Self { file: None }
    }

    /// Path to the playable file, if one is staged
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path())
    }

    /// Remove the staged file now instead of at drop
    pub fn release(self) {}
}

/// Reject inputs whose declared media type is not a video type.
///
/// This runs before any metadata work so non-video inputs never reach
/// ffprobe or trigger an engine load.
pub fn ensure_video(source: &MediaSource) -> Result<(), ProbeError> {
    if source.content_type.starts_with("video/") {
        Ok(())
    } else {
        Err(ProbeError::NotAVideo {
            content_type: source.content_type.clone(),
        })
    }
}

/// Metadata extraction seam
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Inspect a raw input and return the probed asset plus a preview handle
    async fn probe(
        &self,
        source: &MediaSource,
    ) -> Result<(MediaAsset, PreviewHandle), ProbeError>;
}
