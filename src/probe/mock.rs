//! Probe test double with fixed metadata

use async_trait::async_trait;

use crate::probe::{ensure_video, MediaAsset, MediaProbe, MediaSource, PreviewHandle, ProbeError};

/// Probe returning configured metadata for any video input.
///
/// Keeps the declared-type gate of the real inspector so rejection paths
/// behave identically.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    /// Reported duration in seconds
    pub duration_seconds: f64,
    /// Reported frame width
    pub width: u32,
    /// Reported frame height
    pub height: u32,
}

impl StaticProbe {
    /// Probe reporting the given duration and dimensions
    pub fn new(duration_seconds: f64, width: u32, height: u32) -> Self {
        Self {
            duration_seconds,
            width,
            height,
        }
    }
}

#[async_trait]
impl MediaProbe for StaticProbe {
    async fn probe(
        &self,
        source: &MediaSource,
    ) -> Result<(MediaAsset, PreviewHandle), ProbeError> {
        ensure_video(source)?;
        let asset = MediaAsset {
            duration_seconds: self.duration_seconds,
            width: self.width,
            height: self.height,
            size_bytes: source.bytes.len() as u64,
            display_name: source.name.clone(),
            bytes: source.bytes.clone(),
        };
        Ok((asset, PreviewHandle::detached()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn reports_configured_metadata() {
        let probe = StaticProbe::new(600.0, 1920, 1080);
        let source = MediaSource::new("clip.mp4", "video/mp4", Bytes::from_static(b"data"));
        let (asset, preview) = probe.probe(&source).await.unwrap();
        assert_eq!(asset.duration_seconds, 600.0);
        assert_eq!(asset.width, 1920);
        assert_eq!(asset.height, 1080);
        assert_eq!(asset.size_bytes, 4);
        assert_eq!(asset.display_name, "clip.mp4");
        assert!(preview.path().is_none());
    }

    #[tokio::test]
    async fn keeps_the_type_gate() {
        let probe = StaticProbe::new(10.0, 640, 480);
        let source = MediaSource::new("notes.txt", "text/plain", Bytes::from_static(b"hi"));
        assert!(matches!(
            probe.probe(&source).await,
            Err(ProbeError::NotAVideo { .. })
        ));
    }
}
