//! Output strategy planning and engine argument construction

use serde::{Deserialize, Serialize};

use crate::config::EncoderSettings;
use crate::probe::MediaAsset;
use crate::trim::TrimWindow;

/// How the output file is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipMode {
    /// Copy both streams verbatim into a new container.
    ///
    /// Near-instant and lossless, but the actual cut start snaps to the
    /// nearest keyframe at or before the requested start.
    StreamCopy,
    /// Decode and re-compress both streams to broadly compatible codecs
    ReEncode,
}

impl ClipMode {
    /// Parse a mode name as used on the command line
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "copy" | "stream-copy" => Some(Self::StreamCopy),
            "reencode" | "re-encode" | "encode" => Some(Self::ReEncode),
            _ => None,
        }
    }
}

/// Fully resolved output strategy for one job attempt.
///
/// Derived deterministically from the asset, the trim window and the mode
/// hint. The plan never mixes modes: both streams are either copied or
/// re-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingPlan {
    /// Selected production mode
    pub mode: ClipMode,
    /// Clip start inside the source, in seconds
    pub start_seconds: f64,
    /// Clip length in seconds
    pub duration_seconds: f64,
    /// Scale target when the source exceeds the height cap
    pub target_height: Option<u32>,
    /// Video codec argument ("copy" in stream-copy mode)
    pub video_codec: String,
    /// Audio codec argument ("copy" in stream-copy mode)
    pub audio_codec: String,
    /// Constant rate factor for re-encoding
    pub crf: u8,
    /// Encoder speed preset for re-encoding
    pub preset: String,
    /// Audio bitrate for re-encoding
    pub audio_bitrate: String,
}

/// Derive the output strategy for the given asset and window
pub fn plan(
    asset: &MediaAsset,
    window: &TrimWindow,
    mode: ClipMode,
    settings: &EncoderSettings,
) -> EncodingPlan {
    let target_height = match mode {
        ClipMode::StreamCopy => None,
        ClipMode::ReEncode if asset.height > settings.height_cap => Some(settings.height_cap),
        ClipMode::ReEncode => None,
    };

    let (video_codec, audio_codec) = match mode {
        ClipMode::StreamCopy => ("copy".to_string(), "copy".to_string()),
        ClipMode::ReEncode => (
            settings.video_codec.clone(),
            settings.audio_codec.clone(),
        ),
    };

    EncodingPlan {
        mode,
        start_seconds: window.start(),
        duration_seconds: window.len_seconds(),
        target_height,
        video_codec,
        audio_codec,
        crf: settings.crf.min(51),
        preset: settings.preset.clone(),
        audio_bitrate: settings.audio_bitrate.clone(),
    }
}

impl EncodingPlan {
    /// Scale filter expression, when the plan downscales.
    ///
    /// `-2` keeps the aspect ratio and rounds the width to an even value,
    /// which the video codec requires.
    pub fn scale_filter(&self) -> Option<String> {
        self.target_height.map(|h| format!("scale=-2:{h}"))
    }

    /// Build the engine argument vector for staged input/output names.
    ///
    /// Seeking happens before the input is opened, duration bounds the
    /// output, and the container index is moved to the front of the file in
    /// both modes so playback can start before the download finishes.
    pub fn to_args(&self, input_name: &str, output_name: &str) -> Vec<String> {
        let mut args = vec![
            "-ss".to_string(),
            format!("{:.3}", self.start_seconds),
            "-i".to_string(),
            input_name.to_string(),
            "-t".to_string(),
            format!("{:.3}", self.duration_seconds),
        ];

        match self.mode {
            ClipMode::StreamCopy => {
                args.extend(["-c:v", "copy", "-c:a", "copy"].map(String::from));
            }
            ClipMode::ReEncode => {
                let crf = self.crf.to_string();
                args.extend(
                    [
                        "-c:v",
                        self.video_codec.as_str(),
                        "-preset",
                        self.preset.as_str(),
                        "-crf",
                        crf.as_str(),
                    ]
                    .map(String::from),
                );
                if let Some(filter) = self.scale_filter() {
                    args.push("-vf".to_string());
                    args.push(filter);
                }
                args.extend(
                    [
                        "-c:a",
                        self.audio_codec.as_str(),
                        "-b:a",
                        self.audio_bitrate.as_str(),
                    ]
                    .map(String::from),
                );
            }
        }

        args.extend(["-movflags", "+faststart"].map(String::from));
        args.push(output_name.to_string());
        args
    }
}

/// Width of a downscaled frame, preserving aspect ratio to the nearest even pixel
pub fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    if height == 0 {
        return 0;
    }
    let exact = width as f64 * target_height as f64 / height as f64;
    let rounded = exact.round() as u32;
    // Codecs reject odd frame widths
    rounded & !1
}
