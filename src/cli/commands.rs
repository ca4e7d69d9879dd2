//! Command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use crate::cli::{ClipArgs, InspectArgs};
use crate::config::PipelineConfig;
use crate::engine::{EngineLifecycle, FfmpegLoader};
use crate::job::{JobState, TranscodeJob};
use crate::planner::ClipMode;
use crate::probe::{FfprobeInspector, MediaProbe, MediaSource};
use crate::trim::MAX_CLIP_SECONDS;
use crate::util::{format_duration, format_size, parse_timecode};

/// Extract a clip according to the arguments
pub async fn execute_clip(args: ClipArgs, config: PipelineConfig) -> Result<()> {
    let start = parse_timecode(&args.start).map_err(|e| anyhow!(e))?;
    let end = parse_timecode(&args.end).map_err(|e| anyhow!(e))?;
    let mode = ClipMode::parse(&args.mode)
        .with_context(|| format!("unknown mode '{}', expected copy or reencode", args.mode))?;

    let source = read_source(&args.input)?;
    let probe = Arc::new(FfprobeInspector::new(&config));
    let lifecycle = EngineLifecycle::new(Arc::new(FfmpegLoader::new(&config)));
    let mut job = TranscodeJob::new(lifecycle, probe, &config);

    let asset = job
        .open(source)
        .await
        .map_err(|e| anyhow!("{} ({})", e, e.category()))?;

    {
        let window = job.window_mut().context("no trim window after probing")?;
        if !window.set_end(end) {
            bail!("end time {} does not leave a usable range", args.end);
        }
        if !window.set_start(start) {
            bail!("start time {} does not leave a usable range", args.start);
        }
    }
    job.set_mode(mode);

    // Stop cooperatively on Ctrl-C
    let cancel = job.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("cancellation requested");
            cancel.cancel();
        }
    });

    // Relay job states to the terminal until a terminal state arrives
    let mut updates = job.subscribe();
    let reporter = tokio::spawn(async move {
        let mut last_percent = -1i64;
        loop {
            let state = updates.borrow_and_update().clone();
            match &state {
                JobState::Encoding { progress } => {
                    let percent = (progress * 100.0).round() as i64;
                    if percent / 5 > last_percent / 5 {
                        info!("encoding: {percent}%");
                        last_percent = percent;
                    }
                }
                other => info!("{}", other.name()),
            }
            if state.is_terminal() || updates.changed().await.is_err() {
                break;
            }
        }
    });

    let terminal = job.submit().await?;
    let _ = reporter.await;

    match terminal {
        JobState::Completed(output) => {
            let path = args
                .output
                .unwrap_or_else(|| default_output_path(&args.input, start, end));
            std::fs::write(&path, &output.bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(
                "wrote {} ({}, {:.1}s clip of {})",
                path.display(),
                format_size(output.bytes.len() as u64),
                end - start,
                asset.display_name
            );
            Ok(())
        }
        JobState::Failed(e) => bail!("{} ({})", e, e.category()),
        JobState::Cancelled => bail!("processing cancelled"),
        other => bail!("job ended in unexpected state '{}'", other.name()),
    }
}

/// Probe a file and print its metadata
pub async fn execute_inspect(args: InspectArgs, config: PipelineConfig) -> Result<()> {
    let source = read_source(&args.input)?;
    let probe = FfprobeInspector::new(&config);
    let (asset, preview) = probe
        .probe(&source)
        .await
        .map_err(|e| anyhow!("{e}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&asset)?);
    } else {
        println!("{}", asset.display_name);
        println!("  duration: {}", format_duration(asset.duration_seconds));
        println!("  frame:    {}x{}", asset.width, asset.height);
        println!("  size:     {}", format_size(asset.size_bytes));
        if asset.duration_seconds > MAX_CLIP_SECONDS {
            println!(
                "  note:     longer than {}, a clip must be selected",
                format_duration(MAX_CLIP_SECONDS)
            );
        }
    }

    preview.release();
    Ok(())
}

/// Build a source handle from a file on disk
fn read_source(path: &Path) -> Result<MediaSource> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    Ok(MediaSource::new(name, declared_media_type(path), bytes))
}

/// Declared media type inferred from the file extension
fn declared_media_type(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mpg" | "mpeg") => "video/mpeg",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Default output path next to the input
fn default_output_path(input: &Path, start: f64, end: f64) -> std::path::PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    input.with_file_name(format!("{stem}_clip_{start:.1}_{end:.1}.mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_types_follow_extensions() {
        assert_eq!(declared_media_type(Path::new("a.mp4")), "video/mp4");
        assert_eq!(declared_media_type(Path::new("a.MOV")), "video/quicktime");
        assert_eq!(declared_media_type(Path::new("a.webm")), "video/webm");
        assert_eq!(
            declared_media_type(Path::new("a.png")),
            "application/octet-stream"
        );
        assert_eq!(
            declared_media_type(Path::new("noext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn default_output_name_carries_the_range() {
        let path = default_output_path(Path::new("/videos/holiday.mov"), 10.0, 40.5);
        assert_eq!(
            path,
            Path::new("/videos/holiday_clip_10.0_40.5.mp4")
        );
    }
}
