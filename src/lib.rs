//! ClipForge
//!
//! Video clip extraction and transcoding pipeline: probe a source, select a
//! sub-range, pick a production strategy (lossless stream copy or
//! re-encoding) and drive a shared codec engine through an asynchronous,
//! cancellable job with progress reporting.
//!
//! The surrounding application supplies a raw [`probe::MediaSource`] and
//! receives a finished [`job::OutputFile`]; everything in between is this
//! crate.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod planner;
pub mod probe;
pub mod trim;
pub mod util;

// Re-export commonly used types
pub use config::{EncoderSettings, PipelineConfig};
pub use engine::{Engine, EngineError, EngineLifecycle, ExecError, FfmpegLoader};
pub use error::{ErrorCategory, JobError, JobResult};
pub use job::{JobState, OutputFile, SubmitError, TranscodeJob};
pub use planner::{ClipMode, EncodingPlan};
pub use probe::{FfprobeInspector, MediaAsset, MediaProbe, MediaSource, ProbeError};
pub use trim::{PolicyError, TrimWindow, MAX_CLIP_SECONDS};
