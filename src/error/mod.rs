//! Job-level error taxonomy

use std::fmt;

use thiserror::Error;

use crate::engine::{EngineError, ExecError};
use crate::probe::ProbeError;
use crate::trim::PolicyError;

/// Terminal job failure.
///
/// Everything the pipeline can get wrong is recovered at the job boundary
/// and folded into one of these variants; raw engine output never reaches
/// the caller directly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    /// The input was rejected before or during probing
    #[error("input rejected: {0}")]
    Input(#[from] ProbeError),

    /// The selected range violates clip policy
    #[error("clip policy violated: {0}")]
    Policy(#[from] PolicyError),

    /// The codec engine could not be loaded; retryable by a later attempt
    #[error("engine unavailable: {0}")]
    EngineLoad(#[from] EngineError),

    /// The engine failed while producing the output
    #[error("processing failed: {0}")]
    Execution(#[from] ExecError),
}

/// Stable, human-readable failure category for display layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Input is not a video file
    NotAVideo,
    /// Input metadata could not be read
    MetadataUnavailable,
    /// Selected clip exceeds the length limit
    ClipTooLong,
    /// Selected clip range is empty
    EmptyClip,
    /// Codec engine could not be loaded
    EngineUnavailable,
    /// Engine failed while processing
    ProcessingFailed,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotAVideo => "not a video file",
            Self::MetadataUnavailable => "video metadata could not be read",
            Self::ClipTooLong => "video too long",
            Self::EmptyClip => "empty clip selection",
            Self::EngineUnavailable => "processing engine unavailable",
            Self::ProcessingFailed => "processing failed",
        };
        f.write_str(text)
    }
}

impl JobError {
    /// Map the failure to its display category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Input(ProbeError::NotAVideo { .. }) => ErrorCategory::NotAVideo,
            Self::Input(ProbeError::MetadataUnavailable { .. }) => {
                ErrorCategory::MetadataUnavailable
            }
            Self::Policy(PolicyError::ClipTooLong { .. }) => ErrorCategory::ClipTooLong,
            Self::Policy(PolicyError::EmptyWindow) => ErrorCategory::EmptyClip,
            Self::EngineLoad(EngineError::LoadFailed { .. }) => ErrorCategory::EngineUnavailable,
            Self::Execution(_) => ErrorCategory::ProcessingFailed,
        }
    }
}

/// Result alias for job operations
pub type JobResult<T> = std::result::Result<T, JobError>;
