//! Codec engine abstraction, lifecycle and execution queue
//!
//! The engine is a heavyweight, separately loaded component with its own
//! staged file table. All access goes through [`EngineLifecycle`]: loading
//! is coalesced so the engine is fetched once per session, and execution is
//! serialized through an explicit FIFO queue because the engine entry point
//! is not safe for concurrent runs on the same handle.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod ffmpeg;
pub mod lifecycle;
pub mod mock;
pub mod progress;
pub mod queue;

pub use ffmpeg::FfmpegLoader;
pub use lifecycle::{EngineLease, EngineLifecycle};
pub use progress::EngineProgress;

/// Engine load failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine could not be fetched or initialized
    #[error("codec engine failed to load: {reason}")]
    LoadFailed {
        /// What went wrong, for logs
        reason: String,
    },
}

/// Engine execution failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    /// The engine rejected the arguments or could not process the input
    #[error("engine run failed: {reason}")]
    Failed {
        /// What went wrong, for logs
        reason: String,
    },

    /// A staged file could not be written, read or named
    #[error("engine staging error: {reason}")]
    Storage {
        /// What went wrong, for logs
        reason: String,
    },

    /// The run was stopped by a cancellation request
    #[error("engine run cancelled")]
    Cancelled,
}

/// Callback receiving progress events while a run is active
pub type ProgressHook = Arc<dyn Fn(EngineProgress) + Send + Sync>;

/// Loaded codec engine handle.
///
/// Staged entries live in the engine's internal file table; every name a
/// caller creates must be passed to [`Engine::cleanup`] on each exit path,
/// success or not, so the table cannot grow across a session.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Reserve a fresh staged-file name with the given extension
    fn allocate(&self, ext: &str) -> String;

    /// Stage input bytes, returning the name they were stored under
    async fn write_input(&self, bytes: &[u8], ext: &str) -> Result<String, ExecError>;

    /// Execute one operation against staged files.
    ///
    /// Progress events are delivered through `progress` while the run is
    /// active. Cancellation stops the engine at the next safe boundary and
    /// surfaces as [`ExecError::Cancelled`].
    async fn run(
        &self,
        args: &[String],
        progress: ProgressHook,
        cancel: &CancellationToken,
    ) -> Result<(), ExecError>;

    /// Read a staged output file
    async fn read_output(&self, name: &str) -> Result<Bytes, ExecError>;

    /// Remove staged entries, best effort
    async fn cleanup(&self, names: &[String]);

    /// Names currently present in the staged file table
    async fn entries(&self) -> Vec<String>;
}

/// Engine construction seam used by [`EngineLifecycle`]
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Fetch and initialize the engine
    async fn load(&self) -> Result<Arc<dyn Engine>, EngineError>;
}
