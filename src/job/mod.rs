//! Transcode job orchestration and state machine
//!
//! A job owns one probed asset, one trim window and, once planned, one
//! encoding plan. It walks `Idle → Probing → AwaitingEngine → Planning →
//! Encoding` and ends in `Completed`, `Failed` or `Cancelled`. States are
//! published over a watch channel so callers can poll or subscribe.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{EncoderSettings, PipelineConfig};
use crate::engine::{EngineLease, EngineLifecycle, EngineProgress, ExecError, ProgressHook};
use crate::error::JobError;
use crate::planner::{self, ClipMode, EncodingPlan};
use crate::probe::{ensure_video, MediaAsset, MediaProbe, MediaSource, PreviewHandle};
use crate::trim::{PolicyError, TrimWindow};

/// Container type of every finished output, whatever the input was
pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

/// Finished output handle returned to the post-composer
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    /// Display name, carried over from the source
    pub name: String,
    /// Always [`OUTPUT_CONTENT_TYPE`]
    pub content_type: String,
    /// Produced file content
    pub bytes: Bytes,
}

/// Observable job state
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    /// No pipeline stage is active; the job is editable
    Idle,
    /// Reading input metadata
    Probing,
    /// Waiting for the engine to load and for the execution slot
    AwaitingEngine,
    /// Deriving the encoding plan
    Planning,
    /// The engine is producing the output
    Encoding {
        /// Monotonically non-decreasing fraction in `[0, 1]`
        progress: f32,
    },
    /// Finished successfully
    Completed(OutputFile),
    /// Finished with a terminal error
    Failed(JobError),
    /// Stopped by a cancellation request
    Cancelled,
}

impl JobState {
    /// Whether the job finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed(_) | Self::Failed(_) | Self::Cancelled
        )
    }

    /// Short state name for logs and display
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::AwaitingEngine => "awaiting-engine",
            Self::Planning => "planning",
            Self::Encoding { .. } => "encoding",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Refusal returned by [`TranscodeJob::submit`] without failing the job
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// No probed asset is loaded
    #[error("no media source loaded")]
    NotLoaded,

    /// The trim window violates clip policy; adjust it and resubmit
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// One clip extraction job.
///
/// The job object stays editable between probing and submission: the trim
/// window can be scrubbed and the mode hint switched, and a policy refusal
/// from `submit` leaves everything in place. Terminal states release all
/// engine-side entries the job created.
pub struct TranscodeJob {
    lifecycle: Arc<EngineLifecycle>,
    probe: Arc<dyn MediaProbe>,
    settings: EncoderSettings,
    state_tx: watch::Sender<JobState>,
    state_rx: watch::Receiver<JobState>,
    asset: Option<MediaAsset>,
    preview: Option<PreviewHandle>,
    window: Option<TrimWindow>,
    plan: Option<EncodingPlan>,
    mode: ClipMode,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
}

impl TranscodeJob {
    /// Create an idle job bound to the shared engine lifecycle
    pub fn new(
        lifecycle: Arc<EngineLifecycle>,
        probe: Arc<dyn MediaProbe>,
        config: &PipelineConfig,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(JobState::Idle);
        let job = Self {
            lifecycle,
            probe,
            settings: config.encoder.clone(),
            state_tx,
            state_rx,
            asset: None,
            preview: None,
            window: None,
            plan: None,
            mode: ClipMode::StreamCopy,
            cancel: CancellationToken::new(),
            created_at: Utc::now(),
        };
        debug!("job created at {}", job.created_at);
        job
    }

    /// Current state snapshot
    pub fn state(&self) -> JobState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state_rx.clone()
    }

    /// Probed asset, once probing succeeded
    pub fn asset(&self) -> Option<&MediaAsset> {
        self.asset.as_ref()
    }

    /// Preview handle for the display layer, while a source is open
    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    /// Trim window, once probing succeeded
    pub fn trim_window(&self) -> Option<&TrimWindow> {
        self.window.as_ref()
    }

    /// Mutable trim window for interactive scrubbing
    pub fn window_mut(&mut self) -> Option<&mut TrimWindow> {
        self.window.as_mut()
    }

    /// Select how the output is produced
    pub fn set_mode(&mut self, mode: ClipMode) {
        self.mode = mode;
    }

    /// Selected production mode
    pub fn mode(&self) -> ClipMode {
        self.mode
    }

    /// Plan of the latest submission attempt
    pub fn plan(&self) -> Option<&EncodingPlan> {
        self.plan.as_ref()
    }

    /// Token that cancels this job cooperatively
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation at the next safe boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Release the preview and reset the job to an empty idle state
    pub fn close(&mut self) {
        self.preview.take();
        self.asset = None;
        self.window = None;
        self.plan = None;
        self.set_state(JobState::Idle);
    }

    /// Hand off a raw file: validate its declared type and probe it.
    ///
    /// The engine prefetch starts in parallel with metadata extraction, so
    /// the heavyweight load overlaps the editing phase. A non-video input
    /// fails the job before the prefetch is ever spawned.
    pub async fn open(&mut self, source: MediaSource) -> Result<MediaAsset, JobError> {
        self.reset_for_open();
        self.set_state(JobState::Probing);

        if let Err(e) = ensure_video(&source) {
            return Err(self.fail(e.into()));
        }

        let lifecycle = self.lifecycle.clone();
        tokio::spawn(async move {
            if let Err(e) = lifecycle.ensure_ready().await {
                warn!("engine prefetch failed, will retry at submission: {e}");
            }
        });

        let probed = tokio::select! {
            _ = self.cancel.cancelled() => {
                self.set_state(JobState::Cancelled);
                return Err(JobError::Execution(ExecError::Cancelled));
            }
            probed = self.probe.probe(&source) => probed,
        };

        match probed {
            Ok((asset, preview)) => {
                info!(
                    "opened {}: {:.1}s {}x{}",
                    asset.display_name, asset.duration_seconds, asset.width, asset.height
                );
                self.window = Some(TrimWindow::new(asset.duration_seconds));
                self.preview = Some(preview);
                self.asset = Some(asset.clone());
                self.set_state(JobState::Idle);
                Ok(asset)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Run the pipeline to a terminal state.
    ///
    /// Policy violations refuse the submission and leave the job editable;
    /// everything else ends in `Completed`, `Failed` or `Cancelled`, which
    /// is also the returned value. The engine's staged entries for this job
    /// are removed on every exit path before the terminal state is
    /// published.
    pub async fn submit(&mut self) -> Result<JobState, SubmitError> {
        let asset = self.asset.clone().ok_or(SubmitError::NotLoaded)?;
        let window = self.window.clone().ok_or(SubmitError::NotLoaded)?;
        window.validate()?;

        info!(
            "submitting {}: [{:.3}s, {:.3}s] as {:?}",
            asset.display_name,
            window.start(),
            window.end(),
            self.mode
        );

        if self.cancel.is_cancelled() {
            self.set_state(JobState::Cancelled);
            return Ok(JobState::Cancelled);
        }

        self.set_state(JobState::AwaitingEngine);
        let lease = tokio::select! {
            _ = self.cancel.cancelled() => {
                self.set_state(JobState::Cancelled);
                return Ok(JobState::Cancelled);
            }
            lease = self.lifecycle.lease() => match lease {
                Ok(lease) => lease,
                Err(e) => return Ok(self.fail_state(e.into())),
            },
        };

        self.set_state(JobState::Planning);
        let plan = planner::plan(&asset, &window, self.mode, &self.settings);
        debug!("plan: {:?}", plan);
        self.plan = Some(plan.clone());

        self.set_state(JobState::Encoding { progress: 0.0 });
        let outcome = self.run_encode(&lease, &asset, &plan).await;

        // Publish the terminal state while still holding the lease, so no
        // later job emits events before this one is finished.
        let terminal = match outcome {
            Ok(output) => {
                info!("completed {} ({} bytes)", output.name, output.bytes.len());
                JobState::Completed(output)
            }
            Err(JobError::Execution(ExecError::Cancelled)) => {
                info!("cancelled {}", asset.display_name);
                JobState::Cancelled
            }
            Err(e) => {
                warn!("failed {}: {} ({})", asset.display_name, e, e.category());
                JobState::Failed(e)
            }
        };
        self.set_state(terminal.clone());
        drop(lease);
        Ok(terminal)
    }

    /// Stage, run and read back one encode, cleaning up staged names on
    /// every exit path.
    async fn run_encode(
        &self,
        lease: &EngineLease,
        asset: &MediaAsset,
        plan: &EncodingPlan,
    ) -> Result<OutputFile, JobError> {
        let mut staged: Vec<String> = Vec::new();
        let result = async {
            let input = lease.write_input(&asset.bytes, staging_ext(&asset.display_name)).await?;
            staged.push(input.clone());
            let output = lease.allocate("mp4");
            staged.push(output.clone());

            let args = plan.to_args(&input, &output);
            let hook = self.progress_hook(plan.duration_seconds);
            lease.run(&args, hook, &self.cancel).await?;

            let bytes = lease.read_output(&output).await?;
            Ok::<_, ExecError>(OutputFile {
                name: asset.display_name.clone(),
                content_type: OUTPUT_CONTENT_TYPE.to_string(),
                bytes,
            })
        }
        .await;

        lease.cleanup(&staged).await;
        result.map_err(JobError::from)
    }

    /// Hook turning engine out-time into a clamped, non-decreasing fraction
    fn progress_hook(&self, duration_seconds: f64) -> ProgressHook {
        let tx = self.state_tx.clone();
        let highest = Arc::new(Mutex::new(0.0f32));
        Arc::new(move |event: EngineProgress| {
            let fraction = if duration_seconds > 0.0 {
                (event.out_time_ms as f64 / (duration_seconds * 1000.0)) as f32
            } else {
                0.0
            };
            let Ok(mut highest) = highest.lock() else {
                return;
            };
            let next = fraction.clamp(0.0, 1.0).max(*highest);
            *highest = next;
            tx.send_replace(JobState::Encoding { progress: next });
        })
    }

    fn reset_for_open(&mut self) {
        self.preview.take();
        self.asset = None;
        self.window = None;
        self.plan = None;
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
    }

    fn set_state(&self, state: JobState) {
        debug!("job state: {}", state.name());
        self.state_tx.send_replace(state);
    }

    fn fail(&self, error: JobError) -> JobError {
        warn!("job failed: {} ({})", error, error.category());
        self.set_state(JobState::Failed(error.clone()));
        error
    }

    fn fail_state(&self, error: JobError) -> JobState {
        let error = self.fail(error);
        JobState::Failed(error)
    }
}

/// Extension used when staging the input, falling back to the container
/// default for names without a usable one
fn staging_ext(display_name: &str) -> &str {
    match display_name.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(char::is_alphanumeric) =>
        {
            ext
        }
        _ => "mp4",
    }
}
