//! System ffmpeg subprocess engine

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::engine::progress::parse_progress_line;
use crate::engine::{Engine, EngineError, EngineLoader, EngineProgress, ExecError, ProgressHook};

/// How many trailing engine log lines are kept for error reports
const STDERR_TAIL_LINES: usize = 12;

/// Loader resolving and verifying the system ffmpeg binary
pub struct FfmpegLoader {
    binary: Option<PathBuf>,
}

impl FfmpegLoader {
    /// Create a loader from pipeline configuration
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            binary: config.ffmpeg_path.clone(),
        }
    }
}

#[async_trait]
impl EngineLoader for FfmpegLoader {
    async fn load(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let failed = |reason: String| EngineError::LoadFailed { reason };

        let binary = match &self.binary {
            Some(path) => path.clone(),
            None => which::which("ffmpeg")
                .map_err(|e| failed(format!("ffmpeg not found: {e}")))?,
        };

        // A version probe proves the binary is runnable before any job
        // queues behind it.
        let output = Command::new(&binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| failed(format!("failed to run {}: {e}", binary.display())))?;
        if !output.status.success() {
            return Err(failed(format!(
                "{} -version exited with {}",
                binary.display(),
                output.status
            )));
        }
        let banner = String::from_utf8_lossy(&output.stdout);
        let version = banner.lines().next().unwrap_or("unknown version");

        let staging = TempDir::new()
            .map_err(|e| failed(format!("failed to create staging directory: {e}")))?;

        info!(
            "engine loaded: {} ({}), staging at {}",
            binary.display(),
            version,
            staging.path().display()
        );

        Ok(Arc::new(FfmpegEngine {
            binary,
            staging,
            seq: AtomicU64::new(1),
            threads: num_cpus::get().clamp(1, 16),
        }))
    }
}

/// Engine backed by an ffmpeg child process per run.
///
/// A private temp directory plays the role of the engine's internal file
/// table: inputs are staged into it, outputs appear in it, and `cleanup`
/// removes entries by name.
pub struct FfmpegEngine {
    binary: PathBuf,
    staging: TempDir,
    seq: AtomicU64,
    threads: usize,
}

impl FfmpegEngine {
    fn storage(reason: impl Into<String>) -> ExecError {
        ExecError::Storage {
            reason: reason.into(),
        }
    }

    /// Staged names are flat; anything path-like is refused.
    fn checked_path(&self, name: &str) -> Result<PathBuf, ExecError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(Self::storage(format!("invalid staged name '{name}'")));
        }
        Ok(self.staging.path().join(name))
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    fn allocate(&self, ext: &str) -> String {
        let ext = ext.trim_start_matches('.');
        let ext = if ext.is_empty() || !ext.chars().all(char::is_alphanumeric) {
            "mp4"
        } else {
            ext
        };
        format!("clip{:06}.{}", self.seq.fetch_add(1, Ordering::Relaxed), ext)
    }

    async fn write_input(&self, bytes: &[u8], ext: &str) -> Result<String, ExecError> {
        let name = self.allocate(ext);
        let path = self.checked_path(&name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Self::storage(format!("failed to stage '{name}': {e}")))?;
        debug!("staged {} ({} bytes)", name, bytes.len());
        Ok(name)
    }

    async fn run(
        &self,
        args: &[String],
        progress: ProgressHook,
        cancel: &CancellationToken,
    ) -> Result<(), ExecError> {
        let mut command = Command::new(&self.binary);
        command
            .current_dir(self.staging.path())
            .args(["-hide_banner", "-nostdin", "-y"])
            .args(["-loglevel", "error"])
            .args(["-progress", "pipe:1", "-nostats"])
            // Cap worker threads on constrained hosts
            .args(["-threads", &self.threads.to_string()])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("engine run: {:?}", args);
        let mut child = command
            .spawn()
            .map_err(|e| ExecError::Failed {
                reason: format!("failed to spawn engine: {e}"),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Self::storage("engine stdout unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Self::storage("engine stderr unavailable"))?;

        // Keep a short tail of engine log output for error reporting
        let tail: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let tail_writer = tail.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Ok(mut tail) = tail_writer.lock() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut current = EngineProgress::default();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("engine run cancelled, stopping child process");
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    stderr_task.abort();
                    return Err(ExecError::Cancelled);
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if parse_progress_line(&line, &mut current) {
                            (*progress)(current);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!("engine progress stream closed: {e}");
                        break;
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Self::storage(format!("failed to reap engine process: {e}")))?;
        let _ = stderr_task.await;

        if status.success() {
            Ok(())
        } else {
            let log = tail
                .lock()
                .map(|t| t.join("; "))
                .unwrap_or_default();
            Err(ExecError::Failed {
                reason: format!("engine exited with {status}: {log}"),
            })
        }
    }

    async fn read_output(&self, name: &str) -> Result<Bytes, ExecError> {
        let path = self.checked_path(name)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| Self::storage(format!("failed to read '{name}': {e}")))?;
        Ok(Bytes::from(data))
    }

    async fn cleanup(&self, names: &[String]) {
        for name in names {
            let Ok(path) = self.checked_path(name) else {
                continue;
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("removed staged entry {name}"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove staged entry {name}: {e}"),
            }
        }
    }

    async fn entries(&self) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(mut dir) = tokio::fs::read_dir(self.staging.path()).await else {
            return names;
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }
}
