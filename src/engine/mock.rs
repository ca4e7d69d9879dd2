//! Engine test doubles with an in-memory file table

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::engine::{Engine, EngineError, EngineLoader, EngineProgress, ExecError, ProgressHook};

/// Scripted behavior of [`MockEngine::run`]
#[derive(Debug, Clone)]
pub enum RunBehavior {
    /// Emit progress ticks, then write the output entry
    Succeed,
    /// Fail with the given reason, writing nothing
    Fail(String),
    /// Emit one tick, then park until the run is cancelled
    BlockUntilCancelled,
}

/// In-memory engine for pipeline tests.
///
/// Stages entries in a hash map, records every argument vector it is run
/// with, and follows a scripted [`RunBehavior`].
pub struct MockEngine {
    files: Mutex<HashMap<String, Bytes>>,
    runs: Mutex<Vec<Vec<String>>>,
    seq: AtomicU64,
    behavior: RunBehavior,
    progress_points: Mutex<Option<Vec<i64>>>,
}

impl MockEngine {
    /// Engine whose runs succeed
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::with_behavior(RunBehavior::Succeed))
    }

    /// Engine whose runs fail with the given reason
    pub fn failing(reason: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::with_behavior(RunBehavior::Fail(reason.into())))
    }

    /// Engine whose runs park until cancelled
    pub fn blocking() -> Arc<Self> {
        Arc::new(Self::with_behavior(RunBehavior::BlockUntilCancelled))
    }

    fn with_behavior(behavior: RunBehavior) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            runs: Mutex::new(Vec::new()),
            seq: AtomicU64::new(1),
            behavior,
            progress_points: Mutex::new(None),
        }
    }

    /// Override the out-time sequence (milliseconds) emitted by successful runs
    pub fn set_progress_points(&self, points: Vec<i64>) {
        *self.progress_points.lock().unwrap() = Some(points);
    }

    /// Argument vectors of every run so far
    pub fn runs(&self) -> Vec<Vec<String>> {
        self.runs.lock().unwrap().clone()
    }

    /// Number of runs so far
    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    /// Progress points for a run: overridden, or quartiles of the `-t` value
    fn points_for(&self, args: &[String]) -> Vec<i64> {
        if let Some(points) = self.progress_points.lock().unwrap().clone() {
            return points;
        }
        let duration_ms = args
            .iter()
            .position(|a| a == "-t")
            .and_then(|i| args.get(i + 1))
            .and_then(|v| v.parse::<f64>().ok())
            .map(|secs| (secs * 1000.0) as i64)
            .unwrap_or(1000);
        (1..=4).map(|q| duration_ms * q / 4).collect()
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn allocate(&self, ext: &str) -> String {
        format!("mock{:04}.{}", self.seq.fetch_add(1, Ordering::Relaxed), ext)
    }

    async fn write_input(&self, bytes: &[u8], ext: &str) -> Result<String, ExecError> {
        let name = self.allocate(ext);
        self.files
            .lock()
            .unwrap()
            .insert(name.clone(), Bytes::copy_from_slice(bytes));
        Ok(name)
    }

    async fn run(
        &self,
        args: &[String],
        progress: ProgressHook,
        cancel: &CancellationToken,
    ) -> Result<(), ExecError> {
        self.runs.lock().unwrap().push(args.to_vec());

        match &self.behavior {
            RunBehavior::Fail(reason) => Err(ExecError::Failed {
                reason: reason.clone(),
            }),
            RunBehavior::BlockUntilCancelled => {
                (*progress)(EngineProgress {
                    out_time_ms: 1000,
                    speed: Some(1.0),
                });
                cancel.cancelled().await;
                Err(ExecError::Cancelled)
            }
            RunBehavior::Succeed => {
                for out_time_ms in self.points_for(args) {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ExecError::Cancelled),
                        _ = tokio::time::sleep(Duration::from_millis(1)) => {
                            (*progress)(EngineProgress { out_time_ms, speed: Some(8.0) });
                        }
                    }
                }
                // The last argument names the output entry
                if let Some(output) = args.last() {
                    self.files
                        .lock()
                        .unwrap()
                        .insert(output.clone(), Bytes::from_static(b"transcoded"));
                }
                Ok(())
            }
        }
    }

    async fn read_output(&self, name: &str) -> Result<Bytes, ExecError> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ExecError::Storage {
                reason: format!("no staged entry '{name}'"),
            })
    }

    async fn cleanup(&self, names: &[String]) {
        let mut files = self.files.lock().unwrap();
        for name in names {
            files.remove(name);
        }
    }

    async fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Loader test double with load counting and failure injection
pub struct MockLoader {
    engine: Arc<MockEngine>,
    loads: AtomicUsize,
    fail_first: AtomicUsize,
    delay: Duration,
}

impl MockLoader {
    /// Loader that hands out the given engine
    pub fn new(engine: Arc<MockEngine>) -> Self {
        Self {
            engine,
            loads: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long inside every load, to widen race windows in tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make the first `n` loads fail
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    /// How many loads were attempted
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineLoader for MockLoader {
    async fn load(&self) -> Result<Arc<dyn Engine>, EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::LoadFailed {
                reason: "injected load failure".to_string(),
            });
        }
        Ok(self.engine.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeed_run_writes_the_output_entry() {
        let engine = MockEngine::succeeding();
        let input = engine.write_input(b"source", "mp4").await.unwrap();
        let output = engine.allocate("mp4");
        let args = vec![
            "-ss".to_string(),
            "0.000".to_string(),
            "-i".to_string(),
            input.clone(),
            "-t".to_string(),
            "2.000".to_string(),
            output.clone(),
        ];

        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook: ProgressHook = {
            let seen = seen.clone();
            Arc::new(move |p: EngineProgress| seen.lock().unwrap().push(p.out_time_ms))
        };
        let cancel = CancellationToken::new();
        engine.run(&args, hook, &cancel).await.unwrap();

        assert_eq!(engine.run_count(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![500, 1000, 1500, 2000]);
        assert_eq!(&engine.read_output(&output).await.unwrap()[..], b"transcoded");

        engine.cleanup(&[input, output]).await;
        assert!(engine.entries().await.is_empty());
    }

    #[tokio::test]
    async fn blocking_run_returns_cancelled() {
        let engine = MockEngine::blocking();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let hook: ProgressHook = Arc::new(|_| {});
        let err = engine
            .run(&["out.mp4".to_string()], hook, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, ExecError::Cancelled);
    }
}
