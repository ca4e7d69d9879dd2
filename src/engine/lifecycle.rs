//! Load-once engine lifecycle and serialized access

use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::engine::queue::{ExecPermit, ExecQueue};
use crate::engine::{Engine, EngineError, EngineLoader};

/// Process-wide engine lifecycle.
///
/// The first `ensure_ready` call triggers the load; concurrent callers
/// await that same in-flight load instead of starting another. A successful
/// load is cached for the rest of the session. A failed load leaves the
/// lifecycle unloaded so a later call can retry; retry policy belongs to
/// the caller.
pub struct EngineLifecycle {
    loader: Arc<dyn EngineLoader>,
    cell: OnceCell<Arc<dyn Engine>>,
    queue: ExecQueue,
}

/// Exclusive grant to the loaded engine.
///
/// Holding a lease is the only way to touch the engine. The execution slot
/// is released when the lease is dropped, letting the next queued job run.
pub struct EngineLease {
    engine: Arc<dyn Engine>,
    _permit: ExecPermit,
}

impl Deref for EngineLease {
    type Target = dyn Engine;

    fn deref(&self) -> &Self::Target {
        self.engine.as_ref()
    }
}

impl EngineLifecycle {
    /// Create a lifecycle around an engine loader
    pub fn new(loader: Arc<dyn EngineLoader>) -> Arc<Self> {
        Arc::new(Self {
            loader,
            cell: OnceCell::new(),
            queue: ExecQueue::new(),
        })
    }

    /// Load the engine if needed and return the shared handle
    pub async fn ensure_ready(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let engine = self
            .cell
            .get_or_try_init(|| async {
                info!("loading codec engine");
                let engine = self.loader.load().await?;
                info!("codec engine ready");
                Ok::<_, EngineError>(engine)
            })
            .await?;
        Ok(engine.clone())
    }

    /// Whether the engine finished loading
    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Wait for the engine and for the execution slot, in queue order
    pub async fn lease(&self) -> Result<EngineLease, EngineError> {
        let engine = self.ensure_ready().await?;
        debug!("waiting for engine execution slot");
        let permit = self.queue.acquire().await;
        Ok(EngineLease {
            engine,
            _permit: permit,
        })
    }
}
