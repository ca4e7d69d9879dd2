//! FIFO execution queue with a single active slot

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Grant to run against the engine. Dropping it releases the slot to the
/// next waiter.
#[derive(Debug)]
pub struct ExecPermit {
    _done: oneshot::Sender<()>,
}

/// Explicit FIFO queue feeding one execution slot.
///
/// The engine entry point is not reentrant-safe, so a dispatcher task hands
/// out one [`ExecPermit`] at a time in arrival order. Waiters that give up
/// (their request future is dropped) are skipped.
#[derive(Debug, Clone)]
pub struct ExecQueue {
    tx: mpsc::UnboundedSender<oneshot::Sender<ExecPermit>>,
}

impl ExecQueue {
    /// Create the queue and spawn its dispatcher task
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<oneshot::Sender<ExecPermit>>();
        tokio::spawn(async move {
            while let Some(reply) = rx.recv().await {
                let (done_tx, done_rx) = oneshot::channel();
                if reply.send(ExecPermit { _done: done_tx }).is_ok() {
                    // Held until the permit is dropped
                    let _ = done_rx.await;
                } else {
                    debug!("queued engine waiter went away before its turn");
                }
            }
        });
        Self { tx }
    }

    /// Wait for the execution slot.
    ///
    /// Cancellable: dropping the returned future abandons the queue spot.
    pub async fn acquire(&self) -> ExecPermit {
        let (reply_tx, reply_rx) = oneshot::channel();
        // The dispatcher task lives as long as any queue handle
        let _ = self.tx.send(reply_tx);
        match reply_rx.await {
            Ok(permit) => permit,
            Err(_) => {
                // Dispatcher gone, which means the runtime is shutting down.
                // Pending forever is the only consistent behavior here.
                std::future::pending().await
            }
        }
    }
}

impl Default for ExecQueue {
    fn default() -> Self {
        Self::new()
    }
}
