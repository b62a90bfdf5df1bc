// WorkerBridge - Coordinates between the controlling thread and the worker pool
//
// The controlling thread owns every piece of mutable state. Blocking work
// (parsing, sign-in, redemption) runs on tokio's blocking pool, bounded by a
// semaphore, and its result travels back as an immutable WorkerMessage through
// a bounded mpsc inbox that only the controlling thread drains.

use crate::models::{CodeEntry, SelectionKey};
use crate::services::client::{LoginOutcome, Status};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};

/// Result of one parse job
#[derive(Debug, Clone, PartialEq)]
pub struct ParseCompletion {
    pub key: SelectionKey,
    pub success: bool,
    /// Entries the parser discovered beyond the collection it was handed
    pub delta: Vec<CodeEntry>,
}

/// Completion messages posted by worker jobs to the controlling thread
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    ParseFinished(ParseCompletion),
    LoginFinished(LoginOutcome),
    /// `key` is the selection the redeem was dispatched from
    RedeemFinished {
        key: SelectionKey,
        code: String,
        status: Status,
    },
}

/// Runs blocking jobs off the controlling thread and posts their results back
///
/// # Example
/// ```ignore
/// let (bridge, mut inbox) = WorkerBridge::new(runtime.handle().clone(), 4);
///
/// bridge.run_blocking(
///     move || WorkerMessage::LoginFinished(client.login()),
///     WorkerMessage::LoginFinished(LoginOutcome::failed()),
/// );
///
/// // Later, on the controlling thread
/// while let Ok(message) = inbox.try_recv() {
///     controller.handle_message(message);
/// }
/// ```
#[derive(Clone)]
pub struct WorkerBridge {
    /// Handle to the tokio runtime for spawning jobs
    tokio_handle: tokio::runtime::Handle,

    /// Sender half of the controlling thread's inbox
    inbox_tx: mpsc::Sender<WorkerMessage>,

    /// Bounds how many jobs execute at once
    permits: Arc<Semaphore>,
}

impl WorkerBridge {
    /// Create a bridge and the inbox receiver the controlling thread drains
    ///
    /// # Arguments
    /// * `tokio_handle` - Runtime the jobs are spawned on
    /// * `max_workers` - Maximum number of jobs executing concurrently (at least 1)
    pub fn new(
        tokio_handle: tokio::runtime::Handle,
        max_workers: usize,
    ) -> (Self, mpsc::Receiver<WorkerMessage>) {
        let (inbox_tx, inbox_rx) = mpsc::channel(crate::models::INBOX_CAPACITY);
        let bridge = Self {
            tokio_handle,
            inbox_tx,
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
        };
        (bridge, inbox_rx)
    }

    /// Run `job` on the blocking pool and post its message to the inbox
    ///
    /// Returns immediately. If the job panics, `on_panic` is posted instead so
    /// the controlling thread always hears back exactly once per job.
    pub fn run_blocking<F>(&self, job: F, on_panic: WorkerMessage)
    where
        F: FnOnce() -> WorkerMessage + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let inbox_tx = self.inbox_tx.clone();

        self.tokio_handle.spawn(async move {
            // The semaphore is never closed, so acquiring only waits for a free slot
            let _permit = permits.acquire_owned().await.ok();

            let message = match tokio::task::spawn_blocking(job).await {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!("Worker job failed: {}", e);
                    on_panic
                }
            };

            if inbox_tx.send(message).await.is_err() {
                tracing::warn!("Dropping worker result - controller inbox is closed");
            }
        });
    }

    /// Jobs that could start right now without waiting for a slot
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Game, Platform};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key() -> SelectionKey {
        SelectionKey::new(Game::Borderlands3, Platform::Pc)
    }

    #[test]
    fn test_job_result_reaches_inbox() {
        tokio_test::block_on(async {
            let (bridge, mut inbox) = WorkerBridge::new(tokio::runtime::Handle::current(), 2);

            bridge.run_blocking(
                || WorkerMessage::LoginFinished(LoginOutcome::signed_in("alice")),
                WorkerMessage::LoginFinished(LoginOutcome::failed()),
            );

            let message = inbox.recv().await.unwrap();
            assert_eq!(
                message,
                WorkerMessage::LoginFinished(LoginOutcome::signed_in("alice"))
            );
        });
    }

    #[test]
    fn test_panicking_job_posts_fallback() {
        tokio_test::block_on(async {
            let (bridge, mut inbox) = WorkerBridge::new(tokio::runtime::Handle::current(), 1);
            let fallback = WorkerMessage::ParseFinished(ParseCompletion {
                key: key(),
                success: false,
                delta: Vec::new(),
            });

            bridge.run_blocking(|| panic!("parser exploded"), fallback.clone());

            assert_eq!(inbox.recv().await.unwrap(), fallback);
        });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_pool_is_bounded() {
        let (bridge, mut inbox) = WorkerBridge::new(tokio::runtime::Handle::current(), 2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            bridge.run_blocking(
                move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    WorkerMessage::RedeemFinished {
                        key: key(),
                        code: "ABCDE".to_string(),
                        status: Status::Success,
                    }
                },
                WorkerMessage::RedeemFinished {
                    key: key(),
                    code: "ABCDE".to_string(),
                    status: Status::NetworkError,
                },
            );
        }

        for _ in 0..6 {
            tokio::time::timeout(Duration::from_secs(5), inbox.recv())
                .await
                .expect("Timeout waiting for worker")
                .expect("Inbox closed");
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
