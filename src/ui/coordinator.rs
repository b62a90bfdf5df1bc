use crate::logging::LogSink;
use crate::models::{Collection, SelectionKey};
use crate::services::parser::{CodeParser, JobLog};
use crate::ui::bridge::{ParseCompletion, WorkerBridge, WorkerMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bookkeeping for one in-flight parse job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseJob {
    pub key: SelectionKey,
    pub started: Instant,
}

/// Runs parsers off the controlling thread, at most one job per selection key.
///
/// The in-flight table lives on the controlling thread only: a job is entered
/// by [`submit`](Self::submit) and left by [`complete`](Self::complete) when
/// its completion message is handled. Workers never touch it.
pub struct ParseCoordinator {
    bridge: WorkerBridge,
    sink: LogSink,
    running: HashMap<SelectionKey, ParseJob>,
}

impl ParseCoordinator {
    pub fn new(bridge: WorkerBridge, sink: LogSink) -> Self {
        Self {
            bridge,
            sink,
            running: HashMap::new(),
        }
    }

    /// Start a parse job for `key` on a snapshot of the staged collection.
    ///
    /// Returns `false` without doing anything if a job for `key` is already
    /// running. Otherwise the job is dispatched and `true` is returned; the
    /// result arrives later as [`WorkerMessage::ParseFinished`].
    pub fn submit(
        &mut self,
        key: SelectionKey,
        parser: Arc<dyn CodeParser>,
        staged: Collection,
    ) -> bool {
        if self.running.contains_key(&key) {
            tracing::debug!("Parse job for {} already running, not submitting another", key);
            return false;
        }

        self.running.insert(
            key,
            ParseJob {
                key,
                started: Instant::now(),
            },
        );

        let sink = self.sink.clone();
        let on_panic = WorkerMessage::ParseFinished(ParseCompletion {
            key,
            success: false,
            delta: Vec::new(),
        });

        self.bridge.run_blocking(
            move || {
                let mut working = staged.clone();

                // The job scope ends before the completion is posted
                let success = {
                    let log = JobLog::open(key, &sink);
                    log.debug(format!("Parsing with {} known codes", staged.len()));
                    parser.parse_keys(&mut working, &log)
                };

                WorkerMessage::ParseFinished(ParseCompletion {
                    key,
                    success,
                    delta: working.difference(&staged),
                })
            },
            on_panic,
        );

        tracing::info!("Started parse job for {}", key);
        true
    }

    /// Mark the job for `key` as finished.
    ///
    /// Returns how long it ran, or `None` if no job was recorded for `key`.
    pub fn complete(&mut self, key: SelectionKey) -> Option<Duration> {
        self.running.remove(&key).map(|job| job.started.elapsed())
    }

    pub fn is_running(&self, key: SelectionKey) -> bool {
        self.running.contains_key(&key)
    }

    /// Jobs currently in flight
    pub fn running_jobs(&self) -> impl Iterator<Item = &ParseJob> {
        self.running.values()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }
}
