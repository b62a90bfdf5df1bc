// Selection Controller - Drives the code table from the (game, platform) selection
//
// This module contains the SelectionController which coordinates between:
// - CollectionStore (staged view of the selected key's codes)
// - ParseCoordinator (single-flight parse jobs on the worker pool)
// - TableReconciler (display rows)
// - AuthGate (sign-in state, gates redemption)
// - WorkerBridge (worker pool and completion inbox)
//
// All of those are owned here and only touched from the controlling thread.
// Workers post WorkerMessage values; the controller applies them in
// handle_message and publishes the resulting ControllerEvents.

use crate::logging::LogSink;
use crate::metrics::Metrics;
use crate::models::{AuthState, DEFAULT_MAX_WORKERS, SelectionKey};
use crate::services::client::{LoginOutcome, RedemptionClient, Status};
use crate::services::registry::ParserRegistry;
use crate::services::store::CollectionStore;
use crate::state::{AuthGate, ControllerEvent, SelectionPhase};
use crate::ui::bridge::{ParseCompletion, WorkerBridge, WorkerMessage};
use crate::ui::coordinator::ParseCoordinator;
use crate::ui::table::{DisplayRow, TableReconciler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Default lifetime of a transient status message
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Tuning knobs for [`SelectionController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Maximum number of worker jobs running at once
    pub max_workers: usize,

    /// How long transient status messages stay visible
    pub status_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
        }
    }
}

/// Owns every piece of mutable state behind the code table and reacts to
/// selection changes, worker completions and sign-in/redeem requests.
///
/// Every operation returns immediately; blocking work is dispatched to the
/// worker pool and its result is applied later by [`process_pending`] or
/// [`process_next`].
///
/// [`process_pending`]: Self::process_pending
/// [`process_next`]: Self::process_next
///
/// # Example
/// ```ignore
/// let runtime = tokio::runtime::Runtime::new()?;
/// let mut controller = SelectionController::new(
///     CollectionStore::new(Arc::new(YamlKeyStore::new("keys")?)),
///     registry,
///     Arc::new(OfflineClient),
///     LogSink::new(),
///     runtime.handle().clone(),
///     ControllerOptions::default(),
/// );
///
/// controller.select(SelectionKey::new(Game::Borderlands3, Platform::Pc));
/// runtime.block_on(async {
///     while let Some(events) = controller.process_next().await {
///         tracing::debug!("Applied {} events", events.len());
///     }
/// });
/// ```
pub struct SelectionController {
    /// Worker pool shared by login and redeem jobs
    bridge: WorkerBridge,

    /// Completion messages posted by workers
    inbox: mpsc::Receiver<WorkerMessage>,

    /// Jobs dispatched whose completion has not been applied yet
    outstanding: usize,

    store: CollectionStore,
    coordinator: ParseCoordinator,
    table: TableReconciler,
    auth: AuthGate,
    registry: ParserRegistry,
    client: Arc<dyn RedemptionClient>,

    /// Status surface; status messages are appended here as well
    sink: LogSink,

    phase: SelectionPhase,
    events_tx: broadcast::Sender<ControllerEvent>,
    metrics: Arc<Metrics>,
    status_timeout: Duration,
}

impl SelectionController {
    /// Create a controller
    ///
    /// # Arguments
    /// * `store` - Staged view over the persistent key store
    /// * `registry` - Parsers available per selection key
    /// * `client` - Sign-in and redemption client
    /// * `sink` - Status/log surface
    /// * `tokio_handle` - Runtime the worker jobs run on
    /// * `options` - Worker pool size and status timeout
    pub fn new(
        store: CollectionStore,
        registry: ParserRegistry,
        client: Arc<dyn RedemptionClient>,
        sink: LogSink,
        tokio_handle: tokio::runtime::Handle,
        options: ControllerOptions,
    ) -> Self {
        let (bridge, inbox) = WorkerBridge::new(tokio_handle, options.max_workers);
        let coordinator = ParseCoordinator::new(bridge.clone(), sink.clone());
        let (events_tx, _) = broadcast::channel(100);

        tracing::info!(
            "Selection controller initialized ({} parsers, {} workers)",
            registry.len(),
            options.max_workers.max(1)
        );

        Self {
            bridge,
            inbox,
            outstanding: 0,
            store,
            coordinator,
            table: TableReconciler::new(),
            auth: AuthGate::new(),
            registry,
            client,
            sink,
            phase: SelectionPhase::default(),
            events_tx,
            metrics: Arc::new(Metrics::new()),
            status_timeout: options.status_timeout,
        }
    }

    /// Switch the selection to `key`.
    ///
    /// Loads and renders the persisted codes for `key` right away, then starts
    /// a parse job if a parser is registered. A key containing `NONE` renders
    /// an empty table and never parses.
    pub fn select(&mut self, key: SelectionKey) -> Vec<ControllerEvent> {
        tracing::info!("Selection changed to {}", key);

        let mut events = vec![ControllerEvent::SelectionChanged { key }];
        self.phase = SelectionPhase::Loading(key);
        self.table.clear();
        self.store.clear();

        if key.has_none() {
            tracing::debug!("Selection {} is incomplete, skipping parse", key);
            events.push(ControllerEvent::TableRendered { key, rows: 0 });
            self.phase = SelectionPhase::Idle(key);
            return self.publish(events);
        }

        let loaded = match self.store.load(key) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to load codes for {}: {:#}", key, e);
                self.store.clear();
                events.push(self.status(format!("Failed to load codes for {}", key)));
                false
            }
        };

        let rows = self.table.render(self.store.collection()).len();
        events.push(ControllerEvent::TableRendered { key, rows });

        let parser = if loaded { self.registry.lookup(key) } else { None };
        let Some(parser) = parser else {
            tracing::debug!("No parse job for {}", key);
            self.phase = SelectionPhase::Idle(key);
            return self.publish(events);
        };

        if self
            .coordinator
            .submit(key, parser, self.store.collection().clone())
        {
            self.outstanding += 1;
            self.metrics.record_parse_started();
            events.push(ControllerEvent::ParseStarted { key });
        } else {
            self.metrics.record_parse_rejected();
            events.push(ControllerEvent::ParseRejected { key });
        }

        // Either way a job for `key` is in flight now
        self.phase = SelectionPhase::AwaitingParse(key);
        self.publish(events)
    }

    /// Start signing in.
    ///
    /// Returns `false` without dispatching anything while a sign-in is already
    /// in progress or the session is signed in.
    pub fn login(&mut self) -> bool {
        if !self.auth.begin_login() {
            return false;
        }

        self.metrics.record_login_attempt();
        let client = Arc::clone(&self.client);
        self.dispatch(
            move || WorkerMessage::LoginFinished(client.login()),
            WorkerMessage::LoginFinished(LoginOutcome::failed()),
        );

        tracing::info!("Sign-in started");
        self.publish(vec![ControllerEvent::AuthChanged {
            state: self.auth.state().clone(),
        }]);
        true
    }

    /// End the session; redemption is refused until the next sign-in.
    ///
    /// No-op (no events) while a sign-in is in progress.
    pub fn sign_out(&mut self) -> Vec<ControllerEvent> {
        if !self.auth.sign_out() {
            return Vec::new();
        }
        tracing::info!("Signed out");
        self.publish(vec![ControllerEvent::AuthChanged {
            state: AuthState::SignedOut,
        }])
    }

    /// Redeem `code` with the client.
    ///
    /// Refused (returns `false`, no client call) unless signed in.
    pub fn redeem(&mut self, code: &str) -> bool {
        if !self.auth.can_redeem() {
            tracing::warn!("Redeem of {} refused, session is {}", code, self.auth.state());
            self.metrics.record_redemption_blocked();
            return false;
        }

        self.metrics.record_redemption_dispatched();
        let key = self.phase.key();
        let client = Arc::clone(&self.client);
        let job_code = code.to_string();
        self.dispatch(
            move || {
                let status = client.redeem(&job_code);
                WorkerMessage::RedeemFinished {
                    key,
                    code: job_code,
                    status,
                }
            },
            WorkerMessage::RedeemFinished {
                key,
                code: code.to_string(),
                status: Status::NetworkError,
            },
        );

        tracing::info!("Redeeming {}", code);
        true
    }

    /// Apply one worker completion
    pub fn handle_message(&mut self, message: WorkerMessage) -> Vec<ControllerEvent> {
        let events = match message {
            WorkerMessage::ParseFinished(done) => self.on_parse_finished(done),
            WorkerMessage::LoginFinished(outcome) => self.on_login_finished(outcome),
            WorkerMessage::RedeemFinished { key, code, status } => {
                self.on_redeem_finished(key, code, status)
            }
        };
        self.publish(events)
    }

    /// Apply every completion already waiting in the inbox without blocking
    pub fn process_pending(&mut self) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        while let Ok(message) = self.inbox.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            events.extend(self.handle_message(message));
        }
        events
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `None` once no dispatched job is left to report back.
    pub async fn process_next(&mut self) -> Option<Vec<ControllerEvent>> {
        if self.outstanding == 0 {
            return None;
        }

        let message = self.inbox.recv().await?;
        self.outstanding -= 1;
        Some(self.handle_message(message))
    }

    fn on_parse_finished(&mut self, done: ParseCompletion) -> Vec<ControllerEvent> {
        let ParseCompletion {
            key,
            success,
            delta,
        } = done;

        let elapsed = self.coordinator.complete(key).unwrap_or_default();
        self.metrics.record_parse_finished(success, elapsed);

        let current = self.phase.key() == key && self.store.active_key() == Some(key);
        let mut events = Vec::new();

        let added = if current {
            let added = self.store.stage(delta);
            if let Err(e) = self.store.commit() {
                tracing::error!("Failed to commit codes for {}: {:#}", key, e);
                events.push(ControllerEvent::CommitFailed {
                    key,
                    message: format!("{:#}", e),
                });
            }

            let rows = self.table.render(self.store.collection()).len();
            events.push(ControllerEvent::TableRendered { key, rows });
            self.phase = SelectionPhase::Idle(key);
            added
        } else {
            self.metrics.record_stale_completion();
            tracing::debug!(
                "Parse result for {} arrived after selection moved to {}",
                key,
                self.phase.key()
            );

            match self.store.commit_detached(key, delta) {
                Ok(added) => added,
                Err(e) => {
                    tracing::error!("Failed to commit codes for {}: {:#}", key, e);
                    events.push(ControllerEvent::CommitFailed {
                        key,
                        message: format!("{:#}", e),
                    });
                    0
                }
            }
        };

        self.metrics.record_codes_discovered(added);
        tracing::info!(
            "Parse job for {} finished in {:.2}s: success={}, {} new codes",
            key,
            elapsed.as_secs_f64(),
            success,
            added
        );

        events.push(self.status(if success {
            "Parsing complete"
        } else {
            "Parsing failed"
        }));
        events.push(ControllerEvent::ParseFinished {
            key,
            success,
            added,
            stale: !current,
        });
        events
    }

    fn on_login_finished(&mut self, outcome: LoginOutcome) -> Vec<ControllerEvent> {
        if !self.auth.finish_login(outcome) {
            return Vec::new();
        }

        let state = self.auth.state().clone();
        let text = match state.user() {
            Some(user) => format!("Signed in as {}", user),
            None => "Sign-in failed".to_string(),
        };
        tracing::info!("{}", text);

        vec![ControllerEvent::AuthChanged { state }, self.status(text)]
    }

    fn on_redeem_finished(
        &mut self,
        key: SelectionKey,
        code: String,
        status: Status,
    ) -> Vec<ControllerEvent> {
        tracing::info!("Redeem {} for {}: {:?}", code, key, status);
        let mut events = Vec::new();

        let current = self.phase.key() == key && self.store.active_key() == Some(key);
        if status.is_redeemed() && current {
            if self.store.mark_redeemed(&code) {
                if let Err(e) = self.store.commit() {
                    tracing::error!("Failed to commit redeemed flag for {}: {:#}", code, e);
                    events.push(ControllerEvent::CommitFailed {
                        key,
                        message: format!("{:#}", e),
                    });
                }
                let rows = self.table.render(self.store.collection()).len();
                events.push(ControllerEvent::TableRendered { key, rows });
            }
        } else if status.is_redeemed() && !key.has_none() {
            // Selection moved on; flag the code in the collection it was redeemed from
            if let Err(e) = self.store.mark_redeemed_detached(key, &code) {
                tracing::error!("Failed to commit redeemed flag for {}: {:#}", code, e);
                events.push(ControllerEvent::CommitFailed {
                    key,
                    message: format!("{:#}", e),
                });
            }
        }

        events.push(self.status(format!("{}: {}", code, status)));
        events.push(ControllerEvent::Redeemed { key, code, status });
        events
    }

    fn dispatch<F>(&mut self, job: F, on_panic: WorkerMessage)
    where
        F: FnOnce() -> WorkerMessage + Send + 'static,
    {
        self.outstanding += 1;
        self.bridge.run_blocking(job, on_panic);
    }

    fn status(&self, text: impl Into<String>) -> ControllerEvent {
        let text = text.into();
        self.sink.append(text.clone());
        ControllerEvent::StatusMessage {
            text,
            timeout: self.status_timeout,
        }
    }

    fn publish(&self, events: Vec<ControllerEvent>) -> Vec<ControllerEvent> {
        for event in &events {
            // No subscribers is fine
            let _ = self.events_tx.send(event.clone());
        }
        events
    }

    /// Rows currently displayed, newest discovery first
    pub fn rows(&self) -> &[DisplayRow] {
        self.table.rows()
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn selection(&self) -> SelectionKey {
        self.phase.key()
    }

    pub fn auth_state(&self) -> &AuthState {
        self.auth.state()
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Whether a parse job for `key` has been dispatched and not yet applied
    pub fn is_parsing(&self, key: SelectionKey) -> bool {
        self.coordinator.is_running(key)
    }

    /// Jobs of any kind whose completion has not been applied yet
    pub fn outstanding_jobs(&self) -> usize {
        self.outstanding
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events_tx.subscribe()
    }

    pub fn log_sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }
}
