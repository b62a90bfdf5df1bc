use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::fs;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_appender::rolling;
use tracing_subscriber::layer::{Context as LayerContext, Layer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

thread_local! {
    /// Number of suppression scopes open on this thread
    static SUPPRESSION_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Setup logging with rotating file appender.
///
/// Logs are written to the specified directory with daily rotation.
///
/// # Arguments
/// * `log_dir` - Directory for log files (e.g., "logs")
/// * `log_prefix` - Prefix for log files (e.g., "shiftkeys")
/// * `debug_mode` - If true, use debug level; otherwise use info level
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(
    log_dir: &str,
    log_prefix: &str,
    debug_mode: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    setup_logging_with_console(log_dir, log_prefix, debug_mode, false, None)
}

/// Setup logging with optional console output and status-surface forwarding.
///
/// # Arguments
/// * `log_dir` - Directory for log files
/// * `log_prefix` - Prefix for log files
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to console
/// * `sink` - If set, every event is also forwarded into this [`LogSink`]
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging_with_console(
    log_dir: &str,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
    sink: Option<LogSink>,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // Create log directory if it doesn't exist
    let log_path = Utf8PathBuf::from(log_dir);
    if !log_path.exists() {
        fs::create_dir_all(&log_path)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    // Create daily rotating file appender
    let file_appender = rolling::daily(log_dir, log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = if debug_mode {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
    });

    let forwarding = sink.clone().map(LogSinkLayer::new);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .with(forwarding)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}, forwarding={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output,
        sink.as_ref().is_some_and(LogSink::is_enabled)
    );

    Ok(guard)
}

/// Lines a [`LogSink`] keeps by default before dropping the oldest
pub const DEFAULT_SINK_CAPACITY: usize = 1000;

/// Append-only text surface that log output is forwarded to.
///
/// Cloning is cheap; all clones share the same buffer. The buffer holds at
/// most `capacity` lines, oldest dropped first. Lines appended from a thread
/// that currently holds a [`SuppressionGuard`] are dropped.
#[derive(Clone, Debug)]
pub struct LogSink {
    inner: Arc<SinkInner>,
}

#[derive(Debug)]
struct SinkInner {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
    enabled: bool,
    open_scopes: AtomicUsize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::build(true, DEFAULT_SINK_CAPACITY)
    }

    /// A sink that keeps only the newest `capacity` lines (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(true, capacity.max(1))
    }

    /// A sink that never accepts lines (the `no_gui` setting)
    pub fn disabled() -> Self {
        Self::build(false, 0)
    }

    fn build(enabled: bool, capacity: usize) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                lines: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
                capacity,
                enabled,
                open_scopes: AtomicUsize::new(0),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Forward a line to the surface.
    ///
    /// Returns `false` if the line was dropped because the sink is disabled or
    /// the calling thread is inside a suppression scope.
    pub fn append(&self, line: impl Into<String>) -> bool {
        if !self.inner.enabled || Self::suppressed_on_current_thread() {
            return false;
        }

        let mut lines = self
            .inner
            .lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if lines.len() == self.inner.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
        true
    }

    /// Suppress forwarding from the current thread until the guard drops
    pub fn suppress(&self) -> SuppressionGuard {
        SUPPRESSION_DEPTH.with(|depth| depth.set(depth.get() + 1));
        self.inner.open_scopes.fetch_add(1, Ordering::SeqCst);

        SuppressionGuard {
            sink: self.clone(),
            _not_send: PhantomData,
        }
    }

    /// Whether the calling thread is inside a suppression scope
    pub fn suppressed_on_current_thread() -> bool {
        SUPPRESSION_DEPTH.with(|depth| depth.get() > 0)
    }

    /// Number of suppression scopes currently open on any thread
    pub fn open_scopes(&self) -> usize {
        self.inner.open_scopes.load(Ordering::SeqCst)
    }

    /// Snapshot of the retained lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.inner
            .lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn len(&self) -> usize {
        self.inner
            .lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope during which the owning thread does not forward to a [`LogSink`].
///
/// Released when dropped, including during unwinding. Not `Send`: the scope
/// belongs to the thread that opened it.
pub struct SuppressionGuard {
    sink: LogSink,
    _not_send: PhantomData<*const ()>,
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        SUPPRESSION_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
        self.sink.inner.open_scopes.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for SuppressionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppressionGuard").finish_non_exhaustive()
    }
}

/// `tracing` layer forwarding formatted events into a [`LogSink`]
pub struct LogSinkLayer {
    sink: LogSink,
}

impl LogSinkLayer {
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }
}

impl<S: Subscriber> Layer<S> for LogSinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        if !self.sink.is_enabled() || LogSink::suppressed_on_current_thread() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.sink
            .append(format!("{:>5} {}", event.metadata().level(), visitor.finish()));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
