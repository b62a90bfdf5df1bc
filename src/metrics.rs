// Performance metrics module
//
// Lightweight counters for parse and redemption activity

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Controller metrics
///
/// Uses atomic operations so the counters can be read from any thread while
/// the controlling thread updates them. Logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Parse jobs dispatched to the worker pool
    pub parse_jobs_started: AtomicU64,

    /// Parse submissions refused because a job for the key was running
    pub parse_jobs_rejected: AtomicU64,

    /// Parse jobs whose parser reported success
    pub parses_succeeded: AtomicU64,

    /// Parse jobs whose parser reported failure (or panicked)
    pub parses_failed: AtomicU64,

    /// Completions that arrived after the user selected another key
    pub stale_completions: AtomicU64,

    /// Codes that were new to their collection
    pub codes_discovered: AtomicU64,

    /// Total parse time in milliseconds
    pub total_parse_time_ms: AtomicU64,

    /// Sign-in attempts dispatched
    pub login_attempts: AtomicU64,

    /// Redemptions dispatched to the client
    pub redemptions_dispatched: AtomicU64,

    /// Redemptions refused by the sign-in gate
    pub redemptions_blocked: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            parse_jobs_started: AtomicU64::new(0),
            parse_jobs_rejected: AtomicU64::new(0),
            parses_succeeded: AtomicU64::new(0),
            parses_failed: AtomicU64::new(0),
            stale_completions: AtomicU64::new(0),
            codes_discovered: AtomicU64::new(0),
            total_parse_time_ms: AtomicU64::new(0),
            login_attempts: AtomicU64::new(0),
            redemptions_dispatched: AtomicU64::new(0),
            redemptions_blocked: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_parse_started(&self) {
        self.parse_jobs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_rejected(&self) {
        self.parse_jobs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished parse job
    pub fn record_parse_finished(&self, success: bool, elapsed: Duration) {
        if success {
            self.parses_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.parses_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_parse_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_stale_completion(&self) {
        self.stale_completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_codes_discovered(&self, count: usize) {
        self.codes_discovered.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_login_attempt(&self) {
        self.login_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redemption_dispatched(&self) {
        self.redemptions_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redemption_blocked(&self) {
        self.redemptions_blocked.fetch_add(1, Ordering::Relaxed);
    }

    /// Average parse time per finished job in milliseconds
    pub fn avg_parse_time_ms(&self) -> f64 {
        let finished = self.parses_succeeded.load(Ordering::Relaxed)
            + self.parses_failed.load(Ordering::Relaxed);

        if finished == 0 {
            return 0.0;
        }

        self.total_parse_time_ms.load(Ordering::Relaxed) as f64 / finished as f64
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log a summary of all counters
    pub fn log_summary(&self) {
        tracing::info!(
            "Metrics: parse jobs started={}, rejected={}, succeeded={}, failed={}, stale={}, codes discovered={}",
            self.parse_jobs_started.load(Ordering::Relaxed),
            self.parse_jobs_rejected.load(Ordering::Relaxed),
            self.parses_succeeded.load(Ordering::Relaxed),
            self.parses_failed.load(Ordering::Relaxed),
            self.stale_completions.load(Ordering::Relaxed),
            self.codes_discovered.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Metrics: avg parse {:.1}ms, logins={}, redemptions dispatched={}, blocked={}, uptime {:.0}s",
            self.avg_parse_time_ms(),
            self.login_attempts.load(Ordering::Relaxed),
            self.redemptions_dispatched.load(Ordering::Relaxed),
            self.redemptions_blocked.load(Ordering::Relaxed),
            self.uptime().as_secs_f64()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
