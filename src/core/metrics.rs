//! Logger metrics for observability
//!
//! Counters for what happened to messages after they passed the filter:
//! how many reached every sink, how many hit a failing sink, how many bodies
//! were truncated and how often a caller had to wait on a full queue. Failed
//! background flushes are counted separately from failed writes.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use blogger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_sink_failure();
/// metrics.record_dispatched();
///
/// assert_eq!(metrics.sink_failures(), 1);
/// assert_eq!(metrics.dispatched(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Messages delivered to every attached sink without error
    dispatched: AtomicU64,

    /// Messages at least one sink failed (or panicked) on
    sink_failures: AtomicU64,

    /// Messages whose body was cut to fit the render buffer
    truncated: AtomicU64,

    /// Async submissions that had to wait for queue space
    blocked_submissions: AtomicU64,

    /// Idle flushes run by the async drain that returned an error
    flush_failures: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            truncated: AtomicU64::new(0),
            blocked_submissions: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn truncated(&self) -> u64 {
        self.truncated.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn blocked_submissions(&self) -> u64 {
        self.blocked_submissions.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    /// Returns the previous count
    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the previous count
    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_truncated(&self) -> u64 {
        self.truncated.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_blocked_submission(&self) -> u64 {
        self.blocked_submissions.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the previous count
    #[inline]
    pub fn record_flush_failure(&self) -> u64 {
        self.flush_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of dispatched messages that hit a failing sink, as a percentage
    ///
    /// Returns 0.0 if nothing has been dispatched.
    pub fn failure_rate(&self) -> f64 {
        let failed = self.sink_failures() as f64;
        let total = self.dispatched() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.dispatched.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.truncated.store(0, Ordering::Relaxed);
        self.blocked_submissions.store(0, Ordering::Relaxed);
        self.flush_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            dispatched: AtomicU64::new(self.dispatched()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            truncated: AtomicU64::new(self.truncated()),
            blocked_submissions: AtomicU64::new(self.blocked_submissions()),
            flush_failures: AtomicU64::new(self.flush_failures()),
        }
    }
}
