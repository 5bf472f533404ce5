//! Main logger implementation

use super::{
    dispatch::{AsyncQueue, QueuedRecord, SinkSet},
    error::Result,
    formatter::{Formatter, DEFAULT_OVERFLOW_POSTFIX},
    log_level::Level,
    metrics::LoggerMetrics,
    pattern::Pattern,
    record::{LogRecord, OwnedRecord},
    sink::Sink,
    worker_pool::WorkerPool,
};
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tag used when none (or an empty one) is given
pub const DEFAULT_TAG: &str = "Unnamed";

/// Records an async logger can hold before callers start waiting
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

/// How a logger gets rendered messages to its sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Render and write inside the logging call
    Blocking,
    /// Capture the call and let the worker pool render and write it
    Async { queue_capacity: usize },
}

enum Dispatch {
    Inline,
    Queued(AsyncQueue),
}

pub struct Logger {
    tag: Arc<str>,
    filter: AtomicU8,
    /// Blocking loggers render into this; async ones fork it per call
    formatter: Mutex<Formatter>,
    sinks: Arc<SinkSet>,
    metrics: Arc<LoggerMetrics>,
    dispatch: Dispatch,
}

impl Logger {
    /// Blocking logger with the default pattern and no sinks
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self::builder().tag(tag).build()
    }

    /// Async logger on the global worker pool
    #[must_use]
    pub fn with_async(tag: impl Into<String>, queue_capacity: usize) -> Self {
        Self::builder().tag(tag).async_mode(queue_capacity).build()
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    fn assemble(
        tag: Arc<str>,
        filter: Level,
        formatter: Formatter,
        mode: DispatchMode,
        pool: Option<Arc<WorkerPool>>,
        sinks: Vec<Box<dyn Sink>>,
    ) -> Self {
        let metrics = Arc::new(LoggerMetrics::new());
        let sink_set = Arc::new(SinkSet::new(Arc::clone(&metrics)));
        for sink in sinks {
            sink_set.push(sink);
        }

        let dispatch = match mode {
            DispatchMode::Blocking => Dispatch::Inline,
            DispatchMode::Async { queue_capacity } => Dispatch::Queued(AsyncQueue::new(
                pool.unwrap_or_else(WorkerPool::global),
                queue_capacity,
                Arc::clone(&sink_set),
                Arc::clone(&metrics),
            )),
        };

        Self {
            tag,
            filter: AtomicU8::new(filter as u8),
            formatter: Mutex::new(formatter),
            sinks: sink_set,
            metrics,
            dispatch,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn filter(&self) -> Level {
        Level::from_u8(self.filter.load(Ordering::Relaxed))
    }

    pub fn set_filter(&self, level: Level) {
        self.filter.store(level as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level.passes(self.filter())
    }

    pub fn is_async(&self) -> bool {
        matches!(self.dispatch, Dispatch::Queued(_))
    }

    pub fn mode(&self) -> DispatchMode {
        match &self.dispatch {
            Dispatch::Inline => DispatchMode::Blocking,
            Dispatch::Queued(queue) => DispatchMode::Async {
                queue_capacity: queue.capacity(),
            },
        }
    }

    /// Pool an async logger drains on
    pub fn pool(&self) -> Option<&Arc<WorkerPool>> {
        match &self.dispatch {
            Dispatch::Inline => None,
            Dispatch::Queued(queue) => Some(queue.pool()),
        }
    }

    /// Records submitted but not yet written; always 0 for blocking loggers
    pub fn pending(&self) -> usize {
        match &self.dispatch {
            Dispatch::Inline => 0,
            Dispatch::Queued(queue) => queue.pending(),
        }
    }

    /// Install a new layout pattern.
    ///
    /// An empty or malformed pattern installs the default one. Calls made
    /// before this returns keep the layout they were made with.
    pub fn set_pattern(&self, pattern: &str) {
        self.formatter
            .lock()
            .set_pattern(Pattern::compile_or_default(pattern));
    }

    pub fn pattern(&self) -> Pattern {
        self.formatter.lock().pattern().clone()
    }

    /// Marker appended to message bodies cut short by the buffer capacity
    pub fn set_overflow_postfix(&self, postfix: &str) {
        self.formatter.lock().set_overflow_postfix(postfix);
    }

    pub fn add_sink(&self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.names()
    }

    /// Get logger metrics for observability
    ///
    /// # Example
    ///
    /// ```
    /// use blogger::Logger;
    ///
    /// let logger = Logger::new("metrics");
    /// logger.info("nobody listens", &[]);
    ///
    /// assert_eq!(logger.metrics().dispatched(), 1);
    /// assert_eq!(logger.metrics().sink_failures(), 0);
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Format `format` with `args` and hand the result to every sink.
    ///
    /// Each `{}` in `format` takes the next argument. Calls below the filter
    /// return before touching the clock or any buffer.
    pub fn log(&self, level: Level, format: &str, args: &[&dyn Display]) {
        if !self.enabled(level) {
            return;
        }

        let record = LogRecord::new(level, &self.tag, format, args);

        match &self.dispatch {
            Dispatch::Inline => {
                let mut formatter = self.formatter.lock();
                let message = formatter.render(&record);
                self.sinks.dispatch(&message);
            }
            Dispatch::Queued(queue) => {
                let formatter = self.formatter.lock().fork();
                queue.submit(QueuedRecord {
                    record: OwnedRecord::capture(&record, Arc::clone(&self.tag)),
                    formatter,
                });
            }
        }
    }

    #[inline]
    pub fn trace(&self, format: &str, args: &[&dyn Display]) {
        self.log(Level::Trace, format, args);
    }

    #[inline]
    pub fn debug(&self, format: &str, args: &[&dyn Display]) {
        self.log(Level::Debug, format, args);
    }

    #[inline]
    pub fn info(&self, format: &str, args: &[&dyn Display]) {
        self.log(Level::Info, format, args);
    }

    #[inline]
    pub fn warn(&self, format: &str, args: &[&dyn Display]) {
        self.log(Level::Warn, format, args);
    }

    #[inline]
    pub fn error(&self, format: &str, args: &[&dyn Display]) {
        self.log(Level::Error, format, args);
    }

    #[inline]
    pub fn crit(&self, format: &str, args: &[&dyn Display]) {
        self.log(Level::Crit, format, args);
    }

    /// Wait for queued records to be written, then flush every sink
    pub fn flush(&self) -> Result<()> {
        if let Dispatch::Queued(queue) = &self.dispatch {
            queue.wait_idle();
        }
        self.sinks.flush_all()
    }

    /// Drain with an upper bound on the wait
    ///
    /// # Returns
    ///
    /// `true` if every submitted record was written and the sinks flushed
    /// within `timeout`, `false` otherwise. The logger stays usable either way.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use blogger::Logger;
    /// use std::time::Duration;
    ///
    /// let logger = Logger::with_async("app", 1024);
    /// logger.info("Important message", &[]);
    ///
    /// if !logger.shutdown(Duration::from_secs(10)) {
    ///     eprintln!("Warning: logger did not drain in time");
    /// }
    /// ```
    pub fn shutdown(&self, timeout: Duration) -> bool {
        if let Dispatch::Queued(queue) = &self.dispatch {
            if !queue.wait_idle_for(timeout) {
                eprintln!(
                    "[LOGGER WARNING] Logger '{}' did not drain within {:?}; {} records still queued.",
                    self.tag,
                    timeout,
                    queue.pending()
                );
                return false;
            }
        }

        if let Err(e) = self.sinks.flush_all() {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
            return false;
        }

        true
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(DEFAULT_TAG)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // Everything submitted is written before the sinks go away
        if let Dispatch::Queued(queue) = &self.dispatch {
            queue.wait_idle();
        }

        if let Err(e) = self.sinks.flush_all() {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
        }

        // Close files and release their locks now, not when the last pool job
        // lets go of the shared set
        drop(self.sinks.take_all());

        let failures = self.metrics.sink_failures();
        if failures > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger '{}' shutting down after {} failed writes (failure rate: {:.2}%)",
                self.tag,
                failures,
                self.metrics.failure_rate()
            );
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("tag", &self.tag)
            .field("filter", &self.filter())
            .field("mode", &self.mode())
            .field("sinks", &self.sink_names())
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use blogger::prelude::*;
///
/// let logger = Logger::builder()
///     .tag("net")
///     .filter(Level::Debug)
///     .pattern("{lvl}{tag}{msg}")
///     .async_mode(1000)
///     .build();
///
/// assert!(logger.is_async());
/// assert_eq!(logger.tag(), "net");
/// ```
pub struct LoggerBuilder {
    tag: String,
    filter: Level,
    pattern: String,
    mode: DispatchMode,
    pool: Option<Arc<WorkerPool>>,
    sinks: Vec<Box<dyn Sink>>,
    overflow_postfix: String,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            filter: Level::Trace,
            pattern: String::new(),
            mode: DispatchMode::Blocking,
            pool: None,
            sinks: Vec::new(),
            overflow_postfix: DEFAULT_OVERFLOW_POSTFIX.to_string(),
        }
    }

    /// An empty tag falls back to [`DEFAULT_TAG`]
    #[must_use = "builder methods return a new value"]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn filter(mut self, level: Level) -> Self {
        self.filter = level;
        self
    }

    /// Layout pattern; empty or malformed means the default
    #[must_use = "builder methods return a new value"]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Enable async mode with the given queue capacity
    ///
    /// If not called, the logger writes synchronously.
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, queue_capacity: usize) -> Self {
        self.mode = DispatchMode::Async { queue_capacity };
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Drain on `pool` instead of the global one. Only meaningful in async mode.
    #[must_use = "builder methods return a new value"]
    pub fn pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Add a sink
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn overflow_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.overflow_postfix = postfix.into();
        self
    }

    pub fn build(self) -> Logger {
        let tag: Arc<str> = if self.tag.is_empty() {
            Arc::from(DEFAULT_TAG)
        } else {
            Arc::from(self.tag)
        };
        let formatter = Formatter::with_postfix(
            Arc::new(Pattern::compile_or_default(&self.pattern)),
            Arc::from(self.overflow_postfix),
        );

        Logger::assemble(
            tag,
            self.filter,
            formatter,
            self.mode,
            self.pool,
            self.sinks,
        )
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LoggerError;
    use crate::core::record::LogMessage;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<String>>>);

    impl Captured {
        fn lines(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    impl Sink for Captured {
        fn write(&mut self, message: &LogMessage<'_>) -> Result<()> {
            self.0.lock().push(message.to_string_lossy().into_owned());
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "captured"
        }
    }

    struct AlwaysFails;

    impl Sink for AlwaysFails {
        fn write(&mut self, _message: &LogMessage<'_>) -> Result<()> {
            Err(LoggerError::writer("disk on fire"))
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "fails"
        }
    }

    #[test]
    fn test_logger_defaults() {
        let logger = Logger::default();
        assert_eq!(logger.tag(), DEFAULT_TAG);
        assert_eq!(logger.filter(), Level::Trace);
        assert!(!logger.is_async());
        assert!(logger.pattern().is_default());
        assert_eq!(logger.sink_count(), 0);
        assert_eq!(logger.pending(), 0);
    }

    #[test]
    fn test_empty_tag_becomes_default() {
        let logger = Logger::builder().tag("").build();
        assert_eq!(logger.tag(), DEFAULT_TAG);
    }

    #[test]
    fn test_blocking_log_reaches_sink() {
        let captured = Captured::default();
        let logger = Logger::builder()
            .tag("core")
            .pattern("{lvl}{tag}{msg}")
            .sink(captured.clone())
            .build();

        logger.info("[{}] value={}", &[&"x", &42]);
        assert_eq!(captured.lines(), vec!["[INFO][core] [x] value=42\n"]);
        assert_eq!(logger.metrics().dispatched(), 1);
    }

    #[test]
    fn test_filter_blocks_lower_levels() {
        let captured = Captured::default();
        let logger = Logger::builder().sink(captured.clone()).build();
        logger.set_filter(Level::Warn);

        logger.info("dropped", &[]);
        logger.debug("dropped", &[]);
        logger.warn("kept", &[]);
        logger.crit("kept", &[]);

        assert_eq!(captured.lines().len(), 2);
        assert_eq!(logger.metrics().dispatched(), 2);
    }

    #[test]
    fn test_set_pattern_falls_back_to_default() {
        let logger = Logger::new("p");
        logger.set_pattern("{msg}");
        assert_eq!(logger.pattern().source(), "{msg}");

        logger.set_pattern("{bogus");
        assert!(logger.pattern().is_default());

        logger.set_pattern("");
        assert!(logger.pattern().is_default());
    }

    #[test]
    fn test_failing_sink_is_isolated() {
        let captured = Captured::default();
        let logger = Logger::builder()
            .pattern("{msg}")
            .sink(AlwaysFails)
            .sink(captured.clone())
            .build();

        logger.error("first", &[]);
        logger.error("second", &[]);

        assert_eq!(captured.lines(), vec!["first\n", "second\n"]);
        assert_eq!(logger.metrics().sink_failures(), 2);
    }

    #[test]
    fn test_add_sink_after_logging_started() {
        let early = Captured::default();
        let late = Captured::default();
        let logger = Logger::builder().pattern("{msg}").sink(early.clone()).build();

        logger.info("one", &[]);
        logger.add_sink(Box::new(late.clone()));
        logger.info("two", &[]);

        assert_eq!(early.lines(), vec!["one\n", "two\n"]);
        assert_eq!(late.lines(), vec!["two\n"]);
        assert_eq!(logger.sink_names(), vec!["captured", "captured"]);
    }

    #[test]
    fn test_async_logger_flush_delivers_in_order() {
        let captured = Captured::default();
        let logger = Logger::builder()
            .pattern("{msg}")
            .async_mode(16)
            .pool(Arc::new(WorkerPool::new(2)))
            .sink(captured.clone())
            .build();

        for i in 0..100 {
            logger.info("{}", &[&i]);
        }
        logger.flush().unwrap();

        let expected: Vec<String> = (0..100).map(|i| format!("{}\n", i)).collect();
        assert_eq!(captured.lines(), expected);
        assert_eq!(logger.pending(), 0);
    }

    #[test]
    fn test_async_pattern_snapshot_taken_at_call() {
        let captured = Captured::default();
        let logger = Logger::builder()
            .pattern("{msg}")
            .async_mode(16)
            .pool(Arc::new(WorkerPool::new(1)))
            .sink(captured.clone())
            .build();

        logger.info("before", &[]);
        logger.set_pattern("{lvl}{msg}");
        logger.info("after", &[]);
        logger.flush().unwrap();

        assert_eq!(captured.lines(), vec!["before\n", "[INFO] after\n"]);
    }

    #[test]
    fn test_shutdown_reports_success() {
        let captured = Captured::default();
        let logger = Logger::builder()
            .async_mode(8)
            .pool(Arc::new(WorkerPool::new(1)))
            .sink(captured.clone())
            .build();

        logger.warn("bye", &[]);
        assert!(logger.shutdown(Duration::from_secs(5)));
        assert_eq!(captured.lines().len(), 1);
    }

    #[test]
    fn test_mode_reporting() {
        let logger = Logger::with_async("a", 64);
        assert_eq!(logger.mode(), DispatchMode::Async { queue_capacity: 64 });
        assert!(logger.pool().is_some());

        let logger = Logger::new("b");
        assert_eq!(logger.mode(), DispatchMode::Blocking);
        assert!(logger.pool().is_none());
    }

    #[test]
    fn test_custom_overflow_postfix() {
        let captured = Captured::default();
        let logger = Logger::builder()
            .pattern("{msg}")
            .overflow_postfix("~")
            .sink(captured.clone())
            .build();

        let long = "z".repeat(500);
        logger.info("{}", &[&long]);

        let lines = captured.lines();
        assert!(lines[0].ends_with("~\n"));
        assert_eq!(logger.metrics().truncated(), 1);
    }
}
