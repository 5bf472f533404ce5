//! Delivery of rendered messages
//!
//! [`SinkSet`] fans a message out to a logger's sinks in insertion order with
//! per-sink failure and panic isolation. [`AsyncQueue`] is the queued strategy:
//! a bounded per-logger FIFO drained by at most one pool job at a time, which
//! is what keeps a single logger's output in call order.

use super::error::{LoggerError, Result};
use super::formatter::Formatter;
use super::metrics::LoggerMetrics;
use super::record::{LogMessage, OwnedRecord};
use super::sink::Sink;
use super::worker_pool::WorkerPool;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Report the first failure and every 1000th after it
const FAILURE_REPORT_INTERVAL: u64 = 1000;

/// Whether a failure should reach stderr, given how many came before it
pub(crate) fn should_report(previous_failures: u64) -> bool {
    previous_failures == 0 || (previous_failures + 1) % FAILURE_REPORT_INTERVAL == 0
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

pub(crate) struct SinkSet {
    sinks: Mutex<Vec<Box<dyn Sink>>>,
    metrics: Arc<LoggerMetrics>,
}

impl SinkSet {
    pub(crate) fn new(metrics: Arc<LoggerMetrics>) -> Self {
        Self {
            sinks: Mutex::new(Vec::new()),
            metrics,
        }
    }

    pub(crate) fn push(&self, sink: Box<dyn Sink>) {
        self.sinks.lock().push(sink);
    }

    pub(crate) fn len(&self) -> usize {
        self.sinks.lock().len()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.sinks.lock().iter().map(|s| s.name().to_string()).collect()
    }

    /// Detach every sink. A queue job that still holds the set afterwards
    /// sees it empty.
    pub(crate) fn take_all(&self) -> Vec<Box<dyn Sink>> {
        std::mem::take(&mut *self.sinks.lock())
    }

    /// Hand `message` to every sink. A failing or panicking sink is reported
    /// and skipped; the remaining sinks still receive the message.
    pub(crate) fn dispatch(&self, message: &LogMessage<'_>) {
        let mut sinks = self.sinks.lock();
        let mut has_error = false;

        for (idx, sink) in sinks.iter_mut().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| sink.write(message)));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if should_report(self.metrics.sink_failures()) {
                        eprintln!("[LOGGER ERROR] Sink #{} ({}) failed: {}", idx, sink.name(), e);
                    }
                    has_error = true;
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Sink #{} panicked: {}. \
                         Other sinks continue to function.",
                        idx,
                        panic_message(panic_info.as_ref())
                    );
                    has_error = true;
                }
            }
        }

        if message.is_truncated() {
            self.metrics.record_truncated();
        }
        if has_error {
            self.metrics.record_sink_failure();
        } else {
            self.metrics.record_dispatched();
        }
    }

    /// Flush every sink, returning the first error after all were attempted
    pub(crate) fn flush_all(&self) -> Result<()> {
        let mut sinks = self.sinks.lock();
        let mut first_error = None;

        for (idx, sink) in sinks.iter_mut().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| sink.flush())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(panic_info) => {
                    let msg = panic_message(panic_info.as_ref());
                    eprintln!("[LOGGER CRITICAL] Sink #{} panicked during flush: {}", idx, msg);
                    first_error.get_or_insert(LoggerError::other(format!(
                        "sink #{} panicked during flush: {}",
                        idx, msg
                    )));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// A captured record plus the formatter snapshot it must be rendered with
pub(crate) struct QueuedRecord {
    pub(crate) record: OwnedRecord,
    pub(crate) formatter: Formatter,
}

struct QueueState {
    sender: Sender<QueuedRecord>,
    receiver: Receiver<QueuedRecord>,
    /// Set while a drain job is queued on or running in the pool
    scheduled: AtomicBool,
    progress: Mutex<Progress>,
    idle: Condvar,
    sinks: Arc<SinkSet>,
    metrics: Arc<LoggerMetrics>,
}

#[derive(Default)]
struct Progress {
    /// Submitted records not yet dispatched
    pending: usize,
    /// Drain jobs handed to the pool that have not returned
    jobs: usize,
}

impl Progress {
    fn is_idle(&self) -> bool {
        self.pending == 0 && self.jobs == 0
    }
}

impl QueueState {
    /// Body of one pool job. The job counts as running until this returns,
    /// so waiters never see the queue idle while sinks are still in use.
    fn run_job(&self) {
        self.drain();

        let mut progress = self.progress.lock();
        progress.jobs = progress.jobs.saturating_sub(1);
        if progress.is_idle() {
            self.idle.notify_all();
        }
    }

    fn drain(&self) {
        loop {
            while let Ok(queued) = self.receiver.try_recv() {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    let QueuedRecord {
                        record,
                        mut formatter,
                    } = queued;
                    let message = formatter.render(&record.as_record());
                    self.sinks.dispatch(&message);
                }));
                if let Err(panic_info) = outcome {
                    eprintln!(
                        "[LOGGER CRITICAL] Rendering a queued record panicked: {}",
                        panic_message(panic_info.as_ref())
                    );
                }
                self.complete_one();
            }

            // Queue ran dry: push buffered output out, then stand down
            if let Err(e) = self.sinks.flush_all() {
                let previous = self.metrics.record_flush_failure();
                if should_report(previous) {
                    eprintln!(
                        "[LOGGER ERROR] Idle flush failed (failure #{}): {}",
                        previous + 1,
                        e
                    );
                }
            }

            self.scheduled.store(false, Ordering::SeqCst);
            fence(Ordering::SeqCst);

            // A producer may have pushed after the last try_recv but seen the
            // flag still set; take the job back unless someone else already has.
            if self.receiver.is_empty() || self.scheduled.swap(true, Ordering::SeqCst) {
                break;
            }
        }
    }

    fn complete_one(&self) {
        let mut progress = self.progress.lock();
        progress.pending = progress.pending.saturating_sub(1);
        if progress.is_idle() {
            self.idle.notify_all();
        }
    }
}

pub(crate) struct AsyncQueue {
    pool: Arc<WorkerPool>,
    state: Arc<QueueState>,
    capacity: usize,
}

impl AsyncQueue {
    pub(crate) fn new(
        pool: Arc<WorkerPool>,
        capacity: usize,
        sinks: Arc<SinkSet>,
        metrics: Arc<LoggerMetrics>,
    ) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            pool,
            state: Arc::new(QueueState {
                sender,
                receiver,
                scheduled: AtomicBool::new(false),
                progress: Mutex::new(Progress::default()),
                idle: Condvar::new(),
                sinks,
                metrics,
            }),
            capacity,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub(crate) fn pending(&self) -> usize {
        self.state.progress.lock().pending
    }

    /// Enqueue a record, waiting for space when the queue is full.
    pub(crate) fn submit(&self, queued: QueuedRecord) {
        self.state.progress.lock().pending += 1;

        match self.state.sender.try_send(queued) {
            Ok(()) => {}
            Err(TrySendError::Full(queued)) => {
                self.state.metrics.record_blocked_submission();
                self.schedule();
                // The queue state owns the receiver, so this only returns once
                // a drain job made room.
                if self.state.sender.send(queued).is_err() {
                    self.state.complete_one();
                    return;
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                self.state.complete_one();
                return;
            }
        }

        fence(Ordering::SeqCst);
        self.schedule();
    }

    fn schedule(&self) {
        if !self.state.scheduled.swap(true, Ordering::SeqCst) {
            self.state.progress.lock().jobs += 1;
            let state = Arc::clone(&self.state);
            self.pool.execute(move || state.run_job());
        }
    }

    /// Block until every submitted record has been dispatched and the drain
    /// job that wrote it has returned
    pub(crate) fn wait_idle(&self) {
        let mut progress = self.state.progress.lock();
        while !progress.is_idle() {
            self.state.idle.wait(&mut progress);
        }
    }

    /// Like [`wait_idle`](Self::wait_idle) but gives up after `timeout`.
    /// Returns whether the queue drained.
    pub(crate) fn wait_idle_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut progress = self.state.progress.lock();
        while !progress.is_idle() {
            if self.state.idle.wait_until(&mut progress, deadline).timed_out() {
                return progress.is_idle();
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::Level;
    use crate::core::pattern::Pattern;

    struct Collect(Arc<Mutex<Vec<String>>>);

    impl Sink for Collect {
        fn write(&mut self, message: &LogMessage<'_>) -> Result<()> {
            self.0.lock().push(message.to_string_lossy().into_owned());
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "collect"
        }
    }

    struct Broken;

    impl Sink for Broken {
        fn write(&mut self, _message: &LogMessage<'_>) -> Result<()> {
            Err(LoggerError::writer("broken pipe"))
        }
        fn flush(&mut self) -> Result<()> {
            Err(LoggerError::writer("broken pipe"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    struct Panicky;

    impl Sink for Panicky {
        fn write(&mut self, _message: &LogMessage<'_>) -> Result<()> {
            panic!("sink exploded");
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "panicky"
        }
    }

    #[test]
    fn test_failing_sinks_do_not_block_later_ones() {
        let metrics = Arc::new(LoggerMetrics::new());
        let set = SinkSet::new(Arc::clone(&metrics));
        let seen = Arc::new(Mutex::new(Vec::new()));

        set.push(Box::new(Broken));
        set.push(Box::new(Panicky));
        set.push(Box::new(Collect(Arc::clone(&seen))));

        set.dispatch(&LogMessage::new(Level::Info, b"still delivered\n"));

        assert_eq!(seen.lock().as_slice(), ["still delivered\n"]);
        assert_eq!(metrics.sink_failures(), 1);
        assert_eq!(metrics.dispatched(), 0);
        assert!(set.flush_all().is_err());
        assert_eq!(set.names(), vec!["broken", "panicky", "collect"]);
    }

    #[test]
    fn test_queue_preserves_order_and_drains() {
        let metrics = Arc::new(LoggerMetrics::new());
        let sinks = Arc::new(SinkSet::new(Arc::clone(&metrics)));
        let seen = Arc::new(Mutex::new(Vec::new()));
        sinks.push(Box::new(Collect(Arc::clone(&seen))));

        let pool = Arc::new(WorkerPool::new(4));
        let queue = AsyncQueue::new(pool, 8, Arc::clone(&sinks), Arc::clone(&metrics));
        let formatter = Formatter::new(Pattern::compile("{msg}").unwrap());

        for i in 0..200 {
            queue.submit(QueuedRecord {
                record: OwnedRecord {
                    level: Level::Info,
                    tag: Arc::from("q"),
                    format: "n={}".to_string(),
                    args: vec![i.to_string()],
                },
                formatter: formatter.fork(),
            });
        }
        queue.wait_idle();

        let expected: Vec<String> = (0..200).map(|i| format!("n={}\n", i)).collect();
        assert_eq!(*seen.lock(), expected);
        assert_eq!(queue.pending(), 0);
        assert_eq!(metrics.dispatched(), 200);
    }

    /// Flush takes a while and records when it finished
    struct SlowFlush(Arc<AtomicBool>);

    impl Sink for SlowFlush {
        fn write(&mut self, _message: &LogMessage<'_>) -> Result<()> {
            self.0.store(false, Ordering::SeqCst);
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            std::thread::sleep(Duration::from_millis(20));
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &str {
            "slow_flush"
        }
    }

    fn queued(n: usize, formatter: &Formatter) -> QueuedRecord {
        QueuedRecord {
            record: OwnedRecord {
                level: Level::Info,
                tag: Arc::from("q"),
                format: "n={}".to_string(),
                args: vec![n.to_string()],
            },
            formatter: formatter.fork(),
        }
    }

    #[test]
    fn test_report_first_and_every_thousandth() {
        assert!(should_report(0));
        assert!(!should_report(1));
        assert!(!should_report(998));
        assert!(should_report(999));
        assert!(!should_report(1000));
        assert!(should_report(1999));
    }

    #[test]
    fn test_wait_idle_covers_idle_flush() {
        let metrics = Arc::new(LoggerMetrics::new());
        let sinks = Arc::new(SinkSet::new(Arc::clone(&metrics)));
        let flushed = Arc::new(AtomicBool::new(false));
        sinks.push(Box::new(SlowFlush(Arc::clone(&flushed))));

        let queue = AsyncQueue::new(Arc::new(WorkerPool::new(2)), 8, sinks, metrics);
        let formatter = Formatter::new(Pattern::compile("{msg}").unwrap());

        for round in 0..20 {
            queue.submit(queued(round, &formatter));
            queue.wait_idle();
            assert!(flushed.load(Ordering::SeqCst), "round {} returned mid-flush", round);
        }
    }

    #[test]
    fn test_idle_flush_failures_are_counted() {
        let metrics = Arc::new(LoggerMetrics::new());
        let sinks = Arc::new(SinkSet::new(Arc::clone(&metrics)));
        sinks.push(Box::new(Broken));

        let queue = AsyncQueue::new(Arc::new(WorkerPool::new(1)), 8, sinks, Arc::clone(&metrics));
        let formatter = Formatter::new(Pattern::compile("{msg}").unwrap());

        for round in 0..50 {
            queue.submit(queued(round, &formatter));
            queue.wait_idle();
        }

        // Each round drains to empty and runs one idle flush
        assert_eq!(metrics.flush_failures(), 50);
        assert!(!should_report(metrics.flush_failures() - 1));
    }

    #[test]
    fn test_take_all_empties_the_set() {
        let metrics = Arc::new(LoggerMetrics::new());
        let set = SinkSet::new(Arc::clone(&metrics));
        set.push(Box::new(Broken));
        set.push(Box::new(Panicky));

        let taken = set.take_all();
        assert_eq!(taken.len(), 2);
        assert_eq!(set.len(), 0);
        assert!(set.flush_all().is_ok());

        set.dispatch(&LogMessage::new(Level::Info, b"nobody listens\n"));
        assert_eq!(metrics.sink_failures(), 0);
    }

    #[test]
    fn test_wait_idle_for_on_empty_queue() {
        let metrics = Arc::new(LoggerMetrics::new());
        let sinks = Arc::new(SinkSet::new(Arc::clone(&metrics)));
        let queue = AsyncQueue::new(Arc::new(WorkerPool::new(1)), 4, sinks, metrics);
        assert!(queue.wait_idle_for(Duration::from_millis(10)));
        assert_eq!(queue.capacity(), 4);
    }
}
