//! Process-wide worker pool for async loggers
//!
//! A fixed set of threads consuming one bounded job queue. The pool knows
//! nothing about logging: it runs boxed closures. [`WorkerPool::global`]
//! creates the shared instance on first use; private pools can be built with
//! [`WorkerPool::new`].

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Jobs that may wait in the intake queue per worker before `execute` blocks
const QUEUE_SLOTS_PER_WORKER: usize = 256;

static GLOBAL_POOL: OnceLock<Arc<WorkerPool>> = OnceLock::new();

/// Number of workers used by the global pool
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

pub struct WorkerPool {
    sender: RwLock<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    workers: usize,
}

impl WorkerPool {
    /// Start a pool with `workers` threads (at least one)
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = bounded::<Job>(workers * QUEUE_SLOTS_PER_WORKER);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("blogger-worker-{}", idx))
                .spawn(move || Self::worker_loop(idx, receiver));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    eprintln!("[LOGGER ERROR] Failed to spawn worker thread #{}: {}", idx, e);
                }
            }
        }

        // With no thread running, jobs are executed by the submitting thread
        let sender = if handles.is_empty() { None } else { Some(sender) };

        Self {
            sender: RwLock::new(sender),
            workers: handles.len(),
            handles: Mutex::new(handles),
        }
    }

    /// The process-wide pool, started on first call
    pub fn global() -> Arc<WorkerPool> {
        Arc::clone(GLOBAL_POOL.get_or_init(|| Arc::new(WorkerPool::new(default_worker_count()))))
    }

    /// Drain and stop the global pool, if it was ever started. Meant for the
    /// very end of `main`; async loggers keep working afterwards by running
    /// their jobs on the calling thread.
    pub fn shutdown_global() {
        if let Some(pool) = GLOBAL_POOL.get() {
            pool.shutdown();
        }
    }

    /// Live worker threads
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_running(&self) -> bool {
        self.sender.read().is_some()
    }

    /// Queue `job` for a worker, blocking while the intake queue is full.
    ///
    /// After [`shutdown`](Self::shutdown) the job runs on the calling thread
    /// instead, so submitted work is never lost.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.read().clone();
        match sender {
            Some(sender) => {
                if let Err(returned) = sender.send(Box::new(job)) {
                    (returned.into_inner())();
                }
            }
            None => job(),
        }
    }

    /// Stop accepting jobs, let workers finish everything already queued and
    /// join them. Idempotent.
    pub fn shutdown(&self) {
        drop(self.sender.write().take());

        let current = thread::current().id();
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if let Err(e) = handle.join() {
                eprintln!("[LOGGER ERROR] Worker thread panicked during shutdown: {:?}", e);
            }
        }
    }

    fn worker_loop(idx: usize, receiver: Receiver<Job>) {
        // recv fails only once every sender is gone and the queue is empty
        while let Ok(job) = receiver.recv() {
            if let Err(panic_info) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                eprintln!(
                    "[LOGGER CRITICAL] Job on worker #{} panicked: {}. Worker continues.",
                    idx, panic_msg
                );
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("running", &self.is_running())
            .finish()
    }
}
