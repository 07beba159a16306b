//! General-purpose background operations scheduler.
//!
//! Provides a priority-based task queue with configurable worker threads,
//! used here for per-shard WAL flush work and entropy-sampling follow-up
//! (migration execution). The dedicated prefetch pool in
//! `horizon-entanglement` is a separate, purpose-built pool — see
//! `DESIGN.md` for why prefetch does not share this scheduler.

use parking_lot::Mutex as ParkingMutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::error;

/// Priority levels for background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPriority {
    /// Deferrable work: migration execution, diagnostics.
    Low = 0,
    /// Per-shard WAL flush ticks.
    Normal = 1,
    /// Work that must not be delayed behind other pending tasks.
    High = 2,
}

/// Error returned when the task queue is full.
#[derive(Debug)]
pub struct BackpressureError;

impl std::fmt::Display for BackpressureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "background scheduler queue is full")
    }
}

impl std::error::Error for BackpressureError {}

/// Scheduler metrics snapshot.
pub struct SchedulerStats {
    /// Number of tasks waiting in the queue.
    pub queue_depth: usize,
    /// Number of tasks currently being executed by workers.
    pub active_tasks: usize,
    /// Total number of tasks completed since scheduler creation.
    pub tasks_completed: u64,
    /// Number of worker threads.
    pub worker_count: usize,
}

struct TaskEnvelope {
    priority: TaskPriority,
    sequence: u64,
    work: Box<dyn FnOnce() + Send>,
}

impl Eq for TaskEnvelope {}

impl PartialEq for TaskEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

// Higher priority first, then lower sequence (older) first.
impl Ord for TaskEnvelope {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority).then(other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for TaskEnvelope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct SchedulerInner {
    queue: ParkingMutex<BinaryHeap<TaskEnvelope>>,
    work_ready: parking_lot::Condvar,
    drain_cond: parking_lot::Condvar,
    shutdown: AtomicBool,
    sequence: AtomicU64,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    max_queue_depth: usize,
    tasks_completed: AtomicU64,
}

/// A general-purpose background task scheduler with priority ordering.
///
/// Tasks are executed by a fixed pool of worker threads. Higher-priority
/// tasks run first; within the same priority, tasks run in FIFO order.
pub struct BackgroundScheduler {
    inner: Arc<SchedulerInner>,
    workers: ParkingMutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
}

impl BackgroundScheduler {
    /// Create a new scheduler with the given number of worker threads.
    ///
    /// Workers are named `horizon-bg-0`, `horizon-bg-1`, etc.
    pub fn new(num_threads: usize, max_queue_depth: usize) -> Self {
        let inner = Arc::new(SchedulerInner {
            queue: ParkingMutex::new(BinaryHeap::new()),
            work_ready: parking_lot::Condvar::new(),
            drain_cond: parking_lot::Condvar::new(),
            shutdown: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            max_queue_depth,
            tasks_completed: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for i in 0..num_threads.max(1) {
            let inner_clone = Arc::clone(&inner);
            let handle = std::thread::Builder::new()
                .name(format!("horizon-bg-{i}"))
                .spawn(move || worker_loop(&inner_clone))
                .expect("failed to spawn background worker thread");
            workers.push(handle);
        }

        Self { inner, workers: ParkingMutex::new(workers), num_threads: num_threads.max(1) }
    }

    /// Submit a task to the background scheduler.
    ///
    /// Returns `Err(BackpressureError)` if the queue is at capacity or the
    /// scheduler has been shut down.
    pub fn submit(&self, priority: TaskPriority, work: impl FnOnce() + Send + 'static) -> Result<(), BackpressureError> {
        if self.inner.shutdown.load(AtomicOrdering::Acquire) {
            return Err(BackpressureError);
        }
        if self.inner.queue_depth.load(AtomicOrdering::Acquire) >= self.inner.max_queue_depth {
            return Err(BackpressureError);
        }

        let sequence = self.inner.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        let envelope = TaskEnvelope { priority, sequence, work: Box::new(work) };

        {
            let mut queue = self.inner.queue.lock();
            queue.push(envelope);
            self.inner.queue_depth.fetch_add(1, AtomicOrdering::Release);
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until all queued and in-flight tasks have completed. Workers
    /// remain running after drain completes.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queue_depth.load(AtomicOrdering::Acquire) > 0 || self.inner.active_tasks.load(AtomicOrdering::Acquire) > 0 {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Shut down the scheduler: signal workers to exit and join all threads.
    /// Workers drain remaining tasks before exiting.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, AtomicOrdering::Release);
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Return a snapshot of scheduler metrics.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queue_depth: self.inner.queue_depth.load(AtomicOrdering::Relaxed),
            active_tasks: self.inner.active_tasks.load(AtomicOrdering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(AtomicOrdering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

struct ActiveTaskGuard<'a> {
    inner: &'a SchedulerInner,
}

impl<'a> Drop for ActiveTaskGuard<'a> {
    fn drop(&mut self) {
        let prev_active = self.inner.active_tasks.fetch_sub(1, AtomicOrdering::Release);
        self.inner.tasks_completed.fetch_add(1, AtomicOrdering::Relaxed);

        if prev_active == 1 && self.inner.queue_depth.load(AtomicOrdering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &SchedulerInner) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop() {
                    inner.queue_depth.fetch_sub(1, AtomicOrdering::Release);
                    inner.active_tasks.fetch_add(1, AtomicOrdering::Release);
                    break task;
                }
                if inner.shutdown.load(AtomicOrdering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };
        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task.work)) {
            error!("background task panicked: {:?}", e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)"));
        }
    }
}

/// A flag-plus-condvar a periodic thread can sleep against, so shutdown
/// wakes it immediately instead of waiting out the rest of its tick.
pub struct ShutdownSignal {
    stopped: ParkingMutex<bool>,
    cond: parking_lot::Condvar,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        ShutdownSignal { stopped: ParkingMutex::new(false), cond: parking_lot::Condvar::new() }
    }
}

impl ShutdownSignal {
    /// Sleep for `dur`, or less if `stop` is called concurrently. Returns
    /// `true` if the sleep ran to completion, `false` if stopped early.
    pub fn sleep(&self, dur: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if *stopped {
            return false;
        }
        let result = self.cond.wait_for(&mut stopped, dur);
        result.timed_out() && !*stopped
    }

    /// Signal every waiter to wake immediately and stay stopped thereafter.
    pub fn stop(&self) {
        let mut stopped = self.stopped.lock();
        *stopped = true;
        self.cond.notify_all();
    }

    /// True once `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }
}
