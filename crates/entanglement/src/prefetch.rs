//! The bounded prefetch pool (`spec.md` §4.6 "Prefetch", §5 "Prefetches
//! run on a dedicated bounded pool so they cannot starve user
//! operations").
//!
//! Grounded on the same priority-queue-over-worker-threads shape as
//! `stratadb_engine::background::BackgroundScheduler`, simplified to a
//! plain FIFO (prefetch candidates already arrive pre-ordered by rule
//! strength, so no further reordering is needed here) and sized for
//! fire-and-forget jobs rather than scheduler-wide task management.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use horizon_core::Key;

use crate::registry::RelatedKey;

struct PoolInner {
    queue: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
    work_ready: Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active: AtomicUsize,
    capacity: usize,
    completed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time counters for the prefetch pool, surfaced in
/// `metrics()` (`spec.md` §4.6 "failed prefetches are counted in
/// metrics only").
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefetchPoolStats {
    /// Jobs waiting to run.
    pub queue_depth: usize,
    /// Jobs currently executing.
    pub active: usize,
    /// Jobs that have finished (successfully or not) since the pool was
    /// created.
    pub completed: u64,
    /// Candidates that could not be scheduled at all because the pool
    /// was at capacity (counted, never surfaced as an error — `spec.md`
    /// §7 "Prefetch errors are always swallowed and counted").
    pub dropped: u64,
}

/// A fixed-size worker pool dedicated to prefetch jobs, independent of
/// the engine's WAL-flush and entropy-sampling background work so a
/// burst of prefetches can never delay a user-initiated operation.
pub struct PrefetchPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PrefetchPool {
    /// Spawn `num_threads` workers backed by a queue bounded at
    /// `capacity` in-flight-plus-queued jobs.
    pub fn new(num_threads: usize, capacity: usize) -> Self {
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            capacity,
            completed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });

        let workers = (0..num_threads.max(1))
            .map(|i| {
                let inner = Arc::clone(&inner);
                std::thread::Builder::new()
                    .name(format!("horizon-prefetch-{i}"))
                    .spawn(move || worker_loop(&inner))
                    .expect("failed to spawn prefetch worker thread")
            })
            .collect();

        PrefetchPool { inner, workers: Mutex::new(workers) }
    }

    /// How many more jobs can be accepted right now without blocking,
    /// i.e. `capacity - (queued + active)` (`spec.md` §4.6
    /// "N = min(max_fanout, available_slots)").
    pub fn available_slots(&self) -> usize {
        let occupied = self.inner.queue_depth.load(Ordering::Acquire) + self.inner.active.load(Ordering::Acquire);
        self.inner.capacity.saturating_sub(occupied)
    }

    /// Attempt to enqueue a job; returns `false` (and bumps `dropped`)
    /// if the pool is shut down or at capacity.
    pub fn try_submit(&self, job: impl FnOnce() + Send + 'static) -> bool {
        if self.inner.shutdown.load(Ordering::Acquire) || self.available_slots() == 0 {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let mut queue = self.inner.queue.lock();
        queue.push_back(Box::new(job));
        self.inner.queue_depth.fetch_add(1, Ordering::Release);
        self.inner.work_ready.notify_one();
        true
    }

    /// Snapshot current pool counters.
    pub fn stats(&self) -> PrefetchPoolStats {
        PrefetchPoolStats {
            queue_depth: self.inner.queue_depth.load(Ordering::Relaxed),
            active: self.inner.active.load(Ordering::Relaxed),
            completed: self.inner.completed.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
        }
    }

    /// Signal shutdown and join every worker thread. Jobs already queued
    /// are drained before workers exit.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let job = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    inner.queue_depth.fetch_sub(1, Ordering::Release);
                    inner.active.fetch_add(1, Ordering::Release);
                    break job;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job));
        inner.active.fetch_sub(1, Ordering::Release);
        inner.completed.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for PrefetchPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run a bounded, deadline-aware prefetch pass over `candidates`
/// (already ranked by [`crate::registry::Registry::resolve`]),
/// returning whatever values arrived before the collective deadline.
///
/// `fetch` is the engine's internal `get` path called with
/// `consistency = CachedOk` (`spec.md` §4.6); it is expected to populate
/// the cache tiers as a side effect regardless of whether this call
/// waits for it to finish, since a prefetch that misses its deadline is
/// merely *abandoned* by the caller, not cancelled (`spec.md` §4.6
/// "Expired prefetches are abandoned but may still populate caches if
/// they complete afterward").
///
/// `fetch` returns whatever payload the caller needs per key — plain
/// `Value`, or `Value` paired with provenance (e.g. cache vs. shard) —
/// this function only ever moves it from worker thread to caller.
pub fn run_prefetch<F, T>(
    pool: &PrefetchPool,
    candidates: Vec<RelatedKey>,
    max_fanout: usize,
    individual_deadline: Duration,
    collective_deadline: Duration,
    fetch: F,
) -> HashMap<Key, T>
where
    F: Fn(&Key) -> Option<T> + Send + Sync + 'static,
    T: Send + 'static,
{
    let fetch = Arc::new(fetch);
    let budget = max_fanout.min(pool.available_slots());
    let (tx, rx) = mpsc::channel::<(Key, Option<T>)>();

    let mut scheduled = 0usize;
    for candidate in candidates.into_iter().take(budget) {
        let key = candidate.key;
        let fetch = Arc::clone(&fetch);
        let tx = tx.clone();
        let submitted = pool.try_submit(move || {
            let result = fetch(&key);
            let _ = tx.send((key, result));
        });
        if submitted {
            scheduled += 1;
        } else {
            break;
        }
    }
    drop(tx);

    let start = Instant::now();
    let mut results = HashMap::new();
    for _ in 0..scheduled {
        let remaining = collective_deadline.checked_sub(start.elapsed()).unwrap_or_default();
        if remaining.is_zero() {
            break;
        }
        let wait = individual_deadline.min(remaining);
        match rx.recv_timeout(wait) {
            Ok((key, Some(value))) => {
                results.insert(key, value);
            }
            Ok((_key, None)) => {}
            Err(_) => break,
        }
    }
    results
}
