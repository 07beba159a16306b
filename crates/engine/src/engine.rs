//! The public engine facade (`spec.md` §4 "Engine Facade").
//!
//! `Engine` ties every module together: shard table, router, cache,
//! entanglement registry, prefetch pool, entropy monitor, and the
//! background scheduler driving WAL flush ticks and recommended
//! migrations.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use horizon_cache::{EventHorizon, HorizonSnapshot, LookupSource as CacheLookupSource};
use horizon_core::{Consistency, GetOptions, HorizonError, Key, PutOptions, Result, Value};
use horizon_entanglement::{run_prefetch, PrefetchPool, Registry};
use horizon_entropy::{EntropyMonitor, EntropyReport};
use horizon_storage::{execute_migration, MigrationIdAllocator, Router, Shard};

use crate::background::{BackgroundScheduler, ShutdownSignal, TaskPriority};
use crate::config::EngineConfig;
use crate::manifest::{self, Manifest};
use crate::metrics::{self, MetricsSnapshot, WalMetrics};
use crate::recovery;

/// Where a value returned by `get`/`quantum_get` actually came from.
///
/// `horizon_cache::LookupSource` distinguishes only cache-hit-or-not; the
/// engine facade additionally distinguishes a cache miss that was
/// resolved by the shard from one that found nothing at all, since
/// `quantum_get`'s `sources` map needs all three (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Served from a cache tier.
    Cache,
    /// Served from the owning shard (cache missed or was bypassed).
    Shard,
    /// Not found anywhere.
    Miss,
}

/// Result of a `put`.
#[derive(Debug, Clone, Copy)]
pub struct PutOutcome {
    /// Shard the key was written to.
    pub shard_id: u16,
    /// Wall-clock time the operation took.
    pub elapsed: Duration,
}

/// Result of a `get`.
#[derive(Debug, Clone)]
pub struct GetOutcome {
    /// The value, if found.
    pub value: Option<Value>,
    /// Shard the key routes to.
    pub shard_id: u16,
    /// Where the value (or miss) was resolved from.
    pub source: Source,
    /// Wall-clock time the operation took.
    pub elapsed: Duration,
}

/// Result of a `delete`.
#[derive(Debug, Clone, Copy)]
pub struct DeleteOutcome {
    /// True if a record was actually removed.
    pub deleted: bool,
    /// Shard the key routed to.
    pub shard_id: u16,
    /// Wall-clock time the operation took.
    pub elapsed: Duration,
}

/// Result of a `quantum_get` (`spec.md` §4.6).
#[derive(Debug, Clone)]
pub struct QuantumGetOutcome {
    /// The primary key's value, if found.
    pub primary: Option<Value>,
    /// Values opportunistically prefetched for related keys that arrived
    /// before the collective deadline.
    pub related: std::collections::HashMap<Key, Value>,
    /// Where every key involved (primary plus related) was resolved from.
    pub sources: std::collections::HashMap<Key, Source>,
    /// Wall-clock time the whole call took, including prefetch.
    pub elapsed: Duration,
}

/// A running horizon engine: the entry point applications use.
pub struct Engine {
    shards: Vec<Arc<Shard>>,
    router: Router,
    cache: EventHorizon,
    entanglement: Registry,
    prefetch_pool: PrefetchPool,
    entropy_monitor: EntropyMonitor,
    background: BackgroundScheduler,
    migration_ids: MigrationIdAllocator,
    config: EngineConfig,
    data_root: PathBuf,
    manifest: Manifest,
    shutdown: AtomicBool,
    last_entropy: RwLock<EntropyReport>,
    tick_signal: Arc<ShutdownSignal>,
    ticker_handles: parking_lot::Mutex<Vec<std::thread::JoinHandle<()>>>,
}

impl Engine {
    /// Open an engine rooted at `config.data_root()`, recovering any
    /// existing shards and validating (or writing) the manifest.
    pub fn open(config: EngineConfig) -> Result<Arc<Engine>> {
        config.validate()?;

        let data_root = config.data_root().to_path_buf();
        let manifest = manifest::open_or_create(&data_root, config.num_shards())?;

        let shards = recovery::recover_all(&data_root, config.num_shards(), config.limits(), config.durability())?;

        let router = Router::new(config.routing_policy(), config.num_shards());
        // Overrides recorded by `override_shard` puts, `LoadBalanced`/
        // `Gravitational` placement, and migrations live only in memory;
        // rebuild them from where each key actually resides on disk
        // before the router serves a single route (`spec.md` §4.2).
        router.reconcile_overrides(&shards);
        let cache = EventHorizon::new(config.cache_capacities());
        let entanglement = Registry::new(config.entanglement_rules().to_vec());
        let prefetch = config.prefetch();
        let prefetch_pool = PrefetchPool::new(prefetch.threads, prefetch.capacity);
        let entropy_monitor = EntropyMonitor::new(config.entropy());
        let (bg_threads, bg_queue_depth) = config.background_pool();
        let background = BackgroundScheduler::new(bg_threads, bg_queue_depth);
        let migration_ids = MigrationIdAllocator::default();

        // Seed router masses and key counts from whatever each shard
        // carried across the restart, so `LoadBalanced`/`Gravitational`
        // routing doesn't start out blind to pre-crash load.
        router.update_masses(shards.iter().map(|s| s.mass().get()).collect());
        router.update_counts(shards.iter().map(|s| s.len()).collect());

        let engine = Arc::new(Engine {
            shards,
            router,
            cache,
            entanglement,
            prefetch_pool,
            entropy_monitor,
            background,
            migration_ids,
            config,
            data_root,
            manifest,
            shutdown: AtomicBool::new(false),
            last_entropy: RwLock::new(EntropyReport {
                shannon: 1.0,
                imbalance_score: 0.0,
                hot_shards: Vec::new(),
                cold_shards: Vec::new(),
                recommend_rebalance: false,
            }),
            tick_signal: Arc::new(ShutdownSignal::default()),
            ticker_handles: parking_lot::Mutex::new(Vec::new()),
        });

        engine.spawn_tickers();
        Ok(engine)
    }

    fn spawn_tickers(self: &Arc<Self>) {
        let mut handles = Vec::new();

        let entropy_engine = Arc::clone(self);
        let entropy_signal = Arc::clone(&self.tick_signal);
        let sample_interval = Duration::from_millis(self.config.entropy().sample_interval_ms);
        handles.push(
            std::thread::Builder::new()
                .name("horizon-entropy-tick".into())
                .spawn(move || {
                    while entropy_signal.sleep(sample_interval) {
                        entropy_engine.run_entropy_tick();
                    }
                })
                .expect("failed to spawn entropy ticker thread"),
        );

        if !matches!(self.config.durability(), horizon_wal::DurabilityMode::Sync) {
            let flush_engine = Arc::clone(self);
            let flush_signal = Arc::clone(&self.tick_signal);
            // Half the entropy sampling period keeps the WAL's unsynced
            // backlog bounded without adding a second config knob.
            let flush_interval = (sample_interval / 2).max(Duration::from_millis(50));
            handles.push(
                std::thread::Builder::new()
                    .name("horizon-wal-flush-tick".into())
                    .spawn(move || {
                        while flush_signal.sleep(flush_interval) {
                            flush_engine.run_wal_flush_tick();
                        }
                    })
                    .expect("failed to spawn wal flush ticker thread"),
            );
        }

        *self.ticker_handles.lock() = handles;
    }

    fn run_entropy_tick(self: &Arc<Self>) {
        let (snapshot, report) = self.entropy_monitor.sample(&self.shards);

        // Mass is the router's Gravitational placement signal (`spec.md`
        // §4.2); keep it current with each shard's just-sampled activity
        // so that policy actually tracks load rather than staying at its
        // all-zero initial value forever. `LoadBalanced` routes by data
        // count instead, refreshed from the same tick.
        let weights = self.entropy_monitor.config().weights;
        for (shard, load) in self.shards.iter().zip(snapshot.per_shard.iter()) {
            shard.mass().set(weights.activity(load) as f32);
        }
        self.router.update_masses(self.shards.iter().map(|s| s.mass().get()).collect());
        self.router.update_counts(self.shards.iter().map(|s| s.len()).collect());
        *self.last_entropy.write() = report.clone();

        if report.recommend_rebalance {
            let tasks = self.entropy_monitor.recommend_migrations(&self.shards, &report);
            for task in tasks {
                let engine = Arc::clone(self);
                let _ = self.background.submit(TaskPriority::Low, move || {
                    if let Err(err) = execute_migration(&task, &engine.shards, &engine.router, &engine.migration_ids) {
                        tracing::warn!(error = %err, key = %task.key, "recommended migration failed");
                    }
                });
            }
            self.entropy_monitor.mark_rebalanced();
        }
    }

    fn run_wal_flush_tick(&self) {
        for shard in &self.shards {
            let shard = Arc::clone(shard);
            let _ = self.background.submit(TaskPriority::Normal, move || {
                if let Err(err) = shard.flush_wal() {
                    tracing::warn!(error = %err, shard = shard.id(), "background wal flush failed");
                }
            });
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(HorizonError::Shutdown);
        }
        Ok(())
    }

    fn shard_for(&self, key: &Key, override_shard: Option<u16>) -> Result<u16> {
        match override_shard {
            Some(id) => {
                if id as usize >= self.shards.len() {
                    return Err(HorizonError::ShardUnavailable(format!("shard {id} out of range")));
                }
                self.router.record_override(key.clone(), id);
                Ok(id)
            }
            None => Ok(self.router.route(key)),
        }
    }

    /// Write `key` -> `value`, WAL-first on its owning shard, then
    /// write-through to the cache unless `skip_cache` is set.
    pub fn put(&self, key: Key, value: Value, opts: PutOptions) -> Result<PutOutcome> {
        let start = Instant::now();
        self.ensure_open()?;

        let limits = self.config.limits();
        if key.len() > limits.max_key_bytes {
            return Err(HorizonError::KeyTooLarge { len: key.len(), max: limits.max_key_bytes });
        }
        if value.len() > limits.max_value_bytes {
            return Err(HorizonError::ValueTooLarge { len: value.len(), max: limits.max_value_bytes });
        }

        let shard_id = self.shard_for(&key, opts.override_shard)?;
        let tier_hint = opts.access_pattern.resolve();
        let shard = &self.shards[shard_id as usize];
        shard.put(key.clone(), value.clone(), tier_hint)?;

        if !opts.skip_cache {
            self.cache.put(key, value, tier_hint);
        }

        Ok(PutOutcome { shard_id, elapsed: start.elapsed() })
    }

    /// Read `key`. `CachedOk` tries the cache first; `Latest` (the
    /// default) always reads the owning shard, backfilling the cache
    /// afterward.
    pub fn get(&self, key: &Key, opts: GetOptions) -> Result<GetOutcome> {
        let start = Instant::now();
        self.ensure_open()?;

        let shard_id = self.router.route(key);

        if opts.consistency == Consistency::CachedOk {
            let (value, source) = self.cache.get(key, opts.consistency);
            if let CacheLookupSource::Cache = source {
                return Ok(GetOutcome { value, shard_id, source: Source::Cache, elapsed: start.elapsed() });
            }
        }

        let shard = &self.shards[shard_id as usize];
        let record = shard.get(key);
        match record {
            Some(record) => {
                self.cache.put(key.clone(), record.value.clone(), record.tier_hint);
                Ok(GetOutcome { value: Some(record.value), shard_id, source: Source::Shard, elapsed: start.elapsed() })
            }
            None => Ok(GetOutcome { value: None, shard_id, source: Source::Miss, elapsed: start.elapsed() }),
        }
    }

    /// Remove `key` from its owning shard and invalidate any cached copy.
    pub fn delete(&self, key: &Key) -> Result<DeleteOutcome> {
        let start = Instant::now();
        self.ensure_open()?;

        let shard_id = self.router.route(key);
        let shard = &self.shards[shard_id as usize];
        let removed = shard.delete(key)?;
        self.cache.invalidate(key);

        Ok(DeleteOutcome { deleted: removed.is_some(), shard_id, elapsed: start.elapsed() })
    }

    /// Read `key`, then opportunistically prefetch its entangled related
    /// keys on the dedicated prefetch pool (`spec.md` §4.6).
    ///
    /// Only keys that complete before `collective_deadline` are returned
    /// in `related`; slower fetches are abandoned for this call but may
    /// still land in the cache once they finish.
    pub fn quantum_get(self: &Arc<Self>, key: &Key) -> Result<QuantumGetOutcome> {
        let start = Instant::now();
        let primary = self.get(key, GetOptions { consistency: Consistency::Latest, prefetch: true, deadline: None })?;

        let mut sources = std::collections::HashMap::new();
        sources.insert(key.clone(), primary.source);

        let candidates = self.entanglement.resolve(key);
        let prefetch = self.config.prefetch();

        let engine = Arc::clone(self);
        let fetched = run_prefetch(
            &self.prefetch_pool,
            candidates,
            prefetch.max_fanout,
            prefetch.individual_deadline,
            prefetch.collective_deadline,
            move |related_key| {
                let (value, cache_source) = engine.cache.get(related_key, Consistency::CachedOk);
                if let CacheLookupSource::Cache = cache_source {
                    return value.map(|v| (v, Source::Cache));
                }
                let shard_id = engine.router.route(related_key);
                let shard = &engine.shards[shard_id as usize];
                match shard.get(related_key) {
                    Some(record) => {
                        engine.cache.put(related_key.clone(), record.value.clone(), record.tier_hint);
                        Some((record.value, Source::Shard))
                    }
                    None => None,
                }
            },
        );

        let mut related = std::collections::HashMap::with_capacity(fetched.len());
        for (related_key, (value, resolved_source)) in fetched {
            sources.insert(related_key.clone(), resolved_source);
            related.insert(related_key, value);
        }

        Ok(QuantumGetOutcome { primary: primary.value, related, sources, elapsed: start.elapsed() })
    }

    /// Snapshot every metrics surface: per-shard counters, cache
    /// occupancy, WAL backlog, and the most recent entropy report
    /// (`spec.md` §6 "Metrics surface").
    pub fn metrics(&self) -> MetricsSnapshot {
        let shards: Vec<_> = self.shards.iter().map(|s| metrics::shard_metrics(s)).collect();
        let wal = WalMetrics { shards: self.shards.iter().map(|s| metrics::shard_wal_metrics(s)).collect() };
        let cache: HorizonSnapshot = self.cache.snapshot();
        let entropy = self.last_entropy.read().clone();
        MetricsSnapshot { shards, cache, wal, entropy }
    }

    /// This engine's configured manifest (shard count, format version,
    /// creation time).
    pub fn manifest(&self) -> Manifest {
        self.manifest
    }

    /// The data directory this engine was opened against.
    pub fn data_root(&self) -> &std::path::Path {
        &self.data_root
    }

    /// Configured number of shards.
    pub fn num_shards(&self) -> u16 {
        self.shards.len() as u16
    }

    /// Stop accepting new operations, flush every shard's WAL, and join
    /// all background threads.
    pub fn close(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        self.tick_signal.stop();
        for handle in self.ticker_handles.lock().drain(..) {
            let _ = handle.join();
        }
        self.background.drain();
        self.background.shutdown();
        self.prefetch_pool.shutdown();

        for shard in &self.shards {
            shard.flush_wal()?;
        }
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.tick_signal.stop();
            for handle in self.ticker_handles.lock().drain(..) {
                let _ = handle.join();
            }
            self.background.shutdown();
            self.prefetch_pool.shutdown();
            for shard in &self.shards {
                let _ = shard.flush_wal();
            }
        }
    }
}
