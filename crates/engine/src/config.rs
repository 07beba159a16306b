//! Engine configuration (`spec.md` §6 "Configuration").
//!
//! A programmatic builder, not a file loader — reading config from disk
//! (YAML/TOML/etc.) is explicitly out of scope.

use std::path::PathBuf;

use horizon_cache::HorizonCapacities;
use horizon_core::{HorizonError, Limits, Result};
use horizon_entanglement::EntanglementRule;
use horizon_entropy::EntropyConfig;
use horizon_storage::RoutingPolicy;
use horizon_wal::DurabilityMode;

/// Maximum number of shards a single engine may be configured with
/// (`spec.md` §6 "must be > 0 and <= 1024").
pub const MAX_SHARDS: u16 = 1024;

/// Tunables for the entangled-key prefetch pool (`spec.md` §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefetchConfig {
    /// Worker threads dedicated to running prefetch fetches.
    pub threads: usize,
    /// Total in-flight-plus-queued prefetch jobs the pool admits.
    pub capacity: usize,
    /// Per-prefetch deadline.
    pub individual_deadline: std::time::Duration,
    /// Deadline across an entire `quantum_get` prefetch batch.
    pub collective_deadline: std::time::Duration,
    /// Upper bound on related keys considered per `quantum_get` call.
    pub max_fanout: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        PrefetchConfig {
            threads: 4,
            capacity: 256,
            individual_deadline: std::time::Duration::from_millis(2),
            collective_deadline: std::time::Duration::from_millis(5),
            max_fanout: 8,
        }
    }
}

/// Configuration for one [`crate::Engine`] instance.
///
/// Constructed with [`EngineConfig::new`] and refined with the builder
/// methods, mirroring `DatabaseBuilder`'s `.path()`/`.cache()`/`.open()`
/// chain rather than reading from an external file.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    num_shards: u16,
    data_root: PathBuf,
    durability: DurabilityMode,
    limits: Limits,
    cache_capacities: HorizonCapacities,
    routing_policy: RoutingPolicy,
    entanglement_rules: Vec<EntanglementRule>,
    entropy: EntropyConfig,
    prefetch: PrefetchConfig,
    background_threads: usize,
    background_queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let num_shards = std::thread::available_parallelism().map(|n| n.get() as u16).unwrap_or(4).min(MAX_SHARDS);
        EngineConfig {
            num_shards,
            data_root: PathBuf::from("./horizon-data"),
            durability: DurabilityMode::default(),
            limits: Limits::default(),
            cache_capacities: HorizonCapacities::default(),
            routing_policy: RoutingPolicy::Hash,
            entanglement_rules: Vec::new(),
            entropy: EntropyConfig::default(),
            prefetch: PrefetchConfig::default(),
            background_threads: 2,
            background_queue_depth: 4096,
        }
    }
}

impl EngineConfig {
    /// Start from defaults: shard count equal to available parallelism,
    /// `./horizon-data`, grouped durability, hash routing, no entanglement
    /// rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the shard count.
    pub fn with_num_shards(mut self, num_shards: u16) -> Self {
        self.num_shards = num_shards;
        self
    }

    /// Override the data directory.
    pub fn with_data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    /// Override the WAL durability mode.
    pub fn with_durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }

    /// Override key/value/segment size limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Override per-tier cache capacities.
    pub fn with_cache_capacities(mut self, capacities: HorizonCapacities) -> Self {
        self.cache_capacities = capacities;
        self
    }

    /// Override the default routing policy for new keys.
    pub fn with_routing_policy(mut self, policy: RoutingPolicy) -> Self {
        self.routing_policy = policy;
        self
    }

    /// Replace the entanglement rule set.
    pub fn with_entanglement_rules(mut self, rules: Vec<EntanglementRule>) -> Self {
        self.entanglement_rules = rules;
        self
    }

    /// Override the entropy sampler's configuration.
    pub fn with_entropy_config(mut self, entropy: EntropyConfig) -> Self {
        self.entropy = entropy;
        self
    }

    /// Override the prefetch pool's sizing and deadlines.
    pub fn with_prefetch_config(mut self, prefetch: PrefetchConfig) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Override the background scheduler's worker count and queue depth.
    pub fn with_background_pool(mut self, threads: usize, queue_depth: usize) -> Self {
        self.background_threads = threads;
        self.background_queue_depth = queue_depth;
        self
    }

    /// Validate the configuration, returning `InvalidConfig` for anything
    /// out of range.
    pub fn validate(&self) -> Result<()> {
        if self.num_shards == 0 || self.num_shards > MAX_SHARDS {
            return Err(HorizonError::InvalidConfig(format!(
                "num_shards must be in 1..={MAX_SHARDS}, got {}",
                self.num_shards
            )));
        }
        for rule in &self.entanglement_rules {
            let _ = rule; // construction already validated strength/fanout
        }
        Ok(())
    }

    /// Configured shard count.
    pub fn num_shards(&self) -> u16 {
        self.num_shards
    }

    /// Configured data directory.
    pub fn data_root(&self) -> &std::path::Path {
        &self.data_root
    }

    /// Configured durability mode.
    pub fn durability(&self) -> DurabilityMode {
        self.durability
    }

    /// Configured size limits.
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Configured cache capacities.
    pub fn cache_capacities(&self) -> HorizonCapacities {
        self.cache_capacities
    }

    /// Configured default routing policy.
    pub fn routing_policy(&self) -> RoutingPolicy {
        self.routing_policy
    }

    /// Configured entanglement rules.
    pub fn entanglement_rules(&self) -> &[EntanglementRule] {
        &self.entanglement_rules
    }

    /// Configured entropy sampler settings.
    pub fn entropy(&self) -> EntropyConfig {
        self.entropy
    }

    /// Configured prefetch pool settings.
    pub fn prefetch(&self) -> PrefetchConfig {
        self.prefetch
    }

    /// Configured background scheduler sizing.
    pub fn background_pool(&self) -> (usize, usize) {
        (self.background_threads, self.background_queue_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pick_a_sane_shard_count() {
        let config = EngineConfig::new();
        assert!(config.num_shards() > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_shards_is_invalid() {
        let config = EngineConfig::new().with_num_shards(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn over_max_shards_is_invalid() {
        let config = EngineConfig::new().with_num_shards(MAX_SHARDS + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_overrides_are_observable() {
        let config = EngineConfig::new().with_num_shards(8).with_data_root("/tmp/horizon-test").with_routing_policy(RoutingPolicy::Locality);
        assert_eq!(config.num_shards(), 8);
        assert_eq!(config.data_root(), std::path::Path::new("/tmp/horizon-test"));
        assert_eq!(config.routing_policy(), RoutingPolicy::Locality);
    }
}
