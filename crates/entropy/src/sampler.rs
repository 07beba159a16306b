//! Pure Shannon-entropy load math (`spec.md` §4.7 "Algorithm").
//!
//! Kept free of any I/O or shard access so the normalization formula can
//! be property-tested in isolation (`spec.md` §8 "Entropy normalization").

/// One shard's raw activity counters for a sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShardLoad {
    /// Reads observed during the window.
    pub reads: u64,
    /// Writes (puts) observed during the window.
    pub writes: u64,
    /// Resident key+value bytes at the end of the window.
    pub bytes: u64,
}

/// A point-in-time read of every shard's load, as returned by
/// [`crate::monitor::EntropyMonitor::sample`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSnapshot {
    /// Per-shard load, indexed by shard id.
    pub per_shard: Vec<ShardLoad>,
    /// Sum of every shard's load.
    pub total: ShardLoad,
    /// Wall-clock time the sample was taken.
    pub timestamp_ns: u64,
}

/// Weights combining a shard's raw counters into one activity score
/// (`spec.md` §4.7 "activity_i = alpha*reads + beta*writes + gamma*bytes").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyWeights {
    /// Weight applied to reads.
    pub alpha: f64,
    /// Weight applied to writes.
    pub beta: f64,
    /// Weight applied to resident bytes.
    pub gamma: f64,
}

impl Default for EntropyWeights {
    fn default() -> Self {
        EntropyWeights { alpha: 1.0, beta: 2.0, gamma: 0.001 }
    }
}

impl EntropyWeights {
    /// Combine one shard's counters into a single activity score.
    pub fn activity(&self, load: &ShardLoad) -> f64 {
        self.alpha * load.reads as f64 + self.beta * load.writes as f64 + self.gamma * load.bytes as f64
    }
}

/// Tunables for the periodic sampler (`spec.md` §6 "entropy" config block).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyConfig {
    /// How often the monitor samples shard counters.
    pub sample_interval_ms: u64,
    /// Imbalance score at or above which a rebalance is recommended.
    pub imbalance_threshold: f32,
    /// Minimum time between two rebalance recommendations.
    pub rebalance_cooldown_ms: u64,
    /// Activity-score weights.
    pub weights: EntropyWeights,
    /// Hard cap on migration tasks emitted per rebalance window
    /// (`spec.md` §4.7 "bounded per window").
    pub max_migrations_per_window: usize,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        EntropyConfig {
            sample_interval_ms: 1_000,
            imbalance_threshold: 0.35,
            rebalance_cooldown_ms: 60_000,
            weights: EntropyWeights::default(),
            max_migrations_per_window: 16,
        }
    }
}

/// Normalized Shannon-entropy distribution across shards
/// (`spec.md` §3 `EntropyReport`).
#[derive(Debug, Clone, PartialEq)]
pub struct EntropyReport {
    /// Raw (un-normalized) Shannon entropy in bits.
    pub shannon: f32,
    /// `1 - normalized_entropy`, in `[0, 1]`. `0` is perfectly balanced;
    /// `1` means a single shard holds all activity.
    pub imbalance_score: f32,
    /// Shard ids with an above-average share of activity, descending by
    /// share.
    pub hot_shards: Vec<u16>,
    /// Shard ids with a below-average share of activity, ascending by
    /// share.
    pub cold_shards: Vec<u16>,
    /// Whether `imbalance_score` crossed `imbalance_threshold`. Does not
    /// account for the rebalance cooldown; see
    /// [`crate::monitor::EntropyMonitor::sample`] for the gated decision.
    pub recommend_rebalance: bool,
}

/// Compute an [`EntropyReport`] from one activity score per shard.
///
/// A single-shard configuration has no distribution to speak of and is
/// always reported as perfectly balanced (`imbalance_score == 0`), since
/// there is nowhere to rebalance to.
pub fn compute_report(activity: &[f64], threshold: f32) -> EntropyReport {
    let n = activity.len();
    if n <= 1 {
        return EntropyReport {
            shannon: 0.0,
            imbalance_score: 0.0,
            hot_shards: Vec::new(),
            cold_shards: Vec::new(),
            recommend_rebalance: false,
        };
    }

    let total: f64 = activity.iter().sum();
    let shares: Vec<f64> = if total > 0.0 {
        activity.iter().map(|a| a / total).collect()
    } else {
        vec![1.0 / n as f64; n]
    };

    let shannon: f64 = -shares
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.log2())
        .sum::<f64>();
    let max_entropy = (n as f64).log2();
    let normalized = if max_entropy > 0.0 { shannon / max_entropy } else { 1.0 };
    let imbalance = (1.0 - normalized).clamp(0.0, 1.0);

    let average_share = 1.0 / n as f64;
    let mut hot_shards: Vec<u16> = (0..n as u16).filter(|&id| shares[id as usize] > average_share).collect();
    hot_shards.sort_by(|a, b| shares[*b as usize].partial_cmp(&shares[*a as usize]).unwrap());

    let mut cold_shards: Vec<u16> = (0..n as u16).filter(|&id| shares[id as usize] < average_share).collect();
    cold_shards.sort_by(|a, b| shares[*a as usize].partial_cmp(&shares[*b as usize]).unwrap());

    EntropyReport {
        shannon: shannon as f32,
        imbalance_score: imbalance as f32,
        hot_shards,
        cold_shards,
        recommend_rebalance: imbalance as f32 >= threshold,
    }
}
