//! Runtime configuration for the sampling engine

use std::path::PathBuf;
use std::time::Duration;

use crate::sampling::Strategy;
use crate::storage::array::DEFAULT_CAPACITY;

/// Estimated bytes one cache-resident node costs, used to size rounds.
pub const MEMORY_PER_NODE: u64 = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Wall-clock budget for one round's sampling burst.
    pub time_budget: Duration,

    /// Maximum shortest-path search depth for the path-count strategy.
    pub max_depth: usize,

    /// Sampling strategy the worker pool runs.
    pub strategy: Strategy,

    /// Width of the sampling worker pool.
    pub sampling_workers: usize,

    /// Preload pool width is the sampling width divided by this, so the
    /// warm-up does not saturate the store with I/O contention.
    pub preload_divisor: usize,

    /// ArrayStore chunk capacity in elements.
    pub buffer_capacity: usize,

    /// How many top nodes to report at the end of the run.
    pub top_n: usize,

    /// Directory checkpoints are written to when starting fresh.
    pub checkpoint_dir: PathBuf,

    /// Fixed memory budget in bytes for sizing rounds; probes available
    /// system memory when unset.
    pub memory_budget: Option<u64>,

    /// Estimated bytes per cache-resident node.
    pub memory_per_node: u64,

    /// Base RNG seed; worker `w` samples with `seed + w`.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(100),
            max_depth: 10,
            strategy: Strategy::RandomWalk,
            sampling_workers: num_cpus::get() * 2,
            preload_divisor: 4,
            buffer_capacity: DEFAULT_CAPACITY,
            top_n: 10,
            checkpoint_dir: PathBuf::from("."),
            memory_budget: None,
            memory_per_node: MEMORY_PER_NODE,
            seed: 0,
        }
    }
}
