//! Round scheduling: partitioning the id space into memory-bounded windows
//! and driving preload, sampling, and checkpointing over each one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use rayon::prelude::*;
use sysinfo::System;

use crate::config::Config;
use crate::counters::CounterArray;
use crate::graph::GraphStore;
use crate::sampling::{preload, RunnerStats, Window};
use crate::storage::{ArrayStore, CheckpointName};

/// Drives `preload -> sample -> checkpoint` over successive windows of the
/// node-id space until the next full window would run past
/// `highest_node_id`. Rounds are strictly sequential; within a round, each
/// phase is fully parallel on its own pool.
pub struct RoundScheduler {
    store: Arc<dyn GraphStore>,
    config: Config,
    min_node_id: u64,
    nodes_per_round: u64,
    highest_node_id: u64,
    counters: CounterArray,
    checkpoint_dir: PathBuf,
    live_checkpoint: Option<PathBuf>,
    sampling_pool: rayon::ThreadPool,
    preload_pool: rayon::ThreadPool,
}

impl RoundScheduler {
    /// Sets up the first round to run.
    ///
    /// With no checkpoint, the scan starts at id 0 with a round sized to
    /// the memory budget (half the free memory divided by the estimated
    /// bytes per resident node, capped at `highest_node_id`) and a
    /// zero-filled counter array. With a checkpoint, the file name yields
    /// the next round's window and the file contents yield the counters;
    /// the array keeps whatever length was persisted.
    pub fn initialize(
        store: Arc<dyn GraphStore>,
        config: Config,
        checkpoint: Option<&Path>,
    ) -> Result<Self> {
        let highest_node_id = store.highest_node_id();
        let (min_node_id, nodes_per_round, counters, checkpoint_dir, live_checkpoint) =
            match checkpoint {
                Some(path) => {
                    let name = CheckpointName::parse(path)?;
                    // The name parser only guarantees two integers; a
                    // zero-width window would loop forever without ever
                    // advancing, and an overflowing one has no end.
                    ensure!(
                        name.nodes_per_round > 0,
                        "checkpoint {} names a zero-width round",
                        path.display()
                    );
                    ensure!(
                        name.min_node_id.checked_add(name.nodes_per_round).is_some(),
                        "checkpoint {} window overflows the id space",
                        path.display()
                    );
                    let values = ArrayStore::with_capacity(path, config.buffer_capacity)
                        .read()
                        .with_context(|| format!("reading checkpoint {}", path.display()))?;
                    let dir = path
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from("."));
                    log::info!(
                        "resuming at min node id {} with {} nodes per round",
                        name.min_node_id,
                        name.nodes_per_round
                    );
                    (
                        name.min_node_id,
                        name.nodes_per_round,
                        CounterArray::from_vec(values),
                        dir,
                        Some(path.to_path_buf()),
                    )
                }
                None => {
                    let free = free_memory_bytes(&config);
                    let budget_nodes = free / 2 / config.memory_per_node;
                    // A zero-width round would never advance.
                    let nodes_per_round = budget_nodes.min(highest_node_id).max(1);
                    log::info!(
                        "{} bytes free, {} nodes fit a round, highest node id {}",
                        free,
                        budget_nodes,
                        highest_node_id
                    );
                    (
                        0,
                        nodes_per_round,
                        CounterArray::zeroed(highest_node_id as usize),
                        config.checkpoint_dir.clone(),
                        None,
                    )
                }
            };

        let sampling_workers = config.sampling_workers.max(1);
        let preload_workers = (sampling_workers / config.preload_divisor).max(1);
        let sampling_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(sampling_workers)
            .build()?;
        let preload_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(preload_workers)
            .build()?;
        log::info!("{sampling_workers} sampling workers, {preload_workers} preload workers");

        Ok(Self {
            store,
            config,
            min_node_id,
            nodes_per_round,
            highest_node_id,
            counters,
            checkpoint_dir,
            live_checkpoint,
            sampling_pool,
            preload_pool,
        })
    }

    pub fn min_node_id(&self) -> u64 {
        self.min_node_id
    }

    pub fn nodes_per_round(&self) -> u64 {
        self.nodes_per_round
    }

    pub fn highest_node_id(&self) -> u64 {
        self.highest_node_id
    }

    pub fn counters(&self) -> &CounterArray {
        &self.counters
    }

    /// Runs every remaining full window and returns the cumulative
    /// counters together with the aggregated sampling stats.
    ///
    /// The `<` is deliberate: a trailing partial window, when the id space
    /// does not divide evenly, is never sampled.
    pub fn run_rounds(mut self) -> Result<(CounterArray, RunnerStats)> {
        let mut stats = RunnerStats::default();
        let mut rounds = 0u64;
        while self.min_node_id + self.nodes_per_round < self.highest_node_id {
            stats = stats.merged(self.run_round()?);
            rounds += 1;
        }
        log::info!(
            "finished after {} rounds: {} hits, {} traversed",
            rounds,
            stats.hits,
            stats.traversed
        );
        Ok((self.counters, stats))
    }

    fn run_round(&mut self) -> Result<RunnerStats> {
        let window = Window::new(self.min_node_id, self.nodes_per_round);
        log::info!(
            "round over [{}, {}): clearing store cache",
            window.min_node_id,
            window.end()
        );
        self.store.clear_cache();

        let warm_started = Instant::now();
        let warmed = preload::warm_window(self.store.as_ref(), window, &self.preload_pool);
        log::info!(
            "warmed {} nodes+relationships in {} ms, {} bytes free",
            warmed,
            warm_started.elapsed().as_millis(),
            free_memory_bytes(&self.config)
        );

        let stats = self.sample_window(window);
        log::info!(
            "sampled {} hits over {} traversals in [{}, {})",
            stats.hits,
            stats.traversed,
            window.min_node_id,
            window.end()
        );

        self.write_checkpoint()?;
        self.min_node_id += self.nodes_per_round;
        Ok(stats)
    }

    fn sample_window(&self, window: Window) -> RunnerStats {
        let workers = self.sampling_pool.current_num_threads();
        let budget = self.config.time_budget;
        let strategy = self.config.strategy;
        let started = Instant::now();
        let stats = self.sampling_pool.install(|| {
            (0..workers)
                .into_par_iter()
                .map(|worker| {
                    let seed = self.config.seed.wrapping_add(worker as u64);
                    let mut runner = strategy.runner(worker, seed, self.config.max_depth);
                    runner.run(self.store.as_ref(), window, &self.counters, budget)
                })
                .reduce(RunnerStats::default, RunnerStats::merged)
        });
        // Runners only check the clock between walks, so a stalled store
        // call can hold a worker well past the budget.
        let elapsed = started.elapsed();
        if burst_overran(elapsed, budget) {
            log::warn!(
                "sampling burst ran {} ms against a {} ms budget in [{}, {})",
                elapsed.as_millis(),
                budget.as_millis(),
                window.min_node_id,
                window.end()
            );
        }
        stats
    }

    /// Persists the counters under the *next* round's window and drops the
    /// prior file: exactly one checkpoint stays live.
    fn write_checkpoint(&mut self) -> Result<()> {
        let next = CheckpointName::new(
            self.min_node_id + self.nodes_per_round,
            self.nodes_per_round,
        );
        let path = self.checkpoint_dir.join(next.file_name());
        ArrayStore::with_capacity(&path, self.config.buffer_capacity)
            .write(&self.counters.snapshot())
            .with_context(|| format!("writing checkpoint {}", path.display()))?;
        if let Some(previous) = self.live_checkpoint.replace(path.clone()) {
            std::fs::remove_file(&previous)
                .with_context(|| format!("removing checkpoint {}", previous.display()))?;
        }
        log::info!("checkpointed to {}", path.display());
        Ok(())
    }
}

/// A burst this far past its budget points at a stalled store call
/// rather than ordinary end-of-walk slack.
const OVERRUN_WARN_FACTOR: u32 = 2;

fn burst_overran(elapsed: Duration, budget: Duration) -> bool {
    elapsed > budget * OVERRUN_WARN_FACTOR
}

fn free_memory_bytes(config: &Config) -> u64 {
    if let Some(budget) = config.memory_budget {
        return budget;
    }
    let mut system = System::new();
    system.refresh_memory();
    system.available_memory()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MEMORY_PER_NODE;
    use crate::graph::{GraphStore, MemoryGraphStore, Node, NodeId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_config(dir: &Path) -> Config {
        Config {
            time_budget: Duration::from_millis(10),
            sampling_workers: 2,
            checkpoint_dir: dir.to_path_buf(),
            // Large enough that the round covers any test graph.
            memory_budget: Some(u64::MAX / MEMORY_PER_NODE),
            seed: 11,
            ..Config::default()
        }
    }

    /// Store wrapper that counts cache clears.
    struct ClearCounting {
        inner: MemoryGraphStore,
        clears: AtomicUsize,
    }

    impl GraphStore for ClearCounting {
        fn highest_node_id(&self) -> NodeId {
            self.inner.highest_node_id()
        }
        fn node(&self, id: NodeId) -> Option<Node> {
            self.inner.node(id)
        }
        fn clear_cache(&self) {
            self.clears.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn defaults_cover_the_whole_id_space() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(MemoryGraphStore::from_edges(200, &[(0, 1)]));
        let config = test_config(dir.path());
        let scheduler = RoundScheduler::initialize(store, config, None)?;
        assert_eq!(scheduler.min_node_id(), 0);
        assert_eq!(scheduler.nodes_per_round(), 200);
        assert_eq!(scheduler.highest_node_id(), 200);
        assert_eq!(scheduler.counters().len(), 200);
        Ok(())
    }

    #[test]
    fn memory_budget_limits_the_round_size() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(MemoryGraphStore::from_edges(200, &[(0, 1)]));
        let mut config = test_config(dir.path());
        // Room for 50 resident nodes after the halving.
        config.memory_budget = Some(50 * 2 * MEMORY_PER_NODE);
        let scheduler = RoundScheduler::initialize(store, config, None)?;
        assert_eq!(scheduler.nodes_per_round(), 50);
        Ok(())
    }

    #[test]
    fn resumes_from_a_checkpoint_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("page_rank_10_100.int");
        ArrayStore::new(&path).write(&vec![3u32; 42])?;

        let store = Arc::new(MemoryGraphStore::from_edges(200, &[(0, 1)]));
        let scheduler =
            RoundScheduler::initialize(store, test_config(dir.path()), Some(&path))?;
        assert_eq!(scheduler.min_node_id(), 10);
        assert_eq!(scheduler.nodes_per_round(), 100);
        assert_eq!(scheduler.highest_node_id(), 200);
        // The counter array keeps the persisted length.
        assert_eq!(scheduler.counters().len(), 42);
        assert_eq!(scheduler.counters().get(0), 3);
        Ok(())
    }

    #[test]
    fn zero_width_checkpoint_window_is_fatal() -> Result<()> {
        // Both name fields parse as integers, so only the width check can
        // stop a round that would never advance.
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("page_rank_10_0.int");
        ArrayStore::new(&path).write(&vec![0u32; 200])?;
        let store = Arc::new(MemoryGraphStore::from_edges(200, &[(0, 1)]));
        let result = RoundScheduler::initialize(store, test_config(dir.path()), Some(&path));
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn overflowing_checkpoint_window_is_fatal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let name = format!("page_rank_{}_2.int", u64::MAX - 1);
        let path = dir.path().join(name);
        ArrayStore::new(&path).write(&[0, 0])?;
        let store = Arc::new(MemoryGraphStore::from_edges(10, &[(0, 1)]));
        let result = RoundScheduler::initialize(store, test_config(dir.path()), Some(&path));
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn burst_overrun_threshold_is_twice_the_budget() {
        let budget = Duration::from_millis(100);
        assert!(!burst_overran(Duration::from_millis(150), budget));
        assert!(!burst_overran(Duration::from_millis(200), budget));
        assert!(burst_overran(Duration::from_millis(201), budget));
    }

    #[test]
    fn malformed_checkpoint_name_is_fatal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("not_a_checkpoint.bin");
        ArrayStore::new(&path).write(&[1, 2, 3])?;
        let store = Arc::new(MemoryGraphStore::from_edges(10, &[(0, 1)]));
        assert!(RoundScheduler::initialize(store, test_config(dir.path()), Some(&path)).is_err());
        Ok(())
    }

    #[test]
    fn full_window_means_zero_rounds() -> Result<()> {
        // nodes_per_round == highest_node_id: 0 + 200 < 200 is false, so
        // not a single round runs and the cache is never cleared.
        let dir = tempfile::tempdir()?;
        let store = Arc::new(ClearCounting {
            inner: MemoryGraphStore::from_edges(200, &[(0, 1)]),
            clears: AtomicUsize::new(0),
        });
        let scheduler =
            RoundScheduler::initialize(
                Arc::clone(&store) as Arc<dyn GraphStore>,
                test_config(dir.path()),
                None,
            )?;
        assert_eq!(scheduler.nodes_per_round(), 200);
        let (counters, stats) = scheduler.run_rounds()?;
        assert_eq!(stats, RunnerStats::default());
        assert_eq!(counters.snapshot(), vec![0; 200]);
        assert_eq!(store.clears.load(Ordering::Relaxed), 0);
        Ok(())
    }

    #[test]
    fn rounds_march_forward_and_keep_one_checkpoint() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let edges: Vec<_> = (0..100u64).map(|i| (i, (i + 1) % 100)).collect();
        let store = Arc::new(MemoryGraphStore::from_edges(100, &edges));
        let mut config = test_config(dir.path());
        // Two windows of 40: [0, 40) and [40, 80); [80, 100) is partial
        // and never sampled.
        config.memory_budget = Some(40 * 2 * MEMORY_PER_NODE);
        let scheduler = RoundScheduler::initialize(store, config, None)?;
        let (counters, stats) = scheduler.run_rounds()?;

        assert!(stats.hits > 0);
        // Only the final checkpoint survives, named by the never-run
        // third window.
        assert!(dir.path().join("page_rank_80_40.int").exists());
        assert!(!dir.path().join("page_rank_40_40.int").exists());
        // Nothing outside the two sampled windows was ever counted.
        for (id, &count) in counters.snapshot().iter().enumerate() {
            if id >= 80 {
                assert_eq!(count, 0, "node {id} in the partial window was counted");
            }
        }
        Ok(())
    }
}
