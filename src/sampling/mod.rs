//! Sampling strategies run by the round scheduler

pub mod path_count;
pub mod preload;
pub mod random_walk;

pub use path_count::PathCountRunner;
pub use random_walk::RandomWalkRunner;

use std::time::Duration;

use clap::ValueEnum;
use rand::Rng;
use serde::Serialize;

use crate::counters::CounterArray;
use crate::graph::{GraphStore, Node, NodeId};

/// Half-open id range `[min_node_id, min_node_id + len)` that is
/// cache-resident in the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub min_node_id: NodeId,
    pub len: u64,
}

impl Window {
    pub fn new(min_node_id: NodeId, len: u64) -> Self {
        Self { min_node_id, len }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id >= self.min_node_id && id < self.end()
    }

    /// Exclusive upper bound of the window.
    pub fn end(&self) -> NodeId {
        self.min_node_id + self.len
    }
}

/// What one worker accomplished in a sampling burst. Aggregated by the
/// scheduler for reporting only, never for correctness.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunnerStats {
    /// Accepted moves or paths found.
    pub hits: u64,
    /// Relationships and nodes inspected along the way.
    pub traversed: u64,
}

impl RunnerStats {
    pub fn merged(self, other: RunnerStats) -> RunnerStats {
        RunnerStats {
            hits: self.hits + other.hits,
            traversed: self.traversed + other.traversed,
        }
    }
}

/// One worker's sampling strategy. Implementations pick random in-window
/// nodes and bump the shared counters until the time budget elapses. The
/// budget is checked between units of work, so a long search may overrun
/// it slightly; that is accepted, not corrected.
pub trait SamplingRunner {
    fn run(
        &mut self,
        store: &dyn GraphStore,
        window: Window,
        counters: &CounterArray,
        budget: Duration,
    ) -> RunnerStats;
}

/// Which sampling strategy the worker pool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Coin-flip random walk over in-window neighbors.
    RandomWalk,
    /// Bounded-depth shortest-path counting between random endpoint pairs.
    PathCount,
}

impl Strategy {
    /// Builds a fresh runner for one worker, seeded for reproducibility.
    pub fn runner(
        self,
        worker: usize,
        seed: u64,
        max_depth: usize,
    ) -> Box<dyn SamplingRunner + Send> {
        match self {
            Strategy::RandomWalk => Box::new(RandomWalkRunner::new(worker, seed)),
            Strategy::PathCount => Box::new(PathCountRunner::new(worker, seed, max_depth)),
        }
    }
}

/// Picks a uniformly random live node inside the window, retrying absent
/// ids. Spins forever if the window holds no live node at all, same as the
/// picker it replaces; windows are always carved from the live id space.
pub(crate) fn random_node(
    store: &dyn GraphStore,
    window: Window,
    rng: &mut impl Rng,
) -> Node {
    loop {
        let id = window.min_node_id + rng.random_range(0..window.len);
        if let Some(node) = store.node(id) {
            return node;
        }
    }
}
