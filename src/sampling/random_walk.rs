//! Coin-flip random-walk sampling

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{random_node, RunnerStats, SamplingRunner, Window};
use crate::counters::CounterArray;
use crate::graph::{GraphStore, Node};

/// Walks the graph by advancing to a random in-window neighbor of the
/// current node. Each relationship of the current node is offered in turn:
/// a coin flip together with the in-window test either accepts the far end
/// as the next step or passes. When no neighbor is accepted the walk
/// restarts from a fresh random node.
///
/// Every accepted move increments the visited node's counter and the hit
/// count; every relationship inspected, accepted or not, increments the
/// traversal count.
pub struct RandomWalkRunner {
    worker: usize,
    rng: SmallRng,
}

impl RandomWalkRunner {
    pub fn new(worker: usize, seed: u64) -> Self {
        Self {
            worker,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl SamplingRunner for RandomWalkRunner {
    fn run(
        &mut self,
        store: &dyn GraphStore,
        window: Window,
        counters: &CounterArray,
        budget: Duration,
    ) -> RunnerStats {
        let started = Instant::now();
        let mut stats = RunnerStats::default();
        let mut node = random_node(store, window, &mut self.rng);
        loop {
            let mut moved: Option<Node> = None;
            for relationship in node.relationships() {
                stats.traversed += 1;
                let other = relationship.other_end(node.id);
                if self.rng.random_bool(0.5) && window.contains(other) {
                    if let Some(next) = store.node(other) {
                        counters.increment(other);
                        stats.hits += 1;
                        moved = Some(next);
                        break;
                    }
                }
            }
            node = match moved {
                Some(next) => next,
                None => random_node(store, window, &mut self.rng),
            };
            if started.elapsed() > budget {
                break;
            }
        }
        log::debug!(
            "worker {} walked for {} ms: {} hits, {} traversed",
            self.worker,
            started.elapsed().as_millis(),
            stats.hits,
            stats.traversed
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraphStore;

    fn ring(node_count: u64) -> MemoryGraphStore {
        let edges: Vec<_> = (0..node_count).map(|i| (i, (i + 1) % node_count)).collect();
        MemoryGraphStore::from_edges(node_count, &edges)
    }

    #[test]
    fn every_hit_is_one_counter_increment() {
        let store = ring(16);
        let counters = CounterArray::zeroed(16);
        let mut runner = RandomWalkRunner::new(0, 99);
        let stats = runner.run(
            &store,
            Window::new(0, 16),
            &counters,
            Duration::from_millis(20),
        );
        let total: u64 = counters.snapshot().iter().map(|&c| c as u64).sum();
        assert_eq!(total, stats.hits);
        assert!(stats.traversed >= stats.hits);
        assert!(stats.traversed > 0);
    }

    #[test]
    fn never_steps_outside_the_window() {
        // Ring of 12; sample only [4, 8). Moves to 3 or 8 must be refused
        // even though they are direct neighbors of the window edge nodes.
        let store = ring(12);
        let counters = CounterArray::zeroed(12);
        let mut runner = RandomWalkRunner::new(0, 7);
        runner.run(
            &store,
            Window::new(4, 4),
            &counters,
            Duration::from_millis(20),
        );
        let counts = counters.snapshot();
        for (id, &count) in counts.iter().enumerate() {
            if !(4..8).contains(&id) {
                assert_eq!(count, 0, "node {id} outside the window was counted");
            }
        }
    }
}
