//! Bounded shortest-path counting

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::{random_node, RunnerStats, SamplingRunner, Window};
use crate::counters::CounterArray;
use crate::graph::{GraphStore, Node, NodeId};

/// Repeatedly picks two random in-window nodes and enumerates every
/// shortest path between them up to a maximum depth, expanding only
/// through in-window neighbors. For each path found the interior nodes
/// are scored; the endpoints are excluded so the random picker does not
/// bias them.
pub struct PathCountRunner {
    worker: usize,
    rng: SmallRng,
    max_depth: usize,
}

impl PathCountRunner {
    pub fn new(worker: usize, seed: u64, max_depth: usize) -> Self {
        Self {
            worker,
            rng: SmallRng::seed_from_u64(seed),
            max_depth,
        }
    }
}

impl SamplingRunner for PathCountRunner {
    fn run(
        &mut self,
        store: &dyn GraphStore,
        window: Window,
        counters: &CounterArray,
        budget: Duration,
    ) -> RunnerStats {
        let started = Instant::now();
        let mut stats = RunnerStats::default();
        loop {
            let from = random_node(store, window, &mut self.rng);
            let to = random_node(store, window, &mut self.rng);
            for path in shortest_paths(store, window, &from, to.id, self.max_depth) {
                stats.hits += 1;
                stats.traversed += path.len() as u64;
                if path.len() > 2 {
                    for &id in &path[1..path.len() - 1] {
                        counters.increment(id);
                    }
                }
            }
            if started.elapsed() > budget {
                break;
            }
        }
        log::debug!(
            "worker {} searched for {} ms: {} paths, {} traversed",
            self.worker,
            started.elapsed().as_millis(),
            stats.hits,
            stats.traversed
        );
        stats
    }
}

/// All shortest paths from `from` to `to` of at most `max_depth` edges.
/// Expansion never leaves the window: out-of-window neighbors are
/// filtered, so no counter outside the window can ever be touched by a
/// search rooted in it.
fn shortest_paths(
    store: &dyn GraphStore,
    window: Window,
    from: &Node,
    to: NodeId,
    max_depth: usize,
) -> Vec<Vec<NodeId>> {
    if from.id == to {
        return vec![vec![to]];
    }

    // Level-by-level BFS recording, for every node, the set of parents one
    // level closer to the start. A node reached again at its own discovery
    // depth gains an extra parent: another equally short way in.
    let mut parents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut depth_of: HashMap<NodeId, usize> = HashMap::new();
    depth_of.insert(from.id, 0);
    let mut frontier = vec![from.clone()];
    let mut depth = 0;
    let mut found = false;

    while !frontier.is_empty() && depth < max_depth && !found {
        depth += 1;
        let mut next = Vec::new();
        for node in &frontier {
            for relationship in node.relationships() {
                let other = relationship.other_end(node.id);
                if !window.contains(other) {
                    continue;
                }
                match depth_of.get(&other) {
                    Some(&d) if d == depth => {
                        parents.entry(other).or_default().push(node.id);
                    }
                    Some(_) => {}
                    None => {
                        depth_of.insert(other, depth);
                        parents.entry(other).or_default().push(node.id);
                        if other == to {
                            found = true;
                        } else if let Some(discovered) = store.node(other) {
                            next.push(discovered);
                        }
                    }
                }
            }
        }
        frontier = next;
    }

    if !found {
        return Vec::new();
    }

    // Unwind every parent chain from the target back to the start.
    let mut paths = Vec::new();
    let mut stack = vec![vec![to]];
    while let Some(partial) = stack.pop() {
        let Some(&head) = partial.last() else {
            continue;
        };
        if head == from.id {
            let mut complete = partial;
            complete.reverse();
            paths.push(complete);
            continue;
        }
        let Some(ways) = parents.get(&head) else {
            continue;
        };
        for &parent in ways {
            let mut extended = partial.clone();
            extended.push(parent);
            stack.push(extended);
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraphStore;

    #[test]
    fn finds_the_single_shortest_path() {
        // 0 - 1 - 2 - 3, plus a longer detour 0 - 4 - 5 - 6 - 3.
        let store = MemoryGraphStore::from_edges(
            7,
            &[(0, 1), (1, 2), (2, 3), (0, 4), (4, 5), (5, 6), (6, 3)],
        );
        let from = store.node(0).unwrap();
        let paths = shortest_paths(&store, Window::new(0, 7), &from, 3, 10);
        assert_eq!(paths, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn finds_every_equally_short_path() {
        // Diamond: 0 - {1, 2} - 3.
        let store = MemoryGraphStore::from_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let from = store.node(0).unwrap();
        let mut paths = shortest_paths(&store, Window::new(0, 4), &from, 3, 10);
        paths.sort();
        assert_eq!(paths, vec![vec![0, 1, 3], vec![0, 2, 3]]);
    }

    #[test]
    fn respects_the_depth_bound() {
        let store = MemoryGraphStore::from_edges(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let from = store.node(0).unwrap();
        assert!(shortest_paths(&store, Window::new(0, 5), &from, 4, 3).is_empty());
        assert_eq!(
            shortest_paths(&store, Window::new(0, 5), &from, 4, 4).len(),
            1
        );
    }

    #[test]
    fn never_expands_through_out_of_window_nodes() {
        // The only route from 1 to 3 inside [0, 4) runs through 2; the
        // shortcut through 4 is outside the window and must be ignored.
        let store = MemoryGraphStore::from_edges(5, &[(1, 2), (2, 3), (1, 4), (4, 3)]);
        let from = store.node(1).unwrap();
        let paths = shortest_paths(&store, Window::new(0, 4), &from, 3, 10);
        assert_eq!(paths, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn scores_interior_nodes_only() {
        // Line 0 - 1 - 2: node 1 is the only possible interior node, so
        // the endpoints must finish the burst with zero counts.
        let store = MemoryGraphStore::from_edges(3, &[(0, 1), (1, 2)]);
        let counters = CounterArray::zeroed(3);
        let mut runner = PathCountRunner::new(0, 5, 10);
        let stats = runner.run(
            &store,
            Window::new(0, 3),
            &counters,
            Duration::from_millis(20),
        );
        assert!(stats.hits > 0);
        assert!(stats.traversed >= stats.hits);
        let counts = counters.snapshot();
        assert_eq!(counts[0], 0);
        assert_eq!(counts[2], 0);
    }
}
