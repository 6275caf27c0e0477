//! Parallel cache warm-up for a round's window

use rayon::prelude::*;

use super::Window;
use crate::graph::{GraphStore, NodeId};

const LOG_PARTS: u64 = 4;

/// A worker's contiguous slice of the round window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: NodeId,
    pub end: NodeId,
}

impl Segment {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Splits the window into `workers` equal-width contiguous segments; the
/// last segment absorbs the remainder, so the segments exactly partition
/// the window.
pub fn partition(window: Window, workers: usize) -> Vec<Segment> {
    let workers = workers.max(1) as u64;
    let width = window.len / workers;
    (0..workers)
        .map(|i| {
            let start = window.min_node_id + i * width;
            let end = if i == workers - 1 {
                window.end()
            } else {
                start + width
            };
            Segment { start, end }
        })
        .collect()
}

/// Walks a segment, applying `load` to every id, logging a banner at the
/// start and progress at quarter steps so a long warm-up stays observable
/// without flooding the console. Returns the sum of the loads.
pub fn run_segment(worker: usize, segment: Segment, mut load: impl FnMut(NodeId) -> u64) -> u64 {
    log::info!(
        "{worker:2}. loading from {:10} up to {:10}",
        segment.start,
        segment.end
    );
    let fragment = segment.len() / LOG_PARTS;
    let mut log_at = segment.start + fragment;
    let mut count = 0;
    for id in segment.start..segment.end {
        count += load(id);
        if fragment > 0 && id >= log_at {
            log::info!(
                "{worker:2}. {:3}%",
                (100 / LOG_PARTS) * (id - segment.start) / fragment
            );
            log_at += fragment;
        }
    }
    log::info!("{worker:2}. 100% done, loaded {count}");
    count
}

/// Warms the store cache for every node in the window, touching the far
/// end of each relationship as well. Missing ids are skipped silently.
/// Returns the number of nodes and relationships touched, used only for
/// progress reporting.
pub fn warm_window(store: &dyn GraphStore, window: Window, pool: &rayon::ThreadPool) -> u64 {
    let segments = partition(window, pool.current_num_threads());
    pool.install(|| {
        segments
            .par_iter()
            .enumerate()
            .map(|(worker, &segment)| {
                run_segment(worker, segment, |id| {
                    let mut touched = 0;
                    if let Some(node) = store.node(id) {
                        touched += 1;
                        for relationship in node.relationships() {
                            store.node(relationship.other_end(node.id));
                            touched += 1;
                        }
                    }
                    touched
                })
            })
            .sum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraphStore;

    #[test]
    fn segments_partition_the_window_exactly() {
        let window = Window::new(100, 10);
        let segments = partition(window, 3);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment { start: 100, end: 103 });
        assert_eq!(segments[1], Segment { start: 103, end: 106 });
        // Last segment absorbs the remainder.
        assert_eq!(segments[2], Segment { start: 106, end: 110 });
    }

    #[test]
    fn more_workers_than_ids_leaves_leading_segments_empty() {
        let segments = partition(Window::new(0, 2), 4);
        assert_eq!(segments.len(), 4);
        assert!(segments[0].is_empty());
        assert_eq!(segments[3], Segment { start: 0, end: 2 });
        let covered: u64 = segments.iter().map(Segment::len).sum();
        assert_eq!(covered, 2);
    }

    #[test]
    fn run_segment_visits_every_id_once() {
        let mut seen = Vec::new();
        let total = run_segment(0, Segment { start: 5, end: 9 }, |id| {
            seen.push(id);
            2
        });
        assert_eq!(seen, vec![5, 6, 7, 8]);
        assert_eq!(total, 8);
    }

    #[test]
    fn warm_window_counts_nodes_and_relationships() {
        // Triangle on {0, 1, 2} plus isolated 3: warming [0, 4) touches
        // 4 nodes and, undirected, 2 relationship ends per node of the
        // triangle.
        let mut store = MemoryGraphStore::from_edges(4, &[(0, 1), (1, 2), (2, 0)]);
        store.remove(3);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap();
        let touched = warm_window(&store, Window::new(0, 4), &pool);
        assert_eq!(touched, 3 + 3 * 2);
    }
}
