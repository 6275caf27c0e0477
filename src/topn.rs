//! Bounded top-N selection over the counter array

use std::cmp::Reverse;

use itertools::Itertools;

/// Selects the `n` highest counters in a single linear pass.
///
/// Keeps a fixed candidate set of size `n` and the current minimum among
/// the candidates; a value only displaces the minimum when it exceeds it,
/// after which the minimum is rescanned. O(len * n) total, fine for the
/// small `n` this runs with. Ties at the threshold keep the first-seen
/// index.
pub struct TopNSelector<'a> {
    counts: &'a [u32],
}

impl<'a> TopNSelector<'a> {
    pub fn new(counts: &'a [u32]) -> Self {
        Self { counts }
    }

    /// Returns up to `n` `(node_id, count)` pairs, descending by count.
    /// Candidate slots that never filled are dropped, so an all-zero input
    /// yields an empty result.
    pub fn select(&self, n: usize) -> Vec<(usize, u32)> {
        if n == 0 || self.counts.is_empty() {
            return Vec::new();
        }
        let mut ids = vec![0usize; n];
        let mut counts = vec![0u32; n];
        let mut min_count = 0u32;
        let mut min_idx = 0usize;
        for (i, &value) in self.counts.iter().enumerate() {
            if value > min_count {
                ids[min_idx] = i;
                counts[min_idx] = value;
                min_count = value;
                for j in 0..n {
                    if counts[j] < min_count {
                        min_count = counts[j];
                        min_idx = j;
                    }
                }
            }
        }
        ids.into_iter()
            .zip(counts)
            .filter(|&(_, count)| count > 0)
            .sorted_by_key(|&(_, count)| Reverse(count))
            .collect()
    }
}
