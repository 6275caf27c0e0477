//! In-memory graph store for tests and small graphs

use std::sync::Arc;

use super::{GraphStore, Node, NodeId, Relationship};

/// Adjacency held entirely in memory. Slots may be empty: an absent id is
/// a normal miss, mirroring stores whose id space has holes.
pub struct MemoryGraphStore {
    slots: Vec<Option<Arc<[Relationship]>>>,
}

impl MemoryGraphStore {
    /// Builds an undirected store: each edge shows up in the relationship
    /// list of both endpoints.
    pub fn from_edges(node_count: u64, edges: &[(NodeId, NodeId)]) -> Self {
        let mut lists: Vec<Vec<Relationship>> = vec![Vec::new(); node_count as usize];
        for &(a, b) in edges {
            let relationship = Relationship { start: a, end: b };
            lists[a as usize].push(relationship);
            if a != b {
                lists[b as usize].push(relationship);
            }
        }
        Self {
            slots: lists.into_iter().map(|list| Some(Arc::from(list))).collect(),
        }
    }

    /// Marks `id` as having no live node behind it.
    pub fn remove(&mut self, id: NodeId) {
        self.slots[id as usize] = None;
    }
}

impl GraphStore for MemoryGraphStore {
    fn highest_node_id(&self) -> NodeId {
        self.slots.len() as NodeId
    }

    fn node(&self, id: NodeId) -> Option<Node> {
        let relationships = self.slots.get(id as usize)?.as_ref()?;
        Some(Node::new(id, Arc::clone(relationships)))
    }

    // Nothing cached, nothing to drop.
    fn clear_cache(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_visible_from_both_endpoints() {
        let store = MemoryGraphStore::from_edges(3, &[(0, 1), (1, 2)]);
        let middle = store.node(1).unwrap();
        assert_eq!(middle.degree(), 2);
        let neighbors: Vec<_> = middle
            .relationships()
            .iter()
            .map(|r| r.other_end(1))
            .collect();
        assert_eq!(neighbors, vec![0, 2]);
    }

    #[test]
    fn removed_ids_are_normal_misses() {
        let mut store = MemoryGraphStore::from_edges(3, &[(0, 1)]);
        store.remove(2);
        assert!(store.node(2).is_none());
        assert!(store.node(0).is_some());
        assert!(store.node(3).is_none());
        assert_eq!(store.highest_node_id(), 3);
    }
}
