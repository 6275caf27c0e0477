//! Graph store access layer

pub mod memory;
pub mod mmap;

pub use memory::MemoryGraphStore;
pub use mmap::MmapGraphStore;

use std::sync::Arc;

/// Identifier of a node. Ids below a store's `highest_node_id` may or may
/// not have a live node behind them; an absent id is a normal miss.
pub type NodeId = u64;

/// An edge between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub start: NodeId,
    pub end: NodeId,
}

impl Relationship {
    /// The endpoint that is not `id`.
    pub fn other_end(&self, id: NodeId) -> NodeId {
        if self.start == id {
            self.end
        } else {
            self.start
        }
    }
}

/// A materialized node together with its relationship list. Cloning is
/// cheap: the relationship list is shared.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    relationships: Arc<[Relationship]>,
}

impl Node {
    pub fn new(id: NodeId, relationships: Arc<[Relationship]>) -> Self {
        Self { id, relationships }
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn degree(&self) -> usize {
        self.relationships.len()
    }
}

/// The surface the sampling engine needs from the underlying graph engine.
///
/// `highest_node_id` must stay stable for a whole analysis run even if the
/// underlying store keeps growing. `clear_cache` drops whatever node state
/// the store holds so the next round's window can be warmed from scratch.
pub trait GraphStore: Send + Sync {
    /// Exclusive upper bound on node ids currently in use.
    fn highest_node_id(&self) -> NodeId;

    /// Fetch a node, materializing and caching it if the store caches.
    /// Returns `None` for ids with no live node.
    fn node(&self, id: NodeId) -> Option<Node>;

    /// Drop all cached node and relationship state.
    fn clear_cache(&self);
}
