//! Shared per-node hit counters

use std::sync::atomic::{AtomicU32, Ordering};

use crate::graph::NodeId;

/// One counter per node id, shared mutably by every sampling worker in a
/// round. Increments are relaxed atomic adds: workers never order against
/// each other, but no update is ever lost.
///
/// The array is cumulative across rounds; it is only reset between separate
/// full analyses.
pub struct CounterArray {
    slots: Box<[AtomicU32]>,
}

impl CounterArray {
    pub fn zeroed(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || AtomicU32::new(0));
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    /// Rebuilds the array from values loaded out of a checkpoint.
    pub fn from_vec(values: Vec<u32>) -> Self {
        Self {
            slots: values.into_iter().map(AtomicU32::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn increment(&self, id: NodeId) {
        self.slots[id as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, id: NodeId) -> u32 {
        self.slots[id as usize].load(Ordering::Relaxed)
    }

    /// Copies the current values out, for checkpointing and top-N selection.
    pub fn snapshot(&self) -> Vec<u32> {
        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .collect()
    }
}
