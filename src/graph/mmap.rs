//! Memory-mapped graph store

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dashmap::DashMap;
use memmap2::Mmap;

use super::{GraphStore, Node, NodeId, Relationship};

const MAGIC: &[u8; 8] = b"GRSTORE1";
const HEADER_LEN: usize = 8 + 8 + 8;

/// Read-only CSR graph backed by a memory-mapped file, with a node cache
/// the round scheduler clears between rounds.
///
/// Layout: 8-byte magic, node count, edge count, `node_count + 1` offsets,
/// then the edge targets, all u64 little-endian. The file is never loaded
/// wholesale; only cached nodes occupy heap memory.
pub struct MmapGraphStore {
    map: Mmap,
    node_count: u64,
    cache: DashMap<NodeId, Node>,
}

impl MmapGraphStore {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening store {}", path.display()))?;
        let map = unsafe { Mmap::map(&file) }
            .with_context(|| format!("mapping store {}", path.display()))?;
        if map.len() < HEADER_LEN || &map[..8] != MAGIC {
            bail!("{} is not a graph store file", path.display());
        }
        let node_count = read_u64(&map, 8);
        let edge_count = read_u64(&map, 16);
        let expected = HEADER_LEN + (node_count + 1 + edge_count) as usize * 8;
        if map.len() < expected {
            bail!(
                "store {} is truncated: {} bytes, expected {}",
                path.display(),
                map.len(),
                expected
            );
        }
        // The offsets must climb monotonically to exactly edge_count, or
        // materializing a node would slice past the edge array.
        let mut previous = 0u64;
        for index in 0..=node_count {
            let offset = read_u64(&map, HEADER_LEN + index as usize * 8);
            if offset < previous || offset > edge_count {
                bail!(
                    "store {} has a corrupt offset table at node {}",
                    path.display(),
                    index
                );
            }
            previous = offset;
        }
        if previous != edge_count {
            bail!(
                "store {} offset table ends at {}, expected {}",
                path.display(),
                previous,
                edge_count
            );
        }
        Ok(Self {
            map,
            node_count,
            cache: DashMap::new(),
        })
    }

    fn offset(&self, index: u64) -> u64 {
        read_u64(&self.map, HEADER_LEN + index as usize * 8)
    }

    fn edge(&self, index: u64) -> u64 {
        let edges_at = HEADER_LEN + (self.node_count as usize + 1) * 8;
        read_u64(&self.map, edges_at + index as usize * 8)
    }

    fn materialize(&self, id: NodeId) -> Node {
        let start = self.offset(id);
        let end = self.offset(id + 1);
        let relationships: Arc<[Relationship]> = (start..end)
            .map(|e| Relationship {
                start: id,
                end: self.edge(e),
            })
            .collect();
        Node::new(id, relationships)
    }

    pub fn cached_nodes(&self) -> usize {
        self.cache.len()
    }
}

impl GraphStore for MmapGraphStore {
    fn highest_node_id(&self) -> NodeId {
        self.node_count
    }

    fn node(&self, id: NodeId) -> Option<Node> {
        if id >= self.node_count {
            return None;
        }
        if let Some(node) = self.cache.get(&id) {
            return Some(node.clone());
        }
        let node = self.materialize(id);
        self.cache.insert(id, node.clone());
        Some(node)
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

/// Writes a store file from adjacency lists; list `i` holds the outgoing
/// targets of node `i`. Callers wanting undirected traversal put each edge
/// in both endpoint lists.
pub fn write_store(path: &Path, adjacency: &[Vec<NodeId>]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating store {}", path.display()))?;
    let mut out = BufWriter::new(file);
    out.write_all(MAGIC)?;
    out.write_all(&(adjacency.len() as u64).to_le_bytes())?;
    let edge_count: u64 = adjacency.iter().map(|list| list.len() as u64).sum();
    out.write_all(&edge_count.to_le_bytes())?;
    let mut offset = 0u64;
    out.write_all(&offset.to_le_bytes())?;
    for list in adjacency {
        offset += list.len() as u64;
        out.write_all(&offset.to_le_bytes())?;
    }
    for list in adjacency {
        for &target in list {
            out.write_all(&target.to_le_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}
