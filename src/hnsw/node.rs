//! HNSW node representation

use serde::{Deserialize, Serialize};

/// A node in the HNSW graph
///
/// The node's slot number (its position in the node list) is also the slot of
/// its vector in storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HnswNode {
    /// User-facing key
    pub key: u64,
    /// Maximum level this node exists at
    pub level: usize,
    /// Neighbors at each level (level 0 is index 0)
    pub neighbors: Vec<Vec<u32>>,
    /// Tombstone: still traversable, never returned
    pub removed: bool,
}

impl HnswNode {
    pub fn new(key: u64, level: usize) -> Self {
        Self {
            key,
            level,
            neighbors: (0..=level).map(|_| Vec::new()).collect(),
            removed: false,
        }
    }

    /// Get neighbors at a specific level
    pub fn neighbors_at(&self, level: usize) -> &[u32] {
        self.neighbors.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add a neighbor at a specific level
    pub fn add_neighbor(&mut self, level: usize, neighbor: u32) {
        if let Some(list) = self.neighbors.get_mut(level) {
            if !list.contains(&neighbor) {
                list.push(neighbor);
            }
        }
    }

    /// Set neighbors at a specific level
    pub fn set_neighbors(&mut self, level: usize, neighbors: Vec<u32>) {
        if let Some(list) = self.neighbors.get_mut(level) {
            *list = neighbors;
        }
    }

    /// Drop `neighbor` from the list at `level`
    pub fn remove_neighbor(&mut self, level: usize, neighbor: u32) {
        if let Some(list) = self.neighbors.get_mut(level) {
            list.retain(|&n| n != neighbor);
        }
    }

    /// Total out-degree across levels
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }
}
