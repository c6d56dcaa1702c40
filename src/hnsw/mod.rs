//! HNSW (Hierarchical Navigable Small World) graph
//!
//! Key features:
//! - External vector storage: the graph holds slot numbers, never vectors
//! - Tombstoned removal: removed nodes stay traversable until their slot is reused
//! - Deterministic ordering for a fixed graph state
//!
//! The graph itself is not synchronized; the owning index serializes writers.

pub mod insert;
pub mod node;
pub mod persistence;
pub mod search;

use crate::defaults::MAX_LEVELS;
use crate::metric::Metric;
use crate::storage::VectorStorage;
use node::HnswNode;
use serde::{Deserialize, Serialize};

/// Distance oracle over stored vectors
pub struct Space<'a> {
    metric: &'a Metric,
    storage: &'a dyn VectorStorage,
}

impl<'a> Space<'a> {
    pub fn new(metric: &'a Metric, storage: &'a dyn VectorStorage) -> Self {
        Self { metric, storage }
    }

    /// Encoded vector at `slot`
    #[inline]
    pub fn vector(&self, slot: u32) -> &'a [u8] {
        self.storage.read(slot as usize)
    }

    /// Distance from an encoded query to the vector at `slot`
    #[inline]
    pub fn distance_to(&self, query: &[u8], slot: u32) -> f32 {
        self.metric.distance(query, self.vector(slot))
    }

    /// Distance between two stored vectors
    #[inline]
    pub fn between(&self, a: u32, b: u32) -> f32 {
        self.metric.distance(self.vector(a), self.vector(b))
    }
}

/// Structural counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Nodes including tombstones
    pub nodes: usize,
    pub tombstones: usize,
    /// Directed edges across all levels
    pub edges: usize,
    pub max_level: usize,
}

/// Multi-layer proximity graph
#[derive(Clone, Debug)]
pub struct HnswGraph {
    connectivity: usize,
    m_max0: usize,
    ml: f64,
    nodes: Vec<HnswNode>,
    entry_point: Option<u32>,
    max_level: usize,
    tombstones: usize,
}

impl HnswGraph {
    /// Create an empty graph with out-degree `connectivity` (doubled on level 0)
    pub fn new(connectivity: usize) -> Self {
        let connectivity = connectivity.max(2);
        Self {
            connectivity,
            m_max0: connectivity * 2,
            ml: 1.0 / (connectivity as f64).ln(),
            nodes: Vec::new(),
            entry_point: None,
            max_level: 0,
            tombstones: 0,
        }
    }

    pub fn connectivity(&self) -> usize {
        self.connectivity
    }

    /// Neighbor cap at `level`
    pub fn max_neighbors(&self, level: usize) -> usize {
        if level == 0 {
            self.m_max0
        } else {
            self.connectivity
        }
    }

    /// Level normalization factor, `1 / ln(M)`
    pub fn ml(&self) -> f64 {
        self.ml
    }

    pub fn nodes(&self) -> &[HnswNode] {
        &self.nodes
    }

    pub fn node(&self, slot: u32) -> Option<&HnswNode> {
        self.nodes.get(slot as usize)
    }

    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Slots in use, tombstoned or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Update the key stored at `slot`
    pub fn set_key(&mut self, slot: u32, key: u64) {
        if let Some(node) = self.nodes.get_mut(slot as usize) {
            node.key = key;
        }
    }

    /// Tombstone the node at `slot`. Returns false if it was already removed.
    pub fn mark_removed(&mut self, slot: u32) -> bool {
        match self.nodes.get_mut(slot as usize) {
            Some(node) if !node.removed => {
                node.removed = true;
                self.tombstones += 1;
                true
            }
            _ => false,
        }
    }

    /// Prepare a tombstoned slot to be inserted again
    ///
    /// Drops every edge into and out of `slot` and moves the entry point away
    /// from it. The node itself is replaced by the subsequent insert.
    pub fn release(&mut self, slot: u32) {
        let Some(node) = self.nodes.get_mut(slot as usize) else {
            return;
        };
        if node.removed {
            node.removed = false;
            self.tombstones -= 1;
        }
        for list in node.neighbors.iter_mut() {
            list.clear();
        }

        for other in self.nodes.iter_mut() {
            for level in 0..=other.level {
                other.remove_neighbor(level, slot);
            }
        }

        if self.entry_point == Some(slot) {
            self.relocate_entry_point(slot);
        }
    }

    /// Point the entry at the highest live node other than `exclude`
    fn relocate_entry_point(&mut self, exclude: u32) {
        let best = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(slot, _)| *slot as u32 != exclude)
            .max_by(|(a_slot, a), (b_slot, b)| {
                // Prefer live nodes, then higher levels, then lower slots
                (!a.removed, a.level, std::cmp::Reverse(*a_slot))
                    .cmp(&(!b.removed, b.level, std::cmp::Reverse(*b_slot)))
            });

        match best {
            Some((slot, node)) => {
                self.entry_point = Some(slot as u32);
                self.max_level = node.level;
            }
            None => {
                self.entry_point = None;
                self.max_level = 0;
            }
        }
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.entry_point = None;
        self.max_level = 0;
        self.tombstones = 0;
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.len(),
            tombstones: self.tombstones,
            edges: self.nodes.iter().map(HnswNode::edge_count).sum(),
            max_level: self.max_level,
        }
    }

    /// Approximate heap footprint of the adjacency lists
    pub fn memory_usage(&self) -> usize {
        let lists: usize = self
            .nodes
            .iter()
            .map(|node| {
                node.neighbors.capacity() * std::mem::size_of::<Vec<u32>>()
                    + node
                        .neighbors
                        .iter()
                        .map(|l| l.capacity() * std::mem::size_of::<u32>())
                        .sum::<usize>()
            })
            .sum();
        self.nodes.capacity() * std::mem::size_of::<HnswNode>() + lists
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut Vec<HnswNode> {
        &mut self.nodes
    }

    pub(crate) fn set_entry_point(&mut self, slot: u32, level: usize) {
        self.entry_point = Some(slot);
        self.max_level = level.min(MAX_LEVELS - 1);
    }

    /// Rebuild a graph from decoded parts; callers validate structure first
    pub(crate) fn from_parts(
        connectivity: usize,
        nodes: Vec<HnswNode>,
        entry_point: Option<u32>,
        max_level: usize,
    ) -> Self {
        let mut graph = Self::new(connectivity);
        graph.tombstones = nodes.iter().filter(|n| n.removed).count();
        graph.nodes = nodes;
        graph.entry_point = entry_point;
        graph.max_level = max_level;
        graph
    }
}
