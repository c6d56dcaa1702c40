//! HNSW search algorithms

use super::node::HnswNode;
use super::{HnswGraph, Space};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Candidate for search (min-heap by distance)
///
/// Ties are broken by slot number, so results are deterministic for a fixed
/// graph state.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    pub node_id: u32,
    pub distance: f32,
}

impl Candidate {
    fn rank(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.node_id.cmp(&other.node_id))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap (smaller distance = higher priority)
        other.rank(self)
    }
}

/// Max-heap candidate (larger distance = higher priority, used for result pruning)
#[derive(Clone, Copy, Debug)]
pub struct MaxCandidate(pub Candidate);

impl PartialEq for MaxCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MaxCandidate {}

impl PartialOrd for MaxCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MaxCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank(&other.0)
    }
}

/// Sort closest first
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| a.rank(b));
}

/// Search for the `k` nearest live nodes
///
/// Tombstoned nodes are traversed but filtered from the output; the beam is
/// widened by the number of tombstones so they do not crowd out live results.
pub fn search_knn(
    graph: &HnswGraph,
    space: &Space<'_>,
    query: &[u8],
    k: usize,
    ef: usize,
) -> Vec<Candidate> {
    let Some(entry) = graph.entry_point() else {
        return Vec::new();
    };
    let nodes = graph.nodes();
    if nodes.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut current = entry;

    // Phase 1: Greedy search from top level to level 1
    for level in (1..=graph.max_level()).rev() {
        current = greedy_search_layer(nodes, space, query, current, level, None);
    }

    // Phase 2: Search layer 0 with ef candidates
    let ef = ef.max(k).saturating_add(graph.tombstones()).min(nodes.len());
    let candidates = search_layer(nodes, space, query, current, ef, 0, None);

    candidates
        .into_iter()
        .filter(|c| !nodes[c.node_id as usize].removed)
        .take(k)
        .collect()
}

/// Greedy search to find single nearest node at a level
///
/// `skip` is treated as already visited (used while re-inserting a reused slot).
pub fn greedy_search_layer(
    nodes: &[HnswNode],
    space: &Space<'_>,
    query: &[u8],
    entry: u32,
    level: usize,
    skip: Option<u32>,
) -> u32 {
    let mut current = entry;
    let mut current_dist = space.distance_to(query, current);

    loop {
        let mut changed = false;
        for &neighbor_id in nodes[current as usize].neighbors_at(level) {
            if neighbor_id as usize >= nodes.len() || Some(neighbor_id) == skip {
                continue;
            }
            let dist = space.distance_to(query, neighbor_id);
            if dist < current_dist {
                current = neighbor_id;
                current_dist = dist;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    current
}

/// Search layer with ef candidates, returned closest first
pub fn search_layer(
    nodes: &[HnswNode],
    space: &Space<'_>,
    query: &[u8],
    entry: u32,
    ef: usize,
    level: usize,
    skip: Option<u32>,
) -> Vec<Candidate> {
    let ef = ef.max(1);
    let entry = Candidate {
        node_id: entry,
        distance: space.distance_to(query, entry),
    };

    let mut visited = HashSet::new();
    visited.insert(entry.node_id);
    if let Some(skip) = skip {
        visited.insert(skip);
    }

    // Min-heap for candidates to explore
    let mut candidates = BinaryHeap::new();
    candidates.push(entry);

    // Max-heap for results (worst at top for easy pruning)
    let mut results = BinaryHeap::new();
    if Some(entry.node_id) != skip {
        results.push(MaxCandidate(entry));
    }

    while let Some(current) = candidates.pop() {
        // Stop if current is farther than worst result
        if results.len() >= ef {
            if let Some(worst) = results.peek() {
                if current.distance > worst.0.distance {
                    break;
                }
            }
        }

        for &neighbor_id in nodes[current.node_id as usize].neighbors_at(level) {
            if neighbor_id as usize >= nodes.len() || !visited.insert(neighbor_id) {
                continue;
            }

            let dist = space.distance_to(query, neighbor_id);

            let should_add = results.len() < ef
                || results
                    .peek()
                    .map(|worst| dist < worst.0.distance)
                    .unwrap_or(true);

            if should_add {
                let candidate = Candidate {
                    node_id: neighbor_id,
                    distance: dist,
                };
                candidates.push(candidate);
                results.push(MaxCandidate(candidate));

                while results.len() > ef {
                    results.pop();
                }
            }
        }
    }

    let mut result_vec: Vec<Candidate> = results.into_iter().map(|mc| mc.0).collect();
    sort_candidates(&mut result_vec);
    result_vec
}
