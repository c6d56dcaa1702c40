//! HNSW insert algorithms

use super::node::HnswNode;
use super::search::{greedy_search_layer, search_layer, sort_candidates, Candidate};
use super::{HnswGraph, Space};
use crate::defaults::MAX_LEVELS;
use rand::Rng;

/// Insert the vector stored at `slot` into the graph under `key`
///
/// `slot` is either the next unused slot (`graph.len()`) or a slot previously
/// handed to [`HnswGraph::release`]. The vector must already be in storage.
pub fn insert_node(
    graph: &mut HnswGraph,
    space: &Space<'_>,
    slot: u32,
    key: u64,
    level: usize,
    expansion: usize,
) {
    let level = level.min(MAX_LEVELS - 1);
    let index = slot as usize;
    let node = HnswNode::new(key, level);
    if index < graph.len() {
        graph.nodes_mut()[index] = node;
    } else {
        debug_assert_eq!(index, graph.len());
        graph.nodes_mut().push(node);
    }

    // Handle first node
    let Some(entry_point) = graph.entry_point().filter(|&ep| ep != slot) else {
        graph.set_entry_point(slot, level);
        return;
    };

    let query = space.vector(slot);
    let current_max_level = graph.max_level();
    let mut current = entry_point;

    // Traverse from top to the node's level + 1 (greedy search)
    for l in (level + 1..=current_max_level).rev() {
        current = greedy_search_layer(graph.nodes(), space, query, current, l, Some(slot));
    }

    // Insert at each level from level down to 0
    for l in (0..=level.min(current_max_level)).rev() {
        let candidates = search_layer(graph.nodes(), space, query, current, expansion, l, Some(slot));

        let max_neighbors = graph.max_neighbors(l);
        let selected = select_neighbors(&candidates, max_neighbors);

        let nodes = graph.nodes_mut();
        nodes[index].set_neighbors(l, selected.clone());

        // Create bidirectional edges
        for &neighbor_id in &selected {
            let neighbor = neighbor_id as usize;
            nodes[neighbor].add_neighbor(l, slot);

            if nodes[neighbor].neighbors_at(l).len() > max_neighbors {
                let pruned = prune_neighbors(nodes, space, neighbor_id, l, max_neighbors);
                nodes[neighbor].set_neighbors(l, pruned);
            }
        }

        // Use closest neighbor as entry point for next level
        if let Some(closest) = candidates.first() {
            current = closest.node_id;
        }
    }

    if level > current_max_level {
        graph.set_entry_point(slot, level);
    }
}

/// Draw a level from the exponential distribution `floor(-ln(u) * ml)`
pub fn random_level<R: Rng + ?Sized>(ml: f64, rng: &mut R) -> usize {
    // 1 - [0, 1) keeps the argument of ln away from zero
    let r: f64 = 1.0 - rng.gen::<f64>();
    let level = (-r.ln() * ml).floor();
    (level as usize).min(MAX_LEVELS - 1)
}

/// Take the closest `max_count` candidates
///
/// Candidates must be sorted by distance to the query vector.
fn select_neighbors(candidates: &[Candidate], max_count: usize) -> Vec<u32> {
    let mut result = Vec::with_capacity(max_count.min(candidates.len()));
    for candidate in candidates {
        if result.len() >= max_count {
            break;
        }
        if !result.contains(&candidate.node_id) {
            result.push(candidate.node_id);
        }
    }
    result
}

/// Shrink the list of `node_id` at `level` to its `max_count` closest entries
fn prune_neighbors(
    nodes: &[HnswNode],
    space: &Space<'_>,
    node_id: u32,
    level: usize,
    max_count: usize,
) -> Vec<u32> {
    let mut scored: Vec<Candidate> = nodes[node_id as usize]
        .neighbors_at(level)
        .iter()
        .filter(|&&n| (n as usize) < nodes.len())
        .map(|&n| Candidate {
            node_id: n,
            distance: space.between(node_id, n),
        })
        .collect();

    sort_candidates(&mut scored);
    scored.into_iter().take(max_count).map(|c| c.node_id).collect()
}
