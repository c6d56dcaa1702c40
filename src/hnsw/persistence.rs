//! HNSW graph serialization
//!
//! The graph is written as a bincode image. Decoding validates the structure
//! before handing it out, so a damaged image can never produce out-of-range
//! neighbor slots during search.

use super::node::HnswNode;
use super::HnswGraph;
use crate::defaults::MAX_LEVELS;
use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};

/// Serializable graph state (borrowed side)
#[derive(Serialize)]
struct GraphImageRef<'a> {
    connectivity: u32,
    entry_point: Option<u32>,
    max_level: u32,
    nodes: &'a [HnswNode],
}

/// Serializable graph state (owned side)
#[derive(Deserialize)]
struct GraphImage {
    connectivity: u32,
    entry_point: Option<u32>,
    max_level: u32,
    nodes: Vec<HnswNode>,
}

/// Encode the graph to bytes
pub fn encode_graph(graph: &HnswGraph) -> Result<Vec<u8>> {
    let image = GraphImageRef {
        connectivity: graph.connectivity() as u32,
        entry_point: graph.entry_point(),
        max_level: graph.max_level() as u32,
        nodes: graph.nodes(),
    };
    bincode::serialize(&image).map_err(|e| IndexError::serialization(e.to_string()))
}

/// Decode a graph image holding at most `max_nodes` nodes
pub fn decode_graph(bytes: &[u8], max_nodes: usize) -> Result<HnswGraph> {
    let image: GraphImage = bincode::deserialize(bytes)
        .map_err(|e| IndexError::corrupt(format!("graph image: {}", e)))?;

    if image.nodes.len() > max_nodes {
        return Err(IndexError::corrupt(format!(
            "graph holds {} nodes but only {} slots are stored",
            image.nodes.len(),
            max_nodes
        )));
    }
    validate(&image)?;

    Ok(HnswGraph::from_parts(
        image.connectivity as usize,
        image.nodes,
        image.entry_point,
        image.max_level as usize,
    ))
}

fn validate(image: &GraphImage) -> Result<()> {
    let count = image.nodes.len();

    match image.entry_point {
        None if count == 0 => {}
        None => return Err(IndexError::corrupt("non-empty graph without entry point")),
        Some(ep) => {
            let node = image
                .nodes
                .get(ep as usize)
                .ok_or_else(|| IndexError::corrupt(format!("entry point {} out of range", ep)))?;
            if node.level != image.max_level as usize {
                return Err(IndexError::corrupt(format!(
                    "entry point level {} differs from max level {}",
                    node.level, image.max_level
                )));
            }
        }
    }

    for (slot, node) in image.nodes.iter().enumerate() {
        if node.level >= MAX_LEVELS || node.neighbors.len() != node.level + 1 {
            return Err(IndexError::corrupt(format!(
                "node {} has level {} with {} neighbor lists",
                slot,
                node.level,
                node.neighbors.len()
            )));
        }
        if let Some(bad) = node
            .neighbors
            .iter()
            .flatten()
            .find(|&&n| n as usize >= count || n as usize == slot)
        {
            return Err(IndexError::corrupt(format!(
                "node {} links to invalid slot {}",
                slot, bad
            )));
        }
    }

    Ok(())
}
