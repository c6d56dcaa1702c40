//! Index state behind the lock
//!
//! Every method here assumes the caller holds the appropriate side of the
//! index lock. Checks run before any mutation, so a failed call leaves the
//! state exactly as it was.

use super::results::{BatchReport, Matches};
use crate::config::IndexOptions;
use crate::error::{IndexError, Result};
use crate::hnsw::insert::{insert_node, random_level};
use crate::hnsw::search::{search_knn, sort_candidates, Candidate};
use crate::hnsw::{HnswGraph, Space};
use crate::metric::Metric;
use crate::persistence::{IndexImage, IndexMetadata};
use crate::storage::{HeapStorage, VectorStorage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

pub(crate) struct IndexState {
    pub metric: Metric,
    pub expansion_add: usize,
    pub expansion_search: usize,
    pub storage: Box<dyn VectorStorage>,
    pub graph: HnswGraph,
    /// Live key to slot
    pub keys: HashMap<u64, u32>,
    /// Tombstoned slots, lowest last
    pub free_slots: Vec<u32>,
    pub rng: StdRng,
}

impl IndexState {
    pub fn new(options: &IndexOptions) -> Result<Self> {
        options.validate()?;
        let metric = Metric::new(options.metric, options.quantization, options.dimensions);
        let storage = HeapStorage::with_capacity(metric.bytes_per_vector(), options.capacity)?;
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut state = Self {
            metric,
            expansion_add: options.expansion_add,
            expansion_search: options.expansion_search,
            storage: Box::new(storage),
            graph: HnswGraph::new(options.connectivity),
            keys: HashMap::new(),
            free_slots: Vec::new(),
            rng,
        };
        state.reserve_keys(options.capacity)?;
        Ok(state)
    }

    pub fn size(&self) -> usize {
        self.keys.len()
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    pub fn metadata(&self) -> IndexMetadata {
        IndexMetadata {
            version: crate::defaults::INDEX_FILE_VERSION,
            metric: self.metric.kind(),
            scalar: self.metric.scalar(),
            dimensions: self.metric.dimensions(),
            connectivity: self.graph.connectivity(),
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            size: self.size(),
            slots: self.graph.len(),
            capacity: self.capacity(),
        }
    }

    /// Whether vectors are read from a file mapping
    pub fn is_view(&self) -> bool {
        !self.storage.is_writable()
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_view() {
            Err(IndexError::ReadOnlyView)
        } else {
            Ok(())
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        let expected = self.metric.dimensions();
        if vector.len() != expected {
            return Err(IndexError::dimension_mismatch(expected, vector.len()));
        }
        Ok(())
    }

    fn reserve_keys(&mut self, capacity: usize) -> Result<()> {
        let additional = capacity.saturating_sub(self.keys.len());
        self.keys.try_reserve(additional).map_err(IndexError::out_of_memory(
            additional.saturating_mul(std::mem::size_of::<(u64, u32)>()),
        ))
    }

    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        self.ensure_writable()?;
        if capacity <= self.capacity() {
            return Ok(());
        }

        let previous = self.capacity();
        self.reserve_keys(capacity)?;
        self.storage.allocate(capacity)?;
        tracing::debug!(previous, capacity, "Reserved index capacity");
        Ok(())
    }

    /// Grow to the next power of two when `incoming` more entries would fill the index
    pub fn grow_for(&mut self, incoming: usize) -> Result<()> {
        if incoming == 0 {
            return Ok(());
        }
        let needed = self.size().saturating_add(incoming);
        if needed < self.capacity() {
            return Ok(());
        }
        let target = needed.checked_next_power_of_two().ok_or(IndexError::OutOfMemory {
            requested_bytes: usize::MAX,
        })?;
        self.reserve(target)
    }

    pub fn add(&mut self, key: u64, vector: &[f32]) -> Result<()> {
        self.ensure_writable()?;
        self.check_dimensions(vector)?;
        if self.keys.contains_key(&key) {
            return Err(IndexError::DuplicateKey { key });
        }
        if self.size() >= self.capacity() {
            return Err(IndexError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }

        let encoded = self.metric.encode(vector);

        // Every remaining node is a tombstone: start over
        if self.size() == 0 && !self.graph.is_empty() {
            self.graph.clear();
            self.free_slots.clear();
        }

        let slot = match self.free_slots.last() {
            Some(&slot) => slot,
            None => self.graph.len() as u32,
        };
        self.storage.write(slot as usize, &encoded)?;
        if self.free_slots.last() == Some(&slot) {
            self.free_slots.pop();
            self.graph.release(slot);
        }

        let level = random_level(self.graph.ml(), &mut self.rng);
        let space = Space::new(&self.metric, self.storage.as_ref());
        insert_node(&mut self.graph, &space, slot, key, level, self.expansion_add);
        self.keys.insert(key, slot);
        Ok(())
    }

    pub fn add_batch<V: AsRef<[f32]>>(&mut self, keys: &[u64], vectors: &[V]) -> Result<BatchReport> {
        self.ensure_writable()?;
        if keys.len() != vectors.len() {
            return Err(IndexError::invalid_argument(format!(
                "{} keys for {} vectors",
                keys.len(),
                vectors.len()
            )));
        }
        self.grow_for(keys.len())?;

        let mut report = BatchReport::default();
        for (&key, vector) in keys.iter().zip(vectors) {
            match self.add(key, vector.as_ref()) {
                Ok(()) => report.added += 1,
                Err(err) => {
                    tracing::warn!(key, error = %err, "Batch insert skipped entry");
                    report.failed += 1;
                    report.last_error = Some(err);
                }
            }
        }
        Ok(report)
    }

    pub fn search(&self, vector: &[f32], k: usize) -> Result<Matches> {
        self.check_dimensions(vector)?;
        let query = self.metric.encode(vector);
        let space = Space::new(&self.metric, self.storage.as_ref());
        let found = search_knn(&self.graph, &space, &query, k, self.expansion_search);
        Ok(self.collect(found))
    }

    pub fn search_exact(&self, vector: &[f32], k: usize) -> Result<Matches> {
        self.check_dimensions(vector)?;
        let query = self.metric.encode(vector);
        let space = Space::new(&self.metric, self.storage.as_ref());

        let mut scored: Vec<Candidate> = self
            .keys
            .values()
            .map(|&slot| Candidate {
                node_id: slot,
                distance: space.distance_to(&query, slot),
            })
            .collect();
        sort_candidates(&mut scored);
        scored.truncate(k);
        Ok(self.collect(scored))
    }

    /// One search per query; every query is checked before any runs
    pub fn search_batch<V: AsRef<[f32]>>(&self, queries: &[V], k: usize) -> Result<Vec<Matches>> {
        for query in queries {
            self.check_dimensions(query.as_ref())?;
        }
        queries
            .iter()
            .map(|query| self.search(query.as_ref(), k))
            .collect()
    }

    /// Distance between the stored vectors of two live keys
    pub fn pairwise_distance(&self, a: u64, b: u64) -> Result<f32> {
        let slot_of = |key: u64| {
            self.keys
                .get(&key)
                .copied()
                .ok_or(IndexError::KeyNotFound { key })
        };
        let (a, b) = (slot_of(a)?, slot_of(b)?);
        Ok(Space::new(&self.metric, self.storage.as_ref()).between(a, b))
    }

    fn collect(&self, found: Vec<Candidate>) -> Matches {
        let mut matches = Matches::with_capacity(found.len());
        for candidate in found {
            if let Some(node) = self.graph.node(candidate.node_id) {
                matches.push(node.key, candidate.distance);
            }
        }
        matches
    }

    pub fn remove(&mut self, key: u64) -> Result<bool> {
        self.ensure_writable()?;
        let Some(slot) = self.keys.remove(&key) else {
            return Ok(false);
        };
        self.graph.mark_removed(slot);

        // Keep the lowest slot at the end so it is reused first
        let at = self.free_slots.partition_point(|&s| s > slot);
        self.free_slots.insert(at, slot);
        Ok(true)
    }

    pub fn rename(&mut self, from: u64, to: u64) -> Result<bool> {
        self.ensure_writable()?;
        if self.keys.contains_key(&to) {
            return Err(IndexError::DuplicateKey { key: to });
        }
        let Some(slot) = self.keys.remove(&from) else {
            return Ok(false);
        };
        self.keys.insert(to, slot);
        self.graph.set_key(slot, to);
        Ok(true)
    }

    pub fn get(&self, key: u64) -> Result<Vec<f32>> {
        let slot = self
            .keys
            .get(&key)
            .ok_or(IndexError::KeyNotFound { key })?;
        Ok(self.metric.decode(self.storage.read(*slot as usize)))
    }

    /// Live keys in slot order
    pub fn keys(&self) -> Vec<u64> {
        self.graph
            .nodes()
            .iter()
            .filter(|node| !node.removed)
            .map(|node| node.key)
            .collect()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.graph.clear();
        self.keys.clear();
        self.free_slots.clear();
        Ok(())
    }

    /// Drop every entry and all storage, leaving view mode
    pub fn reset(&mut self) {
        self.storage = Box::new(HeapStorage::new(self.metric.bytes_per_vector()));
        self.graph.clear();
        self.keys = HashMap::new();
        self.free_slots = Vec::new();
    }

    /// Deep copy into owned storage
    pub fn try_clone(&self) -> Result<Self> {
        let capacity = self.capacity();
        let storage = HeapStorage::copy_from(self.storage.as_ref(), capacity, capacity)?;
        Ok(Self {
            metric: self.metric,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            storage: Box::new(storage),
            graph: self.graph.clone(),
            keys: self.keys.clone(),
            free_slots: self.free_slots.clone(),
            rng: self.rng.clone(),
        })
    }

    /// Check a decoded file matches this index's vector layout
    pub fn check_compatible(&self, metadata: &IndexMetadata) -> Result<()> {
        let ours = (
            self.metric.kind(),
            self.metric.scalar(),
            self.metric.dimensions(),
        );
        let theirs = (metadata.metric, metadata.scalar, metadata.dimensions);
        if ours != theirs {
            return Err(IndexError::corrupt(format!(
                "file holds {}-dimensional {}/{} vectors, index expects {}-dimensional {}/{}",
                theirs.2, theirs.0, theirs.1, ours.2, ours.0, ours.1
            )));
        }
        Ok(())
    }

    /// Replace everything with a decoded image
    pub fn install(&mut self, image: IndexImage) -> Result<()> {
        let IndexImage {
            metadata,
            storage,
            graph,
        } = image;

        let mut keys = HashMap::new();
        keys.try_reserve(metadata.capacity)
            .map_err(IndexError::out_of_memory(
                metadata.capacity.saturating_mul(std::mem::size_of::<(u64, u32)>()),
            ))?;
        let mut free_slots = Vec::new();
        for (slot, node) in graph.nodes().iter().enumerate() {
            if node.removed {
                free_slots.push(slot as u32);
            } else if keys.insert(node.key, slot as u32).is_some() {
                return Err(IndexError::corrupt(format!(
                    "key {} stored twice",
                    node.key
                )));
            }
        }
        free_slots.reverse();

        self.expansion_add = metadata.expansion_add.max(1);
        self.expansion_search = metadata.expansion_search.max(1);
        self.storage = storage;
        self.graph = graph;
        self.keys = keys;
        self.free_slots = free_slots;
        Ok(())
    }

    pub fn memory_usage(&self) -> usize {
        self.storage.memory_usage()
            + self.graph.memory_usage()
            + self.keys.capacity() * std::mem::size_of::<(u64, u32)>()
            + self.free_slots.capacity() * std::mem::size_of::<u32>()
    }
}
