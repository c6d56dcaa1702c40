//! Dense vector index
//!
//! [`Index`] owns the proximity graph, the vector storage and the key map behind
//! a single readers-writer lock:
//!
//! - `search`, `contains`, `get` and the accessors share the read side and run
//!   concurrently with each other.
//! - `add`, `add_batch`, `remove`, `rename`, `reserve`, `clear` and `load`
//!   take the write side for the whole operation. A batch holds it across its
//!   capacity growth and every insert, so no reader observes a half-grown index.
//!
//! # Usage
//!
//! ```
//! use vortex_dense::{Index, IndexOptions, MetricKind};
//!
//! let index = Index::new(IndexOptions::new(4).with_metric(MetricKind::L2sq)).unwrap();
//! index.reserve(2).unwrap();
//! index.add(1, &[0.0, 0.0, 0.0, 0.0]).unwrap();
//! index.add(2, &[10.0, 10.0, 10.0, 10.0]).unwrap();
//!
//! let matches = index.search(&[0.0, 0.0, 0.0, 1.0], 1).unwrap();
//! assert_eq!(matches.keys, vec![1]);
//! ```

mod results;
mod state;

pub use crate::hnsw::GraphStats as IndexStats;
pub use results::{BatchReport, Matches};

use crate::config::IndexOptions;
use crate::error::Result;
use crate::metric::{MetricKind, ScalarKind};
use crate::persistence::{self, IndexMetadata};
use parking_lot::RwLock;
use state::IndexState;
use std::fmt;
use std::path::Path;

/// Approximate nearest neighbor index over fixed-dimension vectors
pub struct Index {
    state: RwLock<IndexState>,
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Index")
            .field("metric", &state.metric)
            .field("size", &state.size())
            .field("capacity", &state.capacity())
            .field("connectivity", &state.graph.connectivity())
            .field("view", &state.is_view())
            .finish()
    }
}

impl Index {
    /// Create an empty index, allocating `options.capacity` slots
    pub fn new(options: IndexOptions) -> Result<Self> {
        let state = IndexState::new(&options)?;
        tracing::debug!(
            dimensions = options.dimensions,
            metric = %options.metric,
            scalar = %options.quantization,
            capacity = options.capacity,
            "Created index"
        );
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Create an index from positional parameters; `None` picks the default
    pub fn construct(
        dimensions: usize,
        metric: MetricKind,
        scalar: ScalarKind,
        connectivity: Option<usize>,
        expansion_add: Option<usize>,
        expansion_search: Option<usize>,
        initial_capacity: usize,
    ) -> Result<Self> {
        let defaults = IndexOptions::new(dimensions);
        Self::new(IndexOptions {
            capacity: initial_capacity,
            connectivity: connectivity.unwrap_or(defaults.connectivity),
            expansion_add: expansion_add.unwrap_or(defaults.expansion_add),
            expansion_search: expansion_search.unwrap_or(defaults.expansion_search),
            quantization: scalar,
            metric,
            ..defaults
        })
    }

    /// Build an index described by the file at `path`, then load or view it
    pub fn restore(path: impl AsRef<Path>, view: bool) -> Result<Self> {
        let path = path.as_ref();
        let metadata = persistence::read_metadata(path)?;
        let index = Self::new(IndexOptions {
            dimensions: metadata.dimensions,
            capacity: 0,
            connectivity: metadata.connectivity,
            expansion_add: metadata.expansion_add,
            expansion_search: metadata.expansion_search,
            quantization: metadata.scalar,
            metric: metadata.metric,
            seed: None,
        })?;
        if view {
            index.view(path)?;
        } else {
            index.load(path)?;
        }
        Ok(index)
    }

    /// Read the header of an index file without loading it
    pub fn metadata(path: impl AsRef<Path>) -> Result<IndexMetadata> {
        persistence::read_metadata(path.as_ref())
    }

    /// Grow storage to at least `capacity` slots. Never shrinks.
    pub fn reserve(&self, capacity: usize) -> Result<()> {
        self.state.write().reserve(capacity)
    }

    /// Insert one vector. Fails with `CapacityExceeded` when full.
    pub fn add(&self, key: u64, vector: &[f32]) -> Result<()> {
        self.state.write().add(key, vector)
    }

    /// Insert one vector, growing to the next power of two when full
    pub fn add_reserving(&self, key: u64, vector: &[f32]) -> Result<()> {
        let mut state = self.state.write();
        state.grow_for(1)?;
        state.add(key, vector)
    }

    /// Insert many vectors, best effort
    ///
    /// Grows once to the next power of two at or above `size + keys.len()`,
    /// then inserts in order, continuing past failing elements. Mismatched
    /// lengths, a failed growth and views fail the whole call; per-element
    /// failures are counted in the [`BatchReport`], whose
    /// [`into_result`](BatchReport::into_result) surfaces the last one.
    pub fn add_batch<V: AsRef<[f32]>>(&self, keys: &[u64], vectors: &[V]) -> Result<BatchReport> {
        let report = self.state.write().add_batch(keys, vectors)?;
        tracing::debug!(added = report.added, failed = report.failed, "Batch insert finished");
        Ok(report)
    }

    /// Up to `k` approximate nearest neighbors, closest first
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Matches> {
        self.state.read().search(vector, k)
    }

    /// Exact `k` nearest neighbors by linear scan
    pub fn search_exact(&self, vector: &[f32], k: usize) -> Result<Matches> {
        self.state.read().search_exact(vector, k)
    }

    /// Search several queries under one read lock
    ///
    /// Fails with `DimensionMismatch` before searching if any query has the
    /// wrong length.
    pub fn search_batch<V: AsRef<[f32]>>(&self, queries: &[V], k: usize) -> Result<Vec<Matches>> {
        self.state.read().search_batch(queries, k)
    }

    /// Metric distance between the vectors stored under `a` and `b`
    pub fn pairwise_distance(&self, a: u64, b: u64) -> Result<f32> {
        self.state.read().pairwise_distance(a, b)
    }

    /// Tombstone `key`. Returns false if it was absent.
    pub fn remove(&self, key: u64) -> Result<bool> {
        self.state.write().remove(key)
    }

    /// Relabel `from` as `to`. Returns false if `from` was absent.
    ///
    /// Fails with `DuplicateKey` whenever `to` is live, including `from == to`.
    pub fn rename(&self, from: u64, to: u64) -> Result<bool> {
        self.state.write().rename(from, to)
    }

    pub fn contains(&self, key: u64) -> bool {
        self.state.read().keys.contains_key(&key)
    }

    /// Stored vector for `key`, decoded from its scalar encoding
    pub fn get(&self, key: u64) -> Result<Vec<f32>> {
        self.state.read().get(key)
    }

    /// Live keys in slot order
    pub fn keys(&self) -> Vec<u64> {
        self.state.read().keys()
    }

    /// Remove every entry, keeping capacity
    pub fn clear(&self) -> Result<()> {
        self.state.write().clear()
    }

    /// Drop every entry and all storage. Also detaches a view.
    pub fn reset(&self) {
        self.state.write().reset();
    }

    /// Deep copy into owned memory, also when `self` is a view
    pub fn try_clone(&self) -> Result<Self> {
        let state = self.state.read().try_clone()?;
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Write the index to `path`, replacing any existing file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let state = self.state.read();
        persistence::save(
            path.as_ref(),
            state.metadata(),
            state.storage.as_ref(),
            &state.graph,
        )?;
        Ok(())
    }

    /// Replace the contents with the file at `path`, copied into memory
    ///
    /// On failure the index is left as it was.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let image = persistence::load(path.as_ref())?;
        let mut state = self.state.write();
        state.check_compatible(&image.metadata)?;
        state.install(image)
    }

    /// Replace the contents with a read-only memory map of the file at `path`
    ///
    /// The file must not be truncated or rewritten in place while viewed.
    /// Saving over it through [`save`](Self::save) is fine, since that writes a
    /// new file and renames it.
    pub fn view(&self, path: impl AsRef<Path>) -> Result<()> {
        let image = persistence::view(path.as_ref())?;
        let mut state = self.state.write();
        state.check_compatible(&image.metadata)?;
        state.install(image)
    }

    pub fn dimensions(&self) -> usize {
        self.state.read().metric.dimensions()
    }

    /// Live entries
    pub fn size(&self) -> usize {
        self.state.read().size()
    }

    /// Allocated slots
    pub fn capacity(&self) -> usize {
        self.state.read().capacity()
    }

    pub fn connectivity(&self) -> usize {
        self.state.read().graph.connectivity()
    }

    pub fn expansion_add(&self) -> usize {
        self.state.read().expansion_add
    }

    pub fn expansion_search(&self) -> usize {
        self.state.read().expansion_search
    }

    pub fn set_expansion_add(&self, expansion: usize) -> Result<()> {
        let expansion = check_expansion(expansion)?;
        self.state.write().expansion_add = expansion;
        Ok(())
    }

    pub fn set_expansion_search(&self, expansion: usize) -> Result<()> {
        let expansion = check_expansion(expansion)?;
        self.state.write().expansion_search = expansion;
        Ok(())
    }

    pub fn metric_kind(&self) -> MetricKind {
        self.state.read().metric.kind()
    }

    pub fn scalar_kind(&self) -> ScalarKind {
        self.state.read().metric.scalar()
    }

    /// Whether the index reads vectors from a memory-mapped file
    pub fn is_view(&self) -> bool {
        self.state.read().is_view()
    }

    /// Approximate heap bytes held by the index
    pub fn memory_usage(&self) -> usize {
        self.state.read().memory_usage()
    }

    pub fn stats(&self) -> IndexStats {
        self.state.read().graph.stats()
    }
}

fn check_expansion(expansion: usize) -> Result<usize> {
    if expansion == 0 {
        return Err(crate::error::IndexError::invalid_argument(
            "expansion must be greater than 0",
        ));
    }
    Ok(expansion)
}
