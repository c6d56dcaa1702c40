//! # Vortex Dense
//!
//! An in-process approximate nearest neighbor index over dense vectors.
//!
//! ## Architecture
//!
//! ```text
//! Index (RwLock<IndexState>)
//!     ├── Metric (distance fn resolved once per index)
//!     ├── VectorStorage (heap or memory-mapped file)
//!     ├── HnswGraph (layered proximity graph, tombstones)
//!     └── key map (live key → slot)
//! ```
//!
//! ## Features
//!
//! - **Metrics**: inner product, squared L2, cosine, Pearson, haversine, Hamming,
//!   Tanimoto and Sorensen
//! - **Quantization**: vectors stored as i8, f16, f32, f64 or packed bits
//! - **Persistence**: checksummed single-file format, loaded into memory or viewed
//!   through a read-only memory map
//! - **Concurrency**: concurrent readers, serialized writers
//!
//! ## Quick Start
//!
//! ```
//! use vortex_dense::{Index, IndexOptions, MetricKind};
//!
//! let index = Index::new(IndexOptions::new(3).with_metric(MetricKind::Cosine)).unwrap();
//! index.add_batch(&[1, 2], &[[1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0]]).unwrap();
//!
//! let matches = index.search(&[0.9, 0.1, 0.0], 1).unwrap();
//! assert_eq!(matches.keys, vec![1]);
//! ```

pub mod config;
pub mod defaults;
pub mod error;
pub mod hnsw;
pub mod index;
pub mod metric;
pub mod persistence;
pub mod storage;

pub use config::IndexOptions;
pub use defaults::*;
pub use error::{IndexError, Result};
pub use index::{BatchReport, Index, IndexStats, Matches};
pub use metric::{Metric, MetricKind, ScalarKind};
pub use persistence::IndexMetadata;
