//! Shared test utilities for index testing
//!
//! This module provides:
//! - Deterministic vector generation with normalization
//! - Index builders with fixed seeds
//! - Temporary directories for index files
//! - Optional tracing output (`RUST_LOG=debug cargo test`)

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use vortex_dense::{Index, IndexOptions, MetricKind, ScalarKind};

/// Generate a deterministic vector based on seed
pub fn seeded_vector(dims: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let v: Vec<f32> = (0..dims).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect();
    normalize(&v)
}

/// Generate `count` deterministic vectors, seeds `base..base + count`
pub fn seeded_vectors(dims: usize, count: usize, base: u64) -> Vec<Vec<f32>> {
    (0..count as u64).map(|i| seeded_vector(dims, base + i)).collect()
}

/// Normalize a vector to unit length
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Index with a fixed level seed
pub fn seeded_index(dims: usize, metric: MetricKind, scalar: ScalarKind) -> Index {
    Index::new(
        IndexOptions::new(dims)
            .with_metric(metric)
            .with_quantization(scalar)
            .with_seed(42),
    )
    .unwrap()
}

/// Index holding `count` seeded vectors under keys `0..count`
pub fn populated_index(dims: usize, count: usize, metric: MetricKind) -> (Index, Vec<Vec<f32>>) {
    let index = seeded_index(dims, metric, ScalarKind::F32);
    let vectors = seeded_vectors(dims, count, 0);
    let keys: Vec<u64> = (0..count as u64).collect();
    index.add_batch(&keys, &vectors).unwrap().into_result().unwrap();
    (index, vectors)
}

/// Temporary directory and a file path inside it
pub fn temp_index_path(name: &str) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join(name);
    (temp_dir, path)
}

/// Install a test-writer subscriber once per test binary
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
