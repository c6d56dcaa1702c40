//! Index behavior tests
//!
//! Tests covering:
//! - Construction and defaults
//! - Capacity and reservation
//! - Key uniqueness, removal and renaming
//! - Search ordering and self-search across metrics and scalar kinds
//! - Batch inserts

mod common;

use common::{init_tracing, populated_index, seeded_index, seeded_vector, seeded_vectors};
use vortex_dense::{Index, IndexError, IndexOptions, MetricKind, ScalarKind};

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_nearest_of_two() {
    let index = Index::new(IndexOptions::new(4).with_metric(MetricKind::L2sq)).unwrap();
    index.reserve(2).unwrap();
    index.add(1, &[0.0, 0.0, 0.0, 0.0]).unwrap();
    index.add(2, &[10.0, 10.0, 10.0, 10.0]).unwrap();

    let matches = index.search(&[0.0, 0.0, 0.0, 1.0], 1).unwrap();
    assert_eq!(matches.keys, vec![1]);
    assert_eq!(matches.count, 1);
    assert!((matches.distances[0] - 1.0).abs() < 1e-6);
}

#[test]
fn test_add_without_reservation() {
    let index = Index::new(IndexOptions::new(4).with_metric(MetricKind::L2sq)).unwrap();
    index.reserve(0).unwrap();

    let err = index.add(1, &[1.0, 2.0, 3.0, 4.0]).unwrap_err();
    assert!(matches!(err, IndexError::CapacityExceeded { capacity: 0 }));
    assert_eq!(index.size(), 0);
}

// ============================================================================
// CAPACITY
// ============================================================================

#[test]
fn test_reserve_preserves_entries() {
    let index = seeded_index(8, MetricKind::L2sq, ScalarKind::F32);
    index.reserve(4).unwrap();
    let vectors = seeded_vectors(8, 4, 100);
    for (key, v) in vectors.iter().enumerate() {
        index.add(key as u64, v).unwrap();
    }
    assert!(index.add(99, &vectors[0]).is_err());

    let before: Vec<_> = vectors
        .iter()
        .map(|v| index.search(v, 2).unwrap())
        .collect();

    index.reserve(1000).unwrap();
    assert!(index.capacity() >= 1000);
    index.reserve(10).unwrap();
    assert!(index.capacity() >= 1000, "reserve never shrinks");

    for (key, v) in vectors.iter().enumerate() {
        assert!(index.contains(key as u64));
        assert_eq!(index.search(v, 2).unwrap(), before[key]);
    }
}

#[test]
fn test_size_never_exceeds_capacity() {
    let index = seeded_index(4, MetricKind::InnerProduct, ScalarKind::F32);
    index.reserve(3).unwrap();
    for key in 0..10u64 {
        let _ = index.add(key, &seeded_vector(4, key));
        assert!(index.size() <= index.capacity());
    }
    assert_eq!(index.size(), 3);
}

// ============================================================================
// IDENTITY
// ============================================================================

#[test]
fn test_duplicate_key_rejected() {
    let (index, vectors) = populated_index(8, 10, MetricKind::Cosine);
    index.reserve(20).unwrap();

    let err = index.add(3, &vectors[0]).unwrap_err();
    assert!(matches!(err, IndexError::DuplicateKey { key: 3 }));
    assert_eq!(index.size(), 10);
}

#[test]
fn test_dimension_mismatch_never_mutates() {
    let (index, _) = populated_index(8, 5, MetricKind::L2sq);
    index.reserve(10).unwrap();

    assert!(matches!(
        index.add(100, &[1.0; 7]),
        Err(IndexError::DimensionMismatch {
            expected: 8,
            actual: 7
        })
    ));
    assert!(matches!(
        index.search(&[1.0; 9], 1),
        Err(IndexError::DimensionMismatch { .. })
    ));
    assert_eq!(index.size(), 5);
    assert!(!index.contains(100));
}

#[test]
fn test_remove_is_idempotent() {
    let (index, vectors) = populated_index(8, 20, MetricKind::L2sq);

    assert!(!index.remove(1000).unwrap());
    assert!(index.remove(5).unwrap());
    assert_eq!(index.size(), 19);
    assert!(!index.contains(5));
    assert!(!index.remove(5).unwrap());

    let matches = index.search(&vectors[5], 20).unwrap();
    assert_eq!(matches.count, 19);
    assert!(!matches.keys.contains(&5));
    assert!(matches!(
        index.get(5),
        Err(IndexError::KeyNotFound { key: 5 })
    ));
}

#[test]
fn test_removed_key_can_be_added_again() {
    let (index, vectors) = populated_index(8, 8, MetricKind::L2sq);
    index.remove(2).unwrap();
    index.add(2, &vectors[7]).unwrap();

    assert_eq!(index.size(), 8);
    let matches = index.search(&vectors[7], 2).unwrap();
    assert!(matches.keys.contains(&2));
    assert!(matches.keys.contains(&7));
}

#[test]
fn test_rename() {
    let (index, vectors) = populated_index(8, 10, MetricKind::L2sq);

    assert!(index.rename(3, 300).unwrap());
    assert!(!index.contains(3));
    assert!(index.contains(300));
    assert_eq!(index.search(&vectors[3], 1).unwrap().keys, vec![300]);

    assert!(!index.rename(3, 301).unwrap());
    assert!(matches!(
        index.rename(300, 4),
        Err(IndexError::DuplicateKey { key: 4 })
    ));
    assert!(index.contains(300));
    assert!(matches!(
        index.rename(300, 300),
        Err(IndexError::DuplicateKey { key: 300 })
    ));
    assert!(!index.rename(3, 3).unwrap());
    assert_eq!(index.size(), 10);
}

#[test]
fn test_get_returns_stored_vector() {
    let (index, vectors) = populated_index(16, 4, MetricKind::InnerProduct);
    assert_eq!(index.get(2).unwrap(), vectors[2]);
    assert_eq!(index.keys(), vec![0, 1, 2, 3]);
}

// ============================================================================
// SEARCH
// ============================================================================

#[test]
fn test_search_orders_by_distance() {
    let (index, vectors) = populated_index(16, 200, MetricKind::L2sq);
    let matches = index.search(&vectors[17], 10).unwrap();

    assert_eq!(matches.count, 10);
    assert_eq!(matches.keys.len(), matches.distances.len());
    assert!(matches.distances.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_search_fewer_than_k() {
    let (index, vectors) = populated_index(4, 3, MetricKind::L2sq);
    let matches = index.search(&vectors[0], 10).unwrap();
    assert_eq!(matches.count, 3);

    let empty = seeded_index(4, MetricKind::L2sq, ScalarKind::F32);
    assert!(empty.search(&vectors[0], 10).unwrap().is_empty());
    assert!(index.search(&vectors[0], 0).unwrap().is_empty());
}

#[test]
fn test_search_unbounded_k_with_tombstones() {
    let (index, vectors) = populated_index(4, 10, MetricKind::L2sq);
    index.remove(3).unwrap();

    let matches = index.search(&vectors[0], usize::MAX).unwrap();
    assert_eq!(matches.count, 9);
    assert_eq!(matches.keys[0], 0);
    assert!(!matches.keys.contains(&3));
}

#[test]
fn test_search_batch_matches_single_searches() {
    let (index, vectors) = populated_index(16, 100, MetricKind::Cosine);
    let queries = vec![vectors[4].clone(), seeded_vector(16, 4242), vectors[90].clone()];

    let batch = index.search_batch(&queries, 5).unwrap();
    assert_eq!(batch.len(), 3);
    for (query, matches) in queries.iter().zip(&batch) {
        assert_eq!(matches, &index.search(query, 5).unwrap());
    }
    assert_eq!(batch[0].keys[0], 4);
    assert_eq!(batch[2].keys[0], 90);

    let empty: Vec<Vec<f32>> = Vec::new();
    assert!(index.search_batch(&empty, 5).unwrap().is_empty());
}

#[test]
fn test_search_batch_rejects_any_bad_query() {
    let (index, vectors) = populated_index(8, 10, MetricKind::L2sq);
    let err = index
        .search_batch(&[vectors[0].clone(), vec![0.0; 3]], 2)
        .unwrap_err();
    assert!(matches!(
        err,
        IndexError::DimensionMismatch {
            expected: 8,
            actual: 3
        }
    ));
}

#[test]
fn test_pairwise_distance() {
    let index = seeded_index(2, MetricKind::L2sq, ScalarKind::F32);
    index
        .add_batch(&[1, 2], &[[0.0f32, 0.0], [3.0, 4.0]])
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(index.pairwise_distance(1, 2).unwrap(), 25.0);
    assert_eq!(index.pairwise_distance(2, 1).unwrap(), 25.0);
    assert_eq!(index.pairwise_distance(1, 1).unwrap(), 0.0);

    index.remove(2).unwrap();
    assert!(matches!(
        index.pairwise_distance(1, 2),
        Err(IndexError::KeyNotFound { key: 2 })
    ));
    assert!(matches!(
        index.pairwise_distance(7, 1),
        Err(IndexError::KeyNotFound { key: 7 })
    ));
}

#[test]
fn test_search_is_deterministic() {
    let (index, _) = populated_index(16, 300, MetricKind::Cosine);
    let query = seeded_vector(16, 9999);
    let first = index.search(&query, 15).unwrap();
    for _ in 0..5 {
        assert_eq!(index.search(&query, 15).unwrap(), first);
    }
}

#[test]
fn test_self_search_across_kinds() {
    init_tracing();
    let cases = [
        (MetricKind::L2sq, ScalarKind::F32),
        (MetricKind::L2sq, ScalarKind::F64),
        (MetricKind::Cosine, ScalarKind::F32),
        (MetricKind::Cosine, ScalarKind::F16),
        (MetricKind::Cosine, ScalarKind::I8),
        (MetricKind::Pearson, ScalarKind::F32),
    ];

    for (metric, scalar) in cases {
        let index = seeded_index(32, metric, scalar);
        let vectors = seeded_vectors(32, 100, 500);
        let keys: Vec<u64> = (0..100).collect();
        index.add_batch(&keys, &vectors).unwrap().into_result().unwrap();

        for key in [0usize, 37, 99] {
            let matches = index.search(&vectors[key], 1).unwrap();
            assert_eq!(matches.keys, vec![key as u64], "{}/{}", metric, scalar);
            assert!(matches.distances[0].abs() < 1e-2, "{}/{}", metric, scalar);
        }
    }
}

#[test]
fn test_recall_against_exact() {
    let (index, _) = populated_index(24, 500, MetricKind::L2sq);
    let mut hits = 0;
    let mut total = 0;

    for seed in 0..20 {
        let query = seeded_vector(24, 10_000 + seed);
        let approx = index.search(&query, 10).unwrap();
        let exact = index.search_exact(&query, 10).unwrap();
        hits += approx.keys.iter().filter(|k| exact.keys.contains(k)).count();
        total += exact.count;
    }

    let recall = hits as f64 / total as f64;
    assert!(recall > 0.9, "recall {}", recall);
}

#[test]
fn test_bitwise_metrics() {
    let index = seeded_index(16, MetricKind::Hamming, ScalarKind::B1);
    let mut a = vec![0.0; 16];
    a[0] = 1.0;
    let mut b = a.clone();
    b[1] = 1.0;
    b[2] = 1.0;
    let c = vec![1.0; 16];

    index
        .add_batch(&[1, 2, 3], &[a.clone(), b, c])
        .unwrap()
        .into_result()
        .unwrap();

    let matches = index.search(&a, 3).unwrap();
    assert_eq!(matches.keys, vec![1, 2, 3]);
    assert_eq!(matches.distances, vec![0.0, 2.0, 15.0]);
}

#[test]
fn test_haversine_nearest_city() {
    let to_rad = |deg: f32| deg.to_radians();
    let index = seeded_index(2, MetricKind::Haversine, ScalarKind::F64);
    let cities = [
        [to_rad(48.85), to_rad(2.35)],    // Paris
        [to_rad(51.51), to_rad(-0.13)],   // London
        [to_rad(40.71), to_rad(-74.01)],  // New York
    ];
    index.add_batch(&[1, 2, 3], &cities).unwrap().into_result().unwrap();

    // Brussels
    let matches = index.search(&[to_rad(50.85), to_rad(4.35)], 3).unwrap();
    assert_eq!(matches.keys, vec![1, 2, 3]);
}

// ============================================================================
// BATCH
// ============================================================================

#[test]
fn test_batch_grows_to_power_of_two() {
    let index = seeded_index(4, MetricKind::L2sq, ScalarKind::F32);
    let report = index
        .add_batch(&(0..5).collect::<Vec<u64>>(), &seeded_vectors(4, 5, 0))
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.added, 5);
    assert_eq!(index.capacity(), 8);
}

#[test]
fn test_batch_continues_past_failures() {
    let (index, vectors) = populated_index(4, 2, MetricKind::L2sq);
    let report = index
        .add_batch(
            &[10, 1, 11, 12],
            &[
                vectors[0].clone(),
                vectors[1].clone(),
                vec![0.0; 3],
                seeded_vector(4, 77),
            ],
        )
        .unwrap();

    assert_eq!(report.added, 2);
    assert_eq!(report.failed, 2);
    assert!(matches!(
        report.last_error,
        Some(IndexError::DimensionMismatch { .. })
    ));
    assert!(index.contains(10));
    assert!(index.contains(12));
    assert!(!index.contains(11));
    assert_eq!(index.size(), 4);
}

#[test]
fn test_empty_batch_keeps_capacity() {
    let index = seeded_index(4, MetricKind::L2sq, ScalarKind::F32);
    let empty: Vec<Vec<f32>> = Vec::new();
    let report = index.add_batch(&[], &empty).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.added, 0);
    assert_eq!(index.capacity(), 0);
}

#[test]
fn test_batch_length_mismatch() {
    let index = seeded_index(4, MetricKind::L2sq, ScalarKind::F32);
    let err = index
        .add_batch(&[1, 2], &seeded_vectors(4, 1, 0))
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(index.size(), 0);
    assert_eq!(index.capacity(), 0);
}

#[test]
fn test_stats_track_tombstones() {
    let (index, _) = populated_index(8, 50, MetricKind::L2sq);
    for key in 0..10 {
        index.remove(key).unwrap();
    }
    let stats = index.stats();
    assert_eq!(stats.nodes, 50);
    assert_eq!(stats.tombstones, 10);
    assert!(stats.edges > 0);
    assert!(index.memory_usage() > 0);
}
