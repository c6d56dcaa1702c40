//! Concurrency tests
//!
//! Tests covering:
//! - Concurrent readers during writes
//! - Concurrent writers on disjoint keys
//! - Removal racing with search
//! - Saving while other threads search

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use common::{populated_index, seeded_index, seeded_vector, temp_index_path};
use vortex_dense::{Index, MetricKind, ScalarKind};

#[test]
fn test_index_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Index>();
}

#[test]
fn test_concurrent_writers_disjoint_keys() {
    let index = Arc::new(seeded_index(8, MetricKind::L2sq, ScalarKind::F32));
    index.reserve(400).unwrap();

    let num_threads = 8;
    let per_thread = 50u64;
    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let key = thread_id * per_thread + i;
                    index.add(key, &seeded_vector(8, key)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(index.size(), 400);
    for key in [0u64, 199, 399] {
        let matches = index.search(&seeded_vector(8, key), 1).unwrap();
        assert_eq!(matches.keys, vec![key]);
    }
}

#[test]
fn test_readers_during_batch_inserts() {
    let (index, vectors) = populated_index(8, 100, MetricKind::L2sq);
    let index = Arc::new(index);
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            let done = Arc::clone(&done);
            let probe = vectors[10].clone();
            thread::spawn(move || {
                let mut searches = 0;
                while !done.load(Ordering::Acquire) || searches == 0 {
                    let matches = index.search(&probe, 5).unwrap();
                    assert!(matches.count >= 1);
                    assert_eq!(matches.keys[0], 10);
                    assert!(matches.count <= index.capacity());
                    searches += 1;
                }
                searches
            })
        })
        .collect();

    for batch in 0..10u64 {
        let keys: Vec<u64> = (0..50).map(|i| 1000 + batch * 50 + i).collect();
        let batch_vectors: Vec<Vec<f32>> = keys.iter().map(|&k| seeded_vector(8, k)).collect();
        index.add_batch(&keys, &batch_vectors).unwrap().into_result().unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(index.size(), 600);
}

#[test]
fn test_remove_races_with_search() {
    let (index, vectors) = populated_index(8, 200, MetricKind::L2sq);
    let index = Arc::new(index);

    let remover = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for key in (0..200u64).step_by(2) {
                assert!(index.remove(key).unwrap());
            }
        })
    };

    let searcher = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for v in vectors.iter().cycle().take(500) {
                let matches = index.search(v, 10).unwrap();
                assert!(matches.distances.windows(2).all(|w| w[0] <= w[1]));
            }
        })
    };

    remover.join().unwrap();
    searcher.join().unwrap();

    assert_eq!(index.size(), 100);
    let matches = index.search(&seeded_vector(8, 3), 100).unwrap();
    assert!(matches.keys.iter().all(|k| k % 2 == 1));
}

#[test]
fn test_save_while_searching() {
    let (_dir, path) = temp_index_path("busy.dvx");
    let (index, vectors) = populated_index(16, 300, MetricKind::Cosine);
    let index = Arc::new(index);

    let searchers: Vec<_> = (0..3)
        .map(|t| {
            let index = Arc::clone(&index);
            let probe = vectors[t * 7].clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    index.search(&probe, 3).unwrap();
                }
            })
        })
        .collect();

    index.save(&path).unwrap();
    for searcher in searchers {
        searcher.join().unwrap();
    }

    let restored = Index::restore(&path, true).unwrap();
    assert_eq!(restored.size(), 300);
}
