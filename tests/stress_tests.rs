//! Stress tests for concurrent list operations.
//!
//! These tests are designed to expose race conditions through:
//! - Mixed inserter/remover workloads over a small, contended key range
//! - High thread counts (up to the worker-id bound)
//! - Conservation accounting: traversal-visible nodes vs. recorded ops
//! - Sortedness and reclamation checks after every scenario
//!
//! Run with:
//! ```bash
//! cargo test --test stress_tests --release
//! ```

#![expect(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use lazylist::{LazyList, MAX_WORKERS};

use common::KeyStream;

// =============================================================================
// Test Configuration
// =============================================================================

const OPS_PER_THREAD: usize = 1000;
const KEY_RANGE: u64 = 201;

/// Post-scenario invariant sweep: sorted chain, counter agreeing with the
/// traversal, and a retire list that one quiescent scan fully empties.
fn check_quiescent(list: &LazyList, expected_live: usize, test_name: &str) {
    assert!(list.is_sorted(), "{test_name}: chain out of order");

    let live = list.live_keys();
    assert_eq!(
        live.len(),
        expected_live,
        "{test_name}: traversal-visible count mismatch"
    );
    assert_eq!(list.len(), expected_live, "{test_name}: length counter drifted");

    list.scan_and_reclaim();
    assert_eq!(
        list.retired_len(),
        0,
        "{test_name}: quiescent scan left retired nodes"
    );
}

// =============================================================================
// Mixed Workloads
// =============================================================================

/// 4 inserters vs 4 removers over a contended range.
#[test]
fn mixed_inserters_removers_4x4() {
    common::init_tracing();

    const INSERTERS: usize = 4;
    const REMOVERS: usize = 4;

    let list = Arc::new(LazyList::new());
    let removed_total = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::with_capacity(INSERTERS + REMOVERS);

    for id in 0..INSERTERS {
        let list = Arc::clone(&list);
        handles.push(thread::spawn(move || {
            let mut keys = KeyStream::new(id as u64, KEY_RANGE);
            for _ in 0..OPS_PER_THREAD {
                list.insert(keys.next_key(), id).unwrap();
            }
        }));
    }

    for offset in 0..REMOVERS {
        let id = INSERTERS + offset;
        let list = Arc::clone(&list);
        let removed_total = Arc::clone(&removed_total);
        handles.push(thread::spawn(move || {
            let mut keys = KeyStream::new(100 + id as u64, KEY_RANGE);
            let mut removed = 0usize;
            for _ in 0..OPS_PER_THREAD {
                if list.remove(keys.next_key(), id) {
                    removed += 1;
                }
            }
            removed_total.fetch_add(removed, Ordering::Relaxed);
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let inserted = INSERTERS * OPS_PER_THREAD;
    let removed = removed_total.load(Ordering::Relaxed);
    check_quiescent(&list, inserted - removed, "mixed_4x4");

    let counters = list.counters();
    tracing::info!(
        retries = counters.validation_retries,
        passes = counters.reclaim_passes,
        freed = counters.nodes_freed,
        "mixed_4x4 diagnostics"
    );
}

/// Every worker slot occupied, all hammering the same few keys.
#[test]
fn high_contention_full_worker_fanout() {
    common::init_tracing();

    const HOT_RANGE: u64 = 4;

    let list = Arc::new(LazyList::new());
    let inserted_total = Arc::new(AtomicUsize::new(0));
    let removed_total = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..MAX_WORKERS)
        .map(|id| {
            let list = Arc::clone(&list);
            let inserted_total = Arc::clone(&inserted_total);
            let removed_total = Arc::clone(&removed_total);
            thread::spawn(move || {
                let mut keys = KeyStream::new(id as u64, HOT_RANGE);
                let mut inserted = 0usize;
                let mut removed = 0usize;
                for op in 0..OPS_PER_THREAD {
                    let key = keys.next_key();
                    if (op + id) % 2 == 0 {
                        list.insert(key, id).unwrap();
                        inserted += 1;
                    } else if list.remove(key, id) {
                        removed += 1;
                    }
                }
                inserted_total.fetch_add(inserted, Ordering::Relaxed);
                removed_total.fetch_add(removed, Ordering::Relaxed);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let inserted = inserted_total.load(Ordering::Relaxed);
    let removed = removed_total.load(Ordering::Relaxed);
    check_quiescent(&list, inserted - removed, "high_contention");
}

/// Readers running against a churning list must never block or observe an
/// unsorted prefix of their own traversal results.
#[test]
fn readers_against_churn() {
    common::init_tracing();

    const WRITERS: usize = 4;
    const READERS: usize = 4;

    let list = Arc::new(LazyList::new());

    let mut handles = Vec::with_capacity(WRITERS + READERS);

    for id in 0..WRITERS {
        let list = Arc::clone(&list);
        handles.push(thread::spawn(move || {
            let mut keys = KeyStream::new(id as u64, KEY_RANGE);
            for op in 0..OPS_PER_THREAD {
                let key = keys.next_key();
                if op % 2 == 0 {
                    list.insert(key, id).unwrap();
                } else {
                    list.remove(key, id);
                }
            }
        }));
    }

    for offset in 0..READERS {
        let id = WRITERS + offset;
        let list = Arc::clone(&list);
        handles.push(thread::spawn(move || {
            let mut keys = KeyStream::new(7 + id as u64, KEY_RANGE);
            for _ in 0..OPS_PER_THREAD {
                // Result is workload-dependent; the point is that the walk
                // itself is safe while removers retire nodes under it.
                let _ = list.contains(keys.next_key(), id);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(list.is_sorted());
    list.scan_and_reclaim();
    assert_eq!(list.retired_len(), 0);
}

// =============================================================================
// Conservation
// =============================================================================

/// Concurrent insert-only phase, then drain everything sequentially.
#[test]
fn insert_fanout_then_drain() {
    common::init_tracing();

    const INSERTERS: usize = 8;
    const PER_THREAD: usize = 500;

    let list = Arc::new(LazyList::new());

    let handles: Vec<_> = (0..INSERTERS)
        .map(|id| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                // Disjoint key blocks so every insert is individually
                // verifiable afterwards.
                let base = (id * PER_THREAD) as i64;
                for i in 0..PER_THREAD {
                    list.insert(base + i as i64, id).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let total = INSERTERS * PER_THREAD;
    assert_eq!(list.len(), total);
    assert!(list.is_sorted());

    for key in 0..total as i64 {
        assert!(list.contains(key, 0), "key {key} missing after fanout");
    }

    for key in 0..total as i64 {
        assert!(list.remove(key, 0), "key {key} failed to drain");
    }

    check_quiescent(&list, 0, "insert_fanout_then_drain");
}

/// Duplicate-heavy workload: the multiset must conserve every copy.
#[test]
fn duplicate_copies_are_conserved() {
    common::init_tracing();

    const THREADS: usize = 4;
    const COPIES: usize = 250;
    const KEY: i64 = 11;

    let list = Arc::new(LazyList::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|id| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for _ in 0..COPIES {
                    list.insert(KEY, id).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(list.len(), THREADS * COPIES);
    assert_eq!(list.live_keys(), vec![KEY; THREADS * COPIES]);

    let mut drained = 0usize;
    while list.remove(KEY, 0) {
        drained += 1;
    }
    assert_eq!(drained, THREADS * COPIES);

    check_quiescent(&list, 0, "duplicate_copies");
}

// =============================================================================
// Repetition (intermittent-bug fishing)
// =============================================================================

/// Small mixed scenario repeated to catch schedule-dependent failures.
#[test]
fn repeated_mixed_rounds() {
    common::init_tracing();

    for round in 0..10usize {
        let list = Arc::new(LazyList::new());
        let removed_total = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..MAX_WORKERS)
            .map(|id| {
                let list = Arc::clone(&list);
                let removed_total = Arc::clone(&removed_total);
                thread::spawn(move || {
                    let mut keys = KeyStream::new((round * 31 + id) as u64, 16);
                    let mut removed = 0usize;
                    for _ in 0..200 {
                        let key = keys.next_key();
                        if id % 2 == 0 {
                            list.insert(key, id).unwrap();
                        } else if list.remove(key, id) {
                            removed += 1;
                        }
                    }
                    removed_total.fetch_add(removed, Ordering::Relaxed);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let inserted = (MAX_WORKERS / 2) * 200;
        let removed = removed_total.load(Ordering::Relaxed);
        check_quiescent(&list, inserted - removed, "repeated_mixed_rounds");
    }
}
