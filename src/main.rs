//! Driver binary: mixed insert/remove workload over one shared list.
//!
//! Spawns inserter and remover threads hammering a small key range, joins
//! them, then reports the final contents, the approximate length, a probe
//! lookup, and whether the chain is sorted.
//!
//! Run with:
//! ```bash
//! cargo run --release
//! RUST_LOG=lazylist=debug cargo run --features tracing
//! ```

use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use lazylist::LazyList;

// =============================================================================
// Workload Configuration
// =============================================================================

const INSERT_THREADS: usize = 4;
const REMOVE_THREADS: usize = 4;
const OPS_PER_THREAD: usize = 1000;
const KEY_RANGE: u64 = 201; // keys drawn uniformly from [0, 200]
const PROBE_KEY: i64 = 50;

// =============================================================================
// Key Generation
// =============================================================================

/// Per-thread LCG over the key range (same multiplier the benches use).
struct KeyStream {
    state: u64,
}

impl KeyStream {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(0x517c_c1b7_2722_0a95) | 1,
        }
    }

    fn next_key(&mut self) -> i64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        ((self.state >> 33) % KEY_RANGE) as i64
    }
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9e37_79b9_7f4a_7c15)
}

// =============================================================================
// Main
// =============================================================================

fn main() {
    let list = Arc::new(LazyList::new());
    let seed = wall_clock_seed();

    let mut handles = Vec::with_capacity(INSERT_THREADS + REMOVE_THREADS);

    for id in 0..INSERT_THREADS {
        let list = Arc::clone(&list);
        handles.push(thread::spawn(move || {
            let mut keys = KeyStream::new(seed.wrapping_add(id as u64));
            for _ in 0..OPS_PER_THREAD {
                if let Err(e) = list.insert(keys.next_key(), id) {
                    eprintln!("[inserter {id}] {e}");
                }
            }
        }));
    }

    for offset in 0..REMOVE_THREADS {
        let id = INSERT_THREADS + offset;
        let list = Arc::clone(&list);
        handles.push(thread::spawn(move || {
            let mut keys = KeyStream::new(seed.wrapping_add(100 + id as u64));
            for _ in 0..OPS_PER_THREAD {
                list.remove(keys.next_key(), id);
            }
        }));
    }

    for handle in handles {
        let _ = handle.join();
    }

    let contents = list.live_keys();
    println!("Final list contents (live nodes):");
    println!(
        "{}",
        contents
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    );

    println!("Length: {}", list.len());
    println!(
        "Contains {PROBE_KEY}? {}",
        if list.contains(PROBE_KEY, 0) { "Yes" } else { "No" }
    );

    if list.is_sorted() {
        println!("SORTED");
    }

    list.scan_and_reclaim();

    let counters = list.counters();
    println!("\n=== Diagnostics ===");
    println!("Validation retries: {}", counters.validation_retries);
    println!("Reclaim passes:     {}", counters.reclaim_passes);
    println!("Nodes freed:        {}", counters.nodes_freed);
    println!("Still retired:      {}", list.retired_len());
}
