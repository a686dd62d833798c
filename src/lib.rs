//! # lazylist
//!
//! A concurrent sorted multiset of `i64` keys, backed by a singly-linked
//! list with fine-grained synchronization.
//!
//! The list combines three classic techniques:
//! - Optimistic traversal: readers and writers walk the chain without locks
//! - Per-node locking for writes: a mutation locks exactly two adjacent
//!   nodes and re-validates the traversal before touching the chain
//! - Lazy removal: nodes are marked removed under their lock, unlinked, then
//!   reclaimed only once no in-flight traversal can still reference them
//!
//! ## Design
//!
//! Traversals publish each pointer into a per-worker hazard slot before
//! dereferencing it. Removers park unlinked nodes on a retire list, and an
//! amortized scan frees every retired node absent from all hazard slots.
//! Reclamation is deferred and periodic, never immediate.
//!
//! ## Worker ids
//!
//! Every operation takes a caller-assigned worker id in `0..`[`MAX_WORKERS`]
//! that indexes the worker's hazard slots. Concurrent callers must not share
//! an id; the bound is a compile-time constant and part of the ABI.
//!
//! ## Performance
//!
//! - `contains`: lock-free single pass, never blocks
//! - `insert`/`remove`: block only on the two node locks around the
//!   affected link; disjoint positions proceed in parallel
//! - Reclamation: amortized O(1) per operation at steady state

mod counters;
mod hazard;
mod list;
mod node;
mod retire;
mod tracing_helpers;

pub use counters::CounterSnapshot;
pub use hazard::{MAX_WORKERS, SLOTS_PER_WORKER};
pub use list::{InsertError, LazyList};
