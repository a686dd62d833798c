//! Filepath: src/list.rs
//! `LazyList` - a concurrent sorted multiset of `i64` keys.
//!
//! The chain starts at a permanent sentinel (key below every legal key) and
//! stays in non-decreasing key order. Readers traverse without locks;
//! writers lock exactly two adjacent nodes and re-validate the traversal
//! before mutating.
//!
//! # Concurrency Model
//!
//! 1. *Optimistic traversal*: walk unlocked to the first node with
//!    `key >= target`, publishing every pointer into a hazard slot before
//!    dereferencing it.
//! 2. *Lock coupling*: acquire `pred`'s mutex, then `curr`'s (skipped when
//!    `curr` is null - the tail case). Locks are always taken pred-then-curr
//!    along the chain, which is acyclic and forward-only, so no deadlock.
//! 3. *Validation*: under both locks check that `pred` is not removed,
//!    `curr` is null or not removed, and `pred.next == curr`. `removed` only
//!    flips under the node's own lock and `next` only changes under `pred`'s
//!    lock, so a successful check is durable for the rest of the critical
//!    section. On failure, release the locks, clear hazards, and restart.
//!    Locks come off first: a stale `curr` may already sit in the retire
//!    list, and clearing its hazard while still holding its lock would let
//!    a concurrent scan free the node under the guard.
//! 4. *Lazy removal*: `remove` marks `removed = true` (logical delete), then
//!    rewrites `pred.next` (physical unlink), then retires the node. The
//!    reclaimer frees retired nodes once no hazard slot references them.
//!
//! Successful `insert` linearizes at the `pred.next` store, `remove` at the
//! `removed` store, and `contains` at its final read of `curr` - so a
//! `contains` that observes `removed == true` reports the key absent even
//! before the physical unlink.

use std::alloc::{Layout, handle_alloc_error};
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicIsize, Ordering};

use crate::counters::{CounterSnapshot, Counters};
use crate::hazard::{HazardRegistry, MAX_WORKERS};
use crate::node::{Node, SENTINEL_KEY};
use crate::retire::RetireList;
use crate::tracing_helpers::{debug_log, trace_log};


// ============================================================================
//  InsertError
// ============================================================================

/// Errors that can occur during insert operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// Memory allocation failed. The list was not mutated.
    AllocationFailed,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed => write!(f, "memory allocation failed"),
        }
    }
}

impl std::error::Error for InsertError {}

// ============================================================================
//  LazyList
// ============================================================================

/// A concurrent sorted multiset backed by a lazily-removed linked list.
///
/// Equal keys are permitted and cluster together; `remove` unlinks the first
/// match. Operations take a caller-assigned `worker` id in
/// `0..`[`MAX_WORKERS`], which indexes that worker's hazard slots; at most
/// [`MAX_WORKERS`] threads may operate concurrently and no two concurrent
/// callers may share an id.
///
/// # Example
///
/// ```rust
/// use lazylist::LazyList;
///
/// let list = LazyList::new();
/// list.insert(3, 0).unwrap();
/// list.insert(1, 0).unwrap();
///
/// assert!(list.contains(3, 0));
/// assert!(!list.remove(2, 0));
/// assert_eq!(list.live_keys(), vec![1, 3]);
/// ```
pub struct LazyList {
    /// Permanent sentinel. Never removed, never retired, never a hazard
    /// target in the reclamation sense.
    head: *mut Node,
    hazards: HazardRegistry<Node>,
    retired: RetireList,
    /// Successful inserts minus successful removes. Approximate under
    /// concurrency; steers the reclaim trigger and `len`.
    length: AtomicIsize,
    /// Operations since the last reclaim pass. A relaxed hint, see
    /// `bump_ops_and_maybe_reclaim`.
    op_counter: AtomicIsize,
    counters: Counters,
}

// SAFETY: all shared mutation goes through per-node mutexes, the retire-list
// mutex, or atomics. Raw pointers are dereferenced only under the
// publish-before-dereference hazard protocol or while holding the locks that
// freeze them.
unsafe impl Send for LazyList {}
unsafe impl Sync for LazyList {}

impl LazyList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        let head = Node::try_alloc(SENTINEL_KEY, ptr::null_mut())
            .unwrap_or_else(|| handle_alloc_error(Layout::new::<Node>()));

        Self {
            head,
            hazards: HazardRegistry::new(),
            retired: RetireList::new(),
            length: AtomicIsize::new(0),
            op_counter: AtomicIsize::new(0),
            counters: Counters::default(),
        }
    }

    // ========================================================================
    //  Operations
    // ========================================================================

    /// Insert `key`, keeping the chain sorted. Duplicates are allowed; the
    /// new node lands immediately before the first node with key `>= key`.
    ///
    /// Always succeeds apart from allocation failure, which leaves the list
    /// untouched.
    ///
    /// # Panics
    /// Panics if `worker >= MAX_WORKERS`.
    pub fn insert(&self, key: i64, worker: usize) -> Result<(), InsertError> {
        assert!(
            worker < MAX_WORKERS,
            "worker id {worker} out of range 0..{MAX_WORKERS}"
        );

        loop {
            let (pred, curr) = self.traverse(key, worker);

            // SAFETY: `pred` is the sentinel or was hazard-published while
            // it was the traversal's current node; either way it cannot have
            // been freed.
            let pred_ref = unsafe { &*pred };
            let pred_guard = pred_ref.lock.lock();

            // SAFETY: a non-null `curr` was hazard-published before the
            // traversal stepped onto it.
            let curr_ref = (!curr.is_null()).then(|| unsafe { &*curr });
            let curr_guard = curr_ref.map(|c| c.lock.lock());

            if !self.validate(pred_ref, curr) {
                self.counters.record_retry();
                trace_log!(key, worker, "insert validation failed; restarting");
                drop(curr_guard);
                drop(pred_guard);
                self.hazards.clear(worker);
                continue;
            }

            // `curr` is null or carries a key >= `key`, so linking here
            // preserves sortedness.
            let Some(node) = Node::try_alloc(key, curr) else {
                self.hazards.clear(worker);
                return Err(InsertError::AllocationFailed);
            };
            pred_ref.next.store(node, Ordering::Release);

            drop(curr_guard);
            drop(pred_guard);
            self.hazards.clear(worker);

            self.length.fetch_add(1, Ordering::Relaxed);
            self.bump_ops_and_maybe_reclaim();
            return Ok(());
        }
    }

    /// Remove the first node holding `key`. Returns `true` if one was
    /// unlinked, `false` if the key is absent.
    ///
    /// The removed node is retired, not freed; a later reclaim pass frees it
    /// once no hazard slot references it.
    ///
    /// # Panics
    /// Panics if `worker >= MAX_WORKERS`.
    pub fn remove(&self, key: i64, worker: usize) -> bool {
        assert!(
            worker < MAX_WORKERS,
            "worker id {worker} out of range 0..{MAX_WORKERS}"
        );

        loop {
            let (pred, curr) = self.traverse(key, worker);

            // SAFETY: as in `insert` - sentinel or hazard-published.
            let pred_ref = unsafe { &*pred };
            let pred_guard = pred_ref.lock.lock();

            // SAFETY: hazard-published before the traversal stepped onto it.
            let curr_ref = (!curr.is_null()).then(|| unsafe { &*curr });
            let curr_guard = curr_ref.map(|c| c.lock.lock());

            if !self.validate(pred_ref, curr) {
                self.counters.record_retry();
                trace_log!(key, worker, "remove validation failed; restarting");
                drop(curr_guard);
                drop(pred_guard);
                self.hazards.clear(worker);
                continue;
            }

            let Some(curr_ref) = curr_ref else {
                self.hazards.clear(worker);
                return false;
            };
            if curr_ref.key != key {
                self.hazards.clear(worker);
                return false;
            }

            // Logical delete, then physical unlink, then retire - all inside
            // the two-lock critical section. A concurrent `contains` that
            // reads the flag now already reports the key absent.
            curr_ref.removed.store(true, Ordering::Release);
            pred_ref
                .next
                .store(curr_ref.next.load(Ordering::Acquire), Ordering::Release);
            self.retired.push(curr);

            drop(curr_guard);
            drop(pred_guard);
            self.hazards.clear(worker);

            self.length.fetch_sub(1, Ordering::Relaxed);
            self.bump_ops_and_maybe_reclaim();
            return true;
        }
    }

    /// Whether some reachable, non-removed node holds `key` at the lookup
    /// instant.
    ///
    /// Takes no locks and never blocks. Single pass: there is no validation
    /// step, so there is nothing to retry.
    ///
    /// # Panics
    /// Panics if `worker >= MAX_WORKERS`.
    pub fn contains(&self, key: i64, worker: usize) -> bool {
        assert!(
            worker < MAX_WORKERS,
            "worker id {worker} out of range 0..{MAX_WORKERS}"
        );

        // SAFETY: the sentinel is never freed.
        let mut curr = unsafe { &*self.head }.next.load(Ordering::Acquire);
        self.hazards.publish(worker, 0, curr);

        while !curr.is_null() {
            // SAFETY: `curr` was published to slot 0 before this
            // dereference, so the reclaimer defers it.
            let curr_ref = unsafe { &*curr };
            if curr_ref.key >= key {
                break;
            }
            let next = curr_ref.next.load(Ordering::Acquire);
            self.hazards.publish(worker, 0, next);
            curr = next;
        }

        let found = if curr.is_null() {
            false
        } else {
            // SAFETY: still published in slot 0.
            let curr_ref = unsafe { &*curr };
            curr_ref.key == key && !curr_ref.removed.load(Ordering::Acquire)
        };

        self.hazards.clear(worker);
        found
    }

    // ========================================================================
    //  Traversal and validation
    // ========================================================================

    /// Unlocked walk from the sentinel to the first node with
    /// `key >= target`, returning the `(pred, curr)` pair around that
    /// position (`curr` may be null at the tail).
    ///
    /// Publication discipline: slot 0 holds the node currently being
    /// visited, slot 1 holds its already-read successor while stepping. Each
    /// pointer is published *before* it is dereferenced; that handshake is
    /// what stops the reclaimer from freeing a node mid-step.
    fn traverse(&self, key: i64, worker: usize) -> (*mut Node, *mut Node) {
        let mut pred = self.head;
        // SAFETY: the sentinel is never freed.
        let mut curr = unsafe { &*pred }.next.load(Ordering::Acquire);
        self.hazards.publish(worker, 0, curr);

        while !curr.is_null() {
            // SAFETY: `curr` sits in a hazard slot - slot 0 on the first
            // iteration, slot 1 after a step.
            let curr_ref = unsafe { &*curr };
            if curr_ref.key >= key {
                break;
            }

            self.hazards.publish(worker, 0, curr);
            pred = curr;
            let next = curr_ref.next.load(Ordering::Acquire);
            self.hazards.publish(worker, 1, next);
            curr = next;
        }

        (pred, curr)
    }

    /// Post-lock check that the traversal's `(pred, curr)` pair is still the
    /// adjacent live pair it appeared to be. The caller holds `pred`'s lock
    /// (and `curr`'s when non-null), which freezes `pred.next` and both
    /// `removed` flags for the duration.
    ///
    /// A null `curr` is the tail case and validates against
    /// `pred.next == null`.
    fn validate(&self, pred: &Node, curr: *mut Node) -> bool {
        if pred.removed.load(Ordering::Acquire) {
            return false;
        }
        if !curr.is_null() {
            // SAFETY: hazard-published by the traversal that produced it.
            if unsafe { &*curr }.removed.load(Ordering::Acquire) {
                return false;
            }
        }
        pred.next.load(Ordering::Acquire) == curr
    }

    // ========================================================================
    //  Reclamation
    // ========================================================================

    /// Amortized reclaim trigger: once roughly `length` operations have
    /// completed since the last pass, run one and start counting again.
    ///
    /// Both counters are relaxed and the comparison races with concurrent
    /// updates; that is tolerated. The counters steer reclamation frequency,
    /// nothing else reads them for correctness.
    fn bump_ops_and_maybe_reclaim(&self) {
        let ops = self.op_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if ops >= self.length.load(Ordering::Relaxed) {
            self.scan_and_reclaim();
            self.op_counter
                .fetch_sub(self.length.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }

    /// Free every retired node no hazard slot references. Idempotent; safe
    /// to call at any time, including from outside the list's own trigger.
    pub fn scan_and_reclaim(&self) {
        let freed = self.retired.scan(&self.hazards);
        self.counters.record_reclaim(freed);
        if freed > 0 {
            debug_log!(freed, "reclaim pass freed retired nodes");
        }
    }

    // ========================================================================
    //  Observers
    // ========================================================================

    /// Approximate number of live keys: successful inserts minus successful
    /// removes observed so far. Exact while the list is quiescent.
    #[must_use]
    pub fn len(&self) -> usize {
        let length = self.length.load(Ordering::Relaxed);
        usize::try_from(length).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of the non-removed nodes in traversal order.
    ///
    /// Walks unlocked and unprotected; call at a quiescent moment for an
    /// exact answer. Concurrent callers get a consistent-but-torn view.
    #[must_use]
    pub fn live_keys(&self) -> Vec<i64> {
        let mut keys = Vec::new();
        // SAFETY: the sentinel is never freed; reachable nodes stay
        // allocated while reachable (only unlinked nodes are retired).
        let mut curr = unsafe { &*self.head }.next.load(Ordering::Acquire);
        while !curr.is_null() {
            // SAFETY: see above - `curr` was reachable when read.
            let curr_ref = unsafe { &*curr };
            if !curr_ref.removed.load(Ordering::Acquire) {
                keys.push(curr_ref.key);
            }
            curr = curr_ref.next.load(Ordering::Acquire);
        }
        keys
    }

    /// Whether every adjacent reachable pair is in non-decreasing key order
    /// (the sentinel included). Diagnostic; same quiescence caveat as
    /// [`LazyList::live_keys`].
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        // SAFETY: as in `live_keys`.
        let mut prev_key = unsafe { &*self.head }.key;
        let mut curr = unsafe { &*self.head }.next.load(Ordering::Acquire);
        while !curr.is_null() {
            // SAFETY: as in `live_keys`.
            let curr_ref = unsafe { &*curr };
            if curr_ref.key < prev_key {
                return false;
            }
            prev_key = curr_ref.key;
            curr = curr_ref.next.load(Ordering::Acquire);
        }
        true
    }

    /// Number of nodes awaiting reclamation.
    #[must_use]
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    /// Keys of the nodes awaiting reclamation, in retirement order.
    #[must_use]
    pub fn retired_keys(&self) -> Vec<i64> {
        self.retired.keys()
    }

    /// Snapshot of the diagnostic counters.
    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

impl Default for LazyList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LazyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyList")
            .field("len", &self.len())
            .field("retired", &self.retired_len())
            .finish_non_exhaustive()
    }
}

impl Drop for LazyList {
    /// Tear down the whole structure. Callers must have joined every worker
    /// first; `&mut self` encodes that exclusivity.
    fn drop(&mut self) {
        let mut curr = self.head;
        while !curr.is_null() {
            // SAFETY: exclusive access; each reachable node is freed once.
            let next = unsafe { &*curr }.next.load(Ordering::Relaxed);
            unsafe { Node::dealloc(curr) };
            curr = next;
        }
        // Retired nodes are off-chain and freed separately.
        self.retired.drain();
    }
}

// ============================================================================
//  Tests
// ============================================================================
