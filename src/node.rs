//! Node storage for the lazy list.
//!
//! Every node owns its key, an atomic forward link, a per-node mutex, and a
//! monotonic `removed` flag. Nodes live behind raw pointers so that unlocked
//! traversals can walk the chain while writers mutate it under node locks;
//! the hazard registry and retire list decide when a pointer may be freed.
//!
//! # Field contracts
//!
//! - `next` is written only at construction and by an operation holding the
//!   mutex of the *predecessor* whose link is being rewritten. Traversals
//!   read it unlocked with `Acquire`.
//! - `removed` is written only by an operation holding this node's own
//!   mutex, and only ever flips `false → true`. Unlocked readers may observe
//!   a stale `false`; validation under the locks makes the final read
//!   durable.
//! - `lock` guards this node's `removed` flag and (when this node acts as a
//!   predecessor) its `next` link.

use std::alloc::{Layout, alloc, dealloc};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr};

use parking_lot::Mutex;

/// Key carried by the permanent sentinel. Below every legal key, so the
/// sentinel always heads the sorted chain. Callers must not insert it.
pub(crate) const SENTINEL_KEY: i64 = i64::MIN;

/// A single chain node.
pub(crate) struct Node {
    pub(crate) key: i64,
    pub(crate) next: AtomicPtr<Node>,
    pub(crate) lock: Mutex<()>,
    pub(crate) removed: AtomicBool,
}

impl Node {
    /// Allocate a live node with the given key and successor.
    ///
    /// Goes through `std::alloc` directly so that an out-of-memory condition
    /// is reported as `None` rather than aborting the process; the caller
    /// surfaces it as an operation-level error without having touched the
    /// chain.
    pub(crate) fn try_alloc(key: i64, next: *mut Node) -> Option<*mut Node> {
        let layout = Layout::new::<Node>();

        // SAFETY: `Node` has non-zero size.
        let raw = unsafe { alloc(layout) }.cast::<Node>();
        if raw.is_null() {
            return None;
        }

        // SAFETY: `raw` is freshly allocated with `Node`'s layout and valid
        // for a single write.
        unsafe {
            raw.write(Node {
                key,
                next: AtomicPtr::new(next),
                lock: Mutex::new(()),
                removed: AtomicBool::new(false),
            });
        }

        Some(raw)
    }

    /// Free a node previously returned by [`Node::try_alloc`].
    ///
    /// # Safety
    ///
    /// `node` must have come from `try_alloc`, must not have been freed
    /// already, and no other thread may still dereference it (unreachable
    /// from the chain and absent from every hazard slot, or the caller has
    /// exclusive access to the whole list).
    pub(crate) unsafe fn dealloc(node: *mut Node) {
        // SAFETY: per the caller contract, `node` is a live, uniquely
        // referenced allocation from `try_alloc`.
        unsafe {
            ptr::drop_in_place(node);
            dealloc(node.cast::<u8>(), Layout::new::<Node>());
        }
    }
}
