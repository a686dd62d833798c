//! Deferred reclamation of unlinked nodes.
//!
//! A remover that has physically unlinked a node cannot free it immediately:
//! an unlocked traversal that started earlier may still hold the pointer. The
//! node instead lands here, and a periodic scan frees every retired node that
//! no hazard slot references. Nodes that are still published simply survive
//! to the next pass; that is the expected steady state under contention, not
//! an error.

use parking_lot::Mutex;

use crate::hazard::HazardRegistry;
use crate::node::Node;
use crate::tracing_helpers::trace_log;

/// Unordered collection of physically-unlinked nodes awaiting a safe free.
///
/// Invariant: every node in here has `removed == true` and is unreachable
/// from the list head. The mutex protects the vector only; the nodes
/// themselves are immutable once retired.
pub(crate) struct RetireList {
    nodes: Mutex<Vec<*mut Node>>,
}

// SAFETY: the raw pointers are only dereferenced while the mutex is held,
// and only for nodes that their remover made unreachable before retiring.
unsafe impl Send for RetireList {}
unsafe impl Sync for RetireList {}

impl RetireList {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Mutex::new(Vec::new()),
        }
    }

    /// Append an unlinked node. The caller must have set `removed` and
    /// rewritten the predecessor's link before calling this.
    pub(crate) fn push(&self, node: *mut Node) {
        self.nodes.lock().push(node);
    }

    /// Free every retired node no hazard slot references; keep the rest for
    /// a later pass. Returns the number freed.
    pub(crate) fn scan(&self, hazards: &HazardRegistry<Node>) -> usize {
        let mut nodes = self.nodes.lock();
        let before = nodes.len();

        nodes.retain(|&node| {
            if hazards.is_hazarded(node) {
                trace_log!(node = ?node, "retired node still published; deferring");
                true
            } else {
                // SAFETY: the remover made `node` unreachable before retiring
                // it, and the acquire scan just observed no publication, so
                // no traversal can still dereference it.
                unsafe { Node::dealloc(node) };
                false
            }
        });

        before - nodes.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Keys of the retired nodes, in retirement order.
    pub(crate) fn keys(&self) -> Vec<i64> {
        self.nodes
            .lock()
            .iter()
            // SAFETY: retired nodes stay allocated until a scan frees them,
            // and a scan cannot run while this thread holds the mutex.
            .map(|&node| unsafe { (*node).key })
            .collect()
    }

    /// Free everything unconditionally. Only for list teardown, where the
    /// caller has exclusive access and no hazard can be standing.
    pub(crate) fn drain(&self) {
        let mut nodes = self.nodes.lock();
        for node in nodes.drain(..) {
            // SAFETY: exclusive access; each retired node is freed once.
            unsafe { Node::dealloc(node) };
        }
    }
}
