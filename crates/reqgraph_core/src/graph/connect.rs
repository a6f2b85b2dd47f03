//! Parent/child edge maintenance.

use crate::model::node::NodeRef;
use log::trace;
use std::sync::Arc;

/// Links `child` under `parent`.
///
/// Appends `child` to the parent's ordered child list and records a weak
/// back-link to `parent` on the child. Both nodes become dirty.
///
/// # Contract
/// - Not idempotent: connecting the same pair twice creates two edges.
/// - No cycle detection; cycles and self loops are allowed.
/// - Must not race with a save task walking the same nodes; the saved state
///   would be whatever each node held when the task visited it.
pub fn connect(parent: &NodeRef, child: &NodeRef) {
    parent.push_child(Arc::clone(child));
    child.push_parent(Arc::downgrade(parent));
    trace!(
        "event=graph_connect module=graph status=ok parent={} child={}",
        parent.id(),
        child.id()
    );
}

/// Removes every `parent -> child` edge and the matching back-links.
///
/// Returns the number of edges removed; `0` leaves both nodes untouched.
pub fn disconnect(parent: &NodeRef, child: &NodeRef) -> usize {
    let removed = parent.remove_child(child.id());
    if removed > 0 {
        child.remove_parent(parent.id());
    }
    removed
}
