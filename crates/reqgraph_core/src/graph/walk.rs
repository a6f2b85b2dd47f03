//! Cycle-safe depth-first traversal.

use crate::model::node::{NodeId, NodeRef};
use std::collections::HashSet;
use std::sync::Arc;

/// Edges followed by [`walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Children only: the subtree under the root.
    #[default]
    Down,
    /// Children and live parents: everything connected to the root.
    DownAndUp,
}

/// Visits every node reachable from `root` exactly once.
///
/// Uses an explicit stack, so deep graphs do not grow the call stack. Children
/// are visited in connection order. The first error returned by `visit`
/// stops the walk and is returned unchanged.
///
/// Returns the number of visited nodes.
pub fn walk<E>(
    root: &NodeRef,
    direction: Direction,
    visit: impl FnMut(&NodeRef) -> Result<(), E>,
) -> Result<usize, E> {
    walk_from(std::slice::from_ref(root), direction, visit)
}

/// Like [`walk`], but starts from several roots sharing one visited set.
///
/// Roots are walked in order; a node reachable from two roots is visited once.
pub fn walk_from<E>(
    roots: &[NodeRef],
    direction: Direction,
    mut visit: impl FnMut(&NodeRef) -> Result<(), E>,
) -> Result<usize, E> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeRef> = Vec::new();
    for root in roots.iter().rev() {
        if visited.insert(root.id()) {
            stack.push(Arc::clone(root));
        }
    }
    let mut count = 0;

    while let Some(node) = stack.pop() {
        visit(&node)?;
        count += 1;

        let mut next = node.children();
        if direction == Direction::DownAndUp {
            next.extend(node.parents());
        }
        for neighbour in next.into_iter().rev() {
            if visited.insert(neighbour.id()) {
                stack.push(neighbour);
            }
        }
    }

    Ok(count)
}
