//! Deletes the stored records of one or more subtrees.
//!
//! # Invariants
//! - Every node reachable downward from a target is visited once per run,
//!   even when several targets share descendants.
//! - In-memory nodes and their edges are left untouched; a removed node is
//!   marked dirty so a later save writes it back.
//! - Records removed before a failure stay removed.

use super::{task_failure, Task, TaskProgress, TaskState};
use crate::error::{EngineError, EngineResult};
use crate::graph::{walk_from, Direction};
use crate::model::node::{NodeId, NodeRef};
use crate::store::GraphStore;
use log::{info, trace};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub struct RemoveTask {
    targets: Vec<NodeRef>,
    store: Arc<dyn GraphStore>,
    progress: TaskProgress,
    removed: AtomicUsize,
}

impl RemoveTask {
    /// Removes every record under each of `targets`.
    pub fn new(targets: Vec<NodeRef>, store: Arc<dyn GraphStore>) -> Self {
        Self {
            targets,
            store,
            progress: TaskProgress::new(),
            removed: AtomicUsize::new(0),
        }
    }

    pub fn for_node(node: NodeRef, store: Arc<dyn GraphStore>) -> Self {
        Self::new(vec![node], store)
    }

    pub fn targets(&self) -> &[NodeRef] {
        &self.targets
    }

    /// True once every reachable record is gone. Never blocks.
    pub fn removal_complete(&self) -> bool {
        self.progress.state() == TaskState::Completed
    }

    /// Records that existed and were deleted by the current or last run.
    pub fn nodes_removed(&self) -> usize {
        self.removed.load(Ordering::Acquire)
    }

    pub fn nodes_visited(&self) -> usize {
        self.progress.processed()
    }
}

impl Task for RemoveTask {
    fn name(&self) -> &'static str {
        "remove"
    }

    /// First target, or the nil identity for an empty task.
    fn target(&self) -> NodeId {
        self.targets
            .first()
            .map_or_else(NodeId::nil, |node| node.id())
    }

    fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    fn clear_results(&self) {
        self.removed.store(0, Ordering::Release);
    }

    fn execute(&self) -> EngineResult<()> {
        let started_at = Instant::now();
        self.removed.store(0, Ordering::Release);

        let visited = walk_from(&self.targets, Direction::Down, |node| -> EngineResult<()> {
            self.progress.record_processed();
            let existed = self.store.remove_record(node.id()).map_err(|err| {
                task_failure(
                    self.name(),
                    node.id(),
                    EngineError::from_store(node.id(), err),
                )
            })?;
            node.mark_dirty();
            if existed {
                self.removed.fetch_add(1, Ordering::AcqRel);
            }
            trace!(
                "event=node_remove module=task status=ok node={} existed={}",
                node.id(),
                existed
            );
            Ok(())
        })?;

        info!(
            "event=graph_remove module=task status=ok targets={} visited={} removed={} duration_ms={}",
            self.targets.len(),
            visited,
            self.nodes_removed(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}
