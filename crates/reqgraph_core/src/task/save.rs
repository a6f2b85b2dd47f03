//! Persists a node graph reachable from one root.
//!
//! # Invariants
//! - Every reachable node is visited exactly once per run, cycles included.
//! - Records already written stay written when a later node fails.
//! - A node is marked clean only after its record was stored.

use super::{task_failure, Task, TaskProgress, TaskState};
use crate::codec::encode;
use crate::error::{EngineError, EngineResult};
use crate::graph::{walk, Direction};
use crate::model::node::{NodeId, NodeRef};
use crate::store::GraphStore;
use log::{info, trace};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Which edges a save follows from its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveScope {
    /// Children only.
    #[default]
    Subtree,
    /// Children and live parents: the whole connected graph.
    Connected,
}

/// Which visited nodes a save writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    #[default]
    All,
    /// Skip nodes that did not change since they were last saved.
    ChangedOnly,
}

pub struct SaveTask {
    root: NodeRef,
    store: Arc<dyn GraphStore>,
    scope: SaveScope,
    mode: SaveMode,
    progress: TaskProgress,
    written: AtomicUsize,
}

impl SaveTask {
    /// Saves the subtree under `root`, writing every node.
    pub fn new(root: NodeRef, store: Arc<dyn GraphStore>) -> Self {
        Self::with_options(root, store, SaveScope::default(), SaveMode::default())
    }

    pub fn with_options(
        root: NodeRef,
        store: Arc<dyn GraphStore>,
        scope: SaveScope,
        mode: SaveMode,
    ) -> Self {
        Self {
            root,
            store,
            scope,
            mode,
            progress: TaskProgress::new(),
            written: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// True once every reachable node has been handled. Never blocks.
    pub fn tree_save_complete(&self) -> bool {
        self.progress.state() == TaskState::Completed
    }

    /// Records written by the current or last run.
    pub fn nodes_saved(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    /// Nodes visited by the current or last run, written or not.
    pub fn nodes_visited(&self) -> usize {
        self.progress.processed()
    }
}

impl Task for SaveTask {
    fn name(&self) -> &'static str {
        "save"
    }

    fn target(&self) -> NodeId {
        self.root.id()
    }

    fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    fn clear_results(&self) {
        self.written.store(0, Ordering::Release);
    }

    fn execute(&self) -> EngineResult<()> {
        let started_at = Instant::now();
        self.written.store(0, Ordering::Release);
        let direction = match self.scope {
            SaveScope::Subtree => Direction::Down,
            SaveScope::Connected => Direction::DownAndUp,
        };

        let visited = walk(&self.root, direction, |node| -> EngineResult<()> {
            self.progress.record_processed();
            if self.mode == SaveMode::ChangedOnly && !node.is_dirty() {
                trace!("event=node_save module=task status=skip node={}", node.id());
                return Ok(());
            }

            let record = encode(node);
            self.store.put_record(&record).map_err(|err| {
                task_failure(
                    self.name(),
                    node.id(),
                    EngineError::from_store(node.id(), err),
                )
            })?;
            node.mark_clean();
            self.written.fetch_add(1, Ordering::AcqRel);
            trace!(
                "event=node_save module=task status=ok node={} kind={}",
                node.id(),
                node.kind()
            );
            Ok(())
        })?;

        info!(
            "event=graph_save module=task status=ok root={} visited={} written={} duration_ms={}",
            self.root.id(),
            visited,
            self.nodes_saved(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}
