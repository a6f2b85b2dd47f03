//! Rebuilds a node graph from the store, starting at one identity.
//!
//! # Invariants
//! - One in-memory node per identity per run; two records naming the same
//!   child resolve to the same `Arc`.
//! - Edges are re-created in stored child order.
//! - The root is published only when the whole reachable graph loaded.

use super::{task_failure, Task, TaskProgress, TaskState};
use crate::codec::decode;
use crate::error::{EngineError, EngineResult};
use crate::graph::connect;
use crate::model::node::{NodeId, NodeRef};
use crate::store::GraphStore;
use log::{info, trace};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub struct LoadTask {
    root_id: NodeId,
    store: Arc<dyn GraphStore>,
    progress: TaskProgress,
    root: Mutex<Option<NodeRef>>,
}

impl LoadTask {
    pub fn new(root_id: NodeId, store: Arc<dyn GraphStore>) -> Self {
        Self {
            root_id,
            store,
            progress: TaskProgress::new(),
            root: Mutex::new(None),
        }
    }

    /// Creates a load task from a textual identity such as
    /// [`crate::Node::id_string`] returns.
    ///
    /// # Errors
    /// - `InvalidIdentity` when `id` is not a UUID.
    pub fn from_id_string(id: &str, store: Arc<dyn GraphStore>) -> EngineResult<Self> {
        let root_id = Uuid::parse_str(id.trim())
            .map_err(|_| EngineError::InvalidIdentity(id.to_string()))?;
        Ok(Self::new(root_id, store))
    }

    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// True once the whole graph is materialized. Never blocks.
    pub fn graph_loaded(&self) -> bool {
        self.progress.state() == TaskState::Completed
    }

    /// Loaded root, available only after a successful run.
    pub fn node(&self) -> Option<NodeRef> {
        if !self.graph_loaded() {
            return None;
        }
        self.root.lock().clone()
    }

    /// Records decoded by the current or last run.
    pub fn nodes_loaded(&self) -> usize {
        self.progress.processed()
    }

    fn decode_tracked(&self, id: NodeId) -> EngineResult<(NodeRef, Vec<NodeId>)> {
        let decoded = decode(self.store.as_ref(), id)
            .map_err(|err| task_failure(self.name(), id, err))?;
        self.progress.record_processed();
        trace!("event=node_load module=task status=ok node={id}");
        Ok(decoded)
    }
}

impl Task for LoadTask {
    fn name(&self) -> &'static str {
        "load"
    }

    fn target(&self) -> NodeId {
        self.root_id
    }

    fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    fn clear_results(&self) {
        *self.root.lock() = None;
    }

    fn execute(&self) -> EngineResult<()> {
        let started_at = Instant::now();
        self.clear_results();

        let (root, root_children) = self.decode_tracked(self.root_id)?;
        let mut loaded: HashMap<NodeId, NodeRef> = HashMap::from([(root.id(), Arc::clone(&root))]);
        let mut pending = vec![(Arc::clone(&root), root_children)];

        while let Some((parent, child_ids)) = pending.pop() {
            for child_id in child_ids {
                let child = match loaded.get(&child_id) {
                    Some(existing) => Arc::clone(existing),
                    None => {
                        let (child, grandchildren) = self.decode_tracked(child_id)?;
                        loaded.insert(child_id, Arc::clone(&child));
                        pending.push((Arc::clone(&child), grandchildren));
                        child
                    }
                };
                connect(&parent, &child);
            }
        }

        // Re-connecting marked everything dirty; the graph matches the store.
        for node in loaded.values() {
            node.mark_clean();
        }

        info!(
            "event=graph_load module=task status=ok root={} loaded={} duration_ms={}",
            self.root_id,
            loaded.len(),
            started_at.elapsed().as_millis()
        );
        *self.root.lock() = Some(root);
        Ok(())
    }
}
