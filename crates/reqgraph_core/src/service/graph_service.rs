//! Graph persistence use-case service.
//!
//! # Responsibility
//! - Pair one record store with one worker pool and hand out save, load and
//!   remove tasks already queued on that pool.
//! - List the persisted graph entry points.
//!
//! # Invariants
//! - Every returned task is already enqueued; callers only poll it.
//! - The service never blocks on task completion.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::kind::NodeKind;
use crate::model::node::{NodeId, NodeRef};
use crate::pool::{PoolError, WorkerPool};
use crate::store::{GraphStore, StoreError};
use crate::task::{LoadTask, RemoveTask, SaveMode, SaveScope, SaveTask};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Engine(EngineError),
    Pool(PoolError),
    Store(StoreError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::Pool(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Pool(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<EngineError> for ServiceError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<PoolError> for ServiceError {
    fn from(value: PoolError) -> Self {
        Self::Pool(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Persisted graph entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSummary {
    pub id: NodeId,
    pub title: String,
}

pub struct GraphService {
    store: Arc<dyn GraphStore>,
    pool: Arc<WorkerPool>,
}

impl GraphService {
    pub fn new(store: Arc<dyn GraphStore>, pool: Arc<WorkerPool>) -> Self {
        Self { store, pool }
    }

    /// Opens the configured store and starts a pool with the configured
    /// number of workers.
    pub fn from_config(config: &EngineConfig) -> ServiceResult<Self> {
        let store = config.open_store()?;
        let pool = WorkerPool::with_threads(config.worker_threads)?;
        Ok(Self::new(store, Arc::new(pool)))
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Queues a save of every node under `root`.
    pub fn save(&self, root: &NodeRef) -> ServiceResult<Arc<SaveTask>> {
        self.save_with(root, SaveScope::default(), SaveMode::default())
    }

    pub fn save_with(
        &self,
        root: &NodeRef,
        scope: SaveScope,
        mode: SaveMode,
    ) -> ServiceResult<Arc<SaveTask>> {
        let task = Arc::new(SaveTask::with_options(
            Arc::clone(root),
            Arc::clone(&self.store),
            scope,
            mode,
        ));
        self.pool.enqueue(task.clone())?;
        Ok(task)
    }

    /// Queues a load of the graph rooted at the textual identity `id`.
    ///
    /// # Errors
    /// - `Engine(InvalidIdentity)` when `id` is not a node identity.
    /// - `Pool` when the pool no longer accepts work.
    pub fn load(&self, id: &str) -> ServiceResult<Arc<LoadTask>> {
        let task = Arc::new(LoadTask::from_id_string(id, Arc::clone(&self.store))?);
        self.pool.enqueue(task.clone())?;
        Ok(task)
    }

    /// Queues removal of the stored records under each of `nodes`.
    ///
    /// Parents outside `nodes` keep their stored edges until they are saved
    /// again; disconnect first and save the parent to drop the link.
    pub fn remove(&self, nodes: &[NodeRef]) -> ServiceResult<Arc<RemoveTask>> {
        let task = Arc::new(RemoveTask::new(nodes.to_vec(), Arc::clone(&self.store)));
        self.pool.enqueue(task.clone())?;
        Ok(task)
    }

    /// Every persisted `Graph` node with its title, ordered by identity.
    pub fn list_graphs(&self) -> ServiceResult<Vec<GraphSummary>> {
        let records = self.store.list_by_kind(NodeKind::Graph)?;
        Ok(records
            .into_iter()
            .map(|record| GraphSummary {
                id: record.id,
                title: record
                    .attributes
                    .get("title")
                    .and_then(|value| value.as_text())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect())
    }
}
