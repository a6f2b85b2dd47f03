//! Concurrent, identity-addressed persistence engine for graphs of typed
//! domain nodes.
//!
//! Build a graph from [`Node`]s or the per-kind facades, connect nodes with
//! [`connect`], and persist, restore or delete it through [`SaveTask`],
//! [`LoadTask`] and [`RemoveTask`] running on a caller-owned [`WorkerPool`].

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod logging;
pub mod model;
pub mod pool;
pub mod service;
pub mod store;
pub mod task;

pub use codec::{decode, encode, to_json, to_json_string, StorageRecord};
pub use config::{ConfigError, DatabaseTarget, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use graph::{connect, disconnect};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attr::{AttrValue, Attributes};
pub use model::kind::{AttrType, NodeKind};
pub use model::kinds::{
    Actor, Completed, Effort, EmailAddress, Event, Goal, GraphNode, InternationalAddress,
    KeyValue, Organization, Person, PhoneNumber, Product, Project, Purpose, Recurrence,
    RecurringTodo, Requirement, Role, Story, Text, TimeEstimate, Todo, UsAddress, UseCase,
};
pub use model::node::{Node, NodeError, NodeId, NodeRef, NodeResult};
pub use pool::{PoolError, PoolResult, PoolState, WorkerPool, WorkerState};
pub use service::graph_service::{GraphService, GraphSummary, ServiceError, ServiceResult};
pub use store::{GraphStore, MemoryGraphStore, SqliteGraphStore, StoreError, StoreResult};
pub use task::{LoadTask, RemoveTask, SaveMode, SaveScope, SaveTask, Task, TaskState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
