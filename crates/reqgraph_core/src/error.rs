//! Engine-level error taxonomy.
//!
//! # Responsibility
//! - Classify every failure a save or load can hit.
//! - Stay `Clone` so a failed task can report its error to any number of
//!   pollers.
//!
//! # Invariants
//! - Failures inside tasks are captured as `TaskFailed` on the task; they are
//!   never propagated to the thread that enqueued it.

use crate::model::node::NodeId;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No record exists for the identity.
    NotFound(NodeId),
    /// Stored data does not match the schema of its declared kind.
    CorruptRecord { id: NodeId, reason: String },
    /// The store could not be reached or failed mid-operation.
    BackendUnavailable(String),
    /// Text is not a canonical node identity.
    InvalidIdentity(String),
    /// Task body panicked; carries the sanitized panic message.
    Panicked(String),
    /// First failure hit by a task, with the node it was processing.
    TaskFailed {
        task: &'static str,
        node: NodeId,
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Maps a store failure observed while handling `id`.
    pub fn from_store(id: NodeId, err: StoreError) -> Self {
        match err {
            StoreError::InvalidData(reason) => Self::CorruptRecord { id, reason },
            other => Self::BackendUnavailable(other.to_string()),
        }
    }

    /// Innermost error, looking through `TaskFailed` wrappers.
    pub fn root_cause(&self) -> &EngineError {
        match self {
            Self::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "node not found: {id}"),
            Self::CorruptRecord { id, reason } => {
                write!(f, "corrupt record for node {id}: {reason}")
            }
            Self::BackendUnavailable(message) => write!(f, "backend unavailable: {message}"),
            Self::InvalidIdentity(text) => write!(f, "invalid node identity `{text}`"),
            Self::Panicked(message) => write!(f, "task panicked: {message}"),
            Self::TaskFailed { task, node, source } => {
                write!(f, "{task} task failed at node {node}: {source}")
            }
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TaskFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EngineError;
    use crate::db::DbError;
    use crate::store::StoreError;
    use uuid::Uuid;

    #[test]
    fn invalid_store_data_maps_to_corrupt_record() {
        let id = Uuid::now_v7();
        let err = EngineError::from_store(id, StoreError::InvalidData("bad kind".to_string()));
        assert_eq!(
            err,
            EngineError::CorruptRecord {
                id,
                reason: "bad kind".to_string()
            }
        );
    }

    #[test]
    fn transport_failures_map_to_backend_unavailable() {
        let id = Uuid::now_v7();
        let err = EngineError::from_store(
            id,
            StoreError::Db(DbError::UnsupportedSchemaVersion {
                db_version: 9,
                latest_supported: 2,
            }),
        );
        assert!(matches!(err, EngineError::BackendUnavailable(message) if message.contains("9")));
    }

    #[test]
    fn root_cause_unwraps_task_failures() {
        let id = Uuid::now_v7();
        let err = EngineError::TaskFailed {
            task: "load",
            node: id,
            source: Box::new(EngineError::NotFound(id)),
        };
        assert_eq!(err.root_cause(), &EngineError::NotFound(id));
        assert!(err.to_string().starts_with("load task failed"));
    }
}
