//! Durable record store contract.
//!
//! # Responsibility
//! - Define the point get/put/remove contract every backend implements.
//! - Keep backend failures in one error type that the codec maps to
//!   engine errors.
//!
//! # Invariants
//! - One record per node identity; a put replaces the previous record.
//! - Child order of a record is preserved by every backend.
//! - No operation spans more than one identity transactionally.

use crate::codec::StorageRecord;
use crate::db::DbError;
use crate::model::kind::NodeKind;
use crate::model::node::NodeId;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryGraphStore;
pub use sqlite::SqliteGraphStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be turned into a record.
    InvalidData(String),
    /// Backend could not serve the request.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "graph store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "graph store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid graph data: {message}"),
            Self::Unavailable(message) => write!(f, "graph store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Backend contract used by save and load tasks.
///
/// Implementations are shared across worker threads.
pub trait GraphStore: Send + Sync {
    /// Inserts or replaces the record for `record.id`.
    fn put_record(&self, record: &StorageRecord) -> StoreResult<()>;
    /// Loads one record by identity.
    fn get_record(&self, id: NodeId) -> StoreResult<Option<StorageRecord>>;
    /// Lists every record of one kind, ordered by identity.
    fn list_by_kind(&self, kind: NodeKind) -> StoreResult<Vec<StorageRecord>>;
    /// Deletes the record for `id` and its child edges.
    ///
    /// Returns whether a record existed.
    fn remove_record(&self, id: NodeId) -> StoreResult<bool>;
    /// Number of stored records.
    fn record_count(&self) -> StoreResult<usize>;

    fn contains(&self, id: NodeId) -> StoreResult<bool> {
        Ok(self.get_record(id)?.is_some())
    }
}
