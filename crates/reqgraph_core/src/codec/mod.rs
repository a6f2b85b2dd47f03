//! Conversion between in-memory nodes and storage records.
//!
//! # Responsibility
//! - Project one node to a `StorageRecord` without recursing.
//! - Rebuild one node from its stored record, validating it against the kind
//!   schema.
//! - Render a diagnostic JSON dump of a graph.
//!
//! # Invariants
//! - `encode` is deterministic for a given node state.
//! - Decoded nodes have no edges; the loader re-connects them.
//! - Store failures leave this module as `EngineError`s carrying the identity
//!   that was being decoded.

mod json;
mod record;

pub use json::{to_json, to_json_string};
pub use record::StorageRecord;

use crate::error::{EngineError, EngineResult};
use crate::model::node::{Node, NodeId, NodeRef};
use crate::store::GraphStore;

/// Projects `node` to its storage record.
pub fn encode(node: &Node) -> StorageRecord {
    let (attributes, children) = node.snapshot();
    StorageRecord {
        id: node.id(),
        kind: node.kind(),
        attributes,
        children,
    }
}

/// Fetches and rebuilds the node stored under `id`.
///
/// Returns the clean, edge-less node and the child identities listed by its
/// record, in stored order.
///
/// # Errors
/// - `NotFound` when no record exists.
/// - `CorruptRecord` when the record does not parse or does not fit its
///   kind schema.
/// - `BackendUnavailable` when the store fails.
pub fn decode(store: &dyn GraphStore, id: NodeId) -> EngineResult<(NodeRef, Vec<NodeId>)> {
    let record = store
        .get_record(id)
        .map_err(|err| EngineError::from_store(id, err))?
        .ok_or(EngineError::NotFound(id))?;

    if record.id != id {
        return Err(EngineError::CorruptRecord {
            id,
            reason: format!("record is keyed as {}", record.id),
        });
    }
    record
        .validate()
        .map_err(|reason| EngineError::CorruptRecord { id, reason })?;

    let node = Node::restore(record.id, record.kind, record.attributes);
    Ok((node, record.children))
}
