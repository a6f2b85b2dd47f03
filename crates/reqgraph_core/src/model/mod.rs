//! Domain graph model.
//!
//! # Responsibility
//! - Define nodes, their kinds and attribute schemas.
//! - Provide typed per-kind facades for graph construction.
//!
//! # Invariants
//! - Every node is identified by a stable `NodeId`.
//! - Attribute writes never bypass schema and lock/commit guards.

pub mod attr;
pub mod kind;
pub mod kinds;
pub mod node;
