//! Graph construction and traversal over shared nodes.
//!
//! # Invariants
//! - Edges are stored on the parent (ordered) with a weak back-link on the
//!   child.
//! - Traversals are cycle-safe: each identity is visited at most once.

pub mod connect;
pub mod walk;

pub use connect::{connect, disconnect};
pub use walk::{walk, walk_from, Direction};
