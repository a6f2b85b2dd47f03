//! Graph node model.
//!
//! # Responsibility
//! - Carry identity, kind, schema-checked attributes and adjacency for one
//!   vertex of a domain graph.
//! - Track whether the node changed since it was last written to a store.
//!
//! # Invariants
//! - `id` is assigned exactly once and never reused for another node.
//! - Attribute keys always belong to `kind.schema()` and values match the
//!   declared type.
//! - Children are shared (`Arc`); parents are weak back-links so that a
//!   parent is kept alive only by its own owners.
//! - Locks on a node are never held while locking another node.

use super::attr::{AttrValue, Attributes};
use super::kind::{AttrType, NodeKind, COMMITTED_FIELD, LOCKED_FIELD};
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Stable identifier of a graph node.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NodeId = Uuid;

/// Shared handle to a node. Graph edges hold these.
pub type NodeRef = Arc<Node>;

pub type NodeResult<T> = Result<T, NodeError>;

/// Rejected attribute write or kind conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    UnknownField {
        kind: NodeKind,
        field: String,
    },
    TypeMismatch {
        kind: NodeKind,
        field: String,
        expected: AttrType,
        found: AttrType,
    },
    /// Node is locked; only `locked` itself may change.
    Locked(NodeId),
    /// Node is committed; no attribute may change.
    Committed(NodeId),
    WrongKind {
        id: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },
}

impl Display for NodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { kind, field } => {
                write!(f, "`{field}` is not an attribute of {kind} nodes")
            }
            Self::TypeMismatch {
                kind,
                field,
                expected,
                found,
            } => write!(
                f,
                "{kind}.{field} expects a {expected} value, got {found}"
            ),
            Self::Locked(id) => write!(f, "node {id} is locked"),
            Self::Committed(id) => write!(f, "node {id} is committed"),
            Self::WrongKind {
                id,
                expected,
                found,
            } => write!(f, "node {id} is a {found} node, expected {expected}"),
        }
    }
}

impl Error for NodeError {}

/// One vertex of a domain graph.
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    state: RwLock<NodeState>,
}

struct NodeState {
    attributes: Attributes,
    children: Vec<NodeRef>,
    parents: Vec<Weak<Node>>,
    dirty: bool,
}

impl Node {
    /// Creates a node with a fresh time-ordered identity.
    ///
    /// Every schema field starts at its zero value and the node starts dirty.
    pub fn new(kind: NodeKind) -> NodeRef {
        Self::with_id(Uuid::now_v7(), kind)
    }

    /// Creates a node with a caller-provided identity.
    ///
    /// Used by import paths where the identity already exists externally.
    /// The caller is responsible for not creating two live nodes with the same
    /// identity outside of reconstruction.
    pub fn with_id(id: NodeId, kind: NodeKind) -> NodeRef {
        let attributes = kind
            .schema()
            .iter()
            .map(|spec| (spec.name.to_string(), AttrValue::default_for(spec.ty)))
            .collect();
        Arc::new(Self {
            id,
            kind,
            state: RwLock::new(NodeState {
                attributes,
                children: Vec::new(),
                parents: Vec::new(),
                dirty: true,
            }),
        })
    }

    /// Rebuilds a clean node from already validated stored attributes.
    pub(crate) fn restore(id: NodeId, kind: NodeKind, attributes: Attributes) -> NodeRef {
        let node = Self::with_id(id, kind);
        {
            let mut state = node.state.write();
            state.attributes.extend(attributes);
            state.dirty = false;
        }
        node
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Canonical textual identity, stable across save/load round trips.
    pub fn id_string(&self) -> String {
        self.id.hyphenated().to_string()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attr(&self, field: &str) -> Option<AttrValue> {
        self.state.read().attributes.get(field).cloned()
    }

    /// Snapshot of every attribute.
    pub fn attributes(&self) -> Attributes {
        self.state.read().attributes.clone()
    }

    /// Text attribute, or an empty string when the field is not text.
    pub fn text(&self, field: &str) -> String {
        self.state
            .read()
            .attributes
            .get(field)
            .and_then(AttrValue::as_text)
            .unwrap_or_default()
            .to_string()
    }

    /// Bool attribute, `false` when the field is not a bool.
    pub fn flag(&self, field: &str) -> bool {
        self.state
            .read()
            .attributes
            .get(field)
            .and_then(AttrValue::as_bool)
            .unwrap_or(false)
    }

    /// Sets one attribute after schema and guard checks.
    ///
    /// # Errors
    /// - `UnknownField` / `TypeMismatch` when the write does not fit the schema.
    /// - `Committed` when the node is committed.
    /// - `Locked` when the node is locked and `field` is not `locked`.
    pub fn set_attr(&self, field: &str, value: impl Into<AttrValue>) -> NodeResult<()> {
        let value = value.into();
        let spec = self.kind.field(field).ok_or_else(|| NodeError::UnknownField {
            kind: self.kind,
            field: field.to_string(),
        })?;
        if spec.ty != value.attr_type() {
            return Err(NodeError::TypeMismatch {
                kind: self.kind,
                field: field.to_string(),
                expected: spec.ty,
                found: value.attr_type(),
            });
        }

        let mut state = self.state.write();
        let is_set = |name: &str| {
            state
                .attributes
                .get(name)
                .and_then(AttrValue::as_bool)
                .unwrap_or(false)
        };
        if self.kind.is_commitable() && is_set(COMMITTED_FIELD) {
            return Err(NodeError::Committed(self.id));
        }
        if self.kind.is_lockable() && is_set(LOCKED_FIELD) && field != LOCKED_FIELD {
            return Err(NodeError::Locked(self.id));
        }

        state.attributes.insert(field.to_string(), value);
        state.dirty = true;
        Ok(())
    }

    /// Children in connection order.
    pub fn children(&self) -> Vec<NodeRef> {
        self.state.read().children.clone()
    }

    pub fn child_ids(&self) -> Vec<NodeId> {
        self.state.read().children.iter().map(|child| child.id).collect()
    }

    pub fn child_count(&self) -> usize {
        self.state.read().children.len()
    }

    /// Parents that are still alive, in connection order.
    pub fn parents(&self) -> Vec<NodeRef> {
        self.state
            .read()
            .parents
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Attributes and child identities read under one lock.
    pub(crate) fn snapshot(&self) -> (Attributes, Vec<NodeId>) {
        let state = self.state.read();
        (
            state.attributes.clone(),
            state.children.iter().map(|child| child.id).collect(),
        )
    }

    /// Pretty JSON dump of this node and everything below it.
    pub fn to_json_string(&self) -> String {
        crate::codec::to_json_string(self)
    }

    /// Whether the node changed since it was last written to a store.
    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    pub(crate) fn mark_clean(&self) {
        self.state.write().dirty = false;
    }

    pub(crate) fn mark_dirty(&self) {
        self.state.write().dirty = true;
    }

    pub(crate) fn push_child(&self, child: NodeRef) {
        let mut state = self.state.write();
        state.children.push(child);
        state.dirty = true;
    }

    pub(crate) fn push_parent(&self, parent: Weak<Node>) {
        let mut state = self.state.write();
        state.parents.push(parent);
        state.dirty = true;
    }

    /// Removes every child edge to `child_id`, returning how many were removed.
    pub(crate) fn remove_child(&self, child_id: NodeId) -> usize {
        let mut state = self.state.write();
        let before = state.children.len();
        state.children.retain(|child| child.id != child_id);
        let removed = before - state.children.len();
        if removed > 0 {
            state.dirty = true;
        }
        removed
    }

    /// Drops back-links to `parent_id` and back-links whose parent is gone.
    pub(crate) fn remove_parent(&self, parent_id: NodeId) {
        let mut state = self.state.write();
        state
            .parents
            .retain(|parent| parent.upgrade().is_some_and(|parent| parent.id != parent_id));
        state.dirty = true;
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("attributes", &state.attributes)
            .field("children", &state.children.len())
            .field("dirty", &state.dirty)
            .finish()
    }
}
