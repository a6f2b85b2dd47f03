//! Node kinds and their attribute schemas.
//!
//! # Responsibility
//! - Define the closed set of node kinds the engine can persist.
//! - Map every kind to a static attribute schema and a stable storage tag.
//!
//! # Invariants
//! - Storage tags never change once released; they are persisted in
//!   `graph_nodes.kind`.
//! - Every schema field has exactly one scalar type.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Attribute that freezes every other attribute of a lockable node while true.
pub const LOCKED_FIELD: &str = "locked";
/// Attribute that freezes every attribute of a commitable node once true.
pub const COMMITTED_FIELD: &str = "committed";

/// Kind tag of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Owner of projects and organization-wide requirements.
    Organization,
    /// Unit of work owned by an organization.
    Project,
    /// Deliverable of a project.
    Product,
    /// Functional or non-functional requirement.
    Requirement,
    /// User story (title, goal, benefit).
    Story,
    /// Named use case.
    UseCase,
    /// Entry point used to locate a whole graph by title.
    Graph,
    /// Time estimate attached to any work item.
    TimeEstimate,
    /// Free-form note or annotation.
    Text,
    /// Marker that a piece of work is done.
    Completed,
    /// String key/value pair. Keys are not unique.
    KeyValue,
    /// Effort spent so far, in seconds.
    Effort,
    /// Role of the user in a story.
    Role,
    /// Actor of a use case or story.
    Actor,
    Goal,
    Purpose,
    /// Holder for contact nodes (addresses, phone numbers).
    Person,
    EmailAddress,
    PhoneNumber,
    /// Postal address; address lines are child `Text` nodes.
    InternationalAddress,
    /// US postal address; address lines are child `Text` nodes.
    UsAddress,
    /// Named event; flows are chains of events.
    Event,
    /// Template that spawns `Todo`s.
    RecurringTodo,
    Todo,
}

/// Scalar type of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    Text,
    Integer,
    Bool,
    /// Unix epoch milliseconds.
    Timestamp,
}

/// One field of a kind schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: AttrType,
}

const fn field(name: &'static str, ty: AttrType) -> FieldSpec {
    FieldSpec { name, ty }
}

const ORGANIZATION_FIELDS: &[FieldSpec] = &[
    field("name", AttrType::Text),
    field(LOCKED_FIELD, AttrType::Bool),
];

const PROJECT_FIELDS: &[FieldSpec] = &[
    field("name", AttrType::Text),
    field("description", AttrType::Text),
];

const PRODUCT_FIELDS: &[FieldSpec] = &[
    field("title", AttrType::Text),
    field("description", AttrType::Text),
    field(COMMITTED_FIELD, AttrType::Bool),
];

const REQUIREMENT_FIELDS: &[FieldSpec] = &[
    field("title", AttrType::Text),
    field("text", AttrType::Text),
    field("functional", AttrType::Bool),
    field(COMMITTED_FIELD, AttrType::Bool),
];

const STORY_FIELDS: &[FieldSpec] = &[
    field("title", AttrType::Text),
    field("goal", AttrType::Text),
    field("benefit", AttrType::Text),
    field(COMMITTED_FIELD, AttrType::Bool),
];

const USE_CASE_FIELDS: &[FieldSpec] = &[
    field("name", AttrType::Text),
    field(COMMITTED_FIELD, AttrType::Bool),
];

const GRAPH_FIELDS: &[FieldSpec] = &[field("title", AttrType::Text)];

const TIME_ESTIMATE_FIELDS: &[FieldSpec] = &[
    field("text", AttrType::Text),
    field("estimate_secs", AttrType::Integer),
    field("started", AttrType::Bool),
    field("start_timestamp", AttrType::Timestamp),
];

const TEXT_FIELDS: &[FieldSpec] = &[field("text", AttrType::Text)];

const COMPLETED_FIELDS: &[FieldSpec] = &[field("description", AttrType::Text)];

const KEY_VALUE_FIELDS: &[FieldSpec] = &[
    field("key", AttrType::Text),
    field("value", AttrType::Text),
];

const EFFORT_FIELDS: &[FieldSpec] = &[
    field("text", AttrType::Text),
    field("effort_secs", AttrType::Integer),
];

const ROLE_FIELDS: &[FieldSpec] = &[field("who", AttrType::Text)];

const ACTOR_FIELDS: &[FieldSpec] = &[field("actor", AttrType::Text)];

const GOAL_FIELDS: &[FieldSpec] = &[
    field("action", AttrType::Text),
    field("outcome", AttrType::Text),
    field("context", AttrType::Text),
    field("target_date", AttrType::Timestamp),
    field("target_date_confidence", AttrType::Text),
    field("alignment", AttrType::Text),
];

const PURPOSE_FIELDS: &[FieldSpec] = &[
    field("description", AttrType::Text),
    field("deadline", AttrType::Timestamp),
    field("deadline_confidence", AttrType::Text),
];

const PERSON_FIELDS: &[FieldSpec] = &[
    field("last_name", AttrType::Text),
    field("first_name", AttrType::Text),
];

const EMAIL_ADDRESS_FIELDS: &[FieldSpec] = &[field("address", AttrType::Text)];

const PHONE_NUMBER_FIELDS: &[FieldSpec] = &[
    field("country_code", AttrType::Text),
    field("number", AttrType::Text),
    field("phone_type", AttrType::Text),
];

const INTERNATIONAL_ADDRESS_FIELDS: &[FieldSpec] = &[
    field("country_code", AttrType::Text),
    field("locality", AttrType::Text),
    field("postal_code", AttrType::Text),
];

const US_ADDRESS_FIELDS: &[FieldSpec] = &[
    field("city", AttrType::Text),
    field("state", AttrType::Text),
    field("zip_code", AttrType::Text),
];

const EVENT_FIELDS: &[FieldSpec] = &[
    field("name", AttrType::Text),
    field("description", AttrType::Text),
];

const RECURRING_TODO_FIELDS: &[FieldSpec] = &[
    field("description", AttrType::Text),
    field("created", AttrType::Timestamp),
    field("recurring_interval", AttrType::Integer),
    field("seconds", AttrType::Bool),
    field("day_of_month", AttrType::Bool),
    field("day_of_year", AttrType::Bool),
];

const TODO_FIELDS: &[FieldSpec] = &[
    field("description", AttrType::Text),
    field("created", AttrType::Timestamp),
    field("due", AttrType::Timestamp),
    field("completed", AttrType::Bool),
    field("spawned_from", AttrType::Text),
];

impl NodeKind {
    /// Every kind, in declaration order.
    pub const ALL: [NodeKind; 24] = [
        NodeKind::Organization,
        NodeKind::Project,
        NodeKind::Product,
        NodeKind::Requirement,
        NodeKind::Story,
        NodeKind::UseCase,
        NodeKind::Graph,
        NodeKind::TimeEstimate,
        NodeKind::Text,
        NodeKind::Completed,
        NodeKind::KeyValue,
        NodeKind::Effort,
        NodeKind::Role,
        NodeKind::Actor,
        NodeKind::Goal,
        NodeKind::Purpose,
        NodeKind::Person,
        NodeKind::EmailAddress,
        NodeKind::PhoneNumber,
        NodeKind::InternationalAddress,
        NodeKind::UsAddress,
        NodeKind::Event,
        NodeKind::RecurringTodo,
        NodeKind::Todo,
    ];

    /// Returns the attribute schema of this kind.
    pub fn schema(self) -> &'static [FieldSpec] {
        match self {
            Self::Organization => ORGANIZATION_FIELDS,
            Self::Project => PROJECT_FIELDS,
            Self::Product => PRODUCT_FIELDS,
            Self::Requirement => REQUIREMENT_FIELDS,
            Self::Story => STORY_FIELDS,
            Self::UseCase => USE_CASE_FIELDS,
            Self::Graph => GRAPH_FIELDS,
            Self::TimeEstimate => TIME_ESTIMATE_FIELDS,
            Self::Text => TEXT_FIELDS,
            Self::Completed => COMPLETED_FIELDS,
            Self::KeyValue => KEY_VALUE_FIELDS,
            Self::Effort => EFFORT_FIELDS,
            Self::Role => ROLE_FIELDS,
            Self::Actor => ACTOR_FIELDS,
            Self::Goal => GOAL_FIELDS,
            Self::Purpose => PURPOSE_FIELDS,
            Self::Person => PERSON_FIELDS,
            Self::EmailAddress => EMAIL_ADDRESS_FIELDS,
            Self::PhoneNumber => PHONE_NUMBER_FIELDS,
            Self::InternationalAddress => INTERNATIONAL_ADDRESS_FIELDS,
            Self::UsAddress => US_ADDRESS_FIELDS,
            Self::Event => EVENT_FIELDS,
            Self::RecurringTodo => RECURRING_TODO_FIELDS,
            Self::Todo => TODO_FIELDS,
        }
    }

    /// Looks up one schema field by name.
    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.schema().iter().find(|spec| spec.name == name)
    }

    /// Whether nodes of this kind carry the `locked` guard.
    pub fn is_lockable(self) -> bool {
        self.field(LOCKED_FIELD).is_some()
    }

    /// Whether nodes of this kind carry the `committed` guard.
    pub fn is_commitable(self) -> bool {
        self.field(COMMITTED_FIELD).is_some()
    }

    /// Stable storage tag.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Project => "project",
            Self::Product => "product",
            Self::Requirement => "requirement",
            Self::Story => "story",
            Self::UseCase => "use_case",
            Self::Graph => "graph",
            Self::TimeEstimate => "time_estimate",
            Self::Text => "text",
            Self::Completed => "completed",
            Self::KeyValue => "key_value",
            Self::Effort => "effort",
            Self::Role => "role",
            Self::Actor => "actor",
            Self::Goal => "goal",
            Self::Purpose => "purpose",
            Self::Person => "person",
            Self::EmailAddress => "email_address",
            Self::PhoneNumber => "phone_number",
            Self::InternationalAddress => "international_address",
            Self::UsAddress => "us_address",
            Self::Event => "event",
            Self::RecurringTodo => "recurring_todo",
            Self::Todo => "todo",
        }
    }

    /// Parses a storage tag. Returns `None` for unknown tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_tag() == tag)
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Display for AttrType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}
