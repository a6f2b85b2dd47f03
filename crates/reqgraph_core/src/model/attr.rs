//! Scalar attribute values.

use super::kind::AttrType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered attribute map of one node.
pub type Attributes = BTreeMap<String, AttrValue>;

/// One attribute value.
///
/// Serialized as `{"type": "...", "value": ...}` so the stored JSON keeps the
/// scalar type even where JSON itself cannot (timestamps vs integers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    /// Unix epoch milliseconds.
    Timestamp(i64),
}

impl AttrValue {
    pub fn attr_type(&self) -> AttrType {
        match self {
            Self::Text(_) => AttrType::Text,
            Self::Integer(_) => AttrType::Integer,
            Self::Bool(_) => AttrType::Bool,
            Self::Timestamp(_) => AttrType::Timestamp,
        }
    }

    /// Zero value used to populate fresh nodes.
    pub fn default_for(ty: AttrType) -> Self {
        match ty {
            AttrType::Text => Self::Text(String::new()),
            AttrType::Integer => Self::Integer(0),
            AttrType::Bool => Self::Bool(false),
            AttrType::Timestamp => Self::Timestamp(0),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the numeric payload of integer and timestamp values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) | Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}
