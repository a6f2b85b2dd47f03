use crate::model::attr::Attributes;
use crate::model::kind::NodeKind;
use crate::model::node::NodeId;
use serde::{Deserialize, Serialize};

/// Persisted form of one node: its own attributes plus the identities of its
/// direct children, in connection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub id: NodeId,
    pub kind: NodeKind,
    pub attributes: Attributes,
    pub children: Vec<NodeId>,
}

impl StorageRecord {
    /// Checks stored attributes against the schema of `kind`.
    ///
    /// Missing fields are allowed; they take the schema default on decode.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in &self.attributes {
            let spec = self
                .kind
                .field(field)
                .ok_or_else(|| format!("`{field}` is not an attribute of {} nodes", self.kind))?;
            if spec.ty != value.attr_type() {
                return Err(format!(
                    "{}.{field} is stored as {}, schema expects {}",
                    self.kind,
                    value.attr_type(),
                    spec.ty
                ));
            }
        }
        Ok(())
    }
}
