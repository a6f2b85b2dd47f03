//! Diagnostic JSON rendering of a graph.

use crate::model::attr::AttrValue;
use crate::model::node::{Node, NodeId, NodeRef};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Renders `root` and everything below it as nested JSON.
///
/// A node that was already rendered anywhere earlier in the dump is written
/// as `{"ref": "<id>"}`, so shared children and cycles terminate. Nodes are
/// rendered depth-first with an explicit stack, so deep graphs do not grow
/// the call stack.
pub fn to_json(root: &Node) -> Value {
    let mut emitted: HashSet<NodeId> = HashSet::from([root.id()]);
    let mut stack = vec![Frame::open(root)];
    let mut rendered = Value::Null;

    while let Some(top) = stack.last_mut() {
        if let Some(child) = top.pending.pop() {
            if emitted.insert(child.id()) {
                stack.push(Frame::open(&child));
            } else {
                top.children.push(json!({ "ref": child.id_string() }));
            }
            continue;
        }

        let Some(done) = stack.pop() else {
            break;
        };
        let value = done.close();
        match stack.last_mut() {
            Some(parent) => parent.children.push(value),
            None => rendered = value,
        }
    }
    rendered
}

/// Pretty-printed form of [`to_json`].
pub fn to_json_string(root: &Node) -> String {
    format!("{:#}", to_json(root))
}

/// One node whose children are still being rendered.
struct Frame {
    object: Map<String, Value>,
    /// Children not yet rendered, last child first.
    pending: Vec<NodeRef>,
    children: Vec<Value>,
}

impl Frame {
    fn open(node: &Node) -> Self {
        let attributes: Map<String, Value> = node
            .attributes()
            .into_iter()
            .map(|(field, value)| (field, plain(value)))
            .collect();
        let mut object = Map::new();
        object.insert("id".to_string(), Value::String(node.id_string()));
        object.insert("kind".to_string(), Value::from(node.kind().as_tag()));
        object.insert("attributes".to_string(), Value::Object(attributes));

        let mut pending = node.children();
        pending.reverse();
        Self {
            object,
            children: Vec::with_capacity(pending.len()),
            pending,
        }
    }

    fn close(mut self) -> Value {
        self.object
            .insert("children".to_string(), Value::Array(self.children));
        Value::Object(self.object)
    }
}

fn plain(value: AttrValue) -> Value {
    match value {
        AttrValue::Text(text) => Value::String(text),
        AttrValue::Bool(flag) => Value::Bool(flag),
        AttrValue::Integer(number) | AttrValue::Timestamp(number) => Value::from(number),
    }
}
