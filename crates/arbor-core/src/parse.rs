//! Input-literal parser.
//!
//! Normalizes heterogeneous JSON-shaped input into flat [`Node`] records.
//! A literal is either a bare string (shorthand for a leaf), an object with
//! at least a resolvable `text`, or an arbitrarily nested array of either.
//! Anything else (numbers, null, booleans, objects without text) is
//! silently dropped; dropped entries leave no gaps in the output order.
//!
//! # Example
//!
//! ```
//! use arbor_core::parse;
//! use serde_json::json;
//!
//! let parsed = parse(&json!(["Hello", { "text": "X", "child": [1, 2, "Y", 3] }]), None);
//! assert_eq!(parsed.top.len(), 2);
//! let x = parsed.node(&parsed.top[1]).unwrap();
//! assert_eq!(x.children.len(), 1); // only "Y" survives
//! ```

use crate::class_list::ClassList;
use crate::id::NodeId;
use crate::node::{Node, NodeFlags};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Result of one parse call: every produced record (parents before their
/// children) plus the ids of the top-level entries in input order.
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    /// Ids of the top-level parsed entries, in input order.
    pub top: Vec<NodeId>,
    /// Every produced record; a parent always precedes its descendants.
    pub nodes: Vec<Node>,
}

impl Parsed {
    /// Whether nothing usable was found in the input.
    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// Look up a produced record by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

/// Parse a literal into node records.
///
/// `parent` supplies the id and depth of the node the parsed entries will
/// hang under; `None` produces top-level records at depth 0. The parser
/// only wires identifiers; attaching the records to a store is the
/// caller's job.
///
/// An explicit id that repeats within one parse call is replaced by a
/// generated one; the first occurrence keeps the claim.
pub fn parse(raw: &Value, parent: Option<(&NodeId, usize)>) -> Parsed {
    let mut parsed = Parsed::default();
    let mut seen = HashSet::new();
    let (parent_id, depth) = match parent {
        Some((id, d)) => (Some(id), d + 1),
        None => (None, 0),
    };
    let mut top = Vec::new();
    collect(raw, parent_id, depth, &mut top, &mut parsed.nodes, &mut seen);
    parsed.top = top;
    parsed
}

fn collect(
    raw: &Value,
    parent: Option<&NodeId>,
    depth: usize,
    siblings: &mut Vec<NodeId>,
    out: &mut Vec<Node>,
    seen: &mut HashSet<NodeId>,
) {
    match raw {
        // Nested arrays flatten in place.
        Value::Array(items) => {
            for item in items {
                collect(item, parent, depth, siblings, out, seen);
            }
        }
        Value::String(text) => {
            let mut node = Node::new(text);
            node.parent = parent.cloned();
            node.depth = depth;
            seen.insert(node.id.clone());
            siblings.push(node.id.clone());
            out.push(node);
        }
        Value::Object(map) => {
            if let Some(id) = parse_object(map, parent, depth, out, seen) {
                siblings.push(id);
            }
        }
        _ => {}
    }
}

fn parse_object(
    map: &Map<String, Value>,
    parent: Option<&NodeId>,
    depth: usize,
    out: &mut Vec<Node>,
    seen: &mut HashSet<NodeId>,
) -> Option<NodeId> {
    let text = map.get("text")?.as_str()?;

    let mut id = match map.get("id") {
        Some(Value::String(s)) if !s.is_empty() => NodeId::new(s.as_str()),
        Some(Value::Number(n)) => NodeId::new(n.to_string()),
        _ => NodeId::generate(),
    };
    if !seen.insert(id.clone()) {
        id = NodeId::generate();
        seen.insert(id.clone());
    }

    let mut node = Node::with_id(id.clone(), text);
    node.parent = parent.cloned();
    node.depth = depth;

    let mut children_raw = None;
    for (key, value) in map {
        match key.as_str() {
            "id" | "text" => {}
            "children" | "child" => children_raw = Some(value),
            "selected" => node.set_flag(NodeFlags::SELECTED, truthy(value)),
            "checked" => node.set_flag(NodeFlags::CHECKED, truthy(value)),
            "expanded" => node.set_flag(NodeFlags::EXPANDED, truthy(value)),
            "disabled" => node.set_flag(NodeFlags::DISABLED, truthy(value)),
            "disabledCheckbox" => node.set_flag(NodeFlags::DISABLED_CHECKBOX, truthy(value)),
            "batch" => node.set_flag(NodeFlags::BATCH, truthy(value)),
            "className" => {
                if let Some(s) = value.as_str() {
                    node.class_list = ClassList::parse(s);
                }
            }
            "data" => {
                if let Some(bag) = value.as_object() {
                    node.data.extend(bag.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            // Unrecognized fields fold into the data bag.
            _ => {
                node.data.insert(key.clone(), value.clone());
            }
        }
    }

    // Reserve the parent's slot so records stay parent-first, then parse
    // children and patch the child list in.
    let slot = out.len();
    out.push(node);

    if let Some(raw) = children_raw {
        let mut child_ids = Vec::new();
        collect(raw, Some(&id), depth + 1, &mut child_ids, out, seen);
        out[slot].children = child_ids;
    }

    Some(id)
}

// The input surface is JSON: only boolean true counts as set.
fn truthy(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}
