#![forbid(unsafe_code)]

//! Query engine.
//!
//! Heterogeneous match criteria compile once per query into a [`Matcher`]
//! predicate, then evaluate over a breadth-first-by-depth traversal.
//! Within one criterion every condition must hold (AND); a sequence of
//! criteria matches if any of them does (OR). Empty criteria never match
//! anything.

use crate::store::NodeStore;
use crate::walk::{self, Flow};
use arbor_core::{Node, NodeId};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// A match expression against nodes.
#[derive(Clone)]
pub enum Criteria {
    /// Matches nothing. What empty/absent input compiles to.
    None,
    /// Exact equality against the node id OR the node text.
    Text(String),
    /// Regular expression against the node text.
    Pattern(Regex),
    /// Regular expression against the node id.
    IdPattern(Regex),
    /// Arbitrary predicate.
    Func(Rc<dyn Fn(&Node) -> bool>),
    /// Key/value conditions, all of which must hold. Reserved keys
    /// (`id`, the flag names, `expandable`, `checkable`, `isLeaf`,
    /// `expanded`, `$not`) get special predicates; any other key compares
    /// a node field or a dot-path into the data bag. An array value
    /// matches if any element matches.
    Fields(Map<String, Value>),
    /// OR across criteria.
    Any(Vec<Criteria>),
}

impl Criteria {
    /// Wrap a predicate closure.
    pub fn func(f: impl Fn(&Node) -> bool + 'static) -> Self {
        Self::Func(Rc::new(f))
    }

    /// Compile into a reusable predicate.
    pub fn compile(&self) -> Matcher {
        Matcher(compile(self))
    }
}

impl fmt::Debug for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Pattern(r) => f.debug_tuple("Pattern").field(&r.as_str()).finish(),
            Self::IdPattern(r) => f.debug_tuple("IdPattern").field(&r.as_str()).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
            Self::Fields(m) => f.debug_tuple("Fields").field(m).finish(),
            Self::Any(c) => f.debug_tuple("Any").field(c).finish(),
        }
    }
}

impl From<&str> for Criteria {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::None
        } else {
            Self::Text(s.to_owned())
        }
    }
}

impl From<String> for Criteria {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Regex> for Criteria {
    fn from(r: Regex) -> Self {
        Self::Pattern(r)
    }
}

impl From<Map<String, Value>> for Criteria {
    fn from(m: Map<String, Value>) -> Self {
        if m.is_empty() { Self::None } else { Self::Fields(m) }
    }
}

/// JSON-shaped criteria: a string, an object of conditions, or an array
/// of either. Null, booleans, and numbers match nothing.
impl From<Value> for Criteria {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::from(s),
            Value::Object(m) => Self::from(m),
            Value::Array(items) => {
                let list: Vec<Criteria> = items.into_iter().map(Self::from).collect();
                if list.is_empty() { Self::None } else { Self::Any(list) }
            }
            _ => Self::None,
        }
    }
}

impl From<Vec<Criteria>> for Criteria {
    fn from(list: Vec<Criteria>) -> Self {
        if list.is_empty() { Self::None } else { Self::Any(list) }
    }
}

/// A compiled criteria predicate.
pub struct Matcher(Box<dyn Fn(&Node) -> bool>);

impl Matcher {
    /// Evaluate against a node.
    pub fn matches(&self, node: &Node) -> bool {
        (self.0)(node)
    }
}

fn compile(criteria: &Criteria) -> Box<dyn Fn(&Node) -> bool> {
    match criteria {
        Criteria::None => Box::new(|_| false),
        Criteria::Text(s) => {
            let s = s.clone();
            Box::new(move |n| n.id == s.as_str() || n.text == s)
        }
        Criteria::Pattern(r) => {
            let r = r.clone();
            Box::new(move |n| r.is_match(&n.text))
        }
        Criteria::IdPattern(r) => {
            let r = r.clone();
            Box::new(move |n| r.is_match(n.id.as_str()))
        }
        Criteria::Func(f) => {
            let f = f.clone();
            Box::new(move |n| f(n))
        }
        Criteria::Fields(map) => compile_fields(map),
        Criteria::Any(list) => {
            let preds: Vec<_> = list.iter().map(compile).collect();
            Box::new(move |n| preds.iter().any(|p| p(n)))
        }
    }
}

fn compile_fields(map: &Map<String, Value>) -> Box<dyn Fn(&Node) -> bool> {
    let mut preds: Vec<Box<dyn Fn(&Node) -> bool>> = Vec::new();
    for (key, value) in map {
        preds.push(compile_field(key, value));
    }
    Box::new(move |n| preds.iter().all(|p| p(n)))
}

// Fixed dispatch table for the reserved keys; anything else is a field
// (or dot-path) comparison.
fn compile_field(key: &str, value: &Value) -> Box<dyn Fn(&Node) -> bool> {
    match key {
        "id" => {
            let wanted = string_set(value);
            Box::new(move |n| wanted.iter().any(|w| n.id == w.as_str()))
        }
        "disabled" => bool_field(value, |n| n.is_disabled()),
        "disabledCheckbox" => bool_field(value, |n| n.is_checkbox_disabled()),
        "selected" => bool_field(value, |n| n.is_selected()),
        "checked" => bool_field(value, |n| n.is_checked()),
        "expandable" => bool_field(value, |n| n.is_expandable()),
        "checkable" => bool_field(value, |n| n.is_checkable()),
        "isLeaf" => bool_field(value, |n| n.is_leaf()),
        "expanded" => match value.as_bool() {
            // true: the flag is set. false: the node could expand but is
            // not expanded. Leaves don't count as collapsed.
            Some(true) => Box::new(|n| n.is_expanded()),
            Some(false) => Box::new(|n| n.is_expandable() && !n.is_expanded()),
            None => Box::new(|_| false),
        },
        "$not" => {
            let sub = Criteria::from(value.clone());
            let pred = compile(&sub);
            // When the sub-criteria talk about expansion, nodes that
            // cannot expand at all fall under the negation's source set.
            let expansion = references_expanded(value);
            Box::new(move |n| {
                let mut hit = pred(n);
                if expansion && !n.is_expandable() {
                    hit = true;
                }
                !hit
            })
        }
        path => {
            let path = path.to_owned();
            let wanted: Vec<Value> = match value {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            Box::new(move |n| match field_value(n, &path) {
                Some(actual) => wanted.iter().any(|w| *w == actual),
                None => false,
            })
        }
    }
}

fn bool_field(
    value: &Value,
    get: impl Fn(&Node) -> bool + 'static,
) -> Box<dyn Fn(&Node) -> bool> {
    match value.as_bool() {
        Some(want) => Box::new(move |n| get(n) == want),
        None => Box::new(|_| false),
    }
}

// Accepted shapes for id criteria: one string/number or an array of them.
fn string_set(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn references_expanded(value: &Value) -> bool {
    match value {
        Value::Object(m) => m.contains_key("expanded"),
        Value::Array(items) => items.iter().any(references_expanded),
        _ => false,
    }
}

/// Resolve a plain key or dot-path against a node. The first segment may
/// name a node field (`id`, `text`, `depth`, `className`, `data`) or an
/// entry in the data bag directly; further segments index into JSON
/// objects.
fn field_value(node: &Node, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = match first {
        "id" => Value::String(node.id.to_string()),
        "text" => Value::String(node.text.clone()),
        "depth" => Value::from(node.depth as u64),
        "className" => Value::String(node.class_list.to_string()),
        "data" => Value::Object(node.data.clone()),
        other => node.data.get(other)?.clone(),
    };
    for segment in segments {
        current = current.get(segment)?.clone();
    }
    Some(current)
}

/// Evaluate criteria over the whole forest, breadth-first by depth.
/// `multiple` controls whether the first match short-circuits.
pub(crate) fn find_nodes(
    store: &NodeStore,
    criteria: &Criteria,
    multiple: bool,
) -> Vec<Arc<Node>> {
    let matcher = criteria.compile();
    let roots: Vec<NodeId> = store.roots().to_vec();
    let mut out = Vec::new();
    walk::walk_breadth(store, &roots, &mut |n| {
        if matcher.matches(n) {
            out.push(n.clone());
            if !multiple {
                return Flow::Stop;
            }
        }
        Flow::Continue
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::parse;
    use serde_json::json;

    fn store_with(value: serde_json::Value) -> NodeStore {
        let mut store = NodeStore::new();
        let parsed = parse(&value, None);
        let top = store.adopt(parsed);
        store.attach_at(None, &top, 0);
        store
    }

    fn find_texts(store: &NodeStore, criteria: impl Into<Criteria>) -> Vec<String> {
        find_nodes(store, &criteria.into(), true)
            .iter()
            .map(|n| n.text.clone())
            .collect()
    }

    #[test]
    fn string_matches_id_or_text() {
        let store = store_with(json!([{ "text": "Alpha", "id": "a1" }, "Beta"]));
        assert_eq!(find_texts(&store, "Alpha"), ["Alpha"]);
        assert_eq!(find_texts(&store, "a1"), ["Alpha"]);
        assert_eq!(find_texts(&store, "Beta"), ["Beta"]);
        // Exact equality, not substring.
        assert!(find_texts(&store, "Alph").is_empty());
    }

    #[test]
    fn empty_criteria_never_match() {
        let store = store_with(json!(["a", "b"]));
        assert!(find_texts(&store, "").is_empty());
        assert!(find_texts(&store, Criteria::None).is_empty());
        assert!(find_texts(&store, Criteria::from(json!(null))).is_empty());
        assert!(find_texts(&store, Criteria::from(json!(false))).is_empty());
        assert!(find_texts(&store, Criteria::from(json!({}))).is_empty());
        assert!(find_texts(&store, Criteria::from(json!([]))).is_empty());
    }

    #[test]
    fn regex_matches_text() {
        let store = store_with(json!(["Class basic syntax", "Class inheritance", "Other"]));
        let found = find_texts(&store, Regex::new("^Class").unwrap());
        assert_eq!(found, ["Class basic syntax", "Class inheritance"]);
    }

    #[test]
    fn id_pattern_matches_id_only() {
        let store = store_with(json!([{ "text": "widget", "id": "item-7" }]));
        assert_eq!(
            find_texts(&store, Criteria::IdPattern(Regex::new("^item-").unwrap())),
            ["widget"]
        );
        assert!(find_texts(&store, Criteria::IdPattern(Regex::new("widget").unwrap())).is_empty());
    }

    #[test]
    fn func_criteria() {
        let store = store_with(json!(["short", "a much longer label"]));
        let found = find_texts(&store, Criteria::func(|n| n.text.len() > 10));
        assert_eq!(found, ["a much longer label"]);
    }

    #[test]
    fn or_within_one_key_and_across_keys() {
        let store = store_with(json!([
            { "text": "A", "selected": true, "checked": true },
            { "text": "B", "selected": true },
            { "text": "C" }
        ]));
        // OR within one key.
        assert_eq!(
            find_texts(&store, Criteria::from(json!({ "text": ["A", "B"] }))),
            ["A", "B"]
        );
        // AND across keys.
        assert_eq!(
            find_texts(&store, Criteria::from(json!({ "selected": true, "checked": true }))),
            ["A"]
        );
    }

    #[test]
    fn or_across_criteria_sequence() {
        let store = store_with(json!([
            { "text": "A", "weight": 1 },
            { "text": "B", "weight": 2 },
            { "text": "C", "weight": 3 }
        ]));
        let found = find_texts(
            &store,
            Criteria::from(json!([{ "weight": 1 }, { "weight": 2 }])),
        );
        assert_eq!(found, ["A", "B"]);
    }

    #[test]
    fn dot_path_into_data() {
        let store = store_with(json!([
            { "text": "A", "data": { "weight": 7 } },
            { "text": "B", "data": { "weight": 9 } }
        ]));
        assert_eq!(
            find_texts(&store, Criteria::from(json!({ "data.weight": 7 }))),
            ["A"]
        );
        // The bag is also addressable without the prefix.
        assert_eq!(
            find_texts(&store, Criteria::from(json!({ "weight": 9 }))),
            ["B"]
        );
    }

    #[test]
    fn checked_tolerates_absent_flags() {
        let store = store_with(json!([{ "text": "A", "checked": true }, "B"]));
        assert_eq!(
            find_texts(&store, Criteria::from(json!({ "checked": false }))),
            ["B"]
        );
    }

    #[test]
    fn expanded_false_requires_expandable() {
        let store = store_with(json!([
            { "text": "open", "expanded": true, "child": ["x"] },
            { "text": "shut", "child": ["y"] },
            "leaf"
        ]));
        assert_eq!(
            find_texts(&store, Criteria::from(json!({ "expanded": true }))),
            ["open"]
        );
        // A leaf is not "collapsed".
        assert_eq!(
            find_texts(&store, Criteria::from(json!({ "expanded": false }))),
            ["shut"]
        );
    }

    #[test]
    fn computed_property_keys() {
        let store = store_with(json!([
            { "text": "branch", "child": ["kid"] },
            { "text": "pending", "batch": true },
            { "text": "frozen", "disabledCheckbox": true }
        ]));
        let expandable = find_texts(&store, Criteria::from(json!({ "expandable": true })));
        assert_eq!(expandable, ["branch", "pending"]);
        let not_checkable = find_texts(&store, Criteria::from(json!({ "checkable": false })));
        assert_eq!(not_checkable, ["frozen"]);
        // Breadth-first: the depth-0 leaf comes before the depth-1 one.
        let leaves = find_texts(&store, Criteria::from(json!({ "isLeaf": true })));
        assert_eq!(leaves, ["frozen", "kid"]);
    }

    #[test]
    fn not_negates_with_expandable_fallback() {
        let store = store_with(json!([
            { "text": "open", "expanded": true, "child": ["x"] },
            { "text": "shut", "child": ["y"] },
            "leaf"
        ]));
        // $not(expanded:true) = expandable nodes that are not expanded.
        // Leaves fall into the negated source set, so they drop out too.
        let found = find_texts(&store, Criteria::from(json!({ "$not": { "expanded": true } })));
        assert_eq!(found, ["shut"]);
        // Without an expansion reference the fallback does not apply.
        let found = find_texts(&store, Criteria::from(json!({ "$not": { "text": "open" } })));
        assert_eq!(found, ["shut", "leaf", "x", "y"]);
    }

    #[test]
    fn evaluation_is_breadth_first() {
        let store = store_with(json!([
            { "text": "deep", "child": [{ "text": "match", "id": "m1" }] },
            { "text": "match", "id": "m2" }
        ]));
        // Both nodes share a text; the shallower one wins the single find.
        let found = find_nodes(&store, &Criteria::from("match"), false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "m2");
    }
}
