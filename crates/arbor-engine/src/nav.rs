#![forbid(unsafe_code)]

//! Keyboard navigation.
//!
//! Computes the next/previous selectable node relative to a given node in
//! in-order tree position: disabled nodes are skipped and a node's
//! children only count while it is expanded.

use crate::store::NodeStore;
use crate::walk;
use arbor_core::{Node, NodeId};
use std::sync::Arc;

/// Neighbors of a node for keyboard traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Linked {
    /// The node after this one, if any.
    pub next: Option<NodeId>,
    /// The node before this one, if any.
    pub prev: Option<NodeId>,
}

/// Compute both neighbors of `id`. Unknown ids yield empty links.
pub fn linked(store: &NodeStore, id: &str) -> Linked {
    let Some(node) = store.get(id) else {
        return Linked::default();
    };
    Linked {
        next: next_of(store, node),
        prev: prev_of(store, node),
    }
}

fn enabled(store: &NodeStore, id: &NodeId) -> bool {
    store.get(id.as_str()).is_some_and(|n| !n.is_disabled())
}

// First enabled child when expanded, else the next enabled sibling,
// else the nearest ancestor's next enabled sibling. The last visible
// descendant of the last root has no next.
fn next_of(store: &NodeStore, node: &Arc<Node>) -> Option<NodeId> {
    if node.is_expanded() {
        if let Some(child) = walk::first_enabled_child(store, node.id.as_str()) {
            return Some(child.id.clone());
        }
    }

    let mut current = node.clone();
    loop {
        let siblings = store.siblings(&current);
        let index = siblings.iter().position(|s| s == &current.id)?;
        if let Some(next) = siblings[index + 1..].iter().find(|s| enabled(store, s)) {
            return Some(next.clone());
        }
        match &current.parent {
            Some(pid) => current = store.get(pid.as_str())?.clone(),
            None => return None,
        }
    }
}

// Previous enabled sibling, followed down into its deepest expanded
// last-enabled descendant; with no previous sibling the parent itself is
// the answer.
fn prev_of(store: &NodeStore, node: &Arc<Node>) -> Option<NodeId> {
    let siblings = store.siblings(node);
    let index = siblings.iter().position(|s| s == &node.id)?;
    let previous = siblings[..index].iter().rev().find(|s| enabled(store, s));

    match previous {
        Some(prev) => {
            let mut current = store.get(prev.as_str())?.clone();
            while current.is_expanded() {
                match walk::last_enabled_child(store, current.id.as_str()) {
                    Some(last) => current = last,
                    None => break,
                }
            }
            Some(current.id.clone())
        }
        None => node.parent.clone(),
    }
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

    fn id(store: &NodeStore, text: &str) -> NodeId {
        store
            .iter()
            .find(|n| n.text == text)
            .map(|n| n.id.clone())
            .expect("node by text")
    }

    fn next_text(store: &NodeStore, text: &str) -> Option<String> {
        let l = linked(store, id(store, text).as_str());
        l.next
            .map(|n| store.get(n.as_str()).unwrap().text.clone())
    }

    fn prev_text(store: &NodeStore, text: &str) -> Option<String> {
        let l = linked(store, id(store, text).as_str());
        l.prev
            .map(|n| store.get(n.as_str()).unwrap().text.clone())
    }

    #[test]
    fn next_descends_into_expanded_children() {
        let store = store_with(json!([
            { "text": "a", "expanded": true, "child": ["a1", "a2"] },
            "b"
        ]));
        assert_eq!(next_text(&store, "a").as_deref(), Some("a1"));
        assert_eq!(next_text(&store, "a1").as_deref(), Some("a2"));
    }

    #[test]
    fn next_skips_collapsed_children() {
        let store = store_with(json!([
            { "text": "a", "child": ["a1"] },
            "b"
        ]));
        assert_eq!(next_text(&store, "a").as_deref(), Some("b"));
    }

    #[test]
    fn next_climbs_out_of_exhausted_subtrees() {
        let store = store_with(json!([
            {
                "text": "a",
                "expanded": true,
                "child": [{ "text": "mid", "expanded": true, "child": ["deep"] }]
            },
            "b"
        ]));
        // "deep" is the last descendant of its local subtree; its next
        // jumps two levels up.
        assert_eq!(next_text(&store, "deep").as_deref(), Some("b"));
    }

    #[test]
    fn last_descendant_of_last_root_has_no_next() {
        let store = store_with(json!([
            "a",
            { "text": "b", "expanded": true, "child": ["b1"] }
        ]));
        assert_eq!(next_text(&store, "b1"), None);
    }

    #[test]
    fn next_skips_disabled_siblings() {
        let store = store_with(json!([
            "a",
            { "text": "skip", "disabled": true },
            "c"
        ]));
        assert_eq!(next_text(&store, "a").as_deref(), Some("c"));
    }

    #[test]
    fn prev_follows_expanded_sibling_to_deepest_descendant() {
        let store = store_with(json!([
            {
                "text": "a",
                "expanded": true,
                "child": ["a1", { "text": "a2", "expanded": true, "child": ["a2x"] }]
            },
            "b"
        ]));
        assert_eq!(prev_text(&store, "b").as_deref(), Some("a2x"));
    }

    #[test]
    fn prev_of_first_child_is_the_parent() {
        let store = store_with(json!([
            { "text": "a", "expanded": true, "child": ["a1"] }
        ]));
        assert_eq!(prev_text(&store, "a1").as_deref(), Some("a"));
    }

    #[test]
    fn prev_of_first_root_is_none() {
        let store = store_with(json!(["a", "b"]));
        assert_eq!(prev_text(&store, "a"), None);
        assert_eq!(prev_text(&store, "b").as_deref(), Some("a"));
    }

    #[test]
    fn prev_ignores_collapsed_sibling_children() {
        let store = store_with(json!([
            { "text": "a", "child": ["hidden"] },
            "b"
        ]));
        assert_eq!(prev_text(&store, "b").as_deref(), Some("a"));
    }

    #[test]
    fn unknown_id_yields_empty_links() {
        let store = store_with(json!(["a"]));
        assert_eq!(linked(&store, "missing"), Linked::default());
    }
}
