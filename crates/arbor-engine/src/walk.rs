#![forbid(unsafe_code)]

//! Traversal library.
//!
//! Read-only walks over a [`NodeStore`]: depth-first descent with
//! prune/stop control, ancestor walks, breadth-first-by-depth walks, and
//! the visible flatten the view layer diffs against.

use crate::store::NodeStore;
use arbor_core::{Node, NodeId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Visitor verdict controlling a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// Skip this node's children, keep walking elsewhere.
    Prune,
    /// Abort the whole walk.
    Stop,
}

/// Depth-first pre-order descent from one node.
///
/// With `exclude_self` the walk starts at the node's children. The
/// visitor may return [`Flow::Prune`] to skip a subtree or [`Flow::Stop`]
/// to abort. Unknown ids are a silent no-op.
pub fn recurse_down<F>(store: &NodeStore, id: &str, exclude_self: bool, visit: &mut F) -> Flow
where
    F: FnMut(&Arc<Node>) -> Flow,
{
    let Some(node) = store.get(id) else {
        return Flow::Continue;
    };
    if exclude_self {
        for child in &node.children {
            if descend(store, child.as_str(), visit) == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    } else {
        descend(store, id, visit)
    }
}

/// Depth-first pre-order descent over several subtrees.
pub fn recurse_forest<F>(store: &NodeStore, ids: &[NodeId], visit: &mut F) -> Flow
where
    F: FnMut(&Arc<Node>) -> Flow,
{
    for id in ids {
        if descend(store, id.as_str(), visit) == Flow::Stop {
            return Flow::Stop;
        }
    }
    Flow::Continue
}

fn descend<F>(store: &NodeStore, id: &str, visit: &mut F) -> Flow
where
    F: FnMut(&Arc<Node>) -> Flow,
{
    let Some(node) = store.get(id) else {
        return Flow::Continue;
    };
    match visit(node) {
        Flow::Stop => Flow::Stop,
        Flow::Prune => Flow::Continue,
        Flow::Continue => {
            for child in &node.children {
                if descend(store, child.as_str(), visit) == Flow::Stop {
                    return Flow::Stop;
                }
            }
            Flow::Continue
        }
    }
}

/// Walk ancestors from the immediate parent to the root. Stops early on
/// [`Flow::Stop`] (or [`Flow::Prune`], which means the same here).
pub fn traverse_up<F>(store: &NodeStore, id: &str, visit: &mut F)
where
    F: FnMut(&Arc<Node>) -> Flow,
{
    let mut current = store.get(id).and_then(|n| n.parent.clone());
    while let Some(pid) = current {
        let Some(parent) = store.get(pid.as_str()) else {
            return;
        };
        if visit(parent) != Flow::Continue {
            return;
        }
        current = parent.parent.clone();
    }
}

/// Breadth-first-by-depth walk: all reachable nodes grouped by `depth`,
/// depth 0 first, then depth 1, and so on, in left-to-right document order
/// within a level. The visitor may abort the whole walk with
/// [`Flow::Stop`].
pub fn walk_breadth<F>(store: &NodeStore, ids: &[NodeId], visit: &mut F)
where
    F: FnMut(&Arc<Node>) -> Flow,
{
    let mut by_depth: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
    recurse_forest(store, ids, &mut |n| {
        by_depth.entry(n.depth).or_default().push(n.id.clone());
        Flow::Continue
    });

    for level in by_depth.values() {
        for id in level {
            let Some(node) = store.get(id.as_str()) else {
                continue;
            };
            if visit(node) == Flow::Stop {
                return;
            }
        }
    }
}

/// The visible sequence produced by [`flatten`].
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    /// Frozen records in visible order.
    pub nodes: Vec<Arc<Node>>,
    /// Matching ids, same order.
    pub ids: Vec<NodeId>,
}

/// Depth-first flatten of the forest into the sequence a view renders.
///
/// Disabled nodes (and their subtrees) are always skipped. Without
/// `ignore_collapsed` only a collapsed **root** hides its subtree; with
/// it, any collapsed parent hides its children.
pub fn flatten(store: &NodeStore, ignore_collapsed: bool) -> Flattened {
    let mut out = Flattened::default();
    for root in store.roots() {
        flatten_into(store, root.as_str(), true, ignore_collapsed, &mut out);
    }
    out
}

fn flatten_into(
    store: &NodeStore,
    id: &str,
    is_root: bool,
    ignore_collapsed: bool,
    out: &mut Flattened,
) {
    let Some(node) = store.get(id) else {
        return;
    };
    if node.is_disabled() {
        return;
    }
    out.ids.push(node.id.clone());
    out.nodes.push(node.clone());

    let descend = if ignore_collapsed {
        node.is_expanded()
    } else {
        !is_root || node.is_expanded()
    };
    if descend {
        for child in node.children.clone() {
            flatten_into(store, child.as_str(), false, ignore_collapsed, out);
        }
    }
}

/// First direct child not flagged disabled.
pub fn first_enabled_child(store: &NodeStore, id: &str) -> Option<Arc<Node>> {
    let node = store.get(id)?;
    node.children
        .iter()
        .filter_map(|c| store.get(c.as_str()))
        .find(|c| !c.is_disabled())
        .cloned()
}

/// Last direct child not flagged disabled.
pub fn last_enabled_child(store: &NodeStore, id: &str) -> Option<Arc<Node>> {
    let node = store.get(id)?;
    node.children
        .iter()
        .rev()
        .filter_map(|c| store.get(c.as_str()))
        .find(|c| !c.is_disabled())
        .cloned()
}
