#![forbid(unsafe_code)]

//! Checkbox cascade engine.
//!
//! When a node's checked state flips, the change propagates down to every
//! checkable descendant and back up the ancestor chain, where each parent
//! lands on checked, unchecked, or the mixed tri-state depending on what
//! its checkable children now look like. The whole computation runs over
//! the in-progress checked/indeterminate id sets and is applied to node
//! flags in one pass at the end.

use crate::store::NodeStore;
use crate::walk::{self, Flow};
use arbor_core::{Node, NodeFlags, NodeId};
use std::sync::Arc;

/// What a cascade changed, for event notification.
#[derive(Debug, Clone, Default)]
pub struct CascadeOutcome {
    /// Strict descendants whose checked state flipped, paired with the
    /// state they flipped to.
    pub changed: Vec<(NodeId, bool)>,
}

pub(crate) fn add_unique(set: &mut Vec<NodeId>, id: &NodeId) {
    if !set.contains(id) {
        set.push(id.clone());
    }
}

pub(crate) fn remove_id(set: &mut Vec<NodeId>, id: &NodeId) {
    set.retain(|x| x != id);
}

/// Recompute the checked/indeterminate membership sets after `id` flips
/// to `will_be_checked`, then sync node flags to the final sets.
///
/// The caller is responsible for having placed (or removed) `id` itself
/// in the checked set, and for firing events from the returned outcome.
pub fn refresh_indeterminate(
    store: &mut NodeStore,
    checked: &mut Vec<NodeId>,
    indeterminate: &mut Vec<NodeId>,
    id: &str,
    will_be_checked: bool,
) -> CascadeOutcome {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!("cascade", id, checked = will_be_checked).entered();

    let mut outcome = CascadeOutcome::default();

    // 1. Collect checkable strict descendants, pruning disabled subtrees,
    //    noting which ones actually flip.
    let mut child_ids: Vec<NodeId> = Vec::new();
    walk::recurse_down(store, id, true, &mut |n| {
        if !n.is_checkable() {
            return Flow::Prune;
        }
        child_ids.push(n.id.clone());
        if n.is_checked() != will_be_checked {
            outcome.changed.push((n.id.clone(), will_be_checked));
        }
        Flow::Continue
    });

    // 2. Fold the descendants into the checked set.
    if will_be_checked {
        for cid in &child_ids {
            add_unique(checked, cid);
        }
    } else {
        checked.retain(|c| !child_ids.contains(c));
    }

    // 3–5. Ancestor recomputation, purge, and flag sync.
    refresh_ancestors(store, checked, indeterminate, id, will_be_checked);

    outcome
}

/// Recompute the ancestor chain of `id` against the current sets, purge
/// checked∩indeterminate, and sync flags. Split out from the full cascade
/// for mutations (inserts, loads) that change a parent's child population
/// without flipping descendant state.
pub(crate) fn refresh_ancestors(
    store: &mut NodeStore,
    checked: &mut Vec<NodeId>,
    indeterminate: &mut Vec<NodeId>,
    id: &str,
    will_be_checked: bool,
) {
    // Nearest first; a non-checkable ancestor freezes itself and
    // everything above it.
    let mut ancestors: Vec<Arc<Node>> = Vec::new();
    walk::traverse_up(store, id, &mut |n| {
        ancestors.push(n.clone());
        Flow::Continue
    });
    for ancestor in ancestors {
        if !ancestor.is_checkable() {
            break;
        }
        let kids: Vec<&NodeId> = ancestor
            .children
            .iter()
            .filter(|c| store.get(c.as_str()).is_some_and(|n| n.is_checkable()))
            .collect();
        let total = kids.len();
        let marked = kids
            .iter()
            .filter(|k| checked.contains(k) || indeterminate.contains(k))
            .count();

        let is_indeterminate =
            ancestor.is_expandable() && total > 0 && marked > 0 && marked < total;
        if is_indeterminate {
            add_unique(indeterminate, &ancestor.id);
            remove_id(checked, &ancestor.id);
        } else {
            remove_id(indeterminate, &ancestor.id);
            if will_be_checked {
                add_unique(checked, &ancestor.id);
            } else {
                remove_id(checked, &ancestor.id);
            }
        }
    }

    // Checked wins over indeterminate.
    indeterminate.retain(|i| !checked.contains(i));

    sync_flags(store, checked, indeterminate);
}

/// Recompute a node's own checked/indeterminate membership and its
/// ancestor chain after its child population shrank (removal, empty).
/// Unlike a cascade there is no "direction": each level settles on
/// checked when every checkable child is checked, indeterminate on a
/// strict partial subset, unchecked otherwise. Leaves keep whatever
/// membership they have.
pub(crate) fn recompute_membership(
    store: &mut NodeStore,
    checked: &mut Vec<NodeId>,
    indeterminate: &mut Vec<NodeId>,
    id: &str,
) {
    let mut chain: Vec<Arc<Node>> = Vec::new();
    if let Some(node) = store.get(id) {
        chain.push(node.clone());
    }
    walk::traverse_up(store, id, &mut |n| {
        chain.push(n.clone());
        Flow::Continue
    });

    for node in chain {
        if !node.is_checkable() {
            break;
        }
        let kids: Vec<&NodeId> = node
            .children
            .iter()
            .filter(|c| store.get(c.as_str()).is_some_and(|n| n.is_checkable()))
            .collect();
        let total = kids.len();
        if total == 0 && !node.is_expandable() {
            // A node with no checkable children keeps its own membership,
            // but a leaf can never be indeterminate.
            remove_id(indeterminate, &node.id);
            continue;
        }
        let marked = kids
            .iter()
            .filter(|k| checked.contains(k) || indeterminate.contains(k))
            .count();
        let all_checked = total > 0 && kids.iter().all(|k| checked.contains(k));

        if node.is_expandable() && total > 0 && marked > 0 && marked < total {
            add_unique(indeterminate, &node.id);
            remove_id(checked, &node.id);
        } else {
            remove_id(indeterminate, &node.id);
            if total > 0 {
                if all_checked {
                    add_unique(checked, &node.id);
                } else {
                    remove_id(checked, &node.id);
                }
            }
        }
    }

    indeterminate.retain(|i| !checked.contains(i));
    sync_flags(store, checked, indeterminate);
}

/// Make every record's CHECKED/INDETERMINATE flags agree with the sets.
pub(crate) fn sync_flags(
    store: &mut NodeStore,
    checked: &[NodeId],
    indeterminate: &[NodeId],
) {
    let stale: Vec<NodeId> = store
        .iter()
        .filter(|n| {
            n.is_checked() != checked.contains(&n.id)
                || n.is_indeterminate() != indeterminate.contains(&n.id)
        })
        .map(|n| n.id.clone())
        .collect();
    for id in stale {
        let want_checked = checked.contains(&id);
        let want_indeterminate = indeterminate.contains(&id);
        store.update(id.as_str(), |n| {
            n.set_flag(NodeFlags::CHECKED, want_checked);
            n.set_flag(NodeFlags::INDETERMINATE, want_indeterminate);
        });
    }
}
