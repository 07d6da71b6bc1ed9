#![forbid(unsafe_code)]

//! Notifications surfaced to the collaborator.
//!
//! Mutations push events onto a queue owned by the tree; the view layer
//! drains them with [`Tree::take_events`](crate::tree::Tree::take_events)
//! after issuing commands. Events are fire-and-forget and never retried.
//!
//! Events carry ids rather than records: a collaborator re-fetches by id
//! before reading state, the same discipline that applies after any
//! foreign mutation. The one exception is [`TreeEvent::Removed`], whose
//! node can no longer be fetched, so it carries the detached record.

use arbor_core::{Node, NodeId};
use std::sync::Arc;

/// A state change the collaborator may care about.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    /// A node joined the selection.
    Selected(NodeId),
    /// A node left the selection.
    Unselected(NodeId),
    /// A node's checked state flipped.
    Checked {
        /// The node whose state flipped.
        id: NodeId,
        /// The state it flipped to.
        checked: bool,
    },
    /// A node was expanded or collapsed.
    Expanded {
        /// The node that changed.
        id: NodeId,
        /// Whether it is now expanded.
        expanded: bool,
    },
    /// A node (and its subtree) left the tree. Carries the detached
    /// record since it can no longer be looked up.
    Removed(Arc<Node>),
    /// Nodes were inserted.
    Added {
        /// The parent they were attached under; `None` for top level.
        parent: Option<NodeId>,
        /// Ids of the inserted top-level entries, in order.
        ids: Vec<NodeId>,
    },
    /// A double-click semantic command was routed to a node.
    DoubleClick(NodeId),
    /// Something changed; the view should re-render from a fresh flatten.
    Updated,
}
