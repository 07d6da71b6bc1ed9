//! The tree node entity.
//!
//! A [`Node`] is a flat record: structural relations (`parent`, `children`)
//! are stored as identifiers and resolved through the owning store, which
//! keeps the parent/child relation acyclic at the representation level
//! while preserving O(1) ancestor walks.

use crate::class_list::ClassList;
use crate::id::NodeId;
use serde_json::{Map, Value};

bitflags::bitflags! {
    /// Boolean node state, packed.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u16 {
        /// Node is part of the current selection.
        const SELECTED          = 1 << 0;
        /// Checkbox is checked.
        const CHECKED           = 1 << 1;
        /// Checkbox is in the mixed tri-state.
        const INDETERMINATE     = 1 << 2;
        /// Children are visible.
        const EXPANDED          = 1 << 3;
        /// Node does not respond to interaction at all.
        const DISABLED          = 1 << 4;
        /// Only the checkbox is frozen.
        const DISABLED_CHECKBOX = 1 << 5;
        /// Children exist upstream but have not been materialized yet.
        const BATCH             = 1 << 6;
        /// A batch load is in flight.
        const LOADING           = 1 << 7;
    }
}

/// A labeled node in an ordered tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier within the owning tree.
    pub id: NodeId,
    /// Display label. Required; entries without one are dropped by the parser.
    pub text: String,
    /// Owning node, `None` for top-level nodes.
    pub parent: Option<NodeId>,
    /// Ordered children. Insertion order is significant and preserved.
    pub children: Vec<NodeId>,
    /// Number of ancestors; 0 for top-level nodes.
    pub depth: usize,
    /// Packed boolean state.
    pub flags: NodeFlags,
    /// Open attribute bag.
    pub data: Map<String, Value>,
    /// Free-form labels.
    pub class_list: ClassList,
}

impl Node {
    /// Create a leaf node with a generated id.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(NodeId::generate(), text)
    }

    /// Create a leaf node with an explicit id.
    pub fn with_id(id: NodeId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            parent: None,
            children: Vec::new(),
            depth: 0,
            flags: NodeFlags::default(),
            data: Map::new(),
            class_list: ClassList::new(),
        }
    }

    /// Set or clear a flag.
    pub fn set_flag(&mut self, flag: NodeFlags, on: bool) {
        self.flags.set(flag, on);
    }

    /// Whether the node is part of the selection.
    pub fn is_selected(&self) -> bool {
        self.flags.contains(NodeFlags::SELECTED)
    }

    /// Whether the checkbox is checked.
    pub fn is_checked(&self) -> bool {
        self.flags.contains(NodeFlags::CHECKED)
    }

    /// Whether the checkbox is in the mixed tri-state.
    pub fn is_indeterminate(&self) -> bool {
        self.flags.contains(NodeFlags::INDETERMINATE)
    }

    /// Whether children are visible.
    pub fn is_expanded(&self) -> bool {
        self.flags.contains(NodeFlags::EXPANDED)
    }

    /// Whether the node is disabled outright.
    pub fn is_disabled(&self) -> bool {
        self.flags.contains(NodeFlags::DISABLED)
    }

    /// Whether only the checkbox is frozen.
    pub fn is_checkbox_disabled(&self) -> bool {
        self.flags.contains(NodeFlags::DISABLED_CHECKBOX)
    }

    /// Whether children have not been materialized yet.
    pub fn is_batch(&self) -> bool {
        self.flags.contains(NodeFlags::BATCH)
    }

    /// Whether a batch load is in flight.
    pub fn is_loading(&self) -> bool {
        self.flags.contains(NodeFlags::LOADING)
    }

    /// A node is checkable iff neither `DISABLED` nor `DISABLED_CHECKBOX`
    /// is set.
    pub fn is_checkable(&self) -> bool {
        !self
            .flags
            .intersects(NodeFlags::DISABLED | NodeFlags::DISABLED_CHECKBOX)
    }

    /// A node is expandable iff it has at least one child or is a batch
    /// node whose children are still upstream.
    pub fn is_expandable(&self) -> bool {
        !self.children.is_empty() || self.is_batch()
    }

    /// Whether the node has no children, materialized or pending.
    pub fn is_leaf(&self) -> bool {
        !self.is_expandable()
    }

    /// Read an attribute from the data bag.
    pub fn data_get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}
