#![forbid(unsafe_code)]

//! Node model and input-literal parser for the Arbor tree state engine.
//!
//! This crate holds the leaf pieces everything else builds on: the
//! [`NodeId`] identifier, the flat [`Node`] record with its packed
//! [`NodeFlags`], the [`ClassList`] label set, and the tolerant
//! [`parse`] function that turns JSON-shaped literals into records.
//!
//! Structural relations are identifiers, not references: a node names its
//! parent and children by [`NodeId`] and the owning store resolves them.
//! That keeps the parent/child cycle out of the representation while the
//! engine still walks ancestors in O(1) hops.

pub mod class_list;
pub mod id;
pub mod node;
pub mod parse;

pub use class_list::ClassList;
pub use id::NodeId;
pub use node::{Node, NodeFlags};
pub use parse::{Parsed, parse};
