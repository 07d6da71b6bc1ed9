#![forbid(unsafe_code)]

//! Arbor public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. It
//! re-exports common types from the internal crates and offers a
//! lightweight prelude for day-to-day usage.
//!
//! # Example
//!
//! ```
//! use arbor::prelude::*;
//! use serde_json::json;
//!
//! let mut tree = Tree::from_value(&json!(["Hello", "World"]));
//! let first = tree.roots()[0].clone();
//! tree.select(first);
//! assert_eq!(tree.selected_ids().len(), 1);
//! ```

// --- Model re-exports ------------------------------------------------------

pub use arbor_core::class_list::ClassList;
pub use arbor_core::id::NodeId;
pub use arbor_core::node::{Node, NodeFlags};
pub use arbor_core::parse::{Parsed, parse};

// --- Engine re-exports -----------------------------------------------------

pub use arbor_engine::event::TreeEvent;
pub use arbor_engine::load::{LoadError, LoadResult, LoadTask, Loader, LoaderFuture, NodeSource};
pub use arbor_engine::nav::Linked;
pub use arbor_engine::query::{Criteria, Matcher};
pub use arbor_engine::store::NodeStore;
pub use arbor_engine::tree::{CheckModel, InsertOptions, Tree, TreeState};
pub use arbor_engine::walk::{Flattened, Flow};

// --- Prelude ---------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CheckModel, ClassList, Criteria, Flattened, Flow, InsertOptions, Linked, LoadError,
        LoadResult, Node, NodeFlags, NodeId, NodeSource, Tree, TreeEvent, TreeState,
    };
}
