#![forbid(unsafe_code)]

//! The Arbor tree state engine.
//!
//! A headless, in-memory ordered tree of labeled nodes with selection,
//! tri-state checkbox cascading, structural and attribute queries,
//! copy-on-write mutation, and asynchronous lazy loading of subtrees.
//! Rendering and event wiring live in a presentation layer elsewhere;
//! this crate exposes the mutation/query contract and the update
//! notifications that layer consumes.
//!
//! # Architecture
//!
//! - [`store::NodeStore`]: arena of `Arc<Node>` records; clone-on-shared
//!   writes keep previously handed-out records frozen.
//! - [`walk`]: traversal primitives, including prune/stop descent, ancestor walks,
//!   breadth-by-depth walks, the visible flatten.
//! - [`query`]: criteria compiled to predicates, evaluated breadth-first.
//! - [`cascade`]: tri-state checkbox propagation.
//! - [`nav`]: next/previous selectable node for keyboard traversal.
//! - [`tree::Tree`]: the mutation facade tying it all together.
//!
//! # Example
//!
//! ```
//! use arbor_engine::prelude::*;
//! use serde_json::json;
//!
//! let mut tree = Tree::from_value(&json!([
//!     { "text": "Notes", "id": "notes", "child": ["Monday", "Tuesday"] }
//! ]));
//! tree.check("notes");
//! assert_eq!(tree.checked(CheckModel::Leaf).len(), 2);
//! assert!(tree.find("Monday").unwrap().is_checked());
//! ```

pub mod cascade;
pub mod event;
pub mod load;
pub mod nav;
pub mod query;
pub mod store;
pub mod tree;
pub mod walk;

pub use event::TreeEvent;
pub use load::{LoadError, LoadResult, LoadTask, Loader, LoaderFuture, NodeSource};
pub use nav::Linked;
pub use query::{Criteria, Matcher};
pub use store::NodeStore;
pub use tree::{CheckModel, InsertOptions, Tree, TreeState};
pub use walk::{Flattened, Flow};

/// Convenient glob import for consumers.
pub mod prelude {
    pub use crate::event::TreeEvent;
    pub use crate::load::{LoadError, LoadResult, NodeSource};
    pub use crate::nav::Linked;
    pub use crate::query::Criteria;
    pub use crate::tree::{CheckModel, InsertOptions, Tree, TreeState};
    pub use crate::walk::{Flattened, Flow};
    pub use arbor_core::{ClassList, Node, NodeFlags, NodeId};
}
