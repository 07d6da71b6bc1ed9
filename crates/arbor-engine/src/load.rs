#![forbid(unsafe_code)]

//! Lazy subtree loading.
//!
//! A batch node's children live upstream and are materialized through an
//! asynchronous loader. The load is an explicit task: the tree hands out
//! a [`LoadTask`] owning the boxed future, the caller drives it without
//! borrowing the tree (synchronous mutations interleave freely), then
//! feeds the resolution back in. A resolution that arrives after the
//! batch node was removed applies as a silent no-op.

use arbor_core::{Node, NodeId};
use futures::future::LocalBoxFuture;
use serde_json::Value;
use std::fmt;

/// Errors from the lazy-loading surface.
///
/// Everything else in the engine reports failure as "not found" and stays
/// silent; loading is the one place a contract violation interrupts
/// control flow.
#[derive(Debug)]
pub enum LoadError {
    /// A load was requested but no loader is configured.
    NoLoader,
    /// The id did not resolve to any node at load start.
    NotFound(NodeId),
    /// The node is not a batch node; there is nothing to load.
    NotBatch(NodeId),
    /// A load for this node is already in flight.
    AlreadyLoading(NodeId),
    /// The loader itself failed.
    Fetch(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NoLoader => write!(f, "no loader configured"),
            LoadError::NotFound(id) => write!(f, "no node with id {id}"),
            LoadError::NotBatch(id) => write!(f, "node {id} is not a batch node"),
            LoadError::AlreadyLoading(id) => write!(f, "node {id} is already loading"),
            LoadError::Fetch(msg) => write!(f, "load failed: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// The future a loader produces: node literals for the batch node's
/// children, or a fetch failure.
pub type LoaderFuture = LocalBoxFuture<'static, LoadResult<Value>>;

/// The loader contract: given the batch node, produce a future resolving
/// to a node literal or sequence of node literals.
pub type Loader = Box<dyn Fn(&Node) -> LoaderFuture>;

/// An in-flight batch load, detached from the tree.
///
/// Returned by [`Tree::begin_load`](crate::tree::Tree::begin_load). Drive
/// the future however the host schedules work, then hand the resolution
/// to [`Tree::finish_load`](crate::tree::Tree::finish_load).
pub struct LoadTask {
    id: NodeId,
    future: LoaderFuture,
}

impl LoadTask {
    pub(crate) fn new(id: NodeId, future: LoaderFuture) -> Self {
        Self { id, future }
    }

    /// The batch node this load belongs to.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Drive the future to completion.
    pub async fn resolve(self) -> (NodeId, LoadResult<Value>) {
        let result = self.future.await;
        (self.id, result)
    }
}

impl fmt::Debug for LoadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadTask").field("id", &self.id).finish()
    }
}

/// Where the nodes for an insert operation come from: literals available
/// now, a future resolving to literals, or a function invoked with the
/// insertion parent that produces such a future.
pub enum NodeSource {
    /// A node literal or sequence of literals, available synchronously.
    Value(Value),
    /// A future resolving to literals.
    Future(LoaderFuture),
    /// A fetch function handed the insertion parent (`None` for top-level
    /// inserts); the insert-operation shape of the loader contract.
    Fetch(Box<dyn FnOnce(Option<&Node>) -> LoaderFuture>),
}

impl NodeSource {
    /// Wrap a future resolving to literals.
    pub fn future<F>(fut: F) -> Self
    where
        F: Future<Output = LoadResult<Value>> + 'static,
    {
        Self::Future(Box::pin(fut))
    }

    /// Wrap a fetch function.
    pub fn fetch(f: impl FnOnce(Option<&Node>) -> LoaderFuture + 'static) -> Self {
        Self::Fetch(Box::new(f))
    }
}

impl fmt::Debug for NodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Future(_) => f.write_str("Future(..)"),
            Self::Fetch(_) => f.write_str("Fetch(..)"),
        }
    }
}

impl From<Value> for NodeSource {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for NodeSource {
    fn from(text: &str) -> Self {
        Self::Value(Value::String(text.to_owned()))
    }
}

impl From<Vec<Value>> for NodeSource {
    fn from(values: Vec<Value>) -> Self {
        Self::Value(Value::Array(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_display() {
        let id = NodeId::new("more");
        assert_eq!(LoadError::NoLoader.to_string(), "no loader configured");
        assert_eq!(
            LoadError::AlreadyLoading(id.clone()).to_string(),
            "node more is already loading"
        );
        assert_eq!(
            LoadError::Fetch("boom".into()).to_string(),
            "load failed: boom"
        );
        assert_eq!(
            LoadError::NotBatch(id).to_string(),
            "node more is not a batch node"
        );
    }

    #[test]
    fn source_conversions() {
        assert!(matches!(NodeSource::from("Item 1"), NodeSource::Value(_)));
        assert!(matches!(
            NodeSource::from(json!(["a", "b"])),
            NodeSource::Value(_)
        ));
        let src = NodeSource::future(async { Ok(json!("late")) });
        assert!(matches!(src, NodeSource::Future(_)));
    }

    #[test]
    fn task_resolves_to_its_id() {
        let task = LoadTask::new(NodeId::new("more"), Box::pin(async { Ok(json!(["a"])) }));
        let (id, result) = futures::executor::block_on(task.resolve());
        assert_eq!(id, "more");
        assert_eq!(result.unwrap(), json!(["a"]));
    }
}
