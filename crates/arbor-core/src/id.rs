//! Node identifiers.
//!
//! Every node in a tree carries a string identifier, unique within that
//! tree. Input literals may supply their own; entries without one get a
//! generated id from a process-wide counter.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a node within a tree.
///
/// Backed by an immutable string so it can round-trip through the
/// JSON-shaped input surface and be matched by string criteria.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(Box<str>);

impl NodeId {
    /// Create an id from an explicit string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().into_boxed_str())
    }

    /// Generate a fresh id.
    ///
    /// Ids are unique per process run; they are not stable across runs.
    pub fn generate() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("n-{n}").into_boxed_str())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_id_round_trips() {
        let id = NodeId::new("classes");
        assert_eq!(id.as_str(), "classes");
        assert_eq!(id.to_string(), "classes");
        assert_eq!(id, "classes");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = NodeId::generate();
        let b = NodeId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn borrow_allows_str_map_lookup() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(NodeId::new("x"), 1);
        assert_eq!(map.get("x"), Some(&1));
    }
}
