#![forbid(unsafe_code)]

//! Copy-on-write node store.
//!
//! An arena of [`Node`] records keyed by id, plus the ordered root list.
//! Records are held behind [`Arc`] and every write goes through
//! [`Arc::make_mut`]: a record that has been handed out (from a lookup, a
//! flatten, a query result, an event) is cloned before the store writes,
//! so holders never observe in-place mutation. Consumers that want the
//! current state re-fetch by id.

use arbor_core::{Node, NodeId, Parsed};
use std::collections::HashMap;
use std::sync::Arc;

/// Arena container for one tree session.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    arena: HashMap<NodeId, Arc<Node>>,
    roots: Vec<NodeId>,
}

impl NodeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Option<&Arc<Node>> {
        self.arena.get(id)
    }

    /// Whether a record with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.arena.contains_key(id)
    }

    /// Ordered top-level node ids.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Total number of records.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Iterate over all records in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.arena.values()
    }

    /// The sibling sequence a node lives in: its parent's children, or the
    /// root list for top-level nodes.
    pub fn siblings(&self, node: &Node) -> &[NodeId] {
        match &node.parent {
            Some(pid) => self
                .get(pid.as_str())
                .map(|p| p.children.as_slice())
                .unwrap_or(&[]),
            None => &self.roots,
        }
    }

    /// Position of a node among its siblings.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        let node = self.get(id)?;
        self.siblings(node).iter().position(|s| s.as_str() == id)
    }

    /// Mutate a record in place, cloning it first if anyone else holds it.
    /// Returns whether the record existed.
    pub fn update(&mut self, id: &str, f: impl FnOnce(&mut Node)) -> bool {
        match self.arena.get_mut(id) {
            Some(record) => {
                f(Arc::make_mut(record));
                true
            }
            None => false,
        }
    }

    /// Insert parsed records into the arena without attaching them to any
    /// sibling sequence. Incoming ids that collide with existing records
    /// are regenerated (the existing record keeps the claim) and all
    /// references inside the batch are rewritten to match. Returns the
    /// top-level ids of the batch, post-rewrite.
    pub fn adopt(&mut self, parsed: Parsed) -> Vec<NodeId> {
        let Parsed { top, nodes } = parsed;

        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
        for node in &nodes {
            if self.arena.contains_key(node.id.as_str()) {
                remap.insert(node.id.clone(), NodeId::generate());
            }
        }

        let rewrite = |id: &NodeId| remap.get(id).cloned().unwrap_or_else(|| id.clone());

        for mut node in nodes {
            node.id = rewrite(&node.id);
            if let Some(p) = &node.parent {
                if let Some(mapped) = remap.get(p) {
                    node.parent = Some(mapped.clone());
                }
            }
            node.children = node.children.iter().map(&rewrite).collect();
            self.arena.insert(node.id.clone(), Arc::new(node));
        }

        top.iter().map(&rewrite).collect()
    }

    /// Splice already-adopted subtrees into a parent's children (or the
    /// root list) at `index`, re-deriving parent ids and depths for every
    /// attached record. `index` is clamped to the sequence length.
    ///
    /// Checked/indeterminate consistency is the caller's job.
    pub fn attach_at(&mut self, parent: Option<&str>, ids: &[NodeId], index: usize) {
        match parent {
            Some(pid) => {
                let Some(parent_node) = self.get(pid) else {
                    return;
                };
                let parent_id = parent_node.id.clone();
                let parent_depth = parent_node.depth;
                self.update(pid, |p| {
                    let at = index.min(p.children.len());
                    p.children.splice(at..at, ids.iter().cloned());
                });
                for id in ids {
                    self.update(id.as_str(), |n| n.parent = Some(parent_id.clone()));
                    self.refresh_depths(id.as_str(), parent_depth + 1);
                }
            }
            None => {
                let at = index.min(self.roots.len());
                self.roots.splice(at..at, ids.iter().cloned());
                for id in ids {
                    self.update(id.as_str(), |n| n.parent = None);
                    self.refresh_depths(id.as_str(), 0);
                }
            }
        }
    }

    /// Recompute `depth` for a subtree rooted at `id`.
    pub fn refresh_depths(&mut self, id: &str, depth: usize) {
        let updated = self.update(id, |n| n.depth = depth);
        if !updated {
            return;
        }
        let children = self
            .get(id)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            self.refresh_depths(child.as_str(), depth + 1);
        }
    }

    /// Ids of a node and all its descendants, depth-first.
    pub fn subtree_ids(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_subtree(id, &mut out);
        out
    }

    fn collect_subtree(&self, id: &str, out: &mut Vec<NodeId>) {
        if let Some(node) = self.get(id) {
            out.push(node.id.clone());
            for child in &node.children {
                self.collect_subtree(child.as_str(), out);
            }
        }
    }

    /// Detach a node from its sibling sequence and evict it and every
    /// descendant from the arena. Returns the removed record with its
    /// parent reference cleared, or `None` (with nothing changed) when the
    /// id is unknown or its sibling index cannot be located.
    pub fn remove(&mut self, id: &str) -> Option<Arc<Node>> {
        let index = self.index_of(id)?;
        let node = self.get(id)?.clone();

        match &node.parent {
            Some(pid) => {
                let pid = pid.clone();
                self.update(pid.as_str(), |p| {
                    p.children.remove(index);
                });
            }
            None => {
                self.roots.remove(index);
            }
        }

        for sid in self.subtree_ids(id) {
            self.arena.remove(sid.as_str());
        }

        let mut detached = (*node).clone();
        detached.parent = None;
        Some(Arc::new(detached))
    }
}
