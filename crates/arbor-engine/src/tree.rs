#![forbid(unsafe_code)]

//! The mutation facade.
//!
//! [`Tree`] is one tree session: the node store, the three auxiliary
//! index sets (selected/checked/indeterminate), the event queue the
//! collaborator drains, and the optional batch loader. Every semantic
//! command the view layer can issue (select, check, expand, query,
//! insert, remove, load) enters here and is routed through the store and
//! the cascade engine.
//!
//! # Failure discipline
//!
//! Commands against unknown ids are uniform silent no-ops (`false`,
//! `None`, or an empty vec). The lazy-loading surface is the only place
//! that returns errors; see [`LoadError`].
//!
//! # Example
//!
//! ```
//! use arbor_engine::tree::Tree;
//! use serde_json::json;
//!
//! let mut tree = Tree::from_value(&json!([
//!     { "text": "Classes", "id": "classes", "child": [
//!         "Class basic syntax",
//!         "Class inheritance"
//!     ]}
//! ]));
//! assert!(tree.check("classes"));
//! let leaf = tree.find("Class inheritance").unwrap();
//! assert!(leaf.is_checked());
//! ```

use crate::cascade::{self, add_unique, remove_id};
use crate::event::TreeEvent;
use crate::load::{LoadError, LoadResult, LoadTask, Loader, NodeSource};
use crate::nav::{self, Linked};
use crate::query::{self, Criteria};
use crate::store::NodeStore;
use crate::walk::{self, Flattened};
use arbor_core::{Node, NodeFlags, NodeId, parse};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// Options for insert operations.
#[derive(Debug, Clone, Copy)]
pub struct InsertOptions {
    /// Expand the insertion parent once the nodes land.
    pub expand: bool,
    /// Flag the insertion parent as loading while an asynchronous source
    /// is pending.
    pub loading: bool,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            expand: false,
            loading: true,
        }
    }
}

/// Which checked nodes an accessor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckModel {
    /// Every checked node.
    All,
    /// Checked subtree tops: checked nodes whose parent is not checked.
    Branch,
    /// Checked nodes with no checked children.
    Leaf,
}

/// A persistable snapshot of interaction state.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeState {
    /// Selected node ids.
    pub selected: Vec<NodeId>,
    /// Checked node ids.
    pub checked: Vec<NodeId>,
    /// Expanded node ids.
    pub expanded: Vec<NodeId>,
}

// Where an insert lands, resolved against live state at apply time so
// asynchronous sources stay correct under interleaved mutations.
#[derive(Debug, Clone)]
enum Anchor {
    FirstChild(Option<NodeId>),
    LastChild(Option<NodeId>),
    Before(NodeId),
    After(NodeId),
}

impl Anchor {
    // (parent, index), or None when the anchor no longer resolves.
    fn resolve(&self, store: &NodeStore) -> Option<(Option<NodeId>, usize)> {
        match self {
            Anchor::FirstChild(None) => Some((None, 0)),
            Anchor::LastChild(None) => Some((None, store.roots().len())),
            Anchor::FirstChild(Some(pid)) => {
                store.get(pid.as_str())?;
                Some((Some(pid.clone()), 0))
            }
            Anchor::LastChild(Some(pid)) => {
                let parent = store.get(pid.as_str())?;
                Some((Some(pid.clone()), parent.children.len()))
            }
            Anchor::Before(target) => {
                let index = store.index_of(target.as_str())?;
                let parent = store.get(target.as_str())?.parent.clone();
                Some((parent, index))
            }
            Anchor::After(target) => {
                let index = store.index_of(target.as_str())?;
                let parent = store.get(target.as_str())?.parent.clone();
                Some((parent, index + 1))
            }
        }
    }

    // The node an async fetch function receives and the loading flag
    // lands on: the parent for child inserts, the target's parent for
    // sibling inserts.
    fn context_id(&self, store: &NodeStore) -> Option<NodeId> {
        match self {
            Anchor::FirstChild(p) | Anchor::LastChild(p) => p.clone(),
            Anchor::Before(target) | Anchor::After(target) => {
                store.get(target.as_str())?.parent.clone()
            }
        }
    }
}

/// One tree session.
#[derive(Default)]
pub struct Tree {
    store: NodeStore,
    selected_ids: Vec<NodeId>,
    checked_ids: Vec<NodeId>,
    indeterminate_ids: Vec<NodeId>,
    events: VecDeque<TreeEvent>,
    loader: Option<Loader>,
    expand_depth: Option<usize>,
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.store.node_count())
            .field("selected", &self.selected_ids)
            .field("checked", &self.checked_ids)
            .field("indeterminate", &self.indeterminate_ids)
            .field("loader", &self.loader.is_some())
            .finish()
    }
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a forest literal.
    pub fn from_value(value: &Value) -> Self {
        Self::new().load_root_value(value)
    }

    /// Builder form of [`Tree::from_value`], so configuration applies to
    /// the initial parse.
    #[must_use]
    pub fn load_root_value(mut self, value: &Value) -> Self {
        self.apply_insert(&Anchor::LastChild(None), value, InsertOptions::default(), false);
        self
    }

    /// Configure the batch loader.
    #[must_use]
    pub fn with_loader(
        mut self,
        loader: impl Fn(&Node) -> crate::load::LoaderFuture + 'static,
    ) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Auto-expand parsed nodes shallower than `depth` as they land
    /// (depth 0 are the roots). Applies to construction and every later
    /// insert; explicit `expanded` literals below the cutoff still win.
    #[must_use]
    pub fn with_expand_depth(mut self, depth: usize) -> Self {
        self.expand_depth = Some(depth);
        self
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    /// Fetch a node record by id. The record is frozen: it will not
    /// change under later mutations; re-fetch instead of holding on.
    pub fn get(&self, id: impl AsRef<str>) -> Option<Arc<Node>> {
        self.store.get(id.as_ref()).cloned()
    }

    /// Ordered top-level node ids.
    pub fn roots(&self) -> &[NodeId] {
        self.store.roots()
    }

    /// Position of a node among its siblings.
    pub fn index_of(&self, id: impl AsRef<str>) -> Option<usize> {
        self.store.index_of(id.as_ref())
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    /// Whether the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The visible sequence for rendering. See [`walk::flatten`].
    pub fn flatten(&self, ignore_collapsed: bool) -> Flattened {
        walk::flatten(&self.store, ignore_collapsed)
    }

    /// Keyboard-traversal neighbors of a node. See [`nav::linked`].
    pub fn linked(&self, id: impl AsRef<str>) -> Linked {
        nav::linked(&self.store, id.as_ref())
    }

    /// Direct access to the store for read-only walks.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    // ── Query ───────────────────────────────────────────────────────────

    /// First node matching the criteria, breadth-first by depth.
    pub fn find(&self, criteria: impl Into<Criteria>) -> Option<Arc<Node>> {
        query::find_nodes(&self.store, &criteria.into(), false)
            .into_iter()
            .next()
    }

    /// Every node matching the criteria, breadth-first by depth.
    pub fn find_all(&self, criteria: impl Into<Criteria>) -> Vec<Arc<Node>> {
        query::find_nodes(&self.store, &criteria.into(), true)
    }

    // ── Selection ───────────────────────────────────────────────────────

    /// Add a node to the selection. Disabled and unknown nodes are a
    /// silent no-op, as is re-selecting.
    pub fn select(&mut self, id: impl AsRef<str>) -> bool {
        let Some(node) = self.store.get(id.as_ref()) else {
            return false;
        };
        if node.is_disabled() || node.is_selected() {
            return false;
        }
        let nid = node.id.clone();
        add_unique(&mut self.selected_ids, &nid);
        self.store
            .update(id.as_ref(), |n| n.set_flag(NodeFlags::SELECTED, true));
        self.events.push_back(TreeEvent::Selected(nid));
        self.events.push_back(TreeEvent::Updated);
        true
    }

    /// Remove a node from the selection.
    pub fn unselect(&mut self, id: impl AsRef<str>) -> bool {
        let Some(node) = self.store.get(id.as_ref()) else {
            return false;
        };
        if !node.is_selected() {
            return false;
        }
        let nid = node.id.clone();
        remove_id(&mut self.selected_ids, &nid);
        self.store
            .update(id.as_ref(), |n| n.set_flag(NodeFlags::SELECTED, false));
        self.events.push_back(TreeEvent::Unselected(nid));
        self.events.push_back(TreeEvent::Updated);
        true
    }

    /// Select if unselected, unselect if selected.
    pub fn toggle_select(&mut self, id: impl AsRef<str>) -> bool {
        let Some(selected) = self.store.get(id.as_ref()).map(|n| n.is_selected()) else {
            return false;
        };
        if selected { self.unselect(id) } else { self.select(id) }
    }

    /// Clear the whole selection. One `Updated` notification, no
    /// per-node events.
    pub fn unselect_all(&mut self) {
        if self.selected_ids.is_empty() {
            return;
        }
        for id in std::mem::take(&mut self.selected_ids) {
            self.store
                .update(id.as_str(), |n| n.set_flag(NodeFlags::SELECTED, false));
        }
        self.events.push_back(TreeEvent::Updated);
    }

    /// Ids currently selected, in selection order.
    pub fn selected_ids(&self) -> &[NodeId] {
        &self.selected_ids
    }

    // ── Checkbox ────────────────────────────────────────────────────────

    /// Check a node, cascading to checkable descendants and recomputing
    /// the ancestor chain. No-op on unknown, non-checkable, or
    /// already-checked nodes.
    pub fn check(&mut self, id: impl AsRef<str>) -> bool {
        self.set_checked(id.as_ref(), true, true)
    }

    /// Uncheck a node; the cascade mirror of [`Tree::check`].
    pub fn uncheck(&mut self, id: impl AsRef<str>) -> bool {
        self.set_checked(id.as_ref(), false, true)
    }

    /// Check if unchecked (or indeterminate), uncheck if checked.
    pub fn toggle_check(&mut self, id: impl AsRef<str>) -> bool {
        let Some(checked) = self.store.get(id.as_ref()).map(|n| n.is_checked()) else {
            return false;
        };
        if checked { self.uncheck(id) } else { self.check(id) }
    }

    fn set_checked(&mut self, id: &str, on: bool, notify: bool) -> bool {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("tree_op", op = "set_checked", id, on).entered();

        let Some(node) = self.store.get(id) else {
            return false;
        };
        if !node.is_checkable() {
            return false;
        }
        if on && node.is_checked() {
            return false;
        }
        if !on && !node.is_checked() && !node.is_indeterminate() {
            return false;
        }
        let nid = node.id.clone();
        if on {
            add_unique(&mut self.checked_ids, &nid);
        } else {
            remove_id(&mut self.checked_ids, &nid);
        }
        let outcome = cascade::refresh_indeterminate(
            &mut self.store,
            &mut self.checked_ids,
            &mut self.indeterminate_ids,
            id,
            on,
        );
        if notify {
            self.events.push_back(TreeEvent::Checked {
                id: nid,
                checked: on,
            });
            for (cid, state) in outcome.changed {
                self.events.push_back(TreeEvent::Checked {
                    id: cid,
                    checked: state,
                });
            }
            self.events.push_back(TreeEvent::Updated);
        }
        true
    }

    /// Clear every checked and indeterminate node. One `Updated`
    /// notification, no per-node events.
    pub fn uncheck_all(&mut self) {
        if self.checked_ids.is_empty() && self.indeterminate_ids.is_empty() {
            return;
        }
        let checked = std::mem::take(&mut self.checked_ids);
        let indeterminate = std::mem::take(&mut self.indeterminate_ids);
        for id in checked.iter().chain(indeterminate.iter()) {
            self.store.update(id.as_str(), |n| {
                n.set_flag(NodeFlags::CHECKED, false);
                n.set_flag(NodeFlags::INDETERMINATE, false);
            });
        }
        self.events.push_back(TreeEvent::Updated);
    }

    /// Checked node ids, filtered by model.
    pub fn checked(&self, model: CheckModel) -> Vec<NodeId> {
        match model {
            CheckModel::All => self.checked_ids.clone(),
            CheckModel::Branch => self
                .checked_ids
                .iter()
                .filter(|id| {
                    let Some(node) = self.store.get(id.as_str()) else {
                        return false;
                    };
                    match &node.parent {
                        None => true,
                        Some(p) => !self
                            .store
                            .get(p.as_str())
                            .is_some_and(|parent| parent.is_checked()),
                    }
                })
                .cloned()
                .collect(),
            CheckModel::Leaf => self
                .checked_ids
                .iter()
                .filter(|id| {
                    let Some(node) = self.store.get(id.as_str()) else {
                        return false;
                    };
                    !node
                        .children
                        .iter()
                        .any(|c| self.store.get(c.as_str()).is_some_and(|n| n.is_checked()))
                })
                .cloned()
                .collect(),
        }
    }

    /// Ids currently in the mixed tri-state.
    pub fn indeterminate_ids(&self) -> &[NodeId] {
        &self.indeterminate_ids
    }

    // ── Expansion ───────────────────────────────────────────────────────

    /// Expand a node. No-op unless the node is expandable and collapsed.
    pub fn expand(&mut self, id: impl AsRef<str>) -> bool {
        self.set_expanded(id.as_ref(), true)
    }

    /// Collapse a node. No-op unless the node is expanded.
    pub fn collapse(&mut self, id: impl AsRef<str>) -> bool {
        self.set_expanded(id.as_ref(), false)
    }

    /// Expand if collapsed, collapse if expanded.
    pub fn toggle_expand(&mut self, id: impl AsRef<str>) -> bool {
        let Some(expanded) = self.store.get(id.as_ref()).map(|n| n.is_expanded()) else {
            return false;
        };
        if expanded { self.collapse(id) } else { self.expand(id) }
    }

    fn set_expanded(&mut self, id: &str, on: bool) -> bool {
        let Some(node) = self.store.get(id) else {
            return false;
        };
        if on && (!node.is_expandable() || node.is_expanded()) {
            return false;
        }
        if !on && !node.is_expanded() {
            return false;
        }
        let nid = node.id.clone();
        self.store
            .update(id, |n| n.set_flag(NodeFlags::EXPANDED, on));
        self.events.push_back(TreeEvent::Expanded {
            id: nid,
            expanded: on,
        });
        self.events.push_back(TreeEvent::Updated);
        true
    }

    /// Expand every expandable node. One `Updated` notification.
    pub fn expand_all(&mut self) {
        let stale: Vec<NodeId> = self
            .store
            .iter()
            .filter(|n| n.is_expandable() && !n.is_expanded())
            .map(|n| n.id.clone())
            .collect();
        if stale.is_empty() {
            return;
        }
        for id in stale {
            self.store
                .update(id.as_str(), |n| n.set_flag(NodeFlags::EXPANDED, true));
        }
        self.events.push_back(TreeEvent::Updated);
    }

    /// Collapse every expanded node. One `Updated` notification.
    pub fn collapse_all(&mut self) {
        let stale: Vec<NodeId> = self
            .store
            .iter()
            .filter(|n| n.is_expanded())
            .map(|n| n.id.clone())
            .collect();
        if stale.is_empty() {
            return;
        }
        for id in stale {
            self.store
                .update(id.as_str(), |n| n.set_flag(NodeFlags::EXPANDED, false));
        }
        self.events.push_back(TreeEvent::Updated);
    }

    /// Ids of currently expanded nodes, in document order.
    pub fn expanded_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let roots = self.store.roots().to_vec();
        walk::recurse_forest(&self.store, &roots, &mut |n| {
            if n.is_expanded() {
                out.push(n.id.clone());
            }
            walk::Flow::Continue
        });
        out
    }

    // ── Structure ───────────────────────────────────────────────────────

    /// Append nodes as the last children of `parent` (or as the last
    /// roots). The source may be literals, a future, or a fetch function.
    pub async fn append(
        &mut self,
        parent: Option<&str>,
        source: impl Into<NodeSource>,
        options: InsertOptions,
    ) -> LoadResult<Vec<NodeId>> {
        let anchor = Anchor::LastChild(parent.map(NodeId::new));
        self.insert(anchor, source.into(), options).await
    }

    /// Prepend nodes as the first children of `parent` (or as the first
    /// roots).
    pub async fn prepend(
        &mut self,
        parent: Option<&str>,
        source: impl Into<NodeSource>,
        options: InsertOptions,
    ) -> LoadResult<Vec<NodeId>> {
        let anchor = Anchor::FirstChild(parent.map(NodeId::new));
        self.insert(anchor, source.into(), options).await
    }

    /// Insert nodes immediately before `target` among its siblings.
    pub async fn insert_before(
        &mut self,
        target: impl AsRef<str>,
        source: impl Into<NodeSource>,
        options: InsertOptions,
    ) -> LoadResult<Vec<NodeId>> {
        let anchor = Anchor::Before(NodeId::new(target.as_ref()));
        self.insert(anchor, source.into(), options).await
    }

    /// Insert nodes immediately after `target` among its siblings.
    pub async fn insert_after(
        &mut self,
        target: impl AsRef<str>,
        source: impl Into<NodeSource>,
        options: InsertOptions,
    ) -> LoadResult<Vec<NodeId>> {
        let anchor = Anchor::After(NodeId::new(target.as_ref()));
        self.insert(anchor, source.into(), options).await
    }

    async fn insert(
        &mut self,
        anchor: Anchor,
        source: NodeSource,
        options: InsertOptions,
    ) -> LoadResult<Vec<NodeId>> {
        let value = match source {
            NodeSource::Value(value) => value,
            NodeSource::Future(future) => {
                self.await_source(&anchor, options, future).await?
            }
            NodeSource::Fetch(fetch) => {
                let context = anchor
                    .context_id(&self.store)
                    .and_then(|id| self.store.get(id.as_str()).cloned());
                let future = fetch(context.as_deref());
                self.await_source(&anchor, options, future).await?
            }
        };
        Ok(self.apply_insert(&anchor, &value, options, true))
    }

    // Drive an asynchronous source, keeping the loading flag on the
    // insertion context while it is pending.
    async fn await_source(
        &mut self,
        anchor: &Anchor,
        options: InsertOptions,
        future: crate::load::LoaderFuture,
    ) -> LoadResult<Value> {
        let context = if options.loading {
            anchor.context_id(&self.store)
        } else {
            None
        };
        if let Some(cid) = &context {
            self.store
                .update(cid.as_str(), |n| n.set_flag(NodeFlags::LOADING, true));
        }
        let result = future.await;
        if let Some(cid) = &context {
            // The context may have been removed while the load was
            // pending; clearing is then a silent no-op.
            self.store
                .update(cid.as_str(), |n| n.set_flag(NodeFlags::LOADING, false));
        }
        result
    }

    // The synchronous tail of every insert: parse, adopt, attach,
    // reconcile interaction state, notify.
    fn apply_insert(
        &mut self,
        anchor: &Anchor,
        value: &Value,
        options: InsertOptions,
        notify: bool,
    ) -> Vec<NodeId> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("tree_op", op = "insert").entered();

        let Some((parent, index)) = anchor.resolve(&self.store) else {
            return Vec::new();
        };
        let parsed = match &parent {
            Some(pid) => {
                let depth = self.store.get(pid.as_str()).map(|n| n.depth).unwrap_or(0);
                parse(value, Some((pid, depth)))
            }
            None => parse(value, None),
        };
        if parsed.is_empty() {
            return Vec::new();
        }

        let top = self.store.adopt(parsed);
        self.store
            .attach_at(parent.as_ref().map(|p| p.as_str()), &top, index);

        self.reconcile_inserted(&top);

        if let Some(cutoff) = self.expand_depth {
            let mut shallow = Vec::new();
            walk::recurse_forest(&self.store, &top, &mut |n| {
                if n.depth < cutoff && n.is_expandable() && !n.is_expanded() {
                    shallow.push(n.id.clone());
                }
                walk::Flow::Continue
            });
            for id in shallow {
                self.store
                    .update(id.as_str(), |n| n.set_flag(NodeFlags::EXPANDED, true));
            }
        }

        if options.expand {
            if let Some(pid) = &parent {
                self.store
                    .update(pid.as_str(), |n| n.set_flag(NodeFlags::EXPANDED, true));
            }
        }

        if notify {
            self.events.push_back(TreeEvent::Added {
                parent: parent.clone(),
                ids: top.clone(),
            });
            self.events.push_back(TreeEvent::Updated);
        }
        top
    }

    // Fold the flags parsed from input literals into the index sets and
    // re-establish checkbox consistency around the insertion point.
    fn reconcile_inserted(&mut self, top: &[NodeId]) {
        let mut selected = Vec::new();
        let mut checked = Vec::new();
        walk::recurse_forest(&self.store, top, &mut |n| {
            if n.is_selected() && !n.is_disabled() {
                selected.push(n.id.clone());
            }
            if n.is_checked() {
                checked.push(n.id.clone());
            }
            walk::Flow::Continue
        });
        for id in &selected {
            add_unique(&mut self.selected_ids, id);
        }
        for id in &checked {
            add_unique(&mut self.checked_ids, id);
        }
        // Checked literals cascade to their descendants; everything else
        // only needs its ancestor chain recomputed.
        for id in &checked {
            cascade::refresh_indeterminate(
                &mut self.store,
                &mut self.checked_ids,
                &mut self.indeterminate_ids,
                id.as_str(),
                true,
            );
        }
        for id in top {
            let is_checked = self
                .store
                .get(id.as_str())
                .is_some_and(|n| n.is_checked());
            if !is_checked {
                cascade::refresh_ancestors(
                    &mut self.store,
                    &mut self.checked_ids,
                    &mut self.indeterminate_ids,
                    id.as_str(),
                    false,
                );
            }
        }
    }

    /// Remove a node and its subtree. Every descendant id is evicted from
    /// the selected/checked/indeterminate sets. Returns the detached
    /// record.
    pub fn remove(&mut self, id: impl AsRef<str>) -> Option<Arc<Node>> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("tree_op", op = "remove", id = id.as_ref()).entered();

        let subtree = self.store.subtree_ids(id.as_ref());
        let former_parent = self.store.get(id.as_ref()).and_then(|n| n.parent.clone());
        let removed = self.store.remove(id.as_ref())?;
        self.evict_from_sets(&subtree);
        // The former parent's tri-state may no longer hold now that a
        // child is gone.
        if let Some(pid) = former_parent {
            cascade::recompute_membership(
                &mut self.store,
                &mut self.checked_ids,
                &mut self.indeterminate_ids,
                pid.as_str(),
            );
        }
        self.events.push_back(TreeEvent::Removed(removed.clone()));
        self.events.push_back(TreeEvent::Updated);
        Some(removed)
    }

    /// Remove all children of a node, keeping the node itself. Returns
    /// whether the node exists.
    pub fn empty(&mut self, id: impl AsRef<str>) -> bool {
        let Some(node) = self.store.get(id.as_ref()) else {
            return false;
        };
        let children = node.children.clone();
        for child in children {
            let subtree = self.store.subtree_ids(child.as_str());
            if self.store.remove(child.as_str()).is_some() {
                self.evict_from_sets(&subtree);
            }
        }
        // An emptied node is a leaf now; it cannot stay indeterminate.
        cascade::recompute_membership(
            &mut self.store,
            &mut self.checked_ids,
            &mut self.indeterminate_ids,
            id.as_ref(),
        );
        self.events.push_back(TreeEvent::Updated);
        true
    }

    fn evict_from_sets(&mut self, ids: &[NodeId]) {
        self.selected_ids.retain(|s| !ids.contains(s));
        self.checked_ids.retain(|c| !ids.contains(c));
        self.indeterminate_ids.retain(|i| !ids.contains(i));
    }

    // ── Classes and data ────────────────────────────────────────────────

    /// Add a class label to a node.
    pub fn add_class(&mut self, id: impl AsRef<str>, name: &str) -> bool {
        let mut added = false;
        let found = self.store.update(id.as_ref(), |n| {
            added = n.class_list.add(name);
        });
        if found && added {
            self.events.push_back(TreeEvent::Updated);
        }
        found && added
    }

    /// Remove a class label from a node.
    pub fn remove_class(&mut self, id: impl AsRef<str>, name: &str) -> bool {
        let mut removed = false;
        let found = self.store.update(id.as_ref(), |n| {
            removed = n.class_list.remove(name);
        });
        if found && removed {
            self.events.push_back(TreeEvent::Updated);
        }
        found && removed
    }

    /// Whether a node carries a class label.
    pub fn has_class(&self, id: impl AsRef<str>, name: &str) -> bool {
        self.store
            .get(id.as_ref())
            .is_some_and(|n| n.class_list.contains(name))
    }

    /// Read an attribute from a node's data bag.
    pub fn data(&self, id: impl AsRef<str>, key: &str) -> Option<Value> {
        self.store.get(id.as_ref())?.data.get(key).cloned()
    }

    /// Write an attribute into a node's data bag.
    pub fn set_data(&mut self, id: impl AsRef<str>, key: &str, value: Value) -> bool {
        let found = self.store.update(id.as_ref(), |n| {
            n.data.insert(key.to_owned(), value);
        });
        if found {
            self.events.push_back(TreeEvent::Updated);
        }
        found
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Route a double-click semantic command to a node.
    pub fn double_click(&mut self, id: impl AsRef<str>) -> bool {
        let Some(node) = self.store.get(id.as_ref()) else {
            return false;
        };
        if node.is_disabled() {
            return false;
        }
        let nid = node.id.clone();
        self.events.push_back(TreeEvent::DoubleClick(nid));
        true
    }

    /// Drain pending notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<TreeEvent> {
        self.events.drain(..).collect()
    }

    // ── Lazy loading ────────────────────────────────────────────────────

    /// Start loading a batch node's children. Flags the node as loading
    /// and returns the task owning the loader future; the tree is free
    /// for other mutations while the task runs. A second load on the same
    /// still-loading node is rejected.
    pub fn begin_load(&mut self, id: impl AsRef<str>) -> LoadResult<LoadTask> {
        let Some(loader) = &self.loader else {
            return Err(LoadError::NoLoader);
        };
        let Some(node) = self.store.get(id.as_ref()) else {
            return Err(LoadError::NotFound(NodeId::new(id.as_ref())));
        };
        if !node.is_batch() {
            return Err(LoadError::NotBatch(node.id.clone()));
        }
        if node.is_loading() {
            return Err(LoadError::AlreadyLoading(node.id.clone()));
        }
        let future = loader(node);
        let nid = node.id.clone();
        self.store
            .update(id.as_ref(), |n| n.set_flag(NodeFlags::LOADING, true));
        Ok(LoadTask::new(nid, future))
    }

    /// Apply a resolved load. If the batch node was removed while the
    /// load was in flight this is a safe no-op returning an empty vec.
    /// On success the node stops being a batch node and the loaded
    /// literals land as its children.
    pub fn finish_load(
        &mut self,
        id: impl AsRef<str>,
        result: LoadResult<Value>,
    ) -> LoadResult<Vec<NodeId>> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("tree_op", op = "finish_load", id = id.as_ref()).entered();

        let Some(node) = self.store.get(id.as_ref()) else {
            return Ok(Vec::new());
        };
        // Captured before the insert: reconciling the fresh children can
        // flip the batch node to indeterminate on its way through.
        let was_checked = node.is_checked();
        let nid = node.id.clone();
        self.store
            .update(id.as_ref(), |n| n.set_flag(NodeFlags::LOADING, false));
        let value = result?;

        let anchor = Anchor::LastChild(Some(nid.clone()));
        self.store
            .update(id.as_ref(), |n| n.set_flag(NodeFlags::BATCH, false));
        let ids = self.apply_insert(&anchor, &value, InsertOptions::default(), true);

        // A checked batch node extends its checked state over the fresh
        // children.
        if was_checked {
            add_unique(&mut self.checked_ids, &nid);
            cascade::refresh_indeterminate(
                &mut self.store,
                &mut self.checked_ids,
                &mut self.indeterminate_ids,
                id.as_ref(),
                true,
            );
        }
        Ok(ids)
    }

    /// Convenience wrapper: begin, await, and apply one batch load.
    pub async fn load_children(&mut self, id: impl AsRef<str>) -> LoadResult<Vec<NodeId>> {
        let task = self.begin_load(id.as_ref())?;
        let (nid, result) = task.resolve().await;
        self.finish_load(nid.as_str(), result)
    }

    // ── State snapshots ─────────────────────────────────────────────────

    /// Snapshot the interaction state (selection, checks, expansion).
    pub fn state(&self) -> TreeState {
        TreeState {
            selected: self.selected_ids.clone(),
            checked: self.checked_ids.clone(),
            expanded: self.expanded_ids(),
        }
    }

    /// Replace the interaction state with a snapshot. Ids that no longer
    /// resolve are skipped. One `Updated` notification.
    pub fn restore_state(&mut self, state: &TreeState) {
        let all: Vec<NodeId> = self.store.iter().map(|n| n.id.clone()).collect();
        for id in &all {
            self.store.update(id.as_str(), |n| {
                n.flags.remove(
                    NodeFlags::SELECTED
                        | NodeFlags::CHECKED
                        | NodeFlags::INDETERMINATE
                        | NodeFlags::EXPANDED,
                );
            });
        }
        self.selected_ids.clear();
        self.checked_ids.clear();
        self.indeterminate_ids.clear();

        for id in &state.expanded {
            self.store.update(id.as_str(), |n| {
                if n.is_expandable() {
                    n.set_flag(NodeFlags::EXPANDED, true);
                }
            });
        }
        for id in &state.selected {
            let selectable = self
                .store
                .get(id.as_str())
                .is_some_and(|n| !n.is_disabled());
            if selectable {
                add_unique(&mut self.selected_ids, id);
                self.store
                    .update(id.as_str(), |n| n.set_flag(NodeFlags::SELECTED, true));
            }
        }
        for id in &state.checked {
            let checkable = self
                .store
                .get(id.as_str())
                .is_some_and(|n| n.is_checkable());
            if checkable {
                add_unique(&mut self.checked_ids, id);
                cascade::refresh_indeterminate(
                    &mut self.store,
                    &mut self.checked_ids,
                    &mut self.indeterminate_ids,
                    id.as_str(),
                    true,
                );
            }
        }
        self.events.push_back(TreeEvent::Updated);
    }
}
