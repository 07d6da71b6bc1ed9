//! Property-based invariant tests for the tree session.
//!
//! Arbitrary command sequences must leave the session in a state where:
//!
//! 1. Every non-root node appears in its parent's children exactly once,
//!    at the position `index_of` reports.
//! 2. Every node's depth equals its ancestor count.
//! 3. Roots have no parent and depth 0.
//! 4. Boolean flags and index-set membership never disagree.
//! 5. The checked and indeterminate sets are disjoint and free of
//!    duplicates and dangling ids.
//! 6. Indeterminate nodes are always expandable.
//! 7. Disabled-checkbox nodes never gain a checked flag from a cascade.

use arbor_engine::prelude::*;
use futures::executor::block_on;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use serde_json::json;

#[derive(Debug, Clone)]
enum Op {
    Append { parent: u8, label: u8 },
    Remove(u8),
    Check(u8),
    Uncheck(u8),
    Select(u8),
    ToggleExpand(u8),
    Empty(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<u8>()).prop_map(|(parent, label)| Op::Append { parent, label }),
        any::<u8>().prop_map(Op::Remove),
        any::<u8>().prop_map(Op::Check),
        any::<u8>().prop_map(Op::Uncheck),
        any::<u8>().prop_map(Op::Select),
        any::<u8>().prop_map(Op::ToggleExpand),
        any::<u8>().prop_map(Op::Empty),
    ]
}

// Ids in stable document order, so op indices shrink deterministically.
fn document_order(tree: &Tree) -> Vec<NodeId> {
    let mut out = Vec::new();
    let roots = tree.roots().to_vec();
    arbor_engine::walk::recurse_forest(tree.store(), &roots, &mut |n| {
        out.push(n.id.clone());
        Flow::Continue
    });
    out
}

fn pick(tree: &Tree, raw: u8) -> Option<NodeId> {
    let ids = document_order(tree);
    if ids.is_empty() {
        return None;
    }
    Some(ids[raw as usize % ids.len()].clone())
}

fn apply(tree: &mut Tree, op: &Op) {
    match op {
        Op::Append { parent, label } => {
            // Every third pick lands at the root level.
            let target = if *parent % 3 == 0 { None } else { pick(tree, *parent) };
            let literal = json!(format!("node {label}"));
            let _ = block_on(tree.append(
                target.as_ref().map(|id| id.as_str()),
                literal,
                InsertOptions::default(),
            ));
        }
        Op::Remove(raw) => {
            if let Some(id) = pick(tree, *raw) {
                tree.remove(id.as_str());
            }
        }
        Op::Check(raw) => {
            if let Some(id) = pick(tree, *raw) {
                tree.check(id.as_str());
            }
        }
        Op::Uncheck(raw) => {
            if let Some(id) = pick(tree, *raw) {
                tree.uncheck(id.as_str());
            }
        }
        Op::Select(raw) => {
            if let Some(id) = pick(tree, *raw) {
                tree.select(id.as_str());
            }
        }
        Op::ToggleExpand(raw) => {
            if let Some(id) = pick(tree, *raw) {
                tree.toggle_expand(id.as_str());
            }
        }
        Op::Empty(raw) => {
            if let Some(id) = pick(tree, *raw) {
                tree.empty(id.as_str());
            }
        }
    }
}

fn seed_tree() -> Tree {
    Tree::from_value(&json!([
        { "text": "alpha", "child": ["a1", "a2"] },
        { "text": "beta", "child": [{ "text": "b1", "child": ["b1x"] }] },
        { "text": "gamma", "disabledCheckbox": true },
        "delta"
    ]))
}

fn assert_invariants(tree: &Tree) -> Result<(), TestCaseError> {
    let ids = document_order(tree);
    prop_assert_eq!(ids.len(), tree.node_count(), "document order misses nodes");

    let checked = tree.checked(CheckModel::All);
    let selected: Vec<NodeId> = tree.selected_ids().to_vec();
    let indeterminate: Vec<NodeId> = tree.indeterminate_ids().to_vec();

    for id in &ids {
        let node = tree.get(id.as_str()).expect("document-order id resolves");

        // 1 + 2 + 3: structural consistency.
        match &node.parent {
            Some(pid) => {
                let parent = tree.get(pid.as_str()).expect("parent resolves");
                let occurrences = parent.children.iter().filter(|c| *c == id).count();
                prop_assert_eq!(occurrences, 1, "child listed {} times", occurrences);
                let index = tree.index_of(id.as_str()).expect("sibling index");
                prop_assert_eq!(&parent.children[index], id);
                prop_assert_eq!(node.depth, parent.depth + 1);
            }
            None => {
                prop_assert!(tree.roots().contains(id));
                prop_assert_eq!(node.depth, 0);
            }
        }

        // 4: flags agree with set membership.
        prop_assert_eq!(node.is_checked(), checked.contains(id));
        prop_assert_eq!(node.is_selected(), selected.contains(id));
        prop_assert_eq!(node.is_indeterminate(), indeterminate.contains(id));

        // 6: only expandable nodes carry the tri-state.
        if node.is_indeterminate() {
            prop_assert!(node.is_expandable(), "leaf in tri-state");
        }
    }

    // 5: sets are disjoint, duplicate-free, and dangle-free.
    for id in &checked {
        prop_assert!(!indeterminate.contains(id), "{} in both sets", id);
        prop_assert!(tree.get(id.as_str()).is_some(), "dangling checked id");
    }
    for id in &indeterminate {
        prop_assert!(tree.get(id.as_str()).is_some(), "dangling indeterminate id");
    }
    for id in &selected {
        prop_assert!(tree.get(id.as_str()).is_some(), "dangling selected id");
    }
    let mut unique = checked.clone();
    unique.sort();
    unique.dedup();
    prop_assert_eq!(unique.len(), checked.len(), "duplicate checked ids");

    Ok(())
}

proptest! {
    #[test]
    fn invariants_hold_under_arbitrary_commands(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut tree = seed_tree();
        for op in &ops {
            apply(&mut tree, op);
        }
        assert_invariants(&tree)?;
    }

    // 7: a cascade never writes through a frozen checkbox. Commands only
    // target checkable nodes; the frozen ones must never pick up state
    // from the propagation.
    #[test]
    fn frozen_checkboxes_survive_cascades(ops in prop::collection::vec(any::<u8>(), 1..30)) {
        let mut tree = Tree::from_value(&json!([
            { "text": "top", "id": "top", "child": [
                { "text": "free", "id": "free" },
                { "text": "other", "id": "other" },
                { "text": "frozen", "disabledCheckbox": true },
                { "text": "dead", "disabled": true, "child": ["buried"] }
            ]}
        ]));
        let targets = ["top", "free", "other"];
        for raw in &ops {
            let id = targets[*raw as usize % targets.len()];
            if raw % 2 == 0 {
                tree.check(id);
            } else {
                tree.uncheck(id);
            }
        }
        prop_assert!(!tree.find("frozen").unwrap().is_checked());
        prop_assert!(!tree.find("dead").unwrap().is_checked());
        prop_assert!(!tree.find("buried").unwrap().is_checked());
    }
}
