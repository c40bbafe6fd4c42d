//! Randomized interval properties: containment, sibling order, interval
//! descendant checks against parent walks, and mutation round-trips.

use proptest::prelude::*;

use ranktree::config::Settings;
use ranktree::domain::{NodeId, Taxon};
use ranktree::util::testing::flat_schema;
use ranktree::Tree;

const MAX_DEPTH: usize = 20;
const MAX_FANOUT: usize = 10;

struct Generated {
    tree: Tree<Taxon>,
    ids: Vec<NodeId>,
}

/// Grow a tree from random parent picks, respecting depth and fan-out bounds.
/// Each pick also chooses the sibling slot, so positioned inserts are covered.
fn grow(picks: &[(usize, usize)]) -> Generated {
    grow_with(picks, &Settings::default())
}

fn grow_with(picks: &[(usize, usize)], settings: &Settings) -> Generated {
    let mut tree = Tree::<Taxon>::with_settings(flat_schema(MAX_DEPTH as u32 + 1), settings);
    let root = tree.create_root(0, "n0").unwrap();
    let mut ids = vec![root];
    let mut depth = vec![0usize];

    for (i, &(pick, slot)) in picks.iter().enumerate() {
        let candidate = (0..ids.len())
            .map(|k| (pick + k) % ids.len())
            .find(|&j| {
                depth[j] < MAX_DEPTH && tree.get(ids[j]).unwrap().children.len() < MAX_FANOUT
            });
        let Some(j) = candidate else { continue };
        let parent = ids[j];
        let fanout = tree.get(parent).unwrap().children.len();
        let rank = (depth[j] as u32 + 1) * 10;
        let id = tree
            .create_child_at(parent, rank, &format!("n{}", i + 1), Some(slot % (fanout + 1)))
            .unwrap();
        ids.push(id);
        depth.push(depth[j] + 1);
    }
    Generated { tree, ids }
}

/// `false` checks only the intervals a mutation changes.
fn settings(full_check: bool) -> Settings {
    Settings {
        verify_after_mutation: full_check,
        ..Settings::default()
    }
}

fn picks() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((any::<usize>(), any::<usize>()), 1..60)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn interval_descendant_test_matches_parent_walk(picks in picks()) {
        let g = grow(&picks);
        for &a in &g.ids {
            let ancestors = g.tree.ancestors_of(a).unwrap();
            for &b in &g.ids {
                prop_assert_eq!(
                    g.tree.is_descendant_of(a, b).unwrap(),
                    ancestors.contains(&b),
                    "a={} b={}", a, b
                );
            }
        }
    }

    #[test]
    fn children_nest_in_parent_and_siblings_are_ordered(
        picks in picks(),
        full_check in any::<bool>(),
    ) {
        let g = grow_with(&picks, &settings(full_check));
        for &id in &g.ids {
            let node = g.tree.get(id).unwrap();
            prop_assert!(node.node_number() <= node.highest_child_node_number());

            let children = g.tree.children_of(id).unwrap();
            for child in &children {
                prop_assert!(node.interval.strictly_contains(&child.interval));
            }
            for pair in children.windows(2) {
                prop_assert!(
                    pair[0].highest_child_node_number() < pair[1].node_number(),
                    "{} overlaps {}", pair[0], pair[1]
                );
            }
        }
        g.tree.verify().unwrap();
    }

    #[test]
    fn descendant_scan_returns_subtree_in_preorder(picks in picks(), which in any::<usize>()) {
        let g = grow(&picks);
        let b = g.ids[which % g.ids.len()];

        let scanned: Vec<NodeId> = g.tree.descendants_of(b).unwrap().iter().map(|n| n.id).collect();
        let mut walked: Vec<NodeId> = g.ids
            .iter()
            .copied()
            .filter(|&a| g.tree.ancestors_of(a).unwrap().contains(&b))
            .collect();
        walked.sort_by_key(|&a| g.tree.get(a).unwrap().node_number());

        prop_assert_eq!(scanned, walked);
    }

    #[test]
    fn move_there_and_back_restores_all_intervals(
        picks in picks(),
        which in any::<usize>(),
        target in any::<usize>(),
        full_check in any::<bool>(),
    ) {
        let mut g = grow_with(&picks, &settings(full_check));
        prop_assume!(g.ids.len() > 2);
        let n = g.ids[1 + which % (g.ids.len() - 1)];
        let node = g.tree.get(n).unwrap();
        let rank = node.rank_id;
        let p0 = node.parent.unwrap();
        let index = g.tree.get(p0).unwrap().children.iter().position(|&c| c == n).unwrap();

        let targets: Vec<NodeId> = g.ids
            .iter()
            .copied()
            .filter(|&p| p != p0 && p != n)
            .filter(|&p| !g.tree.is_descendant_of(p, n).unwrap())
            .filter(|&p| g.tree.get(p).unwrap().rank_id < rank)
            .collect();
        prop_assume!(!targets.is_empty());
        let p1 = targets[target % targets.len()];

        let before = g.tree.records();
        g.tree.move_subtree(n, p1).unwrap();
        prop_assert!(g.tree.is_descendant_of(n, p1).unwrap());
        g.tree.move_subtree_at(n, p0, Some(index)).unwrap();

        prop_assert_eq!(g.tree.records(), before);
        g.tree.verify().unwrap();
    }

    #[test]
    fn insert_then_delete_leaves_intervals_unchanged(
        picks in picks(),
        which in any::<usize>(),
        slot in any::<usize>(),
        full_check in any::<bool>(),
    ) {
        let mut g = grow_with(&picks, &settings(full_check));
        let parent = g.ids[which % g.ids.len()];
        let p = g.tree.get(parent).unwrap();
        prop_assume!((p.rank_id as usize) < MAX_DEPTH * 10);
        let rank = p.rank_id + 10;
        let fanout = p.children.len();

        let before = g.tree.records();
        let tmp = g.tree.create_child_at(parent, rank, "tmp", Some(slot % (fanout + 1))).unwrap();
        g.tree.delete_leaf(tmp).unwrap();

        prop_assert_eq!(g.tree.records(), before);
        g.tree.verify().unwrap();
    }
}
