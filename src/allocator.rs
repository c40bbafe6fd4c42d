//! Interval allocator: keeps `[node_number, highest_child_node_number]`
//! consistent across insert, move and delete.
//!
//! Every operation runs in two phases. First a [`Renumbering`] plan is
//! computed from the store without touching it, then the plan is checked
//! against the containment and disjointness rules and only applied when
//! the check passes. A rejected plan leaves every interval untouched.

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::{Interval, NodeId, TreeError, TreeResult};
use crate::store::NodeStore;

/// Pending interval changes, keyed by node.
#[derive(Debug, Default)]
pub struct Renumbering {
    changes: HashMap<NodeId, Interval>,
    /// Node that is about to leave the store and must be ignored
    removed: Option<NodeId>,
}

impl Renumbering {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn set(&mut self, id: NodeId, interval: Interval) {
        self.changes.insert(id, interval);
    }

    fn interval(&self, store: &NodeStore, id: NodeId) -> TreeResult<Interval> {
        match self.changes.get(&id) {
            Some(interval) => Ok(*interval),
            None => Ok(store.get(id)?.interval),
        }
    }
}

/// How much checking a plan gets before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Every node in the family
    Full,
    /// Only nodes whose interval changes
    Touched,
}

#[derive(Debug, Clone)]
pub struct IntervalAllocator {
    first_number: u32,
    verification: Verification,
}

impl Default for IntervalAllocator {
    fn default() -> Self {
        Self::new(1, Verification::Full)
    }
}

impl IntervalAllocator {
    pub fn new(first_number: u32, verification: Verification) -> Self {
        Self {
            first_number,
            verification,
        }
    }

    pub fn first_number(&self) -> u32 {
        self.first_number
    }

    /// Give a freshly created root its interval.
    #[instrument(level = "debug", skip(self, store))]
    pub fn number_root(&self, store: &mut NodeStore, root: NodeId) -> TreeResult<()> {
        let mut plan = Renumbering::default();
        plan.set(root, Interval::new(self.first_number, self.first_number));
        self.commit(store, plan)
    }

    /// Number a leaf that has already been attached to its parent.
    ///
    /// The leaf takes the slot in front of its next sibling, or the slot
    /// after the parent's last descendant. Everything from that slot on
    /// shifts right by one and every ancestor grows by one.
    #[instrument(level = "debug", skip(self, store))]
    pub fn insert_leaf(&self, store: &mut NodeStore, id: NodeId) -> TreeResult<()> {
        let node = store.get(id)?;
        let parent_id = node
            .parent
            .ok_or_else(|| TreeError::corruption(id, "inserted leaf has no parent"))?;
        let parent = store.get(parent_id)?.interval;
        let point = self.slot_before_next_sibling(store, id, parent_id, |s| {
            Ok(store.get(s)?.interval)
        })?;

        let mut plan = Renumbering::default();
        for other in store.iter().filter(|n| n.id != id) {
            let iv = other.interval;
            if iv.node_number >= point {
                plan.set(
                    other.id,
                    Interval::new(iv.node_number + 1, iv.highest_child_node_number + 1),
                );
            } else if iv.covers(&parent) {
                plan.set(
                    other.id,
                    Interval::new(iv.node_number, iv.highest_child_node_number + 1),
                );
            }
        }
        plan.set(id, Interval::new(point, point));
        debug!("insert_leaf: {} at {}, {} intervals change", id, point, plan.len());
        self.commit(store, plan)
    }

    /// Renumber after `id` and its subtree were reparented.
    ///
    /// `old` is the subtree's interval before the structural move. The
    /// width `w` is closed at the old place, reopened in front of the new
    /// next sibling (or after the new parent's last descendant), and the
    /// subtree is translated by the net offset, all in one pass.
    #[instrument(level = "debug", skip(self, store))]
    pub fn relocate(&self, store: &mut NodeStore, id: NodeId, old: Interval) -> TreeResult<()> {
        let (a, b, w) = (old.node_number, old.highest_child_node_number, old.width());

        // close
        let mut closed: HashMap<NodeId, Interval> = HashMap::with_capacity(store.len());
        for other in store.iter() {
            let iv = other.interval;
            if old.contains_number(iv.node_number) {
                continue;
            }
            let nn = if iv.node_number > b { iv.node_number - w } else { iv.node_number };
            let hcn = if iv.highest_child_node_number >= b {
                iv.highest_child_node_number - w
            } else {
                iv.highest_child_node_number
            };
            closed.insert(other.id, Interval::new(nn, hcn));
        }

        let closed_of = |n: NodeId| {
            closed
                .get(&n)
                .copied()
                .ok_or_else(|| TreeError::corruption(n, "target lies inside the moved subtree"))
        };
        let new_parent_id = store
            .get(id)?
            .parent
            .ok_or_else(|| TreeError::corruption(id, "moved node has no parent"))?;
        let new_parent = closed_of(new_parent_id)?;
        let point = self.slot_before_next_sibling(store, id, new_parent_id, closed_of)?;

        // reopen
        let mut plan = Renumbering::default();
        for (&other, &iv) in &closed {
            let moved = if iv.node_number >= point {
                Interval::new(iv.node_number + w, iv.highest_child_node_number + w)
            } else if iv.covers(&new_parent) {
                Interval::new(iv.node_number, iv.highest_child_node_number + w)
            } else {
                iv
            };
            plan.set(other, moved);
        }

        // translate subtree
        for node in store.iter() {
            let iv = node.interval;
            if old.contains_number(iv.node_number) {
                plan.set(
                    node.id,
                    Interval::new(
                        iv.node_number - a + point,
                        iv.highest_child_node_number - a + point,
                    ),
                );
            }
        }

        let unchanged: Vec<NodeId> = plan
            .changes
            .iter()
            .filter(|(n, iv)| store.get(**n).map(|x| x.interval == **iv).unwrap_or(false))
            .map(|(n, _)| *n)
            .collect();
        for n in unchanged {
            plan.changes.remove(&n);
        }

        debug!(
            "relocate: {} from {} to slot {}, {} intervals change",
            id,
            old,
            point,
            plan.len()
        );
        self.commit(store, plan)
    }

    /// Renumber for the removal of leaf `id`, then drop it from the store.
    ///
    /// Refuses any node whose interval spans more than itself.
    #[instrument(level = "debug", skip(self, store))]
    pub fn remove_leaf(&self, store: &mut NodeStore, id: NodeId) -> TreeResult<()> {
        let iv = store.get(id)?.interval;
        if iv.width() > 1 || !store.get(id)?.children.is_empty() {
            return Err(TreeError::NodeHasChildren(id));
        }
        let point = iv.node_number;

        let mut plan = Renumbering {
            removed: Some(id),
            ..Default::default()
        };
        for other in store.iter().filter(|n| n.id != id) {
            let o = other.interval;
            if o.node_number > point {
                plan.set(
                    other.id,
                    Interval::new(o.node_number - 1, o.highest_child_node_number - 1),
                );
            } else if o.highest_child_node_number >= point {
                plan.set(
                    other.id,
                    Interval::new(o.node_number, o.highest_child_node_number - 1),
                );
            }
        }

        self.check(store, &plan)?;
        store.delete(id)?;
        debug!("remove_leaf: {} at {}, {} intervals change", id, point, plan.len());
        apply(store, plan)
    }

    /// Assign dense preorder numbers to the whole family from its
    /// parent/child structure.
    ///
    /// Used for bulk construction and repair: one pass regardless of
    /// family size, instead of one shift per inserted node.
    #[instrument(level = "debug", skip(self, store))]
    pub fn renumber_all(&self, store: &mut NodeStore) -> TreeResult<usize> {
        let Some(root) = store.root() else {
            return Ok(0);
        };

        let mut plan = Renumbering::default();
        let mut next = self.first_number;
        // (node, children visited)
        let mut stack = vec![(root, false)];
        let mut opened: HashMap<NodeId, u32> = HashMap::new();

        while let Some((current, visited)) = stack.pop() {
            if !visited {
                if opened.insert(current, next).is_some() {
                    return Err(TreeError::corruption(current, "node reached twice"));
                }
                next += 1;
                stack.push((current, true));
                for &child in store.get(current)?.children.iter().rev() {
                    stack.push((child, false));
                }
            } else {
                let start = opened[&current];
                plan.set(current, Interval::new(start, next - 1));
            }
        }

        if opened.len() != store.len() {
            return Err(TreeError::corruption(
                root,
                format!(
                    "{} of {} nodes are unreachable from the root",
                    store.len() - opened.len(),
                    store.len()
                ),
            ));
        }

        let count = plan.len();
        debug!("renumber_all: {} nodes", count);
        self.commit(store, plan)?;
        Ok(count)
    }

    /// Check every node of the family against its parent and next sibling.
    #[instrument(level = "debug", skip(self, store))]
    pub fn verify(&self, store: &NodeStore) -> TreeResult<()> {
        check_nodes(store, &Renumbering::default(), store.iter().map(|n| n.id))
    }

    fn commit(&self, store: &mut NodeStore, plan: Renumbering) -> TreeResult<()> {
        self.check(store, &plan)?;
        apply(store, plan)
    }

    fn check(&self, store: &NodeStore, plan: &Renumbering) -> TreeResult<()> {
        match self.verification {
            Verification::Full => check_nodes(store, plan, store.iter().map(|n| n.id)),
            Verification::Touched => check_nodes(store, plan, plan.changes.keys().copied()),
        }
    }

    /// Slot in front of `id`'s next sibling, or right after the parent's
    /// last descendant when `id` is the last child.
    fn slot_before_next_sibling(
        &self,
        store: &NodeStore,
        id: NodeId,
        parent_id: NodeId,
        interval_of: impl Fn(NodeId) -> TreeResult<Interval>,
    ) -> TreeResult<u32> {
        let siblings = &store.get(parent_id)?.children;
        let pos = siblings
            .iter()
            .position(|&s| s == id)
            .ok_or_else(|| TreeError::corruption(id, "node missing from parent's children"))?;
        match siblings.get(pos + 1) {
            Some(&next) => Ok(interval_of(next)?.node_number),
            None => Ok(interval_of(parent_id)?.highest_child_node_number + 1),
        }
    }
}

/// Validate `ids` against their parents, then every sibling run those
/// parents own, each run once.
fn check_nodes(
    store: &NodeStore,
    plan: &Renumbering,
    ids: impl Iterator<Item = NodeId>,
) -> TreeResult<()> {
    let mut parents: BTreeSet<NodeId> = BTreeSet::new();
    for id in ids.filter(|&id| Some(id) != plan.removed) {
        if let Some(parent_id) = check_containment(store, plan, id)? {
            parents.insert(parent_id);
        }
    }
    for parent_id in parents {
        check_siblings(store, plan, parent_id)?;
    }
    Ok(())
}

/// Validate one node's interval against its parent's. Returns the parent.
fn check_containment(
    store: &NodeStore,
    plan: &Renumbering,
    id: NodeId,
) -> TreeResult<Option<NodeId>> {
    let node = store.get(id)?;
    let iv = plan.interval(store, id)?;
    if iv.node_number > iv.highest_child_node_number {
        return Err(TreeError::corruption(id, format!("inverted interval {}", iv)));
    }

    if let Some(parent_id) = node.parent {
        let parent = plan.interval(store, parent_id)?;
        if !parent.strictly_contains(&iv) {
            return Err(TreeError::corruption(
                id,
                format!("interval {} escapes parent {} {}", iv, parent_id, parent),
            ));
        }
    }
    Ok(node.parent)
}

/// Adjacent children of `parent_id` must not overlap, in sibling order.
fn check_siblings(store: &NodeStore, plan: &Renumbering, parent_id: NodeId) -> TreeResult<()> {
    let siblings = store
        .get(parent_id)?
        .children
        .iter()
        .copied()
        .filter(|&s| Some(s) != plan.removed);
    for (id, next) in siblings.tuple_windows() {
        let iv = plan.interval(store, id)?;
        let next_iv = plan.interval(store, next)?;
        if iv.highest_child_node_number >= next_iv.node_number {
            return Err(TreeError::corruption(
                id,
                format!("interval {} overlaps next sibling {} {}", iv, next, next_iv),
            ));
        }
    }
    Ok(())
}

fn apply(store: &mut NodeStore, plan: Renumbering) -> TreeResult<()> {
    for (id, interval) in plan.changes {
        store.set_interval(id, interval)?;
    }
    store.reindex();
    Ok(())
}
