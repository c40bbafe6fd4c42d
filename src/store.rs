use std::collections::{BTreeMap, HashMap};

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::{Interval, NodeId, TreeError, TreeNode, TreeResult};

/// Arena-backed node storage for one tree family.
///
/// Nodes live in a generational arena and are addressed by stable
/// [`NodeId`]s. A `node_number -> id` index turns subtree queries into a
/// single ordered range scan. The index is rebuilt by the allocator after
/// every renumbering pass, never mid-pass.
#[derive(Debug, Clone)]
pub struct NodeStore {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Stable id to arena slot
    slots: HashMap<NodeId, Index>,
    /// Preorder index over node numbers
    by_number: BTreeMap<u32, NodeId>,
    root: Option<NodeId>,
    next_id: u64,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            slots: HashMap::new(),
            by_number: BTreeMap::new(),
            root: None,
            next_id: 1,
        }
    }

    /// Rebuild a store from persisted nodes.
    ///
    /// Children are ordered by node number, so sibling order survives a
    /// save/load cycle. Intervals are taken as given and must be verified
    /// by the caller.
    pub fn from_nodes(nodes: Vec<TreeNode>) -> TreeResult<Self> {
        let mut store = Self::new();
        for mut node in nodes {
            if store.slots.contains_key(&node.id) {
                return Err(TreeError::corruption(node.id, "duplicate node id"));
            }
            if node.parent.is_none() {
                if let Some(existing) = store.root {
                    return Err(TreeError::RootExists(existing));
                }
                store.root = Some(node.id);
            }
            node.children.clear();
            store.next_id = store.next_id.max(node.id.0 + 1);
            let id = node.id;
            let idx = store.arena.insert(node);
            store.slots.insert(id, idx);
        }

        let mut links: Vec<(NodeId, u32, NodeId)> = store
            .arena
            .iter()
            .filter_map(|(_, n)| n.parent.map(|p| (p, n.node_number(), n.id)))
            .collect();
        links.sort_by_key(|&(parent, number, _)| (parent, number));
        for (parent, _, child) in links {
            store.get_mut(parent)?.children.push(child);
        }

        store.reindex();
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Allocate the next node id without inserting anything.
    pub(crate) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Attach a new node under `parent` at sibling `position` (append when None).
    ///
    /// The node keeps a provisional interval until the allocator numbers it.
    #[instrument(level = "trace", skip(self))]
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        rank_id: u32,
        name: &str,
        position: Option<usize>,
    ) -> TreeResult<NodeId> {
        match parent {
            Some(p) => {
                self.get(p)?;
            }
            None => {
                if let Some(root) = self.root {
                    return Err(TreeError::RootExists(root));
                }
            }
        }

        let id = self.allocate_id();
        let idx = self.arena.insert(TreeNode::new(id, name, rank_id, parent));
        self.slots.insert(id, idx);

        match parent {
            Some(p) => {
                let siblings = &mut self.get_mut(p)?.children;
                let at = position.unwrap_or(siblings.len()).min(siblings.len());
                siblings.insert(at, id);
            }
            None => self.root = Some(id),
        }
        Ok(id)
    }

    /// Move `id` (with its subtree) under `new_parent` at sibling `position`.
    ///
    /// Only parent/child links change here; intervals are the allocator's job.
    #[instrument(level = "trace", skip(self))]
    pub fn reparent(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        position: Option<usize>,
    ) -> TreeResult<()> {
        self.get(new_parent)?;
        if id == new_parent || self.ancestors(new_parent)?.contains(&id) {
            return Err(TreeError::CycleDetected {
                node: id,
                target: new_parent,
            });
        }

        let old_parent = self.get(id)?.parent.ok_or(TreeError::CycleDetected {
            node: id,
            target: new_parent,
        })?;
        self.get_mut(old_parent)?.children.retain(|&c| c != id);

        let siblings = &mut self.get_mut(new_parent)?.children;
        let at = position.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, id);
        self.get_mut(id)?.parent = Some(new_parent);
        Ok(())
    }

    /// Remove a childless node and return it.
    #[instrument(level = "trace", skip(self))]
    pub fn delete(&mut self, id: NodeId) -> TreeResult<TreeNode> {
        let node = self.get(id)?;
        if !node.children.is_empty() {
            return Err(TreeError::NodeHasChildren(id));
        }
        let parent = node.parent;
        let number = node.node_number();

        if let Some(p) = parent {
            self.get_mut(p)?.children.retain(|&c| c != id);
        } else {
            self.root = None;
        }
        if self.by_number.get(&number) == Some(&id) {
            self.by_number.remove(&number);
        }
        let idx = self.slots.remove(&id).ok_or(TreeError::NodeNotFound(id))?;
        self.arena.remove(idx).ok_or(TreeError::NodeNotFound(id))
    }

    pub fn get(&self, id: NodeId) -> TreeResult<&TreeNode> {
        self.slots
            .get(&id)
            .and_then(|&idx| self.arena.get(idx))
            .ok_or(TreeError::NodeNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> TreeResult<&mut TreeNode> {
        let idx = *self.slots.get(&id).ok_or(TreeError::NodeNotFound(id))?;
        self.arena.get_mut(idx).ok_or(TreeError::NodeNotFound(id))
    }

    /// Direct children in sibling order.
    #[instrument(level = "trace", skip(self))]
    pub fn children(&self, id: NodeId) -> TreeResult<Vec<&TreeNode>> {
        self.get(id)?
            .children
            .iter()
            .map(|&c| self.get(c))
            .collect()
    }

    /// All proper descendants in preorder.
    ///
    /// One range scan over the node-number index: every node numbered in
    /// `(node_number, highest_child_node_number]` is a descendant.
    #[instrument(level = "trace", skip(self))]
    pub fn descendants(&self, id: NodeId) -> TreeResult<Vec<&TreeNode>> {
        let interval = self.get(id)?.interval;
        if interval.width() == 1 {
            return Ok(Vec::new());
        }
        self.by_number
            .range(interval.node_number + 1..=interval.highest_child_node_number)
            .map(|(_, &d)| self.get(d))
            .collect()
    }

    /// Parent chain from the direct parent up to the root.
    ///
    /// The walk is bounded by the node count, so a corrupted parent cycle
    /// is reported instead of looping.
    #[instrument(level = "trace", skip(self))]
    pub fn ancestors(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut chain = Vec::new();
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            if chain.len() > self.len() {
                return Err(TreeError::CycleDetected {
                    node: id,
                    target: parent,
                });
            }
            chain.push(parent);
            current = self.get(parent)?.parent;
        }
        Ok(chain)
    }

    /// Node occupying `number`, if any.
    pub fn at_number(&self, number: u32) -> Option<NodeId> {
        self.by_number.get(&number).copied()
    }

    /// All nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.arena.iter().map(|(_, n)| n)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TreeNode> {
        self.arena.iter_mut().map(|(_, n)| n)
    }

    /// All nodes in preorder, read from the node-number index.
    pub fn preorder(&self) -> impl Iterator<Item = &TreeNode> {
        self.by_number
            .values()
            .filter_map(|id| self.get(*id).ok())
    }

    pub(crate) fn set_interval(&mut self, id: NodeId, interval: Interval) -> TreeResult<()> {
        self.get_mut(id)?.interval = interval;
        Ok(())
    }

    /// Rebuild the node-number index from current intervals.
    pub(crate) fn reindex(&mut self) {
        self.by_number = self
            .arena
            .iter()
            .map(|(_, n)| (n.node_number(), n.id))
            .collect();
    }

    /// Number of levels below and including the root.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.iter()
            .filter(|n| n.children.is_empty())
            .filter_map(|n| self.ancestors(n.id).ok())
            .map(|chain| chain.len() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Ids of all nodes without children.
    pub fn leaf_nodes(&self) -> Vec<NodeId> {
        self.preorder()
            .filter(|n| n.children.is_empty())
            .map(|n| n.id)
            .collect()
    }
}
