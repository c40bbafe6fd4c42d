//! Tree facade: one family's nodes, ranks, numbering and names behind a
//! single API.
//!
//! Every mutating call is all-or-nothing: rank validation, then the
//! structural change and renumbering, then full-name invalidation. When a
//! step fails the family is left exactly as it was.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, instrument, warn};

use crate::allocator::IntervalAllocator;
use crate::composer::FullNameComposer;
use crate::config::{FullNameRefresh, Settings};
use crate::domain::{
    NodeId, NodeRecord, RankSchema, TreeError, TreeFamily, TreeNode, TreeResult,
};
use crate::store::NodeStore;
use crate::synonym::SynonymResolver;

/// Ids touched by [`Tree::merge`], for redirecting record linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The node that no longer exists
    pub removed: NodeId,
    /// The node that absorbed it
    pub target: NodeId,
    /// Former children of `removed`, now children of `target`
    pub moved_children: Vec<NodeId>,
    /// Former synonyms of `removed`, now synonyms of `target`
    pub repointed_synonyms: Vec<NodeId>,
}

pub struct Tree<F: TreeFamily> {
    schema: RankSchema,
    store: NodeStore,
    allocator: IntervalAllocator,
    refresh: FullNameRefresh,
    family: PhantomData<F>,
}

impl<F: TreeFamily> fmt::Debug for Tree<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("family", &F::NAME)
            .field("definition_id", &self.schema.definition_id)
            .field("nodes", &self.store.len())
            .finish()
    }
}

impl<F: TreeFamily> Tree<F> {
    /// Empty family with default settings.
    pub fn new(schema: RankSchema) -> Self {
        Self::with_settings(schema, &Settings::default())
    }

    pub fn with_settings(schema: RankSchema, settings: &Settings) -> Self {
        Self {
            schema,
            store: NodeStore::new(),
            allocator: settings.allocator(),
            refresh: settings.full_name_refresh,
            family: PhantomData,
        }
    }

    /// Empty family using the family's standard ranks.
    pub fn with_default_ranks(definition_id: u32, settings: &Settings) -> TreeResult<Self> {
        let schema = RankSchema::new(definition_id, F::default_ranks())?;
        Ok(Self::with_settings(schema, settings))
    }

    /// Wrap an existing store, verifying it first.
    pub fn from_store(schema: RankSchema, store: NodeStore, settings: &Settings) -> TreeResult<Self> {
        let tree = Self {
            schema,
            store,
            allocator: settings.allocator(),
            refresh: settings.full_name_refresh,
            family: PhantomData,
        };
        tree.verify()?;
        Ok(tree)
    }

    pub fn family_name(&self) -> &'static str {
        F::NAME
    }

    pub fn schema(&self) -> &RankSchema {
        &self.schema
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.store.root()
    }

    pub fn get(&self, id: NodeId) -> TreeResult<&TreeNode> {
        self.store.get(id)
    }

    // ---------------------------------------------------------------
    // mutation
    // ---------------------------------------------------------------

    /// Create the family root. It must use the shallowest rank.
    #[instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn create_root(&mut self, rank_id: u32, name: &str) -> TreeResult<NodeId> {
        let root_rank = self.schema.root_rank()?;
        if rank_id != root_rank.rank_id {
            return Err(TreeError::rank_violation(format!(
                "root must have rank {}, got {}",
                root_rank, rank_id
            )));
        }
        let id = self.store.insert(None, rank_id, name, None)?;
        if let Err(e) = self.allocator.number_root(&mut self.store, id) {
            self.store.delete(id)?;
            return Err(e);
        }
        self.after_invalidation();
        Ok(id)
    }

    /// Create a leaf as the last child of `parent`.
    pub fn create_child(&mut self, parent: NodeId, rank_id: u32, name: &str) -> TreeResult<NodeId> {
        self.create_child_at(parent, rank_id, name, None)
    }

    /// Create a leaf under `parent` at sibling `position` (append when None).
    #[instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn create_child_at(
        &mut self,
        parent: NodeId,
        rank_id: u32,
        name: &str,
        position: Option<usize>,
    ) -> TreeResult<NodeId> {
        let p = self.store.get(parent)?;
        if !p.is_accepted {
            return Err(TreeError::NotAccepted(parent));
        }
        self.schema.validate_rank(p.rank_id, rank_id)?;

        let id = self.store.insert(Some(parent), rank_id, name, position)?;
        if let Err(e) = self.allocator.insert_leaf(&mut self.store, id) {
            self.store.delete(id)?;
            return Err(e);
        }
        debug!("create_child: {} {:?} under {}", id, name, parent);
        self.after_invalidation();
        Ok(id)
    }

    /// Move `id` and its subtree to be the last child of `new_parent`.
    pub fn move_subtree(&mut self, id: NodeId, new_parent: NodeId) -> TreeResult<()> {
        self.move_subtree_at(id, new_parent, None)
    }

    /// Move `id` and its subtree under `new_parent` at sibling `position`.
    ///
    /// `position` counts siblings without `id` itself, so moving a node
    /// back to its former parent at its former index restores the former
    /// numbering exactly.
    #[instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn move_subtree_at(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        position: Option<usize>,
    ) -> TreeResult<()> {
        let node = self.store.get(id)?;
        let target = self.store.get(new_parent)?;
        let old = node.interval;
        let old_parent = node.parent.ok_or(TreeError::CycleDetected {
            node: id,
            target: new_parent,
        })?;
        if old.covers(&target.interval) {
            return Err(TreeError::CycleDetected {
                node: id,
                target: new_parent,
            });
        }
        if !target.is_accepted {
            return Err(TreeError::NotAccepted(new_parent));
        }
        self.schema.validate_rank(target.rank_id, node.rank_id)?;

        let old_index = self
            .store
            .get(old_parent)?
            .children
            .iter()
            .position(|&c| c == id)
            .ok_or_else(|| TreeError::corruption(id, "node missing from parent's children"))?;

        self.store.reparent(id, new_parent, position)?;
        if let Err(e) = self.allocator.relocate(&mut self.store, id, old) {
            self.store.reparent(id, old_parent, Some(old_index))?;
            return Err(e);
        }

        FullNameComposer::invalidate(&mut self.store, id)?;
        self.after_invalidation();
        Ok(())
    }

    /// Change a node's name; its full name and every descendant's go stale.
    #[instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn rename(&mut self, id: NodeId, name: &str) -> TreeResult<()> {
        self.store.get_mut(id)?.name = name.to_string();
        let affected = FullNameComposer::invalidate(&mut self.store, id)?;
        debug!("rename: {} full names invalidated", affected);
        self.after_invalidation();
        Ok(())
    }

    /// Turn `id` into a synonym of the accepted node `canonical`.
    #[instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn mark_synonym(&mut self, id: NodeId, canonical: NodeId) -> TreeResult<()> {
        SynonymResolver::make_synonym_of(&mut self.store, id, canonical)
    }

    /// Make a synonym an accepted name again.
    pub fn mark_accepted(&mut self, id: NodeId) -> TreeResult<()> {
        SynonymResolver::make_accepted(&mut self.store, id)
    }

    /// Delete a node that has neither children nor synonyms.
    #[instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn delete_leaf(&mut self, id: NodeId) -> TreeResult<()> {
        let synonyms = SynonymResolver::synonyms_of(&self.store, id);
        if !synonyms.is_empty() {
            return Err(TreeError::NodeHasSynonyms {
                node: id,
                count: synonyms.len(),
            });
        }
        self.allocator.remove_leaf(&mut self.store, id)
    }

    /// Fold `source` into `target`.
    ///
    /// Children of `source` move under `target` (keeping their order),
    /// synonyms of `source` are repointed at `target`, and `source` is
    /// deleted. Callers redirect their own references using the outcome.
    #[instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn merge(&mut self, source: NodeId, target: NodeId) -> TreeResult<MergeOutcome> {
        let src = self.store.get(source)?;
        let dst = self.store.get(target)?;
        if src.interval.covers(&dst.interval) || src.is_root() {
            return Err(TreeError::CycleDetected {
                node: source,
                target,
            });
        }
        if !dst.is_accepted {
            return Err(TreeError::NotAccepted(target));
        }
        let children = src.children.clone();
        for &child in &children {
            self.schema
                .validate_rank(dst.rank_id, self.store.get(child)?.rank_id)?;
        }
        let synonyms = SynonymResolver::synonyms_of(&self.store, source);

        let backup = self.store.clone();
        let result = self.apply_merge(source, target, &children, &synonyms);
        if let Err(e) = result {
            warn!("merge {} into {} rolled back: {}", source, target, e);
            self.store = backup;
            return Err(e);
        }

        Ok(MergeOutcome {
            removed: source,
            target,
            moved_children: children,
            repointed_synonyms: synonyms,
        })
    }

    fn apply_merge(
        &mut self,
        source: NodeId,
        target: NodeId,
        children: &[NodeId],
        synonyms: &[NodeId],
    ) -> TreeResult<()> {
        for &child in children {
            self.move_subtree(child, target)?;
        }
        for &synonym in synonyms {
            self.store.get_mut(synonym)?.accepted_id = Some(target);
        }
        self.delete_leaf(source)
    }

    /// Reassign dense preorder numbers from the parent/child structure.
    pub fn renumber_all(&mut self) -> TreeResult<usize> {
        self.allocator.renumber_all(&mut self.store)
    }

    /// Recompose every stale cached full name.
    pub fn refresh_full_names(&mut self) -> TreeResult<usize> {
        FullNameComposer::refresh_stale(&mut self.store, &self.schema)
    }

    /// Mark every cached full name stale and recompose them all.
    pub fn rebuild_full_names(&mut self) -> TreeResult<usize> {
        for node in self.store.iter_mut() {
            node.full_name_stale = true;
        }
        self.refresh_full_names()
    }

    fn after_invalidation(&mut self) {
        if self.refresh == FullNameRefresh::Eager {
            if let Err(e) = FullNameComposer::refresh_stale(&mut self.store, &self.schema) {
                warn!("full names left stale: {}", e);
            }
        }
    }

    // ---------------------------------------------------------------
    // queries
    // ---------------------------------------------------------------

    /// Current full name: the cached value when fresh, composed otherwise.
    pub fn full_name(&self, id: NodeId) -> TreeResult<String> {
        FullNameComposer::current(&self.store, &self.schema, id)
    }

    /// Full name for display; failures degrade to a placeholder.
    pub fn display_name(&self, id: NodeId) -> String {
        match self.full_name(id) {
            Ok(name) => name,
            Err(e) => {
                warn!("cannot display {}: {}", id, e);
                format!("<cannot display {}>", id)
            }
        }
    }

    /// Canonical node to use when persisting a reference to `id`.
    pub fn resolve(&self, id: NodeId) -> TreeResult<NodeId> {
        SynonymResolver::resolve(&self.store, id)
    }

    pub fn synonyms_of(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        self.store.get(id)?;
        Ok(SynonymResolver::synonyms_of(&self.store, id))
    }

    /// Proper descendants of `id` in preorder.
    pub fn descendants_of(&self, id: NodeId) -> TreeResult<Vec<&TreeNode>> {
        self.store.descendants(id)
    }

    pub fn children_of(&self, id: NodeId) -> TreeResult<Vec<&TreeNode>> {
        self.store.children(id)
    }

    /// Parent chain, nearest first.
    pub fn ancestors_of(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        self.store.ancestors(id)
    }

    /// True when `a` lies strictly below `b`. Interval test, no traversal.
    pub fn is_descendant_of(&self, a: NodeId, b: NodeId) -> TreeResult<bool> {
        let a = self.store.get(a)?.interval;
        let b = self.store.get(b)?.interval;
        Ok(b.strictly_contains(&a))
    }

    /// Check intervals, rank ordering and synonym links of the whole family.
    #[instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn verify(&self) -> TreeResult<()> {
        if !self.store.is_empty() && self.store.root().is_none() {
            return Err(TreeError::NoRoot);
        }
        self.allocator.verify(&self.store)?;
        for node in self.store.iter() {
            match node.parent {
                Some(parent) => {
                    let p = self.store.get(parent)?;
                    self.schema.validate_rank(p.rank_id, node.rank_id)?;
                    if !p.is_accepted {
                        return Err(TreeError::NotAccepted(parent));
                    }
                }
                None => {
                    self.schema.require(node.rank_id)?;
                }
            }
        }
        SynonymResolver::verify(&self.store)
    }

    /// Persisted shape of every node, in preorder.
    pub fn records(&self) -> Vec<NodeRecord> {
        self.store.preorder().map(TreeNode::to_record).collect()
    }
}

/// A family behind its own read/write lock.
///
/// Mutations on one family are serialized; readers share the lock and
/// never see a half-applied renumbering. Separate families have separate
/// locks and proceed independently.
pub struct SharedTree<F: TreeFamily> {
    inner: Arc<RwLock<Tree<F>>>,
}

impl<F: TreeFamily> Clone for SharedTree<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: TreeFamily> fmt::Debug for SharedTree<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTree").field("family", &F::NAME).finish()
    }
}

impl<F: TreeFamily> SharedTree<F> {
    pub fn new(tree: Tree<F>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Tree<F>> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Tree<F>> {
        self.inner.write()
    }

    pub fn create_child(&self, parent: NodeId, rank_id: u32, name: &str) -> TreeResult<NodeId> {
        self.write().create_child(parent, rank_id, name)
    }

    pub fn move_subtree(&self, id: NodeId, new_parent: NodeId) -> TreeResult<()> {
        self.write().move_subtree(id, new_parent)
    }

    pub fn mark_synonym(&self, id: NodeId, canonical: NodeId) -> TreeResult<()> {
        self.write().mark_synonym(id, canonical)
    }

    pub fn delete_leaf(&self, id: NodeId) -> TreeResult<()> {
        self.write().delete_leaf(id)
    }

    pub fn full_name(&self, id: NodeId) -> TreeResult<String> {
        self.read().full_name(id)
    }

    pub fn resolve(&self, id: NodeId) -> TreeResult<NodeId> {
        self.read().resolve(id)
    }

    /// Ids of the proper descendants of `id`, in preorder.
    pub fn descendants_of(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        Ok(self.read().descendants_of(id)?.iter().map(|n| n.id).collect())
    }

    pub fn is_descendant_of(&self, a: NodeId, b: NodeId) -> TreeResult<bool> {
        self.read().is_descendant_of(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interval, Storage};

    #[test]
    fn given_corrupted_branch_when_move_rejected_then_node_back_at_old_index() {
        // Arrange: root -> East(R1, R2), West, North
        let mut tree = Tree::<Storage>::with_default_ranks(4, &Settings::default()).unwrap();
        let root = tree.create_root(0, "Museum").unwrap();
        let east = tree.create_child(root, 100, "East").unwrap();
        let r1 = tree.create_child(east, 200, "R1").unwrap();
        let r2 = tree.create_child(east, 200, "R2").unwrap();
        let west = tree.create_child(root, 100, "West").unwrap();
        let north = tree.create_child(root, 100, "North").unwrap();
        tree.store.set_interval(north, Interval::new(6, 7)).unwrap();
        let before = tree.records();

        // Act
        let err = tree.move_subtree(r1, west).unwrap_err();

        // Assert
        assert!(matches!(err, TreeError::IntervalCorruption { .. }), "{err}");
        assert_eq!(tree.get(east).unwrap().children, vec![r1, r2]);
        assert!(tree.get(west).unwrap().children.is_empty());
        assert_eq!(tree.get(r1).unwrap().parent, Some(east));
        assert_eq!(tree.records(), before);
    }
}
