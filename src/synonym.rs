//! Synonym resolution: one hop from a non-accepted node to its accepted node.

use tracing::instrument;

use crate::domain::{NodeId, TreeError, TreeResult};
use crate::store::NodeStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct SynonymResolver;

impl SynonymResolver {
    /// Canonical node for `id`.
    ///
    /// Accepted nodes resolve to themselves. A synonym resolves to its
    /// accepted node, which must itself be accepted; chains are never
    /// followed.
    #[instrument(level = "trace", skip(store))]
    pub fn resolve(store: &NodeStore, id: NodeId) -> TreeResult<NodeId> {
        let node = store.get(id)?;
        if node.is_accepted {
            return Ok(id);
        }
        let target = node
            .accepted_id
            .ok_or_else(|| TreeError::broken_chain(id, "synonym without accepted node"))?;
        match store.get(target) {
            Ok(accepted) if accepted.is_accepted => Ok(target),
            Ok(_) => Err(TreeError::broken_chain(
                id,
                format!("accepted node {} is itself a synonym", target),
            )),
            Err(_) => Err(TreeError::broken_chain(
                id,
                format!("accepted node {} does not exist", target),
            )),
        }
    }

    /// Check that `id` may become a synonym of `canonical`.
    pub fn check_synonymize(store: &NodeStore, id: NodeId, canonical: NodeId) -> TreeResult<()> {
        let node = store.get(id)?;
        let target = store.get(canonical)?;
        if id == canonical {
            return Err(TreeError::broken_chain(id, "node cannot be its own synonym"));
        }
        if !target.is_accepted {
            return Err(TreeError::NotAccepted(canonical));
        }
        if !node.children.is_empty() {
            return Err(TreeError::NodeHasChildren(id));
        }
        let dependents = Self::synonyms_of(store, id);
        if !dependents.is_empty() {
            return Err(TreeError::NodeHasSynonyms {
                node: id,
                count: dependents.len(),
            });
        }
        Ok(())
    }

    /// Point `id` at `canonical`.
    #[instrument(level = "debug", skip(store))]
    pub fn make_synonym_of(store: &mut NodeStore, id: NodeId, canonical: NodeId) -> TreeResult<()> {
        Self::check_synonymize(store, id, canonical)?;
        let node = store.get_mut(id)?;
        node.is_accepted = false;
        node.accepted_id = Some(canonical);
        Ok(())
    }

    /// Restore `id` as an accepted name.
    pub fn make_accepted(store: &mut NodeStore, id: NodeId) -> TreeResult<()> {
        let node = store.get_mut(id)?;
        node.is_accepted = true;
        node.accepted_id = None;
        Ok(())
    }

    /// Nodes whose accepted node is `id`, in preorder.
    pub fn synonyms_of(store: &NodeStore, id: NodeId) -> Vec<NodeId> {
        store
            .preorder()
            .filter(|n| n.accepted_id == Some(id))
            .map(|n| n.id)
            .collect()
    }

    /// Check every synonym link of the family.
    pub fn verify(store: &NodeStore) -> TreeResult<()> {
        for node in store.iter() {
            match (node.is_accepted, node.accepted_id) {
                (true, Some(_)) => {
                    return Err(TreeError::broken_chain(
                        node.id,
                        "accepted node carries an accepted id",
                    ))
                }
                (false, _) => {
                    Self::resolve(store, node.id)?;
                }
                (true, None) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genus_with_species() -> (NodeStore, NodeId, NodeId, NodeId) {
        let mut store = NodeStore::new();
        let genus = store.insert(None, 180, "Felis", None).unwrap();
        let leo = store.insert(Some(genus), 220, "leo", None).unwrap();
        let old = store.insert(Some(genus), 220, "leo-old", None).unwrap();
        (store, genus, leo, old)
    }

    #[test]
    fn given_accepted_node_when_resolving_then_itself() {
        let (store, _, leo, _) = genus_with_species();
        assert_eq!(SynonymResolver::resolve(&store, leo), Ok(leo));
    }

    #[test]
    fn given_synonym_when_resolving_then_one_hop() {
        let (mut store, _, leo, old) = genus_with_species();
        SynonymResolver::make_synonym_of(&mut store, old, leo).unwrap();
        assert_eq!(SynonymResolver::resolve(&store, old), Ok(leo));
        assert_eq!(SynonymResolver::synonyms_of(&store, leo), vec![old]);
    }

    #[test]
    fn given_synonym_target_when_synonymizing_then_not_accepted() {
        let (mut store, genus, leo, old) = genus_with_species();
        SynonymResolver::make_synonym_of(&mut store, old, leo).unwrap();
        let third = store.insert(Some(genus), 220, "third", None).unwrap();
        assert_eq!(
            SynonymResolver::make_synonym_of(&mut store, third, old),
            Err(TreeError::NotAccepted(old))
        );
    }

    #[test]
    fn given_node_with_children_when_synonymizing_then_rejected() {
        let (mut store, genus, leo, _) = genus_with_species();
        assert_eq!(
            SynonymResolver::make_synonym_of(&mut store, genus, leo),
            Err(TreeError::NodeHasChildren(genus))
        );
    }

    #[test]
    fn given_chain_written_behind_resolver_when_resolving_then_broken_chain() {
        let (mut store, _, leo, old) = genus_with_species();
        SynonymResolver::make_synonym_of(&mut store, old, leo).unwrap();
        let node = store.get_mut(leo).unwrap();
        node.is_accepted = false;
        node.accepted_id = Some(old);
        assert!(matches!(
            SynonymResolver::resolve(&store, old),
            Err(TreeError::BrokenSynonymChain { .. })
        ));
        assert!(SynonymResolver::verify(&store).is_err());
    }
}
