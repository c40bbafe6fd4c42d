//! Full-name composition from the ancestor chain.

use tracing::{debug, instrument};

use crate::domain::{FullNameDirection, NodeId, RankSchema, TreeError, TreeResult};
use crate::store::NodeStore;

/// Builds and caches the display name of a node.
///
/// Segments come from the node and every ancestor whose rank is in the
/// full name; the node's own segment is always kept. Between a parent's
/// segment and its child's segment goes the child rank's separator,
/// whichever way round the segments are written.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullNameComposer;

impl FullNameComposer {
    /// Compose the full name of `id` without touching the cache.
    #[instrument(level = "trace", skip(store, schema))]
    pub fn compose(store: &NodeStore, schema: &RankSchema, id: NodeId) -> TreeResult<String> {
        let node = store.get(id)?;
        let own_rank = schema.get(node.rank_id).ok_or_else(|| {
            TreeError::composition(id, format!("rank {} is not defined", node.rank_id))
        })?;
        let ancestors = store
            .ancestors(id)
            .map_err(|e| TreeError::composition(id, e.to_string()))?;

        // leaf first: (segment, separator towards parent)
        let mut parts: Vec<(String, &str)> = Vec::with_capacity(ancestors.len() + 1);
        parts.push((
            RankSchema::compose_segment(own_rank, &node.name),
            &own_rank.full_name_separator,
        ));
        for ancestor in ancestors {
            let a = store
                .get(ancestor)
                .map_err(|e| TreeError::composition(id, e.to_string()))?;
            let rank = schema.get(a.rank_id).ok_or_else(|| {
                TreeError::composition(id, format!("rank {} of {} is not defined", a.rank_id, a.id))
            })?;
            if rank.is_in_full_name {
                parts.push((
                    RankSchema::compose_segment(rank, &a.name),
                    &rank.full_name_separator,
                ));
            }
        }

        let mut name = String::new();
        match own_rank.full_name_direction {
            FullNameDirection::RootToLeaf => {
                let mut iter = parts.iter().rev();
                if let Some((root, _)) = iter.next() {
                    name.push_str(root);
                }
                for (segment, separator) in iter {
                    name.push_str(separator);
                    name.push_str(segment);
                }
            }
            FullNameDirection::LeafToRoot => {
                for (i, (segment, _)) in parts.iter().enumerate() {
                    if i > 0 {
                        name.push_str(parts[i - 1].1);
                    }
                    name.push_str(segment);
                }
            }
        }
        Ok(name)
    }

    /// Mark `id` and all its descendants as needing recomposition.
    #[instrument(level = "trace", skip(store))]
    pub fn invalidate(store: &mut NodeStore, id: NodeId) -> TreeResult<usize> {
        let mut affected: Vec<NodeId> = store.descendants(id)?.iter().map(|n| n.id).collect();
        affected.push(id);
        for &n in &affected {
            store.get_mut(n)?.full_name_stale = true;
        }
        Ok(affected.len())
    }

    /// Recompose and cache the full name of `id`.
    ///
    /// On failure the previous cached value stays as it was.
    pub fn refresh(store: &mut NodeStore, schema: &RankSchema, id: NodeId) -> TreeResult<String> {
        let name = Self::compose(store, schema, id)?;
        let node = store.get_mut(id)?;
        node.full_name = Some(name.clone());
        node.full_name_stale = false;
        Ok(name)
    }

    /// Recompose every stale node. Returns how many were refreshed.
    #[instrument(level = "debug", skip(store, schema))]
    pub fn refresh_stale(store: &mut NodeStore, schema: &RankSchema) -> TreeResult<usize> {
        let stale: Vec<NodeId> = store
            .preorder()
            .filter(|n| n.full_name_stale)
            .map(|n| n.id)
            .collect();
        for &id in &stale {
            Self::refresh(store, schema, id)?;
        }
        debug!("refresh_stale: {} full names recomposed", stale.len());
        Ok(stale.len())
    }

    /// Cached name when current, otherwise a freshly composed one.
    pub fn current(store: &NodeStore, schema: &RankSchema, id: NodeId) -> TreeResult<String> {
        let node = store.get(id)?;
        match (&node.full_name, node.full_name_stale) {
            (Some(cached), false) => Ok(cached.clone()),
            _ => Self::compose(store, schema, id),
        }
    }
}
