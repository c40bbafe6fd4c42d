//! Bulk construction of a family from flat records.
//!
//! Nodes are attached structurally first and numbered in one allocator
//! pass at the end, so building n nodes costs O(n) renumbering instead of
//! one suffix shift per insert.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::composer::FullNameComposer;
use crate::config::Settings;
use crate::domain::{NodeId, RankSchema, TreeError, TreeFamily, TreeResult};
use crate::store::NodeStore;
use crate::synonym::SynonymResolver;
use crate::tree::Tree;

/// One flat input row, keyed by the importer's own identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub key: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub rank_id: u32,
    pub name: String,
    /// Key of the accepted node when this row is a synonym
    #[serde(default)]
    pub accepted: Option<String>,
}

impl BuildRecord {
    pub fn new(key: &str, parent: Option<&str>, rank_id: u32, name: &str) -> Self {
        Self {
            key: key.to_string(),
            parent: parent.map(str::to_string),
            rank_id,
            name: name.to_string(),
            accepted: None,
        }
    }

    pub fn synonym_of(mut self, accepted: &str) -> Self {
        self.accepted = Some(accepted.to_string());
        self
    }
}

/// A built family plus the importer-key to node-id mapping.
#[derive(Debug)]
pub struct Built<F: TreeFamily> {
    pub tree: Tree<F>,
    pub ids: HashMap<String, NodeId>,
}

/// Constructs a family from records in any order.
///
/// Siblings keep their relative input order.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    records: Vec<BuildRecord>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: BuildRecord) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = BuildRecord>) -> &mut Self {
        self.records.extend(records);
        self
    }

    #[instrument(level = "debug", skip(self, schema, settings), fields(records = self.records.len()))]
    pub fn build<F: TreeFamily>(&self, schema: RankSchema, settings: &Settings) -> TreeResult<Built<F>> {
        let mut by_key: HashMap<&str, &BuildRecord> = HashMap::new();
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut roots = Vec::new();

        for record in &self.records {
            if by_key.insert(record.key.as_str(), record).is_some() {
                return Err(TreeError::DuplicateKey(record.key.clone()));
            }
            match &record.parent {
                Some(parent) => children
                    .entry(parent.as_str())
                    .or_default()
                    .push(record.key.as_str()),
                None => roots.push(record.key.as_str()),
            }
        }
        for parent in children.keys() {
            if !by_key.contains_key(parent) {
                return Err(TreeError::UnknownKey(parent.to_string()));
            }
        }

        let mut store = NodeStore::new();
        let mut ids: HashMap<String, NodeId> = HashMap::new();
        let root_key = match roots.as_slice() {
            [] if self.records.is_empty() => {
                let tree = Tree::from_store(schema, store, settings)?;
                return Ok(Built { tree, ids });
            }
            [] => return Err(TreeError::NoRoot),
            [root] => *root,
            _ => return Err(TreeError::MultipleRoots(roots.len())),
        };

        let root = by_key[root_key];
        let root_rank = schema.root_rank()?;
        if root.rank_id != root_rank.rank_id {
            return Err(TreeError::rank_violation(format!(
                "root {} must have rank {}",
                root.key, root_rank
            )));
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, Option<NodeId>)> = vec![(root_key, None)];
        while let Some((key, parent_id)) = stack.pop() {
            if !visited.insert(key) {
                return Err(TreeError::DuplicateKey(key.to_string()));
            }
            let record = by_key[key];
            if let Some(pid) = parent_id {
                schema.validate_rank(store.get(pid)?.rank_id, record.rank_id)?;
            }
            let id = store.insert(parent_id, record.rank_id, &record.name, None)?;
            ids.insert(key.to_string(), id);

            if let Some(kids) = children.get(key) {
                // reversed so the first child is popped first
                for kid in kids.iter().rev() {
                    stack.push((*kid, Some(id)));
                }
            }
        }

        if visited.len() != self.records.len() {
            let stray = self
                .records
                .iter()
                .filter(|r| !visited.contains(r.key.as_str()))
                .map(|r| r.key.as_str())
                .join(", ");
            return Err(TreeError::UnknownKey(format!(
                "not reachable from the root: {stray}"
            )));
        }

        for record in self.records.iter().filter(|r| r.accepted.is_some()) {
            let accepted_key = record.accepted.as_deref().unwrap_or_default();
            let accepted = *ids
                .get(accepted_key)
                .ok_or_else(|| TreeError::UnknownKey(accepted_key.to_string()))?;
            SynonymResolver::make_synonym_of(&mut store, ids[&record.key], accepted)?;
        }

        let numbered = settings.allocator().renumber_all(&mut store)?;
        let named = FullNameComposer::refresh_stale(&mut store, &schema)?;
        debug!("build: {} nodes numbered, {} full names", numbered, named);

        let tree = Tree::from_store(schema, store, settings)?;
        Ok(Built { tree, ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RankDefinition, Storage};

    fn schema() -> RankSchema {
        RankSchema::new(
            3,
            vec![
                RankDefinition::new(0, "Site").hidden(),
                RankDefinition::new(100, "Building"),
                RankDefinition::new(200, "Room").separator(", "),
            ],
        )
        .unwrap()
    }

    #[test]
    fn given_records_out_of_order_when_building_then_input_sibling_order_kept() {
        let mut builder = TreeBuilder::new();
        builder
            .add(BuildRecord::new("r2", Some("b"), 200, "Room 2"))
            .add(BuildRecord::new("b", Some("site"), 100, "Main"))
            .add(BuildRecord::new("site", None, 0, "Museum"))
            .add(BuildRecord::new("r1", Some("b"), 200, "Room 1"));

        let built = builder.build::<Storage>(schema(), &Settings::default()).unwrap();
        let tree = &built.tree;
        let b = built.ids["b"];

        let rooms: Vec<&str> = tree
            .children_of(b)
            .unwrap()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(rooms, vec!["Room 2", "Room 1"]);
        assert_eq!(tree.get(built.ids["site"]).unwrap().interval.width(), 4);
        assert_eq!(tree.full_name(built.ids["r1"]).unwrap(), "Main, Room 1");
    }

    #[test]
    fn given_unknown_parent_when_building_then_unknown_key() {
        let mut builder = TreeBuilder::new();
        builder
            .add(BuildRecord::new("site", None, 0, "Museum"))
            .add(BuildRecord::new("r1", Some("nowhere"), 200, "Room 1"));
        assert_eq!(
            builder.build::<Storage>(schema(), &Settings::default()).unwrap_err(),
            TreeError::UnknownKey("nowhere".to_string())
        );
    }

    #[test]
    fn given_parent_cycle_when_building_then_unreachable_rejected() {
        let mut builder = TreeBuilder::new();
        builder
            .add(BuildRecord::new("site", None, 0, "Museum"))
            .add(BuildRecord::new("x", Some("y"), 100, "X"))
            .add(BuildRecord::new("y", Some("x"), 100, "Y"));
        assert!(matches!(
            builder.build::<Storage>(schema(), &Settings::default()),
            Err(TreeError::UnknownKey(_))
        ));
    }

    #[test]
    fn given_synonym_record_when_building_then_linked_to_accepted() {
        let mut builder = TreeBuilder::new();
        builder
            .add(BuildRecord::new("site", None, 0, "Museum"))
            .add(BuildRecord::new("b", Some("site"), 100, "Main"))
            .add(BuildRecord::new("old", Some("site"), 100, "Old Main").synonym_of("b"));

        let built = builder.build::<Storage>(schema(), &Settings::default()).unwrap();
        assert_eq!(built.tree.resolve(built.ids["old"]), Ok(built.ids["b"]));
    }
}
