//! Family snapshots: the persisted node columns plus the rank schema,
//! stored as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt, TomlResultExt};
use crate::config::Settings;
use crate::domain::{FamilyKind, Interval, NodeRecord, RankSchema, TreeFamily, TreeNode};
use crate::store::NodeStore;
use crate::tree::Tree;

/// Everything needed to reconstruct one family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilySnapshot {
    pub family: FamilyKind,
    pub schema: RankSchema,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

impl FamilySnapshot {
    /// Capture a family's current state, nodes in preorder.
    pub fn capture<F: TreeFamily>(tree: &Tree<F>) -> Self {
        Self {
            family: F::KIND,
            schema: tree.schema().clone(),
            nodes: tree.records(),
        }
    }

    /// Rebuild the family. The result is fully verified before it is returned.
    #[instrument(level = "debug", skip(self, settings), fields(family = %self.family, nodes = self.nodes.len()))]
    pub fn restore<F: TreeFamily>(self, settings: &Settings) -> ApplicationResult<Tree<F>> {
        if self.family != F::KIND {
            return Err(ApplicationError::Config {
                message: format!("snapshot holds {}, expected {}", self.family, F::NAME),
            });
        }

        let nodes = self
            .nodes
            .into_iter()
            .map(|r| {
                let mut node = TreeNode::new(r.id, r.name, r.rank_id, r.parent_id);
                node.accepted_id = r.accepted_id;
                node.is_accepted = r.is_accepted;
                node.interval = Interval::new(r.node_number, r.highest_child_node_number);
                node.full_name_stale = r.full_name.is_none();
                node.full_name = r.full_name;
                node
            })
            .collect();

        let store = NodeStore::from_nodes(nodes)?;
        let tree = Tree::from_store(self.schema, store, settings)?;
        debug!("restore: {} nodes", tree.len());
        Ok(tree)
    }

    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::OperationFailed {
            context: format!("serialize {} snapshot", self.family),
            source: Box::new(e),
        })
    }

    /// Parse a snapshot; the embedded schema is checked while deserializing.
    pub fn from_toml(content: &str, path: &Path) -> ApplicationResult<Self> {
        toml::from_str::<Self>(content).with_file(path)
    }

    pub fn load(path: &Path) -> ApplicationResult<Self> {
        let content = std::fs::read_to_string(path).with_path_context("read snapshot", path)?;
        Self::from_toml(&content, path)
    }

    pub fn save(&self, path: &Path) -> ApplicationResult<()> {
        let content = self.to_toml()?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_path_context("create snapshot dir", dir)?;
        }
        std::fs::write(path, content).with_path_context("write snapshot", path)
    }
}
