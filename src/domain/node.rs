//! Tree nodes and their persisted shape.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a node within one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed preorder interval `[node_number, highest_child_node_number]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub node_number: u32,
    pub highest_child_node_number: u32,
}

impl Interval {
    pub fn new(node_number: u32, highest_child_node_number: u32) -> Self {
        Self {
            node_number,
            highest_child_node_number,
        }
    }

    /// Number of slots the subtree occupies (1 for a leaf).
    pub fn width(&self) -> u32 {
        self.highest_child_node_number - self.node_number + 1
    }

    /// Strict containment: `other` is a proper descendant range of `self`.
    pub fn strictly_contains(&self, other: &Interval) -> bool {
        self.node_number < other.node_number
            && other.highest_child_node_number <= self.highest_child_node_number
    }

    /// True when `other` lies entirely within `self`, including equality.
    pub fn covers(&self, other: &Interval) -> bool {
        self.node_number <= other.node_number
            && other.highest_child_node_number <= self.highest_child_node_number
    }

    pub fn contains_number(&self, number: u32) -> bool {
        self.node_number <= number && number <= self.highest_child_node_number
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.node_number, self.highest_child_node_number)
    }
}

/// A node held by the store.
///
/// `children` is kept in sibling display order, which is also interval
/// order: child `i` ends before child `i + 1` begins.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    pub rank_id: u32,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub accepted_id: Option<NodeId>,
    pub is_accepted: bool,
    pub interval: Interval,
    /// Materialized display name, None until first composed
    pub full_name: Option<String>,
    /// Set when an ancestor name or the parent chain changed since `full_name` was composed
    pub full_name_stale: bool,
}

impl TreeNode {
    pub fn new(id: NodeId, name: impl Into<String>, rank_id: u32, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name: name.into(),
            rank_id,
            parent,
            children: Vec::new(),
            accepted_id: None,
            is_accepted: true,
            interval: Interval::new(0, 0),
            full_name: None,
            full_name_stale: true,
        }
    }

    pub fn node_number(&self) -> u32 {
        self.interval.node_number
    }

    pub fn highest_child_node_number(&self) -> u32 {
        self.interval.highest_child_node_number
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id,
            name: self.name.clone(),
            rank_id: self.rank_id,
            parent_id: self.parent,
            accepted_id: self.accepted_id,
            is_accepted: self.is_accepted,
            node_number: self.interval.node_number,
            highest_child_node_number: self.interval.highest_child_node_number,
            full_name: self.full_name.clone(),
        }
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.id, self.name, self.interval)
    }
}

/// Columns persisted per node, independent of the surrounding schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub rank_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_id: Option<NodeId>,
    pub is_accepted: bool,
    pub node_number: u32,
    pub highest_child_node_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}
