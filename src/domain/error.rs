//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;

/// Integrity errors raised by the hierarchy engine.
///
/// None of these are transient: callers surface them, nothing retries.
/// Every mutating operation that returns one of these has left the
/// family exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("rank violation: {message}")]
    RankViolation { message: String },

    #[error("interval corruption at node {node}: {message}")]
    IntervalCorruption { node: NodeId, message: String },

    #[error("broken synonym chain at node {node}: {message}")]
    BrokenSynonymChain { node: NodeId, message: String },

    #[error("cannot compose full name for node {node}: {message}")]
    CompositionError { node: NodeId, message: String },

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("unknown rank id: {0}")]
    UnknownRank(u32),

    #[error("cycle detected: node {node} cannot be placed under {target}")]
    CycleDetected { node: NodeId, target: NodeId },

    #[error("node {0} has children")]
    NodeHasChildren(NodeId),

    #[error("node {node} is the accepted name of {count} synonym(s)")]
    NodeHasSynonyms { node: NodeId, count: usize },

    #[error("node {0} is not an accepted name")]
    NotAccepted(NodeId),

    #[error("family already has a root: {0}")]
    RootExists(NodeId),

    #[error("family has no root")]
    NoRoot,

    #[error("family has {0} roots, expected one")]
    MultipleRoots(usize),

    #[error("unknown record key: {0}")]
    UnknownKey(String),

    #[error("duplicate record key: {0}")]
    DuplicateKey(String),

    #[error("invalid rank schema: {0}")]
    InvalidSchema(String),
}

impl TreeError {
    pub fn rank_violation(message: impl Into<String>) -> Self {
        Self::RankViolation {
            message: message.into(),
        }
    }

    pub fn corruption(node: NodeId, message: impl Into<String>) -> Self {
        Self::IntervalCorruption {
            node,
            message: message.into(),
        }
    }

    pub fn broken_chain(node: NodeId, message: impl Into<String>) -> Self {
        Self::BrokenSynonymChain {
            node,
            message: message.into(),
        }
    }

    pub fn composition(node: NodeId, message: impl Into<String>) -> Self {
        Self::CompositionError {
            node,
            message: message.into(),
        }
    }
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
