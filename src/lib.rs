//! ranktree: rank-constrained hierarchies for collection data.
//!
//! One engine serves every tree family (geography, geologic time,
//! lithostratigraphy, storage, taxonomy). A family is a single rooted
//! tree whose nodes carry preorder interval numbers, so "is X below Y"
//! and "all descendants of Y" are range checks rather than walks.
//!
//! Layers, innermost first:
//! - [`domain`]: nodes, ranks, families and errors
//! - [`store`], [`allocator`], [`composer`], [`synonym`]: the engine parts
//! - [`tree`]: the per-family facade and its locked, shareable form
//! - [`application`]: snapshots, record import and five-family collections
//! - [`cli`]: the `ranktree` command

pub mod allocator;
pub mod application;
pub mod builder;
pub mod cli;
pub mod composer;
pub mod config;
pub mod display;
pub mod domain;
pub mod exitcode;
pub mod store;
pub mod synonym;
pub mod tree;
pub mod util;

pub use allocator::{IntervalAllocator, Renumbering, Verification};
pub use builder::{BuildRecord, Built, TreeBuilder};
pub use config::{FullNameRefresh, Settings};
pub use domain::{
    FamilyKind, FullNameDirection, Interval, NodeId, RankDefinition, RankSchema, TreeError,
    TreeFamily, TreeNode, TreeResult,
};
pub use tree::{MergeOutcome, SharedTree, Tree};
