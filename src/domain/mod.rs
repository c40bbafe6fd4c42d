//! Domain layer: node, rank and family definitions
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod error;
pub mod family;
pub mod node;
pub mod rank;

pub use error::{TreeError, TreeResult};
pub use family::{
    FamilyKind, Geography, GeologicTimePeriod, LithoStrat, Storage, Taxon, TreeFamily,
};
pub use node::{Interval, NodeId, NodeRecord, TreeNode};
pub use rank::{FullNameDirection, RankDefinition, RankSchema};
