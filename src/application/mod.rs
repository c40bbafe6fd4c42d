//! Application layer: snapshot files and multi-family collections
//!
//! This layer wraps the tree engine with file I/O and configuration.

pub mod collection;
pub mod error;
pub mod error_ext;
pub mod import;
pub mod snapshot;

pub use collection::{Collection, FamilyHandle, FamilyReport};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::{IoResultExt, TomlResultExt};
pub use import::{import_file, import_records};
pub use snapshot::FamilySnapshot;
