//! Flat record files: a list of `[[records]]`, optionally with the rank
//! schema to build against.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::application::{ApplicationResult, IoResultExt, TomlResultExt};
use crate::builder::{BuildRecord, Built, TreeBuilder};
use crate::config::Settings;
use crate::domain::{RankSchema, TreeFamily};

#[derive(Debug, Deserialize)]
struct RecordFile {
    #[serde(default)]
    schema: Option<RankSchema>,
    #[serde(default)]
    records: Vec<BuildRecord>,
}

/// Parse a record file and build the family it describes.
///
/// Without a `[schema]` table the family's standard ranks are used. A
/// `[schema]` table that is empty or out of order is rejected while parsing.
pub fn import_records<F: TreeFamily>(
    content: &str,
    path: &Path,
    settings: &Settings,
) -> ApplicationResult<Built<F>> {
    let file = toml::from_str::<RecordFile>(content).with_file(path)?;
    let schema = match file.schema {
        Some(schema) => schema,
        None => RankSchema::new(F::KIND.definition_id(), F::default_ranks())?,
    };

    let mut builder = TreeBuilder::new();
    builder.extend(file.records);
    let built = builder.build::<F>(schema, settings)?;
    info!("imported {} {} nodes from {}", built.tree.len(), F::NAME, path.display());
    Ok(built)
}

pub fn import_file<F: TreeFamily>(path: &Path, settings: &Settings) -> ApplicationResult<Built<F>> {
    let content = std::fs::read_to_string(path).with_path_context("read records", path)?;
    import_records(&content, path, settings)
}
