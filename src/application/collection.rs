//! The five tree families of a collection, each behind its own lock.

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::application::{ApplicationResult, FamilySnapshot};
use crate::config::Settings;
use crate::domain::{
    FamilyKind, Geography, GeologicTimePeriod, LithoStrat, Storage, Taxon, TreeFamily, TreeResult,
};
use crate::tree::{SharedTree, Tree};

/// Type-erased view of one family, for work that spans families.
pub trait FamilyHandle: Send + Sync {
    fn kind(&self) -> FamilyKind;
    fn len(&self) -> usize;
    fn verify(&self) -> TreeResult<()>;
    fn refresh_full_names(&self) -> TreeResult<usize>;
    fn snapshot(&self) -> FamilySnapshot;
}

impl<F: TreeFamily> FamilyHandle for SharedTree<F> {
    fn kind(&self) -> FamilyKind {
        F::KIND
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn verify(&self) -> TreeResult<()> {
        self.read().verify()
    }

    fn refresh_full_names(&self) -> TreeResult<usize> {
        self.write().refresh_full_names()
    }

    fn snapshot(&self) -> FamilySnapshot {
        FamilySnapshot::capture(&*self.read())
    }
}

/// Outcome of verifying one family.
#[derive(Debug)]
pub struct FamilyReport {
    pub kind: FamilyKind,
    pub nodes: usize,
    pub result: TreeResult<()>,
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub geography: SharedTree<Geography>,
    pub geologic_time_period: SharedTree<GeologicTimePeriod>,
    pub litho_strat: SharedTree<LithoStrat>,
    pub storage: SharedTree<Storage>,
    pub taxon: SharedTree<Taxon>,
}

fn empty<F: TreeFamily>(settings: &Settings) -> TreeResult<SharedTree<F>> {
    Ok(SharedTree::new(Tree::with_default_ranks(
        F::KIND.definition_id(),
        settings,
    )?))
}

fn load_or_empty<F: TreeFamily>(
    dir: &Path,
    settings: &Settings,
) -> ApplicationResult<SharedTree<F>> {
    let path = dir.join(snapshot_file_name(F::KIND));
    if path.exists() {
        debug!("loading {}", path.display());
        let tree = FamilySnapshot::load(&path)?.restore::<F>(settings)?;
        Ok(SharedTree::new(tree))
    } else {
        Ok(empty(settings)?)
    }
}

/// `taxon.toml`, `geologic_time_period.toml`, ...
pub fn snapshot_file_name(kind: FamilyKind) -> String {
    let mut name = String::new();
    for (i, c) in kind.name().chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            name.push('_');
        }
        name.push(c.to_ascii_lowercase());
    }
    name + ".toml"
}

impl Collection {
    /// Five empty families with their standard ranks.
    pub fn new(settings: &Settings) -> TreeResult<Self> {
        Ok(Self {
            geography: empty(settings)?,
            geologic_time_period: empty(settings)?,
            litho_strat: empty(settings)?,
            storage: empty(settings)?,
            taxon: empty(settings)?,
        })
    }

    /// Load every family snapshot found in `dir`; missing families start empty.
    #[instrument(level = "debug", skip(settings))]
    pub fn load_dir(dir: &Path, settings: &Settings) -> ApplicationResult<Self> {
        Ok(Self {
            geography: load_or_empty(dir, settings)?,
            geologic_time_period: load_or_empty(dir, settings)?,
            litho_strat: load_or_empty(dir, settings)?,
            storage: load_or_empty(dir, settings)?,
            taxon: load_or_empty(dir, settings)?,
        })
    }

    /// Write one snapshot file per non-empty family.
    pub fn save_dir(&self, dir: &Path) -> ApplicationResult<usize> {
        let mut written = 0;
        for handle in self.handles() {
            if handle.len() > 0 {
                handle
                    .snapshot()
                    .save(&dir.join(snapshot_file_name(handle.kind())))?;
                written += 1;
            }
        }
        Ok(written)
    }

    pub fn handles(&self) -> [&dyn FamilyHandle; 5] {
        [
            &self.geography,
            &self.geologic_time_period,
            &self.litho_strat,
            &self.storage,
            &self.taxon,
        ]
    }

    /// Verify all families in parallel; each takes only its own read lock.
    #[instrument(level = "debug", skip(self))]
    pub fn verify_all(&self) -> Vec<FamilyReport> {
        let reports: Vec<FamilyReport> = self
            .handles()
            .into_par_iter()
            .map(|h| FamilyReport {
                kind: h.kind(),
                nodes: h.len(),
                result: h.verify(),
            })
            .collect();
        let failed = reports.iter().filter(|r| r.result.is_err()).count();
        info!("verified {} families, {} failed", reports.len(), failed);
        reports
    }

    /// Recompose stale full names in every family, in parallel.
    pub fn refresh_all(&self) -> TreeResult<usize> {
        self.handles()
            .into_par_iter()
            .map(|h| h.refresh_full_names())
            .try_reduce(|| 0, |a, b| Ok(a + b))
    }
}
