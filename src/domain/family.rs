//! Tree families: independent hierarchies that share one engine.
//!
//! Each family is a zero-sized marker type. The facade is generic over
//! the marker, so the five record types cannot be mixed up at compile time
//! while sharing every line of tree logic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::rank::{FullNameDirection, RankDefinition};

/// Runtime tag for a family, used where the type is not known statically
/// (snapshots, CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyKind {
    Geography,
    GeologicTimePeriod,
    LithoStrat,
    Storage,
    Taxon,
}

impl FamilyKind {
    pub const ALL: [FamilyKind; 5] = [
        FamilyKind::Geography,
        FamilyKind::GeologicTimePeriod,
        FamilyKind::LithoStrat,
        FamilyKind::Storage,
        FamilyKind::Taxon,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FamilyKind::Geography => Geography::NAME,
            FamilyKind::GeologicTimePeriod => GeologicTimePeriod::NAME,
            FamilyKind::LithoStrat => LithoStrat::NAME,
            FamilyKind::Storage => Storage::NAME,
            FamilyKind::Taxon => Taxon::NAME,
        }
    }

    /// Rank definition id used when a family is created with its standard ranks.
    pub fn definition_id(&self) -> u32 {
        match self {
            FamilyKind::Geography => 1,
            FamilyKind::GeologicTimePeriod => 2,
            FamilyKind::LithoStrat => 3,
            FamilyKind::Storage => 4,
            FamilyKind::Taxon => 5,
        }
    }

    pub fn default_ranks(&self) -> Vec<RankDefinition> {
        match self {
            FamilyKind::Geography => Geography::default_ranks(),
            FamilyKind::GeologicTimePeriod => GeologicTimePeriod::default_ranks(),
            FamilyKind::LithoStrat => LithoStrat::default_ranks(),
            FamilyKind::Storage => Storage::default_ranks(),
            FamilyKind::Taxon => Taxon::default_ranks(),
        }
    }
}

impl FromStr for FamilyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace(['-', '_'], "").to_lowercase();
        FamilyKind::ALL
            .into_iter()
            .find(|k| k.name().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown tree family: {s}"))
    }
}

impl fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of one tree family.
pub trait TreeFamily: Send + Sync + 'static {
    const NAME: &'static str;
    const KIND: FamilyKind;

    /// Standard levels used when a family is created without an explicit schema.
    fn default_ranks() -> Vec<RankDefinition>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Geography;

#[derive(Debug, Clone, Copy, Default)]
pub struct GeologicTimePeriod;

#[derive(Debug, Clone, Copy, Default)]
pub struct LithoStrat;

#[derive(Debug, Clone, Copy, Default)]
pub struct Storage;

#[derive(Debug, Clone, Copy, Default)]
pub struct Taxon;

fn leaf_first(rank_id: u32, name: &str) -> RankDefinition {
    RankDefinition::new(rank_id, name)
        .separator(", ")
        .direction(FullNameDirection::LeafToRoot)
}

impl TreeFamily for Geography {
    const NAME: &'static str = "Geography";
    const KIND: FamilyKind = FamilyKind::Geography;

    fn default_ranks() -> Vec<RankDefinition> {
        vec![
            leaf_first(0, "Earth").hidden(),
            leaf_first(100, "Continent").enforced(),
            leaf_first(200, "Country").enforced(),
            leaf_first(300, "State").enforced(),
            leaf_first(400, "County"),
        ]
    }
}

impl TreeFamily for GeologicTimePeriod {
    const NAME: &'static str = "GeologicTimePeriod";
    const KIND: FamilyKind = FamilyKind::GeologicTimePeriod;

    fn default_ranks() -> Vec<RankDefinition> {
        vec![
            leaf_first(0, "Time").hidden(),
            leaf_first(100, "Era").enforced(),
            leaf_first(200, "Period").enforced(),
            leaf_first(300, "Epoch").enforced(),
            leaf_first(400, "Age"),
        ]
    }
}

impl TreeFamily for LithoStrat {
    const NAME: &'static str = "LithoStrat";
    const KIND: FamilyKind = FamilyKind::LithoStrat;

    fn default_ranks() -> Vec<RankDefinition> {
        vec![
            leaf_first(0, "Surface").hidden(),
            leaf_first(100, "Super Group"),
            leaf_first(200, "Group"),
            leaf_first(300, "Formation").enforced(),
            leaf_first(400, "Member"),
            leaf_first(500, "Bed"),
        ]
    }
}

impl TreeFamily for Storage {
    const NAME: &'static str = "Storage";
    const KIND: FamilyKind = FamilyKind::Storage;

    fn default_ranks() -> Vec<RankDefinition> {
        vec![
            RankDefinition::new(0, "Site").hidden(),
            RankDefinition::new(100, "Building").enforced(),
            RankDefinition::new(200, "Room").separator(", "),
            RankDefinition::new(300, "Cabinet").separator(", "),
            RankDefinition::new(400, "Shelf").separator(", "),
        ]
    }
}

impl TreeFamily for Taxon {
    const NAME: &'static str = "Taxon";
    const KIND: FamilyKind = FamilyKind::Taxon;

    fn default_ranks() -> Vec<RankDefinition> {
        vec![
            RankDefinition::new(0, "Life").hidden(),
            RankDefinition::new(10, "Kingdom").enforced().hidden(),
            RankDefinition::new(30, "Phylum").enforced().hidden(),
            RankDefinition::new(60, "Class").enforced().hidden(),
            RankDefinition::new(100, "Order").enforced().hidden(),
            RankDefinition::new(140, "Family").enforced().hidden(),
            RankDefinition::new(180, "Genus").enforced(),
            RankDefinition::new(220, "Species").enforced(),
            RankDefinition::new(230, "Subspecies"),
        ]
    }
}
