//! Rank definitions: the ordered levels a tree family may use.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::error::{TreeError, TreeResult};

/// Order in which ancestor segments are joined into a full name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullNameDirection {
    /// Root segment first, e.g. "Panthera leo persica"
    #[default]
    RootToLeaf,
    /// Leaf segment first, e.g. "Shelf 3, Cabinet 2, Room 101"
    LeafToRoot,
}

/// One permissible level of a tree family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankDefinition {
    /// Strictly increasing along the schema, deeper ranks are larger
    pub rank_id: u32,
    pub name: String,
    /// Deeper nodes may not skip this rank
    #[serde(default)]
    pub is_enforced: bool,
    /// Excluded levels contribute nothing to composed names
    #[serde(default = "default_true")]
    pub is_in_full_name: bool,
    #[serde(default)]
    pub text_before: String,
    #[serde(default)]
    pub text_after: String,
    /// Placed between the parent's segment and this rank's segment
    #[serde(default = "default_separator")]
    pub full_name_separator: String,
    #[serde(default)]
    pub full_name_direction: FullNameDirection,
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    " ".to_string()
}

impl RankDefinition {
    pub fn new(rank_id: u32, name: impl Into<String>) -> Self {
        Self {
            rank_id,
            name: name.into(),
            is_enforced: false,
            is_in_full_name: true,
            text_before: String::new(),
            text_after: String::new(),
            full_name_separator: default_separator(),
            full_name_direction: FullNameDirection::RootToLeaf,
        }
    }

    pub fn enforced(mut self) -> Self {
        self.is_enforced = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_in_full_name = false;
        self
    }

    pub fn wrapped(mut self, before: impl Into<String>, after: impl Into<String>) -> Self {
        self.text_before = before.into();
        self.text_after = after.into();
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.full_name_separator = separator.into();
        self
    }

    pub fn direction(mut self, direction: FullNameDirection) -> Self {
        self.full_name_direction = direction;
        self
    }
}

impl fmt::Display for RankDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.rank_id)
    }
}

/// The ordered rank sequence shared by every node of one family.
///
/// Stateless apart from the definitions themselves: validation reports,
/// it never corrects. Deserialization goes through [`RankSchema::new`], so
/// every schema in memory is non-empty and strictly ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRankSchema")]
pub struct RankSchema {
    /// Stable definition id referenced by every node of the family
    pub definition_id: u32,
    ranks: Vec<RankDefinition>,
}

#[derive(Deserialize)]
struct RawRankSchema {
    definition_id: u32,
    #[serde(default)]
    ranks: Vec<RankDefinition>,
}

impl TryFrom<RawRankSchema> for RankSchema {
    type Error = TreeError;

    fn try_from(raw: RawRankSchema) -> TreeResult<Self> {
        Self::new(raw.definition_id, raw.ranks)
    }
}

impl RankSchema {
    /// Create a schema, rejecting duplicate or out-of-order rank ids.
    pub fn new(definition_id: u32, ranks: Vec<RankDefinition>) -> TreeResult<Self> {
        let schema = Self {
            definition_id,
            ranks,
        };
        schema.check()?;
        Ok(schema)
    }

    /// Non-empty and strictly increasing by rank id.
    pub fn check(&self) -> TreeResult<()> {
        if self.ranks.is_empty() {
            return Err(TreeError::InvalidSchema(format!(
                "definition {} has no ranks",
                self.definition_id
            )));
        }
        for pair in self.ranks.windows(2) {
            if pair[0].rank_id >= pair[1].rank_id {
                return Err(TreeError::InvalidSchema(format!(
                    "rank ids must be strictly increasing: {} then {}",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(())
    }

    pub fn ranks(&self) -> &[RankDefinition] {
        &self.ranks
    }

    pub fn get(&self, rank_id: u32) -> Option<&RankDefinition> {
        self.ranks
            .binary_search_by_key(&rank_id, |r| r.rank_id)
            .ok()
            .map(|i| &self.ranks[i])
    }

    pub fn require(&self, rank_id: u32) -> TreeResult<&RankDefinition> {
        self.get(rank_id).ok_or(TreeError::UnknownRank(rank_id))
    }

    /// The shallowest rank; the family root uses it.
    pub fn root_rank(&self) -> TreeResult<&RankDefinition> {
        self.ranks.first().ok_or_else(|| {
            TreeError::InvalidSchema(format!("definition {} has no ranks", self.definition_id))
        })
    }

    /// Check that `child_rank` may sit directly below `parent_rank`.
    ///
    /// The child must be strictly deeper, and every rank strictly between
    /// the two must be unenforced.
    #[instrument(level = "trace", skip(self))]
    pub fn validate_rank(&self, parent_rank: u32, child_rank: u32) -> TreeResult<()> {
        let parent = self.require(parent_rank)?;
        let child = self.require(child_rank)?;

        if child.rank_id <= parent.rank_id {
            return Err(TreeError::rank_violation(format!(
                "{} cannot be placed under {}: child rank must be deeper",
                child, parent
            )));
        }

        if let Some(skipped) = self
            .ranks
            .iter()
            .filter(|r| r.rank_id > parent.rank_id && r.rank_id < child.rank_id)
            .find(|r| r.is_enforced)
        {
            return Err(TreeError::rank_violation(format!(
                "{} cannot be placed under {}: enforced rank {} would be skipped",
                child, parent, skipped
            )));
        }

        Ok(())
    }

    /// Apply a rank's before/after text around a node name.
    pub fn compose_segment(rank: &RankDefinition, node_name: &str) -> String {
        format!("{}{}{}", rank.text_before, node_name, rank.text_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn taxon_ranks() -> RankSchema {
        RankSchema::new(
            1,
            vec![
                RankDefinition::new(0, "Life"),
                RankDefinition::new(10, "Kingdom").enforced(),
                RankDefinition::new(60, "Order"),
                RankDefinition::new(140, "Family").enforced(),
                RankDefinition::new(180, "Genus").enforced(),
                RankDefinition::new(190, "Subgenus"),
                RankDefinition::new(220, "Species").enforced(),
            ],
        )
        .expect("valid schema")
    }

    #[rstest]
    #[case(10, 60)]
    #[case(60, 140)]
    #[case(180, 220)]
    #[case(10, 140)]
    fn given_legal_ranks_when_validating_then_ok(
        taxon_ranks: RankSchema,
        #[case] parent: u32,
        #[case] child: u32,
    ) {
        assert!(taxon_ranks.validate_rank(parent, child).is_ok());
    }

    #[rstest]
    #[case(220, 180)]
    #[case(180, 180)]
    #[case(10, 180)]
    #[case(140, 220)]
    fn given_illegal_ranks_when_validating_then_rank_violation(
        taxon_ranks: RankSchema,
        #[case] parent: u32,
        #[case] child: u32,
    ) {
        let err = taxon_ranks.validate_rank(parent, child).unwrap_err();
        assert!(matches!(err, TreeError::RankViolation { .. }), "{err}");
    }

    #[rstest]
    fn given_unknown_rank_when_validating_then_unknown_rank(taxon_ranks: RankSchema) {
        assert_eq!(
            taxon_ranks.validate_rank(10, 999),
            Err(TreeError::UnknownRank(999))
        );
    }

    #[test]
    fn given_unordered_ranks_when_creating_schema_then_invalid() {
        let result = RankSchema::new(
            7,
            vec![RankDefinition::new(20, "B"), RankDefinition::new(10, "A")],
        );
        assert!(matches!(result, Err(TreeError::InvalidSchema(_))));
        assert!(matches!(
            RankSchema::new(7, vec![]),
            Err(TreeError::InvalidSchema(_))
        ));
    }

    #[rstest]
    #[case::empty("definition_id = 7\nranks = []\n", "has no ranks")]
    #[case::missing("definition_id = 7\n", "has no ranks")]
    #[case::unordered(
        "definition_id = 7\n[[ranks]]\nrank_id = 20\nname = \"B\"\n[[ranks]]\nrank_id = 10\nname = \"A\"\n",
        "strictly increasing"
    )]
    fn given_bad_schema_toml_when_deserializing_then_rejected(
        #[case] text: &str,
        #[case] expected: &str,
    ) {
        let err = toml::from_str::<RankSchema>(text).unwrap_err();
        assert!(err.to_string().contains(expected), "{err}");
    }

    #[rstest]
    fn given_schema_when_serialized_then_deserializes_to_same(taxon_ranks: RankSchema) {
        let text = toml::to_string(&taxon_ranks).unwrap();
        assert_eq!(toml::from_str::<RankSchema>(&text).unwrap(), taxon_ranks);
        assert_eq!(taxon_ranks.root_rank().unwrap().rank_id, 0);
    }

    #[test]
    fn given_wrapped_rank_when_composing_segment_then_text_surrounds_name() {
        let genus = RankDefinition::new(180, "Genus").wrapped("_", "_");
        assert_eq!(RankSchema::compose_segment(&genus, "Panthera"), "_Panthera_");
    }
}
