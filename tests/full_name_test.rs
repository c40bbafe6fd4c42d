//! Full-name composition across rank rules, directions and renames.

use rstest::{fixture, rstest};

use ranktree::config::Settings;
use ranktree::domain::{
    FullNameDirection, Geography, NodeId, RankDefinition, RankSchema, Storage, Taxon,
};
use ranktree::Tree;

struct Panthera {
    tree: Tree<Taxon>,
    animalia: NodeId,
    panthera: NodeId,
    leo: NodeId,
    persica: NodeId,
}

fn italic(rank_id: u32, name: &str) -> RankDefinition {
    RankDefinition::new(rank_id, name)
        .wrapped("_", "_")
        .separator(" ")
}

/// Animalia -> Panthera -> leo -> persica, every full name cached.
#[fixture]
fn panthera() -> Panthera {
    let schema = RankSchema::new(
        7,
        vec![
            RankDefinition::new(10, "Kingdom").hidden(),
            italic(180, "Genus"),
            italic(220, "Species"),
            italic(230, "Subspecies"),
        ],
    )
    .unwrap();
    let mut tree = Tree::<Taxon>::with_settings(schema, &Settings::default());
    let animalia = tree.create_root(10, "Animalia").unwrap();
    let panthera = tree.create_child(animalia, 180, "Panthera").unwrap();
    let leo = tree.create_child(panthera, 220, "leo").unwrap();
    let persica = tree.create_child(leo, 230, "persica").unwrap();
    tree.refresh_full_names().unwrap();
    Panthera {
        tree,
        animalia,
        panthera,
        leo,
        persica,
    }
}

fn cached(tree: &Tree<Taxon>, id: NodeId) -> Option<String> {
    tree.get(id).unwrap().full_name.clone()
}

#[rstest]
fn given_four_level_chain_when_composing_then_wrapped_segments_joined(panthera: Panthera) {
    let t = &panthera.tree;
    assert_eq!(t.full_name(panthera.persica).unwrap(), "_Panthera_ _leo_ _persica_");
    assert_eq!(t.full_name(panthera.leo).unwrap(), "_Panthera_ _leo_");
    assert_eq!(t.full_name(panthera.panthera).unwrap(), "_Panthera_");
    // a hidden rank still names its own node
    assert_eq!(t.full_name(panthera.animalia).unwrap(), "Animalia");
}

#[test]
fn given_kingdom_without_wrapper_text_when_composing_then_kingdom_leads_chain() {
    let schema = RankSchema::new(
        7,
        vec![
            RankDefinition::new(10, "Kingdom"),
            italic(180, "Genus"),
            italic(220, "Species"),
            italic(230, "Subspecies"),
        ],
    )
    .unwrap();
    let mut tree = Tree::<Taxon>::with_settings(schema, &Settings::default());
    let animalia = tree.create_root(10, "Animalia").unwrap();
    let panthera = tree.create_child(animalia, 180, "Panthera").unwrap();
    let leo = tree.create_child(panthera, 220, "leo").unwrap();
    let persica = tree.create_child(leo, 230, "persica").unwrap();

    assert_eq!(tree.full_name(persica).unwrap(), "Animalia _Panthera_ _leo_ _persica_");
    assert_eq!(tree.full_name(panthera).unwrap(), "Animalia _Panthera_");
}

#[rstest]
fn given_rename_when_refreshing_then_only_node_and_descendants_change(mut panthera: Panthera) {
    // Arrange
    let animalia_before = cached(&panthera.tree, panthera.animalia);
    let genus_before = cached(&panthera.tree, panthera.panthera);

    // Act
    panthera.tree.rename(panthera.leo, "leo2").unwrap();

    // Assert: exactly two caches went stale
    let t = &panthera.tree;
    assert!(!t.get(panthera.animalia).unwrap().full_name_stale);
    assert!(!t.get(panthera.panthera).unwrap().full_name_stale);
    assert!(t.get(panthera.leo).unwrap().full_name_stale);
    assert!(t.get(panthera.persica).unwrap().full_name_stale);

    let refreshed = panthera.tree.refresh_full_names().unwrap();
    assert_eq!(refreshed, 2);
    let t = &panthera.tree;
    assert_eq!(cached(t, panthera.animalia), animalia_before);
    assert_eq!(cached(t, panthera.panthera), genus_before);
    assert_eq!(cached(t, panthera.leo).as_deref(), Some("_Panthera_ _leo2_"));
    assert_eq!(
        cached(t, panthera.persica).as_deref(),
        Some("_Panthera_ _leo2_ _persica_")
    );
}

#[rstest]
fn given_stale_cache_when_reading_full_name_then_composed_fresh(mut panthera: Panthera) {
    panthera.tree.rename(panthera.panthera, "Felis").unwrap();
    assert_eq!(
        panthera.tree.full_name(panthera.persica).unwrap(),
        "_Felis_ _leo_ _persica_"
    );
    // reading does not write the cache
    assert_eq!(
        cached(&panthera.tree, panthera.persica).as_deref(),
        Some("_Panthera_ _leo_ _persica_")
    );
}

#[rstest]
fn given_move_when_refreshing_then_moved_subtree_renamed(mut panthera: Panthera) {
    let felis = panthera
        .tree
        .create_child(panthera.animalia, 180, "Felis")
        .unwrap();
    panthera.tree.move_subtree(panthera.leo, felis).unwrap();
    panthera.tree.refresh_full_names().unwrap();

    assert_eq!(
        cached(&panthera.tree, panthera.persica).as_deref(),
        Some("_Felis_ _leo_ _persica_")
    );
}

#[test]
fn given_geography_when_composing_then_leaf_first_with_child_separators() {
    let mut tree = Tree::<Geography>::with_default_ranks(1, &Settings::default()).unwrap();
    let earth = tree.create_root(0, "Earth").unwrap();
    let na = tree.create_child(earth, 100, "North America").unwrap();
    let usa = tree.create_child(na, 200, "USA").unwrap();
    let kansas = tree.create_child(usa, 300, "Kansas").unwrap();

    assert_eq!(tree.full_name(kansas).unwrap(), "Kansas, USA, North America");
}

#[test]
fn given_mixed_separators_when_composing_root_to_leaf_then_child_side_separator_used() {
    let schema = RankSchema::new(
        1,
        vec![
            RankDefinition::new(0, "Site").hidden(),
            RankDefinition::new(10, "Building").separator(" | "),
            RankDefinition::new(20, "Room").separator(" / "),
            RankDefinition::new(30, "Shelf")
                .separator(" # ")
                .direction(FullNameDirection::LeafToRoot),
        ],
    )
    .unwrap();
    let mut tree = Tree::<Storage>::with_settings(schema, &Settings::default());
    let site = tree.create_root(0, "Site").unwrap();
    let building = tree.create_child(site, 10, "B").unwrap();
    let room = tree.create_child(building, 20, "R").unwrap();
    let shelf = tree.create_child(room, 30, "S").unwrap();

    assert_eq!(tree.full_name(room).unwrap(), "B / R");
    // direction comes from the composed node's own rank
    assert_eq!(tree.full_name(shelf).unwrap(), "S # R / B");
}
