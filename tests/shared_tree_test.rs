//! Family-scoped locking: writers serialize per family, readers never see a
//! half-renumbered family, and families do not block each other.

use std::thread;

use ranktree::application::Collection;
use ranktree::config::Settings;
use ranktree::domain::{Geography, Storage};
use ranktree::util::testing::init_test_setup;
use ranktree::{SharedTree, Tree};

#[test]
fn given_concurrent_writers_and_readers_when_inserting_then_every_read_is_consistent() {
    // Arrange
    init_test_setup();
    let mut tree = Tree::<Storage>::with_default_ranks(4, &Settings::default()).unwrap();
    let root = tree.create_root(0, "Museum").unwrap();
    let shared = SharedTree::new(tree);

    // Act
    thread::scope(|s| {
        for w in 0..4 {
            let shared = shared.clone();
            s.spawn(move || {
                for i in 0..25 {
                    let building = shared
                        .create_child(root, 100, &format!("B{w}-{i}"))
                        .unwrap();
                    shared.create_child(building, 200, "Room").unwrap();
                }
            });
        }
        for _ in 0..4 {
            let shared = shared.clone();
            s.spawn(move || {
                for _ in 0..50 {
                    let guard = shared.read();
                    guard.verify().unwrap();
                    let below = guard.descendants_of(root).unwrap().len();
                    assert_eq!(below + 1, guard.len());
                }
            });
        }
    });

    // Assert
    let guard = shared.read();
    assert_eq!(guard.len(), 1 + 4 * 25 * 2);
    let root_node = guard.get(root).unwrap();
    assert_eq!(root_node.interval.width() as usize, guard.len());
    guard.verify().unwrap();
}

#[test]
fn given_two_families_when_mutated_in_parallel_then_both_complete() {
    let settings = Settings::default();
    let collection = Collection::new(&settings).unwrap();
    let storage_root = collection.storage.write().create_root(0, "Museum").unwrap();
    let geo_root = collection.geography.write().create_root(0, "Earth").unwrap();

    thread::scope(|s| {
        let storage = &collection.storage;
        let geography = &collection.geography;
        s.spawn(move || {
            for i in 0..50 {
                storage.create_child(storage_root, 100, &format!("B{i}")).unwrap();
            }
        });
        s.spawn(move || {
            for i in 0..50 {
                geography.create_child(geo_root, 100, &format!("C{i}")).unwrap();
            }
        });
    });

    assert_eq!(collection.storage.read().len(), 51);
    assert_eq!(collection.geography.read().len(), 51);
    assert!(collection.verify_all().iter().all(|r| r.result.is_ok()));
}

#[test]
fn given_shared_handle_when_querying_then_convenience_reads_match_tree() {
    let mut tree = Tree::<Geography>::with_default_ranks(1, &Settings::default()).unwrap();
    let earth = tree.create_root(0, "Earth").unwrap();
    let shared = SharedTree::new(tree);
    let europe = shared.create_child(earth, 100, "Europe").unwrap();
    let france = shared.create_child(europe, 200, "France").unwrap();
    let gaul = shared.create_child(europe, 200, "Gaul").unwrap();
    shared.mark_synonym(gaul, france).unwrap();

    assert_eq!(shared.full_name(france).unwrap(), "France, Europe");
    assert_eq!(shared.resolve(gaul), Ok(france));
    assert_eq!(shared.descendants_of(europe), Ok(vec![france, gaul]));
    assert_eq!(shared.is_descendant_of(france, earth), Ok(true));

    shared.move_subtree(gaul, earth).unwrap_err();
    shared.delete_leaf(france).unwrap_err();
}
