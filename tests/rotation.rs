mod common;

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::fs;

use common::pool;
use factreels::facts::load_pool;
use factreels::used::{JsonUsedStore, UsedStore};
use factreels::{ContentRotator, RotatorError};
use tempfile::TempDir;

fn rotator(store: &JsonUsedStore, n: i64, seed: u64) -> ContentRotator {
    ContentRotator::load(pool(n), Box::new(store.clone()), StdRng::seed_from_u64(seed)).unwrap()
}

#[test]
fn used_set_survives_a_restart() {
    let temp = TempDir::new().unwrap();
    let store = JsonUsedStore::new(temp.path().join("used.json"));

    let mut first = rotator(&store, 6, 1);
    let mut seen = HashSet::new();
    for _ in 0..3 {
        seen.insert(first.next().unwrap().id);
    }
    assert_eq!(&store.load(), first.used_ids());
    drop(first);

    let mut second = rotator(&store, 6, 2);
    assert_eq!(second.remaining(), 3);
    for _ in 0..3 {
        assert!(seen.insert(second.next().unwrap().id));
    }
    assert_eq!(seen.len(), 6);
}

#[test]
fn next_after_full_cycle_resets_on_disk_too() {
    let temp = TempDir::new().unwrap();
    let store = JsonUsedStore::new(temp.path().join("used.json"));
    let mut rotator = rotator(&store, 2, 3);
    rotator.next().unwrap();
    rotator.next().unwrap();
    let third = rotator.next().unwrap();
    assert_eq!(store.load(), HashSet::from([third.id]));
}

#[test]
fn empty_pool_file_cannot_be_rotated() {
    let temp = TempDir::new().unwrap();
    let facts = temp.path().join("facts.json");
    fs::write(&facts, r#"{"facts": []}"#).unwrap();

    let pool = load_pool(&facts).unwrap();
    let result = ContentRotator::load(
        pool,
        Box::new(JsonUsedStore::new(temp.path().join("used.json"))),
        StdRng::seed_from_u64(0),
    );
    assert!(matches!(result, Err(RotatorError::PoolEmpty)));
}

#[test]
fn missing_pool_file_is_load_error() {
    let temp = TempDir::new().unwrap();
    let err = load_pool(temp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, RotatorError::PoolLoad { .. }));
}
