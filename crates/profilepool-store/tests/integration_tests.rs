//! Integration tests for profilepool-store
//!
//! These tests verify the full CRUD cycle and the atomic update primitives.

use chrono::{Duration, SubsecRound, Utc};
use profilepool_domain::{EntryFilter, EntryStore, EntryUpdate, LockState, Meta, NewEntry};
use profilepool_store::SqliteStore;
use serde_json::json;

fn meta(value: serde_json::Value) -> Meta {
    value.as_object().cloned().unwrap()
}

fn credentials(user: &str) -> Meta {
    meta(json!({"username": user, "password": "secret"}))
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_insert_and_find_by_id() {
    let store = SqliteStore::in_memory().unwrap();

    let inserted = store
        .insert(vec![NewEntry::new("p1", credentials("alice"))])
        .unwrap();
    assert_eq!(inserted.len(), 1);

    let entry = &inserted[0];
    assert_eq!(entry.name, "p1");
    assert!(!entry.locked);
    assert!(entry.locked_at.is_none());
    assert_eq!(entry.use_count, 0);
    assert_eq!(entry.error_count, 0);
    assert!(!entry.disabled);

    let found = store.find_one(&EntryFilter::by_id(entry.id)).unwrap();
    assert_eq!(found.as_ref(), Some(entry));
}

#[test]
fn test_bulk_insert_assigns_distinct_ids() {
    let store = SqliteStore::in_memory().unwrap();

    let inserted = store
        .insert(vec![
            NewEntry::new("p1", credentials("alice")),
            NewEntry::new("p1", credentials("bob")),
        ])
        .unwrap();

    assert_eq!(inserted.len(), 2);
    assert_ne!(inserted[0].id, inserted[1].id);
    assert_eq!(store.count(&EntryFilter::by_name("p1")).unwrap(), 2);
}

#[test]
fn test_find_preserves_insertion_order_and_meta_order() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .insert(vec![
            NewEntry::new("p1", meta(json!({"z": 1, "a": 2}))),
            NewEntry::new("p1", meta(json!({"m": 3}))),
        ])
        .unwrap();

    let entries = store.find(&EntryFilter::all()).unwrap();
    assert_eq!(entries.len(), 2);

    let keys: Vec<&str> = entries[0].meta.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z", "a"]);
    assert_eq!(entries[1].meta["m"], 3);
}

#[test]
fn test_find_by_meta_field() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .insert(vec![
            NewEntry::new("p1", credentials("alice")),
            NewEntry::new("p2", credentials("bob")),
        ])
        .unwrap();

    let found = store
        .find(&EntryFilter::all().meta_eq("username", "bob"))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "p2");

    let missing = store
        .find(&EntryFilter::all().meta_eq("nokey", "bob"))
        .unwrap();
    assert!(missing.is_empty());
}

#[test]
fn test_meta_filter_compares_strings_only() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .insert(vec![
            NewEntry::new("p1", meta(json!({"n": 1}))),
            NewEntry::new("p1", meta(json!({"n": "1"}))),
        ])
        .unwrap();

    let found = store.find(&EntryFilter::all().meta_eq("n", "1")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].meta["n"], "1");
}

#[test]
fn test_find_one_and_update_returns_post_update_state() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .insert(vec![NewEntry::new("p1", credentials("alice"))])
        .unwrap();

    let state = LockState::locked_now();
    let claimed = store
        .find_one_and_update(
            &EntryFilter::by_name("p1").locked(false),
            &EntryUpdate::lock(state),
        )
        .unwrap()
        .expect("one unlocked entry");

    assert!(claimed.locked);
    assert_eq!(claimed.locked_at, state.locked_at());

    // Nothing left to claim
    let none = store
        .find_one_and_update(
            &EntryFilter::by_name("p1").locked(false),
            &EntryUpdate::lock(LockState::locked_now()),
        )
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn test_find_one_and_update_counters_and_meta() {
    let store = SqliteStore::in_memory().unwrap();
    let id = store
        .insert(vec![NewEntry::new("p1", credentials("alice"))])
        .unwrap()[0]
        .id;

    let update = EntryUpdate {
        lock: Some(LockState::Unlocked),
        increment_use: true,
        increment_error: true,
        meta: Some(meta(json!({"token": "t"}))),
    };
    let updated = store
        .find_one_and_update(&EntryFilter::by_id(id), &update)
        .unwrap()
        .unwrap();

    assert_eq!(updated.use_count, 1);
    assert_eq!(updated.error_count, 1);
    assert_eq!(updated.meta, meta(json!({"token": "t"})));
    assert!(!updated.locked);
}

#[test]
fn test_update_many_counts_affected_entries() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .insert(vec![
            NewEntry::new("p1", credentials("a")),
            NewEntry::new("p1", credentials("b")),
            NewEntry::new("p2", credentials("c")),
        ])
        .unwrap();

    let locked = store
        .update_many(&EntryFilter::all(), &EntryUpdate::lock(LockState::locked_now()))
        .unwrap();
    assert_eq!(locked, 3);

    let released = store
        .update_many(&EntryFilter::by_name("p1").locked(true), &EntryUpdate::unlock())
        .unwrap();
    assert_eq!(released, 2);

    assert_eq!(store.count(&EntryFilter::all().locked(true)).unwrap(), 1);
}

#[test]
fn test_locked_before_is_strict() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .insert(vec![
            NewEntry::new("p1", credentials("old")),
            NewEntry::new("p1", credentials("new")),
        ])
        .unwrap();

    let now = Utc::now().trunc_subsecs(3);
    let old = now - Duration::minutes(20);

    store
        .update_many(
            &EntryFilter::all().meta_eq("username", "old"),
            &EntryUpdate::lock(LockState::Locked { at: old }),
        )
        .unwrap();
    store
        .update_many(
            &EntryFilter::all().meta_eq("username", "new"),
            &EntryUpdate::lock(LockState::Locked { at: now }),
        )
        .unwrap();

    let stale = store
        .find(&EntryFilter::all().locked(true).locked_before(now))
        .unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].meta["username"], "old");
    assert_eq!(stale[0].locked_at, Some(old));
}

#[test]
fn test_delete_one_returns_removed_entry() {
    let store = SqliteStore::in_memory().unwrap();
    let id = store
        .insert(vec![NewEntry::new("p1", credentials("alice"))])
        .unwrap()[0]
        .id;

    let removed = store.delete_one(&EntryFilter::by_id(id)).unwrap();
    assert_eq!(removed.map(|e| e.id), Some(id));

    assert!(store.delete_one(&EntryFilter::by_id(id)).unwrap().is_none());
    assert!(store.find_one(&EntryFilter::by_id(id)).unwrap().is_none());
}

#[test]
fn test_delete_many_scoped_by_name() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .insert(vec![
            NewEntry::new("p1", credentials("a")),
            NewEntry::new("p1", credentials("b")),
            NewEntry::new("p2", credentials("c")),
        ])
        .unwrap();

    assert_eq!(store.delete_many(&EntryFilter::by_name("p1")).unwrap(), 2);
    assert_eq!(store.delete_many(&EntryFilter::by_name("p1")).unwrap(), 0);
    assert_eq!(store.count(&EntryFilter::all()).unwrap(), 1);
}

#[test]
fn test_file_backed_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pool.db");

    let id = {
        let store = SqliteStore::new(&path).unwrap();
        store
            .insert(vec![NewEntry::new("p1", credentials("alice"))])
            .unwrap()[0]
            .id
    };

    let reopened = SqliteStore::new(&path).unwrap();
    let entry = reopened.find_one(&EntryFilter::by_id(id)).unwrap().unwrap();
    assert_eq!(entry.meta["username"], "alice");
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: any meta key, including quotes and path syntax, filters exactly
        #[test]
        fn test_meta_filter_any_key(key in "\\PC{1,16}", value in "\\PC{0,16}") {
            let store = SqliteStore::in_memory().unwrap();
            let mut m = Meta::new();
            m.insert(key.clone(), json!(value.clone()));
            store.insert(vec![
                NewEntry::new("p1", m),
                NewEntry::new("p1", Meta::new()),
            ]).unwrap();

            let found = store.find(&EntryFilter::all().meta_eq(key.clone(), value.clone())).unwrap();
            prop_assert_eq!(found.len(), 1);
            prop_assert_eq!(&found[0].meta[&key], &json!(value));
        }
    }
}
