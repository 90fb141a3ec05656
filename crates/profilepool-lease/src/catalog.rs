//! Listing, lookup, insert, update and delete of profile entries
//!
//! No lock semantics here: each call is a plain store operation.

use crate::validate::require_param;
use crate::PoolError;
use profilepool_domain::{
    EntryFilter, EntryId, EntryStore, EntryUpdate, Meta, NewEntry, ProfileEntry,
};
use std::sync::Arc;

/// Entry counts reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Entries across all profiles
    pub entries: usize,
    /// Entries currently checked out
    pub locked: usize,
}

/// CRUD access to profile entries
pub struct ProfileCatalog<S> {
    store: Arc<S>,
}

impl<S> Clone for ProfileCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> ProfileCatalog<S>
where
    S: EntryStore,
    S::Error: std::fmt::Display,
{
    /// Create a catalog over a shared store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// List entries matching `filter`; an empty filter lists everything
    pub fn list(&self, filter: &EntryFilter) -> Result<Vec<ProfileEntry>, PoolError> {
        self.store
            .find(filter)
            .map_err(|e| PoolError::Store(e.to_string()))
    }

    /// First entry whose `meta.<key>` equals `value`
    pub fn find_by_meta(&self, key: &str, value: &str) -> Result<ProfileEntry, PoolError> {
        let key = require_param("key", key)?;
        let value = require_param("value", value)?;

        self.store
            .find_one(&EntryFilter::all().meta_eq(key, value))
            .map_err(|e| PoolError::Store(e.to_string()))?
            .ok_or(PoolError::NotFound)
    }

    /// Entry by id
    pub fn get(&self, id: EntryId) -> Result<ProfileEntry, PoolError> {
        self.store
            .find_one(&EntryFilter::by_id(id))
            .map_err(|e| PoolError::Store(e.to_string()))?
            .ok_or(PoolError::NotFound)
    }

    /// All entries of one profile
    pub fn list_profile(&self, profile: &str) -> Result<Vec<ProfileEntry>, PoolError> {
        let profile = require_param("name", profile)?;
        self.list(&EntryFilter::by_name(profile))
    }

    /// Insert entries into a profile, unlocked with zero counters
    ///
    /// All entries are inserted or none are.
    pub fn add(&self, profile: &str, metas: Vec<Meta>) -> Result<Vec<ProfileEntry>, PoolError> {
        let profile = require_param("name", profile)?;

        let entries = metas
            .into_iter()
            .map(|meta| NewEntry::new(profile, meta))
            .collect();

        let inserted = self
            .store
            .insert(entries)
            .map_err(|e| PoolError::Store(e.to_string()))?;

        tracing::debug!("Added {} entries to profile {}", inserted.len(), profile);
        Ok(inserted)
    }

    /// Replace an entry's `meta` wholesale; lock state and counters are kept
    pub fn replace_meta(&self, id: EntryId, meta: Meta) -> Result<ProfileEntry, PoolError> {
        self.store
            .find_one_and_update(&EntryFilter::by_id(id), &EntryUpdate::replace_meta(meta))
            .map_err(|e| PoolError::Store(e.to_string()))?
            .ok_or(PoolError::NotFound)
    }

    /// Delete one entry, returning it
    pub fn delete(&self, id: EntryId) -> Result<ProfileEntry, PoolError> {
        self.store
            .delete_one(&EntryFilter::by_id(id))
            .map_err(|e| PoolError::Store(e.to_string()))?
            .ok_or(PoolError::NotFound)
    }

    /// Delete every entry of a profile; returns the number removed
    pub fn delete_profile(&self, profile: &str) -> Result<usize, PoolError> {
        let profile = require_param("name", profile)?;

        let removed = self
            .store
            .delete_many(&EntryFilter::by_name(profile))
            .map_err(|e| PoolError::Store(e.to_string()))?;

        tracing::info!("Deleted {} entries of profile {}", removed, profile);
        Ok(removed)
    }

    /// Total and locked entry counts
    pub fn stats(&self) -> Result<PoolStats, PoolError> {
        let entries = self
            .store
            .count(&EntryFilter::all())
            .map_err(|e| PoolError::Store(e.to_string()))?;
        let locked = self
            .store
            .count(&EntryFilter::all().locked(true))
            .map_err(|e| PoolError::Store(e.to_string()))?;

        Ok(PoolStats { entries, locked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LeaseManager;
    use profilepool_store::SqliteStore;
    use serde_json::json;

    fn meta(value: serde_json::Value) -> Meta {
        value.as_object().cloned().unwrap()
    }

    fn catalog() -> ProfileCatalog<SqliteStore> {
        ProfileCatalog::new(Arc::new(SqliteStore::in_memory().unwrap()))
    }

    #[test]
    fn test_add_and_get() {
        let catalog = catalog();
        let added = catalog
            .add("p1", vec![meta(json!({"username": "u", "password": "p"}))])
            .unwrap();

        let entry = catalog.get(added[0].id).unwrap();
        assert_eq!(entry.name, "p1");
        assert!(!entry.locked);
        assert_eq!(entry.meta["username"], "u");
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        assert_eq!(catalog().get(EntryId::new()), Err(PoolError::NotFound));
    }

    #[test]
    fn test_find_by_meta() {
        let catalog = catalog();
        catalog
            .add("p1", vec![meta(json!({"username": "a"})), meta(json!({"username": "b"}))])
            .unwrap();

        assert_eq!(catalog.find_by_meta("username", "b").unwrap().meta["username"], "b");
        assert_eq!(catalog.find_by_meta("username", "zz"), Err(PoolError::NotFound));
        assert_eq!(catalog.find_by_meta("nokey", "a"), Err(PoolError::NotFound));
    }

    #[test]
    fn test_list_profile_empty_is_ok() {
        assert!(catalog().list_profile("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_replace_meta_keeps_lock_state() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let catalog = ProfileCatalog::new(Arc::clone(&store));
        let leases = LeaseManager::new(store);

        catalog.add("p1", vec![meta(json!({"username": "u"}))]).unwrap();
        let claimed = leases.claim_next("p1").unwrap();

        let updated = catalog
            .replace_meta(claimed.id, meta(json!({"token": "t"})))
            .unwrap();
        assert_eq!(updated.meta, meta(json!({"token": "t"})));
        assert!(updated.locked);
        assert_eq!(updated.locked_at, claimed.locked_at);

        assert_eq!(
            catalog.replace_meta(EntryId::new(), Meta::new()),
            Err(PoolError::NotFound)
        );
    }

    #[test]
    fn test_delete_and_delete_profile() {
        let catalog = catalog();
        let added = catalog
            .add("p1", vec![meta(json!({"n": "1"})), meta(json!({"n": "2"}))])
            .unwrap();
        catalog.add("p2", vec![meta(json!({"n": "3"}))]).unwrap();

        let removed = catalog.delete(added[0].id).unwrap();
        assert_eq!(removed.id, added[0].id);
        assert_eq!(catalog.delete(added[0].id), Err(PoolError::NotFound));

        assert_eq!(catalog.delete_profile("p1").unwrap(), 1);
        assert_eq!(catalog.list(&EntryFilter::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let catalog = ProfileCatalog::new(Arc::clone(&store));
        let leases = LeaseManager::new(store);

        catalog
            .add("p1", vec![meta(json!({"n": "1"})), meta(json!({"n": "2"}))])
            .unwrap();
        leases.claim_next("p1").unwrap();

        assert_eq!(catalog.stats().unwrap(), PoolStats { entries: 2, locked: 1 });
    }
}
