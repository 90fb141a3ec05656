//! Trait definitions for external interactions
//!
//! These traits define the boundary between pool logic and storage.
//! Implementations live in other crates.

use crate::{EntryFilter, EntryUpdate, NewEntry, ProfileEntry};

/// Document store holding profile entries
///
/// Implemented by the infrastructure layer (profilepool-store).
///
/// Every method is one atomic store operation. Mutual exclusion of claims
/// rests on [`EntryStore::find_one_and_update`] matching and mutating in a
/// single step, so no other caller can observe the matched entry in between.
pub trait EntryStore {
    /// Error type for store operations
    type Error;

    /// Insert entries unlocked with zero counters; all or nothing
    fn insert(&self, entries: Vec<NewEntry>) -> Result<Vec<ProfileEntry>, Self::Error>;

    /// Find all matching entries in insertion order
    fn find(&self, filter: &EntryFilter) -> Result<Vec<ProfileEntry>, Self::Error>;

    /// Find the first matching entry
    fn find_one(&self, filter: &EntryFilter) -> Result<Option<ProfileEntry>, Self::Error>;

    /// Atomically pick one matching entry, apply `update` and return its
    /// post-update state
    fn find_one_and_update(
        &self,
        filter: &EntryFilter,
        update: &EntryUpdate,
    ) -> Result<Option<ProfileEntry>, Self::Error>;

    /// Atomically apply `update` to every matching entry; returns the number affected
    fn update_many(&self, filter: &EntryFilter, update: &EntryUpdate) -> Result<usize, Self::Error>;

    /// Remove the first matching entry and return it
    fn delete_one(&self, filter: &EntryFilter) -> Result<Option<ProfileEntry>, Self::Error>;

    /// Remove every matching entry; returns the number removed
    fn delete_many(&self, filter: &EntryFilter) -> Result<usize, Self::Error>;

    /// Count matching entries
    fn count(&self, filter: &EntryFilter) -> Result<usize, Self::Error>;
}
