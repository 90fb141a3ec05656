//! Claim, release and bulk release of profile entries

use crate::validate::require_param;
use crate::PoolError;
use chrono::{DateTime, SubsecRound, Utc};
use profilepool_domain::{EntryFilter, EntryId, EntryStore, EntryUpdate, LockState, ProfileEntry};
use std::sync::Arc;

/// Lease manager owning the lock semantics of profile entries
///
/// Touches only `locked`, `locked_dt`, `use_cnt` and `error_cnt`; `meta` is
/// opaque here.
pub struct LeaseManager<S> {
    store: Arc<S>,
}

impl<S> Clone for LeaseManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> LeaseManager<S>
where
    S: EntryStore,
    S::Error: std::fmt::Display,
{
    /// Create a lease manager over a shared store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Claim the next unlocked entry of a profile
    ///
    /// Returns the entry as it is after locking. Which eligible entry is
    /// picked is up to the store.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Validation`] if `profile` is blank
    /// - [`PoolError::NotFound`] if the profile has no unlocked entry
    pub fn claim_next(&self, profile: &str) -> Result<ProfileEntry, PoolError> {
        self.claim_next_at(profile, Utc::now())
    }

    /// Claim the next unlocked entry, stamping the lock with `now`
    pub fn claim_next_at(
        &self,
        profile: &str,
        now: DateTime<Utc>,
    ) -> Result<ProfileEntry, PoolError> {
        let profile = require_param("name", profile)?;

        let filter = EntryFilter::by_name(profile).locked(false);
        let update = EntryUpdate::lock(LockState::Locked {
            at: now.trunc_subsecs(3),
        });

        let entry = self
            .store
            .find_one_and_update(&filter, &update)
            .map_err(|e| PoolError::Store(e.to_string()))?
            .ok_or(PoolError::NotFound)?;

        tracing::debug!("Claimed entry {} from profile {}", entry.id, profile);
        Ok(entry)
    }

    /// Release an entry back into its pool
    ///
    /// Always increments `use_cnt`; also increments `error_cnt` when
    /// `mark_error` is set. Releasing an entry that is not locked still
    /// counts as a use.
    ///
    /// # Errors
    ///
    /// [`PoolError::NotFound`] if no entry has this id.
    pub fn release(&self, id: EntryId, mark_error: bool) -> Result<ProfileEntry, PoolError> {
        let update = EntryUpdate {
            lock: Some(LockState::Unlocked),
            increment_use: true,
            increment_error: mark_error,
            meta: None,
        };

        let entry = self
            .store
            .find_one_and_update(&EntryFilter::by_id(id), &update)
            .map_err(|e| PoolError::Store(e.to_string()))?
            .ok_or(PoolError::NotFound)?;

        tracing::debug!("Released entry {} (error: {})", id, mark_error);
        Ok(entry)
    }

    /// Unlock every locked entry of a profile without touching counters
    ///
    /// Returns the number of entries unlocked; zero is not an error.
    pub fn release_all(&self, profile: &str) -> Result<usize, PoolError> {
        let profile = require_param("name", profile)?;

        let released = self
            .store
            .update_many(&EntryFilter::by_name(profile).locked(true), &EntryUpdate::unlock())
            .map_err(|e| PoolError::Store(e.to_string()))?;

        tracing::debug!("Released {} entries of profile {}", released, profile);
        Ok(released)
    }
}
