//! Store query types: which entries to match and how to mutate them

use crate::{EntryId, Meta};
use chrono::{DateTime, SubsecRound, Utc};

/// Criteria for matching profile entries
///
/// All set criteria must hold. An empty filter matches every entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    /// Match a single entry by id
    pub id: Option<EntryId>,

    /// Match entries of one profile
    pub name: Option<String>,

    /// Match on the lock flag
    pub locked: Option<bool>,

    /// Match entries whose lock was taken strictly before this instant
    pub locked_before: Option<DateTime<Utc>>,

    /// Equality on top-level `meta` fields, compared as strings
    pub meta: Vec<(String, String)>,
}

impl EntryFilter {
    /// Filter matching every entry
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching one entry by id
    pub fn by_id(id: EntryId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    /// Filter matching all entries of a profile
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Restrict to entries with the given lock flag
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    /// Restrict to entries locked strictly before `cutoff`
    pub fn locked_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.locked_before = Some(cutoff);
        self
    }

    /// Add a `meta.<key> == value` condition
    pub fn meta_eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.push((key.into(), value.into()));
        self
    }

    /// True when no criteria are set
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.name.is_none()
            && self.locked.is_none()
            && self.locked_before.is_none()
            && self.meta.is_empty()
    }
}

/// Lock transition applied by an update
///
/// The only way the lock flag and lock timestamp change, so they always move
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Checked out at the given instant
    Locked {
        /// When the lock was taken
        at: DateTime<Utc>,
    },
    /// Back in the pool
    Unlocked,
}

impl LockState {
    /// Lock at the current instant, truncated to the store's millisecond precision
    pub fn locked_now() -> Self {
        LockState::Locked {
            at: Utc::now().trunc_subsecs(3),
        }
    }

    /// Lock flag for this state
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. })
    }

    /// Lock timestamp for this state
    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        match self {
            LockState::Locked { at } => Some(*at),
            LockState::Unlocked => None,
        }
    }
}

/// Mutation applied to matched entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    /// New lock state, if changing
    pub lock: Option<LockState>,

    /// Increment `use_cnt` by one
    pub increment_use: bool,

    /// Increment `error_cnt` by one
    pub increment_error: bool,

    /// Replace `meta` wholesale
    pub meta: Option<Meta>,
}

impl EntryUpdate {
    /// Set the lock state
    pub fn lock(state: LockState) -> Self {
        Self {
            lock: Some(state),
            ..Default::default()
        }
    }

    /// Clear the lock without touching counters
    pub fn unlock() -> Self {
        Self::lock(LockState::Unlocked)
    }

    /// Replace the payload
    pub fn replace_meta(meta: Meta) -> Self {
        Self {
            meta: Some(meta),
            ..Default::default()
        }
    }

    /// True when the update changes nothing
    pub fn is_noop(&self) -> bool {
        self.lock.is_none() && !self.increment_use && !self.increment_error && self.meta.is_none()
    }
}
