//! Profile Pool Lease Manager
//!
//! Lease lifecycle of profile entries plus the thin CRUD layer on top of an
//! [`EntryStore`](profilepool_domain::EntryStore).
//!
//! # Lease lifecycle
//!
//! | Operation | Store primitive | Effect |
//! |-----------|-----------------|--------|
//! | `claim_next` | find-one-and-update | one unlocked entry of the profile becomes locked at `now` |
//! | `release` | find-one-and-update by id | unlocked, `use_cnt + 1`, `error_cnt + 1` if flagged |
//! | `release_all` | update-many | every locked entry of the profile unlocked, counters untouched |
//!
//! Each operation is a single store call, so claims stay exclusive without
//! any lock held in this process.
//!
//! # Examples
//!
//! ```no_run
//! use profilepool_lease::LeaseManager;
//! use profilepool_store::SqliteStore;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::new("profilepool.db")?);
//! let leases = LeaseManager::new(store);
//!
//! let entry = leases.claim_next("accounts")?;
//! // ... use entry.meta ...
//! leases.release(entry.id, false)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod catalog;
mod error;
mod lease;
mod validate;

pub use catalog::{PoolStats, ProfileCatalog};
pub use error::PoolError;
pub use lease::LeaseManager;
pub use validate::{parse_entry_id, require_param};
