//! Profile Pool Domain Layer
//!
//! Core types and trait interfaces for the profile pool: a store of named
//! collections of opaque records that are leased to one consumer at a time.
//!
//! ## Key Concepts
//!
//! - **Profile**: a named group of entries sharing a `name`
//! - **Profile entry**: one leasable record with lock state, usage counters
//!   and opaque metadata
//! - **Claim**: atomically marking an entry locked and handing it out
//! - **Release**: unlocking an entry and recording the usage/error outcome
//! - **Sweep**: forced unlock of entries whose lock outlived a timeout
//!
//! ## Architecture
//!
//! - Pure types and trait definitions only
//! - Storage implementations live in `profilepool-store`
//! - Lease semantics live in `profilepool-lease`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod query;
pub mod traits;

// Re-exports for convenience
pub use entry::{EntryId, Meta, NewEntry, ParseEntryIdError, ProfileEntry};
pub use query::{EntryFilter, EntryUpdate, LockState};
pub use traits::EntryStore;
