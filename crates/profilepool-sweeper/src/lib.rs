//! Profile Pool Unlock Sweeper
//!
//! Background maintenance that reclaims entries whose lock has gone stale.
//!
//! # Overview
//!
//! A client that claims an entry and never releases it would keep that entry
//! out of the pool forever. The sweeper periodically force-releases every
//! entry, across all profiles, whose lock is older than the configured
//! timeout:
//!
//! - one bulk update per sweep, no per-entry round trips
//! - `use_cnt` and `error_cnt` are left alone
//! - a failed sweep is logged and retried on the next tick
//!
//! # Usage
//!
//! ## One-time Sweep
//!
//! ```no_run
//! use profilepool_sweeper::{Sweeper, SweeperConfig};
//! use profilepool_store::SqliteStore;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::new("profilepool.db")?);
//! let mut sweeper = Sweeper::new(store, SweeperConfig::default());
//!
//! sweeper.sweep()?;
//! println!("{}", sweeper.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Worker
//!
//! [`SweeperWorker::spawn`] returns a [`SweeperHandle`] owning the task; call
//! [`SweeperHandle::shutdown`] to stop it deterministically.
//!
//! # Configuration
//!
//! ```toml
//! [sweeper]
//! unlock_timeout_ms = 600000
//! sweep_interval_ms = 60000
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod sweeper;
mod worker;

pub use config::{SweeperConfig, DEFAULT_SWEEP_INTERVAL_MS, DEFAULT_UNLOCK_TIMEOUT_MS};
pub use error::SweeperError;
pub use metrics::SweepMetrics;
pub use sweeper::Sweeper;
pub use worker::{SweeperHandle, SweeperWorker};
