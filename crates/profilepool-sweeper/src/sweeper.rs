//! Core sweep: force-release locks that outlived the staleness threshold

use crate::{SweepMetrics, SweeperConfig, SweeperError};
use chrono::{DateTime, TimeDelta, Utc};
use profilepool_domain::{EntryFilter, EntryStore, EntryUpdate};
use std::sync::Arc;

/// Sweeper for stale entry locks
///
/// One sweep is a single bulk update across every profile: entries locked
/// before `now - unlock_timeout` are unlocked. Counters are never touched.
///
/// # Examples
///
/// ```no_run
/// use profilepool_sweeper::{Sweeper, SweeperConfig};
/// use profilepool_store::SqliteStore;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(SqliteStore::new("profilepool.db")?);
/// let mut sweeper = Sweeper::new(store, SweeperConfig::default());
///
/// let unlocked = sweeper.sweep()?;
/// println!("unlocked {} entries", unlocked);
/// # Ok(())
/// # }
/// ```
pub struct Sweeper<S> {
    store: Arc<S>,
    config: SweeperConfig,
    metrics: SweepMetrics,
}

impl<S> Sweeper<S>
where
    S: EntryStore,
    S::Error: std::fmt::Display,
{
    /// Create a new Sweeper with the given configuration
    pub fn new(store: Arc<S>, config: SweeperConfig) -> Self {
        Self {
            store,
            config,
            metrics: SweepMetrics::new(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Sweep against the current time
    pub fn sweep(&mut self) -> Result<usize, SweeperError> {
        self.sweep_at(Utc::now())
    }

    /// Sweep treating `now` as the current time
    ///
    /// Returns the number of entries unlocked. Failures are recorded in the
    /// metrics and returned; the next sweep is independent.
    pub fn sweep_at(&mut self, now: DateTime<Utc>) -> Result<usize, SweeperError> {
        let Some(cutoff) = self.cutoff(now) else {
            // Threshold reaches past the earliest representable instant
            self.metrics.record_sweep(0);
            return Ok(0);
        };

        let filter = EntryFilter::all().locked(true).locked_before(cutoff);

        match self.store.update_many(&filter, &EntryUpdate::unlock()) {
            Ok(unlocked) => {
                self.metrics.record_sweep(unlocked);
                Ok(unlocked)
            }
            Err(e) => {
                self.metrics.record_failure();
                Err(SweeperError::Store(e.to_string()))
            }
        }
    }

    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let timeout = i64::try_from(self.config.unlock_timeout_ms).ok()?;
        now.checked_sub_signed(TimeDelta::try_milliseconds(timeout)?)
    }
}
