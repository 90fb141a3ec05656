//! Background worker running the sweeper on a fixed interval

use crate::{SweepMetrics, Sweeper, SweeperConfig, SweeperError};
use profilepool_domain::EntryStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Background worker that sweeps stale locks on a schedule
///
/// The first sweep happens one interval after start. A failed sweep is
/// logged and the worker carries on; there is no backoff. Sweeps run on the
/// blocking pool since the store API is synchronous.
///
/// # Examples
///
/// ```no_run
/// use profilepool_sweeper::{SweeperConfig, SweeperWorker};
/// use profilepool_store::SqliteStore;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = Arc::new(SqliteStore::new("profilepool.db")?);
///     let handle = SweeperWorker::new(store, SweeperConfig::default())?.spawn();
///
///     // ... serve requests ...
///
///     let metrics = handle.shutdown().await?;
///     println!("{}", metrics.summary());
///     Ok(())
/// }
/// ```
pub struct SweeperWorker<S> {
    sweeper: Arc<Mutex<Sweeper<S>>>,
    interval: Duration,
}

impl<S> SweeperWorker<S>
where
    S: EntryStore + Send + Sync + 'static,
    S::Error: std::fmt::Display,
{
    /// Create a new background worker with the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`SweeperError::Config`] if the interval is zero.
    pub fn new(store: Arc<S>, config: SweeperConfig) -> Result<Self, SweeperError> {
        config.validate()?;
        let interval = config.sweep_interval();
        Ok(Self {
            sweeper: Arc::new(Mutex::new(Sweeper::new(store, config))),
            interval,
        })
    }

    /// Run until `cancel` fires, returning the final metrics
    pub async fn run(self, cancel: CancellationToken) -> SweepMetrics {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Unlock sweeper started (interval: {:?}, unlock timeout: {:?})",
            self.interval,
            lock(&self.sweeper).config().unlock_timeout()
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Cancellation received, stopping unlock sweeper");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        let metrics = self.metrics();
        tracing::info!("Unlock sweeper stopped. Final metrics:\n{}", metrics.summary());
        metrics
    }

    /// Run for a specific number of cycles (useful for testing)
    ///
    /// Unlike [`SweeperWorker::run`], stops at the first failed sweep.
    pub async fn run_cycles(&mut self, cycles: usize) -> Result<(), SweeperError> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);
            if let Err(e) = self.sweep_blocking().await {
                tracing::error!("Sweep {}/{} failed: {}", cycle + 1, cycles, e);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Start the worker on the tokio runtime
    pub fn spawn(self) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));

        SweeperHandle {
            cancel,
            task: Some(task),
        }
    }

    /// Snapshot of the sweeper's current metrics
    pub fn metrics(&self) -> SweepMetrics {
        lock(&self.sweeper).metrics().clone()
    }

    async fn sweep_blocking(&self) -> Result<usize, SweeperError> {
        let sweeper = Arc::clone(&self.sweeper);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&sweeper);
            guard.sweep()
        })
        .await
        .map_err(|e| SweeperError::Worker(e.to_string()))?
    }

    async fn tick(&self) {
        tracing::debug!("Starting sweep cycle");

        match self.sweep_blocking().await {
            Ok(0) => tracing::debug!("Sweep completed: no stale locks"),
            Ok(unlocked) => tracing::info!("Sweep completed: {} stale locks released", unlocked),
            Err(e) => tracing::error!("Sweep failed: {}", e),
        }
    }
}

// A panic mid-sweep leaves metrics intact, so poisoning is ignored
fn lock<S>(sweeper: &Mutex<Sweeper<S>>) -> MutexGuard<'_, Sweeper<S>> {
    sweeper.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owned handle to a running sweeper task
///
/// Dropping the handle cancels the task. The task never keeps the runtime
/// alive on its own.
#[must_use = "dropping the handle stops the sweeper"]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<SweepMetrics>>,
}

impl SweeperHandle {
    /// Token that stops the sweeper when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the task has exited
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Stop the sweeper and wait for it, returning its final metrics
    pub async fn shutdown(mut self) -> Result<SweepMetrics, SweeperError> {
        self.cancel.cancel();

        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| SweeperError::Worker(e.to_string())),
            None => Ok(SweepMetrics::default()),
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
