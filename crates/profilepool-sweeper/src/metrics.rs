//! Metrics collection for sweeper operations

/// Metrics collected while sweeping stale locks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    /// Sweeps that completed
    pub sweep_count: usize,

    /// Sweeps that failed (store unreachable, ...)
    pub failed_sweeps: usize,

    /// Entries force-unlocked across all sweeps
    pub total_unlocked: usize,

    /// Entries force-unlocked by the most recent successful sweep
    pub last_unlocked: usize,
}

impl SweepMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed sweep
    pub fn record_sweep(&mut self, unlocked: usize) {
        self.sweep_count += 1;
        self.total_unlocked += unlocked;
        self.last_unlocked = unlocked;
    }

    /// Record a failed sweep
    pub fn record_failure(&mut self) {
        self.failed_sweeps += 1;
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        [
            "Sweeper Metrics Summary".to_string(),
            "=======================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Failed sweeps: {}", self.failed_sweeps),
            format!("Entries unlocked: {}", self.total_unlocked),
            format!("Unlocked by last sweep: {}", self.last_unlocked),
        ]
        .join("\n")
    }
}
