//! Tuning knobs for recomputation.

use std::time::Duration;

use doc_store::DEFAULT_MAX_BATCH_SIZE;

/// Configuration shared by the recompute entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReputationConfig {
    /// Subjects fetched per page during a full recompute.
    pub page_size: usize,
    /// Subjects of one page processed at the same time.
    pub concurrency: usize,
    /// Time budget for one subject's recompute and propagation.
    pub call_timeout: Duration,
    /// Upper bound on fan-out batch size. The store's own limit still applies.
    pub fanout_batch_size: usize,
    /// Log a progress line every this many processed subjects.
    pub progress_interval: usize,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            concurrency: 8,
            call_timeout: Duration::from_secs(30),
            fanout_batch_size: DEFAULT_MAX_BATCH_SIZE,
            progress_interval: 10,
        }
    }
}
