use crate::view_model::BatchSummary;
use crate::{DiscoveryResult, DiscoveryStatus};

/// Consecutive failed assets that make the browser session suspect.
pub const DEFAULT_ERROR_THRESHOLD: u32 = 3;

/// Discovery batch progress plus browser-session health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchState {
    results: Vec<DiscoveryResult>,
    consecutive_errors: u32,
    error_threshold: u32,
    session_recycles: u32,
}

impl Default for BatchState {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_ERROR_THRESHOLD)
    }
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A threshold of zero is treated as one.
    pub fn with_threshold(error_threshold: u32) -> Self {
        Self {
            results: Vec::new(),
            consecutive_errors: 0,
            error_threshold: error_threshold.max(1),
            session_recycles: 0,
        }
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn session_recycles(&self) -> u32 {
        self.session_recycles
    }

    pub fn results(&self) -> &[DiscoveryResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<DiscoveryResult> {
        self.results
    }

    pub fn view(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            processed: self.results.len(),
            session_recycles: self.session_recycles,
            ..BatchSummary::default()
        };
        for result in &self.results {
            match result.status() {
                DiscoveryStatus::Found(_) => summary.with_documents += 1,
                DiscoveryStatus::NoneFound => summary.without_documents += 1,
                DiscoveryStatus::Error(_) => summary.errors += 1,
            }
        }
        summary
    }

    /// Stores the result and returns true when the session must be recycled.
    pub(crate) fn record(&mut self, result: DiscoveryResult) -> bool {
        let failed = result.status().is_error();
        self.results.push(result);
        if !failed {
            self.consecutive_errors = 0;
            return false;
        }
        self.consecutive_errors += 1;
        if self.consecutive_errors >= self.error_threshold {
            self.consecutive_errors = 0;
            self.session_recycles += 1;
            return true;
        }
        false
    }
}
