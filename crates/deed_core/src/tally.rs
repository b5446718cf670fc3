#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success { bytes_written: u64 },
    Skipped { existing_size: u64 },
    Failed { reason: String },
}

/// Run-level download counters, threaded through the download loop by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunTally {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunTally {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn record(mut self, outcome: &DownloadOutcome) -> Self {
        match outcome {
            DownloadOutcome::Success { .. } => self.succeeded += 1,
            DownloadOutcome::Skipped { .. } => self.skipped += 1,
            DownloadOutcome::Failed { .. } => self.failed += 1,
        }
        self
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    /// A run is clean when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_outcome_kind() {
        let tally = RunTally::new()
            .record(&DownloadOutcome::Success { bytes_written: 10 })
            .record(&DownloadOutcome::Skipped { existing_size: 3 })
            .record(&DownloadOutcome::Skipped { existing_size: 4 });
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.skipped, 2);
        assert!(tally.is_clean());

        let tally = tally.record(&DownloadOutcome::Failed {
            reason: "timeout".into(),
        });
        assert!(!tally.is_clean());
    }
}
