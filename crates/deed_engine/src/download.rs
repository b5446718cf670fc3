use std::path::{Path, PathBuf};
use std::time::Duration;

use deed_core::{
    issuer_dir, AssetId, DownloadOutcome, DownloadTask, LinkCollection, RunTally,
};
use engine_logging::{clip, engine_debug};

use crate::fetch::{Fetcher, ProgressSink};
use crate::persist::{ensure_output_dir, existing_download_size};
use crate::EngineEvent;

const REASON_LIMIT: usize = 80;

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub max_attempts: u32,
    /// Pause after a transport failure before the next attempt.
    pub retry_delay: Duration,
    /// Pause after every fetched URL, whatever the outcome.
    pub post_download_delay: Duration,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            post_download_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub asset: AssetId,
    pub url: String,
    pub destination: Option<PathBuf>,
    pub outcome: DownloadOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadReport {
    pub records: Vec<DownloadRecord>,
    pub tally: RunTally,
}

/// Fetches every link of a collection into `<base>/<issuer>/<file>`, one at a time.
pub struct DownloadEngine<F> {
    fetcher: F,
    settings: DownloadSettings,
}

impl<F: Fetcher> DownloadEngine<F> {
    pub fn new(fetcher: F, settings: DownloadSettings) -> Self {
        Self { fetcher, settings }
    }

    pub async fn run(
        &self,
        base: &Path,
        links: &LinkCollection,
        sink: &dyn ProgressSink,
    ) -> DownloadReport {
        let mut report = DownloadReport::default();
        let total = links.len();

        for (position, (asset, urls)) in links.iter().enumerate() {
            sink.emit(EngineEvent::AssetStarted {
                asset: asset.clone(),
                position: position + 1,
                total,
            });

            let folder_error = match issuer_dir(base, asset) {
                Some(folder) => ensure_output_dir(&folder)
                    .err()
                    .map(|err| format!("cannot create {}: {err}", folder.display())),
                None => Some(format!("asset {asset} has no usable issuer folder")),
            };

            for url in urls.iter() {
                let record = match &folder_error {
                    Some(reason) => DownloadRecord {
                        asset: asset.clone(),
                        url: url.to_string(),
                        destination: None,
                        outcome: DownloadOutcome::Failed {
                            reason: reason.clone(),
                        },
                    },
                    None => self.download_one(base, asset, url, sink).await,
                };
                sink.emit(EngineEvent::DownloadFinished {
                    asset: record.asset.clone(),
                    url: record.url.clone(),
                    destination: record.destination.clone(),
                    outcome: record.outcome.clone(),
                });
                report.tally = report.tally.record(&record.outcome);
                report.records.push(record);
            }
        }

        report
    }

    /// Downloads one URL unless its destination already holds a non-empty file.
    pub async fn download_one(
        &self,
        base: &Path,
        asset: &AssetId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> DownloadRecord {
        let Some(task) = DownloadTask::new(base, asset, url) else {
            return DownloadRecord {
                asset: asset.clone(),
                url: url.to_string(),
                destination: None,
                outcome: DownloadOutcome::Failed {
                    reason: "no destination: url has no file name or issuer folder is unusable"
                        .to_string(),
                },
            };
        };

        if let Some(existing_size) = existing_download_size(&task.destination) {
            engine_debug!("Skipping existing {:?} ({} bytes)", task.destination, existing_size);
            return DownloadRecord {
                asset: asset.clone(),
                url: task.url,
                destination: Some(task.destination),
                outcome: DownloadOutcome::Skipped { existing_size },
            };
        }

        let outcome = self.fetch_with_retry(&task, sink).await;
        pause(self.settings.post_download_delay).await;

        DownloadRecord {
            asset: asset.clone(),
            url: task.url,
            destination: Some(task.destination),
            outcome,
        }
    }

    async fn fetch_with_retry(&self, task: &DownloadTask, sink: &dyn ProgressSink) -> DownloadOutcome {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            sink.emit(EngineEvent::DownloadAttempt {
                url: task.url.clone(),
                attempt,
                max_attempts,
            });

            let error = match self.fetcher.fetch_to_file(&task.url, &task.destination).await {
                Ok(bytes_written) => return DownloadOutcome::Success { bytes_written },
                Err(error) => error,
            };

            if !error.is_transport() {
                return DownloadOutcome::Failed {
                    reason: clip(&error.to_string(), REASON_LIMIT).to_string(),
                };
            }

            sink.emit(EngineEvent::AttemptFailed {
                url: task.url.clone(),
                attempt,
                error: error.clone(),
            });
            if attempt >= max_attempts {
                return DownloadOutcome::Failed {
                    reason: format!(
                        "gave up after {max_attempts} attempts: {}",
                        clip(&error.to_string(), REASON_LIMIT)
                    ),
                };
            }
            attempt += 1;
            pause(self.settings.retry_delay).await;
        }
    }
}

pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
