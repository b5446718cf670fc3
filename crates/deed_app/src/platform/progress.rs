use deed_core::DownloadOutcome;
use deed_engine::{EngineEvent, ProgressSink};
use engine_logging::{clip, engine_debug, engine_info, engine_warn};

const URL_PREVIEW: usize = 80;

/// Turns engine events into progress lines on the installed logger.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::AssetStarted {
                asset,
                position,
                total,
            } => engine_info!("[{}/{}] {}", position, total, asset),
            EngineEvent::ConsentDismissed { asset } => {
                engine_debug!("{}: consent banner dismissed", asset)
            }
            EngineEvent::AffordancesFound { asset, count } => {
                engine_info!("{}: {} download button(s)", asset, count)
            }
            EngineEvent::DocumentCaptured { asset, url } => {
                engine_info!("{}: captured {}", asset, clip(&url, URL_PREVIEW))
            }
            EngineEvent::AssetDiscovered { asset, status } => {
                if status.is_error() {
                    engine_warn!("{}: {}", asset, status);
                } else {
                    engine_info!("{}: {}", asset, status);
                }
            }
            EngineEvent::SessionRecycled => engine_warn!("Browser session recreated"),
            EngineEvent::DownloadAttempt {
                url,
                attempt,
                max_attempts,
            } => engine_info!(
                "Downloading ({}/{}): {}",
                attempt,
                max_attempts,
                clip(&url, URL_PREVIEW)
            ),
            EngineEvent::AttemptFailed {
                url,
                attempt,
                error,
            } => engine_warn!(
                "Attempt {} failed for {}: {}",
                attempt,
                clip(&url, URL_PREVIEW),
                error
            ),
            EngineEvent::DownloadFinished {
                asset,
                destination,
                outcome,
                url,
            } => {
                let name = destination
                    .as_deref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| clip(&url, URL_PREVIEW).to_string());
                match outcome {
                    DownloadOutcome::Success { bytes_written } => {
                        engine_info!("{}: saved {} ({})", asset, name, megabytes(bytes_written))
                    }
                    DownloadOutcome::Skipped { existing_size } => engine_info!(
                        "{}: {} already present ({})",
                        asset,
                        name,
                        megabytes(existing_size)
                    ),
                    DownloadOutcome::Failed { reason } => {
                        engine_warn!("{}: {} failed: {}", asset, name, reason)
                    }
                }
            }
        }
    }
}

fn megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}
