use std::fmt::Write as _;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::Local;
use deed_core::{collect_links, total_links, BatchSummary, LedgerRow, RunTally};
use deed_engine::{
    ensure_output_dir, load_asset_list, read_ledger, write_ledger, ChromiumFactory,
    DiscoveryEngine, DownloadEngine, ReqwestFetcher,
};
use engine_logging::{engine_info, engine_warn};

use super::config::{load_config, AppConfig};
use super::progress::LogSink;

const ASSET_PREVIEW: usize = 5;

/// What the user asked for on the command line.
pub enum Job {
    Discover {
        assets: PathBuf,
        output_dir: PathBuf,
        ledger: Option<String>,
    },
    Download {
        ledger: PathBuf,
        dest: PathBuf,
    },
    Run {
        assets: PathBuf,
        output_dir: PathBuf,
        dest: PathBuf,
    },
    DefaultConfig,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub headless: Option<bool>,
    pub chrome_path: Option<PathBuf>,
}

pub fn run_job(job: Job, overrides: Overrides) -> Result<ExitCode> {
    let mut config = load_config(overrides.config.as_deref())?;
    if let Some(headless) = overrides.headless {
        config.browser.headless = headless;
    }
    if let Some(path) = overrides.chrome_path {
        config.browser.chrome_path = Some(path);
    }

    if let Job::DefaultConfig = job {
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new())
            .context("cannot render configuration")?;
        println!("{text}");
        return Ok(ExitCode::SUCCESS);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    runtime.block_on(execute(job, &config))
}

async fn execute(job: Job, config: &AppConfig) -> Result<ExitCode> {
    match job {
        Job::Discover {
            assets,
            output_dir,
            ledger,
        } => {
            discover(config, &assets, &output_dir, ledger).await?;
            Ok(ExitCode::SUCCESS)
        }
        Job::Download { ledger, dest } => {
            let tally = download(config, &ledger, &dest).await?;
            Ok(exit_code(tally))
        }
        Job::Run {
            assets,
            output_dir,
            dest,
        } => {
            let ledger = discover(config, &assets, &output_dir, None).await?;
            let tally = download(config, &ledger, &dest).await?;
            Ok(exit_code(tally))
        }
        Job::DefaultConfig => Ok(ExitCode::SUCCESS),
    }
}

async fn discover(
    config: &AppConfig,
    assets_path: &Path,
    output_dir: &Path,
    ledger_name: Option<String>,
) -> Result<PathBuf> {
    let assets = load_asset_list(assets_path)?;
    if assets.is_empty() {
        bail!("no assets listed in {}", assets_path.display());
    }
    let preview: Vec<&str> = assets.iter().take(ASSET_PREVIEW).map(|a| a.as_str()).collect();
    engine_info!(
        "{} asset(s) loaded: {}{}",
        assets.len(),
        preview.join(", "),
        if assets.len() > ASSET_PREVIEW { ", ..." } else { "" }
    );

    let factory = ChromiumFactory::new(config.browser_settings()?);
    let engine = DiscoveryEngine::new(factory, config.discovery_settings()?);
    let state = until_interrupted(engine.run(&assets, &LogSink)).await?;

    println!("{}", discovery_summary(&state.view()));

    let rows: Vec<LedgerRow> = state.results().iter().map(LedgerRow::from).collect();
    let name = ledger_name.unwrap_or_else(default_ledger_name);
    let path = write_ledger(output_dir, &name, &rows)
        .with_context(|| format!("cannot write ledger {name} in {}", output_dir.display()))?;
    println!("Ledger saved: {}", path.display());
    Ok(path)
}

async fn download(config: &AppConfig, ledger: &Path, dest: &Path) -> Result<RunTally> {
    let rows = read_ledger(ledger)?;
    let links = collect_links(&rows);
    println!(
        "{} asset(s) with documents, {} PDF(s) to download",
        links.len(),
        total_links(&links)
    );

    ensure_output_dir(dest)
        .with_context(|| format!("cannot prepare destination {}", dest.display()))?;
    let engine = DownloadEngine::new(
        ReqwestFetcher::new(config.fetch_settings()?),
        config.download_settings()?,
    );
    let report = until_interrupted(engine.run(dest, &links, &LogSink)).await?;

    let absolute = std::path::absolute(dest).unwrap_or_else(|_| dest.to_path_buf());
    println!("{}", download_summary(&report.tally, &absolute));
    Ok(report.tally)
}

/// Drives `work` to completion unless Ctrl-C arrives first, in which case
/// `work` is dropped along with any browser it owns.
async fn until_interrupted<F: Future>(work: F) -> Result<F::Output> {
    tokio::select! {
        output = work => Ok(output),
        signal = tokio::signal::ctrl_c() => {
            signal.context("cannot listen for Ctrl-C")?;
            engine_warn!("Interrupted, shutting down");
            bail!("interrupted by user")
        }
    }
}

fn default_ledger_name() -> String {
    format!("escrituras_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
}

fn exit_code(tally: RunTally) -> ExitCode {
    if tally.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn discovery_summary(summary: &BatchSummary) -> String {
    let mut out = String::from("Discovery summary\n");
    let _ = writeln!(out, "  processed:          {}", summary.processed);
    let _ = writeln!(out, "  with documents:     {}", summary.with_documents);
    let _ = writeln!(out, "  without documents:  {}", summary.without_documents);
    let _ = write!(out, "  errors:             {}", summary.errors);
    if summary.session_recycles > 0 {
        let _ = write!(out, "\n  browser restarts:   {}", summary.session_recycles);
    }
    out
}

fn download_summary(tally: &RunTally, destination: &Path) -> String {
    let mut out = String::from("Download summary\n");
    let _ = writeln!(out, "  downloaded:       {}", tally.succeeded);
    let _ = writeln!(out, "  already present:  {}", tally.skipped);
    let _ = writeln!(out, "  failed:           {}", tally.failed);
    let _ = writeln!(out, "  total:            {}", tally.total());
    if tally.is_clean() {
        out.push_str("All PDFs are in place.\n");
    } else {
        let _ = writeln!(out, "{} PDF(s) failed to download.", tally.failed);
    }
    let _ = write!(out, "Destination: {}", destination.display());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use deed_core::DownloadOutcome;
    use pretty_assertions::assert_eq;

    #[test]
    fn ledger_name_carries_timestamp() {
        let name = default_ledger_name();
        assert!(name.starts_with("escrituras_"));
        assert!(name.ends_with(".csv"));
        // escrituras_YYYYmmdd_HHMMSS.csv
        assert_eq!(name.len(), "escrituras_".len() + 15 + ".csv".len());
    }

    #[test]
    fn discovery_summary_lists_counts() {
        let summary = BatchSummary {
            processed: 4,
            with_documents: 2,
            without_documents: 1,
            errors: 1,
            session_recycles: 0,
        };
        let text = discovery_summary(&summary);
        assert!(text.contains("processed:          4"));
        assert!(text.contains("errors:             1"));
        assert!(!text.contains("browser restarts"));
    }

    #[test]
    fn download_summary_reports_failures() {
        let tally = RunTally::new()
            .record(&DownloadOutcome::Success { bytes_written: 10 })
            .record(&DownloadOutcome::Failed {
                reason: "timeout".into(),
            });
        let text = download_summary(&tally, Path::new("/data/escrituras"));
        assert!(text.contains("total:            2"));
        assert!(text.contains("1 PDF(s) failed to download."));
        assert!(text.ends_with("Destination: /data/escrituras"));
        assert_eq!(exit_code(tally), ExitCode::FAILURE);
    }

    #[test]
    fn clean_run_exits_successfully() {
        let tally = RunTally::new().record(&DownloadOutcome::Skipped { existing_size: 3 });
        assert!(download_summary(&tally, Path::new("out")).contains("All PDFs are in place."));
        assert_eq!(exit_code(tally), ExitCode::SUCCESS);
    }
}
