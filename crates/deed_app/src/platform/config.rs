//! Optional RON configuration file.
//!
//! Every field has a default taken from the engine settings, so a config file
//! only needs the values it changes. Durations are written in seconds.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use deed_core::DocumentClassifier;
use deed_engine::{BrowserSettings, DiscoverySettings, DownloadSettings, FetchSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserSection,
    pub discovery: DiscoverySection,
    pub download: DownloadSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub no_sandbox: bool,
    pub request_timeout_secs: f64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        let settings = BrowserSettings::default();
        Self {
            headless: settings.headless,
            chrome_path: settings.executable,
            no_sandbox: settings.no_sandbox,
            request_timeout_secs: settings.request_timeout.as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub page_url_template: String,
    pub ready_selector: String,
    pub navigation_timeout_secs: f64,
    pub consent_xpath: String,
    pub consent_window_secs: f64,
    pub consent_settle_secs: f64,
    pub render_settle_secs: f64,
    pub affordance_xpath: String,
    pub capture_delay_secs: f64,
    pub inter_asset_delay_secs: f64,
    pub error_threshold: u32,
    pub host_patterns: Vec<String>,
    pub keywords: Vec<String>,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        let s = DiscoverySettings::default();
        Self {
            host_patterns: s.classifier.host_patterns().to_vec(),
            keywords: s.classifier.keywords().to_vec(),
            page_url_template: s.page_url_template,
            ready_selector: s.ready_selector,
            navigation_timeout_secs: s.navigation_timeout.as_secs_f64(),
            consent_xpath: s.consent_xpath,
            consent_window_secs: s.consent_window.as_secs_f64(),
            consent_settle_secs: s.consent_settle_delay.as_secs_f64(),
            render_settle_secs: s.render_settle_delay.as_secs_f64(),
            affordance_xpath: s.affordance_xpath,
            capture_delay_secs: s.capture_delay.as_secs_f64(),
            inter_asset_delay_secs: s.inter_asset_delay.as_secs_f64(),
            error_threshold: s.error_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSection {
    pub max_attempts: u32,
    pub retry_delay_secs: f64,
    pub post_download_delay_secs: f64,
    pub connect_timeout_secs: f64,
    pub read_timeout_secs: f64,
    pub chunk_size: usize,
}

impl Default for DownloadSection {
    fn default() -> Self {
        let download = DownloadSettings::default();
        let fetch = FetchSettings::default();
        Self {
            max_attempts: download.max_attempts,
            retry_delay_secs: download.retry_delay.as_secs_f64(),
            post_download_delay_secs: download.post_download_delay.as_secs_f64(),
            connect_timeout_secs: fetch.connect_timeout.as_secs_f64(),
            read_timeout_secs: fetch.read_timeout.as_secs_f64(),
            chunk_size: fetch.chunk_size,
        }
    }
}

/// Loads `path`, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    let config: AppConfig =
        ron::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

fn seconds(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{field} must be a non-negative number of seconds, got {value}"))
}

impl AppConfig {
    pub fn browser_settings(&self) -> Result<BrowserSettings> {
        let b = &self.browser;
        Ok(BrowserSettings {
            headless: b.headless,
            executable: b.chrome_path.clone(),
            no_sandbox: b.no_sandbox,
            request_timeout: seconds("browser.request_timeout_secs", b.request_timeout_secs)?,
        })
    }

    pub fn discovery_settings(&self) -> Result<DiscoverySettings> {
        let d = &self.discovery;
        if d.host_patterns.is_empty() || d.keywords.is_empty() {
            anyhow::bail!("discovery.host_patterns and discovery.keywords must not be empty");
        }
        Ok(DiscoverySettings {
            page_url_template: d.page_url_template.clone(),
            ready_selector: d.ready_selector.clone(),
            navigation_timeout: seconds(
                "discovery.navigation_timeout_secs",
                d.navigation_timeout_secs,
            )?,
            consent_xpath: d.consent_xpath.clone(),
            consent_window: seconds("discovery.consent_window_secs", d.consent_window_secs)?,
            consent_settle_delay: seconds("discovery.consent_settle_secs", d.consent_settle_secs)?,
            render_settle_delay: seconds("discovery.render_settle_secs", d.render_settle_secs)?,
            affordance_xpath: d.affordance_xpath.clone(),
            capture_delay: seconds("discovery.capture_delay_secs", d.capture_delay_secs)?,
            inter_asset_delay: seconds(
                "discovery.inter_asset_delay_secs",
                d.inter_asset_delay_secs,
            )?,
            error_threshold: d.error_threshold,
            classifier: DocumentClassifier::new(&d.host_patterns, &d.keywords),
        })
    }

    pub fn download_settings(&self) -> Result<DownloadSettings> {
        let d = &self.download;
        Ok(DownloadSettings {
            max_attempts: d.max_attempts,
            retry_delay: seconds("download.retry_delay_secs", d.retry_delay_secs)?,
            post_download_delay: seconds(
                "download.post_download_delay_secs",
                d.post_download_delay_secs,
            )?,
        })
    }

    pub fn fetch_settings(&self) -> Result<FetchSettings> {
        let d = &self.download;
        Ok(FetchSettings {
            connect_timeout: seconds("download.connect_timeout_secs", d.connect_timeout_secs)?,
            read_timeout: seconds("download.read_timeout_secs", d.read_timeout_secs)?,
            chunk_size: d.chunk_size.max(1),
        })
    }
}
