//! Chromium-backed [`PageSession`] using chromiumoxide.
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::{EventTargetCreated, EventTargetInfoChanged};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn};
use futures_util::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use crate::session::{PageSession, SessionFactory};
use crate::SessionError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Marks the affordances enumerated by `count_affordances`, in document order.
const AFFORDANCE_ATTR: &str = "data-deedfetch-affordance";

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Explicit executable; searched for when `None`.
    pub executable: Option<PathBuf>,
    pub no_sandbox: bool,
    /// Timeout of a single DevTools command.
    pub request_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            no_sandbox: false,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Find Chrome/Chromium: `CHROMIUM_PATH`, then well-known install paths, then `PATH`.
pub fn find_browser_executable() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        engine_warn!("CHROMIUM_PATH points to a missing file: {}", path.display());
    }

    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for candidate in candidates {
        let path = match candidate.strip_prefix("~/") {
            Some(rest) => match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => continue,
            },
            None => PathBuf::from(candidate),
        };
        if path.exists() {
            return Some(path);
        }
    }

    ["google-chrome", "chromium", "chromium-browser", "chrome"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Launches one fresh [`ChromiumSession`] per call.
#[derive(Debug, Clone, Default)]
pub struct ChromiumFactory {
    settings: BrowserSettings,
}

impl ChromiumFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionFactory for ChromiumFactory {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let session = ChromiumSession::launch(&self.settings).await?;
        Ok(Box::new(session))
    }
}

type TrafficBuffer = Arc<Mutex<Vec<String>>>;

/// Browser process, its single working tab and the traffic captured from it.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    traffic: TrafficBuffer,
    tasks: Vec<JoinHandle<()>>,
    // Removed only after the browser above is gone.
    _profile: TempDir,
}

impl ChromiumSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, SessionError> {
        let executable = match &settings.executable {
            Some(path) => path.clone(),
            None => find_browser_executable().ok_or(SessionError::BrowserNotFound)?,
        };
        let profile = tempfile::Builder::new()
            .prefix("deedfetch-profile-")
            .tempdir()
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&executable)
            .user_data_dir(profile.path())
            .request_timeout(settings.request_timeout)
            .window_size(1920, 1080)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-dev-shm-usage");
        builder = if settings.headless {
            builder.headless_mode(HeadlessMode::default())
        } else {
            builder.with_head()
        };
        if settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(SessionError::Launch)?;

        engine_info!("Launching browser {}", executable.display());
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let mut tasks = vec![tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    engine_trace!("Browser handler error: {}", err);
                }
            }
        })];

        let traffic: TrafficBuffer = Arc::default();
        match Self::open_page(&browser, &traffic, &mut tasks).await {
            Ok(page) => Ok(Self {
                browser,
                page,
                traffic,
                tasks,
                _profile: profile,
            }),
            Err(err) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                for task in &tasks {
                    task.abort();
                }
                Err(err)
            }
        }
    }

    async fn open_page(
        browser: &Browser,
        traffic: &TrafficBuffer,
        tasks: &mut Vec<JoinHandle<()>>,
    ) -> Result<Page, SessionError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;
        let sink = Arc::clone(traffic);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                push_url(&sink, &event.request.url);
            }
        }));

        // Affordances may open the document in a new tab instead of fetching it
        // from the current one; the new target's URL is the request we want.
        let mut created = browser
            .event_listener::<EventTargetCreated>()
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;
        let sink = Arc::clone(traffic);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = created.next().await {
                push_url(&sink, &event.target_info.url);
            }
        }));

        let mut changed = browser
            .event_listener::<EventTargetInfoChanged>()
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;
        let sink = Arc::clone(traffic);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = changed.next().await {
                push_url(&sink, &event.target_info.url);
            }
        }));

        Ok(page)
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, SessionError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| SessionError::Script(e.to_string()))
    }

    fn lock_traffic(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.traffic.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn push_url(buffer: &TrafficBuffer, url: &str) {
    if url.is_empty() || url == "about:blank" {
        return;
    }
    buffer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(url.to_string());
}

fn js_string(value: &str) -> Result<String, SessionError> {
    serde_json::to_string(value).map_err(|e| SessionError::Script(e.to_string()))
}

fn snapshot_expr(xpath: &str) -> Result<String, SessionError> {
    Ok(format!(
        "document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null)",
        js_string(xpath)?
    ))
}

/// Tags every element matching `xpath` with its position and returns the count,
/// so later clicks address the same elements even if the DOM shifts.
fn tag_affordances_script(xpath: &str) -> Result<String, SessionError> {
    Ok(format!(
        "(() => {{ \
            document.querySelectorAll('[{AFFORDANCE_ATTR}]').forEach(el => el.removeAttribute('{AFFORDANCE_ATTR}')); \
            const found = {}; \
            for (let i = 0; i < found.snapshotLength; i++) {{ found.snapshotItem(i).setAttribute('{AFFORDANCE_ATTR}', String(i)); }} \
            return found.snapshotLength; \
        }})()",
        snapshot_expr(xpath)?
    ))
}

fn click_tagged_script(index: usize) -> String {
    format!(
        "(() => {{ const el = document.querySelector('[{AFFORDANCE_ATTR}=\"{index}\"]'); \
            if (!el) return false; el.click(); return true; }})()"
    )
}

/// Runs `start`, then polls `ready` until it holds. Both share one deadline of
/// `timeout` from the call.
async fn load_within<S, R, F>(timeout: Duration, start: S, mut ready: R) -> Result<(), SessionError>
where
    S: Future<Output = Result<(), SessionError>>,
    R: FnMut() -> F,
    F: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    match tokio::time::timeout_at(deadline, start).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(SessionError::Timeout {
                what: "navigation",
                after: timeout,
            })
        }
    }

    loop {
        if ready().await {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(SessionError::Timeout {
                what: "page content",
                after: timeout,
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(
        &mut self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let page = &self.page;
        // `Page.navigate` answers once the navigation commits; readiness is
        // then judged by the selector alone, against a single deadline.
        let start = async move {
            match page.execute(NavigateParams::new(url)).await {
                Ok(response) => match &response.result.error_text {
                    Some(text) => Err(SessionError::Navigation(text.clone())),
                    None => Ok(()),
                },
                Err(CdpError::Timeout) => {
                    engine_debug!("Navigation to {} not committed yet, polling on", url);
                    Ok(())
                }
                Err(err) => Err(SessionError::Navigation(err.to_string())),
            }
        };
        let ready = move || async move { page.find_element(ready_selector).await.is_ok() };
        load_within(timeout, start, ready).await?;
        engine_debug!("Page ready: {}", url);
        Ok(())
    }

    async fn dismiss_consent(&mut self, xpath: &str, window: Duration) -> Result<bool, SessionError> {
        let script = format!(
            "(() => {{ const el = {}.snapshotItem(0); if (!el) return false; el.click(); return true; }})()",
            snapshot_expr(xpath)?
        );
        let deadline = Instant::now() + window;
        loop {
            if self.evaluate::<bool>(script.clone()).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn count_affordances(&mut self, xpath: &str) -> Result<usize, SessionError> {
        self.evaluate::<usize>(tag_affordances_script(xpath)?).await
    }

    async fn activate_affordance(&mut self, index: usize) -> Result<(), SessionError> {
        if self.evaluate::<bool>(click_tagged_script(index)).await? {
            Ok(())
        } else {
            Err(SessionError::Script(format!("affordance {index} is gone")))
        }
    }

    fn clear_traffic(&mut self) {
        self.lock_traffic().clear();
    }

    fn take_traffic(&mut self) -> Vec<String> {
        std::mem::take(&mut *self.lock_traffic())
    }

    async fn close(mut self: Box<Self>) {
        // The handler task must keep running until the close command is answered.
        if let Err(err) = self.browser.close().await {
            engine_warn!("Browser did not close cleanly: {}", err);
        }
        if let Err(err) = self.browser.wait().await {
            engine_warn!("Waiting for browser exit failed: {}", err);
        }
        engine_info!("Browser closed");
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // `Browser` kills its own child process when dropped.
        for task in &self.tasks {
            task.abort();
        }
    }
}
