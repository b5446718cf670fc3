use std::collections::BTreeSet;
use std::time::Duration;

use deed_core::{
    update, AssetId, BatchState, DiscoveryResult, DocumentClassifier, Effect, Msg,
    DEFAULT_ERROR_THRESHOLD,
};
use engine_logging::{clip, engine_debug, engine_info, engine_warn};
use url::Url;

use crate::download::pause;
use crate::fetch::ProgressSink;
use crate::session::{PageSession, SessionFactory};
use crate::{EngineEvent, SessionError};

/// Placeholder replaced by the asset id in [`DiscoverySettings::page_url_template`].
pub const ASSET_PLACEHOLDER: &str = "{asset}";

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub page_url_template: String,
    /// CSS selector whose presence means the page shell has loaded.
    pub ready_selector: String,
    pub navigation_timeout: Duration,
    pub consent_xpath: String,
    pub consent_window: Duration,
    pub consent_settle_delay: Duration,
    /// Wait for client-side rendering; there is no reliable readiness signal.
    pub render_settle_delay: Duration,
    pub affordance_xpath: String,
    /// Wait after each click for the request it triggers.
    pub capture_delay: Duration,
    pub inter_asset_delay: Duration,
    pub error_threshold: u32,
    pub classifier: DocumentClassifier,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            page_url_template: "https://data.anbima.com.br/debentures/{asset}/documentos".to_string(),
            ready_selector: "body".to_string(),
            navigation_timeout: Duration::from_secs(60),
            consent_xpath:
                "//a[contains(@href, 'aceito-as-regras') or contains(text(), 'Prosseguir')]"
                    .to_string(),
            consent_window: Duration::from_secs(5),
            consent_settle_delay: Duration::from_secs(2),
            render_settle_delay: Duration::from_secs(20),
            affordance_xpath: "//a[contains(text(), 'Baixar')]".to_string(),
            capture_delay: Duration::from_secs(2),
            inter_asset_delay: Duration::from_secs(3),
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            classifier: DocumentClassifier::default(),
        }
    }
}

impl DiscoverySettings {
    pub fn page_url(&self, asset: &AssetId) -> Result<String, SessionError> {
        let raw = self.page_url_template.replace(ASSET_PLACEHOLDER, asset.as_str());
        Url::parse(&raw)
            .map(String::from)
            .map_err(|e| SessionError::InvalidPageUrl(format!("{raw}: {e}")))
    }
}

/// Drives one browser session across a batch of assets.
///
/// The session lives only inside [`DiscoveryEngine::run`]; it is recycled
/// after too many consecutive failures and closed before `run` returns.
pub struct DiscoveryEngine<S> {
    factory: S,
    settings: DiscoverySettings,
}

impl<S: SessionFactory> DiscoveryEngine<S> {
    pub fn new(factory: S, settings: DiscoverySettings) -> Self {
        Self { factory, settings }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    pub async fn run(&self, assets: &[AssetId], sink: &dyn ProgressSink) -> BatchState {
        let mut state = BatchState::with_threshold(self.settings.error_threshold);
        let mut session: Option<Box<dyn PageSession>> = None;
        let total = assets.len();

        for (idx, asset) in assets.iter().enumerate() {
            sink.emit(EngineEvent::AssetStarted {
                asset: asset.clone(),
                position: idx + 1,
                total,
            });

            let result = self.discover_asset(&mut session, asset, sink).await;
            sink.emit(EngineEvent::AssetDiscovered {
                asset: asset.clone(),
                status: result.status().clone(),
            });

            let (next, effects) = update(state, Msg::AssetDiscovered(result));
            state = next;
            for effect in effects {
                match effect {
                    Effect::RecycleSession => {
                        engine_warn!("Too many consecutive errors, recreating the browser");
                        self.recycle(&mut session).await;
                        sink.emit(EngineEvent::SessionRecycled);
                    }
                }
            }

            if idx + 1 < total {
                pause(self.settings.inter_asset_delay).await;
            }
        }

        if let Some(session) = session.take() {
            session.close().await;
        }
        state
    }

    /// Never fails: every problem becomes an `Error` result for this asset.
    async fn discover_asset(
        &self,
        slot: &mut Option<Box<dyn PageSession>>,
        asset: &AssetId,
        sink: &dyn ProgressSink,
    ) -> DiscoveryResult {
        if slot.is_none() {
            match self.factory.launch().await {
                Ok(session) => *slot = Some(session),
                Err(err) => {
                    engine_warn!("Browser launch failed: {}", err);
                    return DiscoveryResult::failed(asset.clone(), err.to_string());
                }
            }
        }
        let Some(session) = slot.as_mut() else {
            return DiscoveryResult::failed(asset.clone(), "browser session unavailable");
        };

        match self.scan_page(&mut **session, asset, sink).await {
            Ok(urls) => DiscoveryResult::from_matches(asset.clone(), urls),
            Err(err) => {
                engine_warn!("{}: {}", asset, err);
                DiscoveryResult::failed(asset.clone(), err.to_string())
            }
        }
    }

    async fn scan_page(
        &self,
        session: &mut dyn PageSession,
        asset: &AssetId,
        sink: &dyn ProgressSink,
    ) -> Result<BTreeSet<String>, SessionError> {
        let settings = &self.settings;
        let page_url = settings.page_url(asset)?;
        engine_info!("Opening {}", page_url);

        session.clear_traffic();
        session
            .navigate(&page_url, &settings.ready_selector, settings.navigation_timeout)
            .await?;

        match session
            .dismiss_consent(&settings.consent_xpath, settings.consent_window)
            .await
        {
            Ok(true) => {
                sink.emit(EngineEvent::ConsentDismissed {
                    asset: asset.clone(),
                });
                pause(settings.consent_settle_delay).await;
            }
            Ok(false) => engine_debug!("No consent banner for {}", asset),
            Err(err) => engine_debug!("Consent banner check failed for {}: {}", asset, err),
        }

        pause(settings.render_settle_delay).await;

        let count = session.count_affordances(&settings.affordance_xpath).await?;
        sink.emit(EngineEvent::AffordancesFound {
            asset: asset.clone(),
            count,
        });

        let mut matches = BTreeSet::new();
        for index in 0..count {
            session.clear_traffic();
            if let Err(err) = session.activate_affordance(index).await {
                engine_warn!("{}: click {} failed: {}", asset, index + 1, clip(&err.to_string(), 50));
                continue;
            }
            pause(settings.capture_delay).await;

            for url in session.take_traffic() {
                if settings.classifier.is_document_url(&url) && !matches.contains(&url) {
                    sink.emit(EngineEvent::DocumentCaptured {
                        asset: asset.clone(),
                        url: url.clone(),
                    });
                    matches.insert(url);
                }
            }
        }

        Ok(matches)
    }

    async fn recycle(&self, slot: &mut Option<Box<dyn PageSession>>) {
        if let Some(old) = slot.take() {
            old.close().await;
        }
        match self.factory.launch().await {
            Ok(fresh) => *slot = Some(fresh),
            // The next asset retries the launch.
            Err(err) => engine_warn!("Could not relaunch browser: {}", err),
        }
    }
}
