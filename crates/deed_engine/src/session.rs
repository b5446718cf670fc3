use std::time::Duration;

use async_trait::async_trait;

use crate::SessionError;

/// A live browser tab owned by the discovery engine.
///
/// Implementations capture the URL of every request the page (or a tab it
/// opens) issues, into a buffer drained with [`PageSession::take_traffic`].
#[async_trait]
pub trait PageSession: Send {
    /// Loads `url` and waits until `ready_selector` matches, all within `timeout`.
    async fn navigate(
        &mut self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// Clicks the first element matching `xpath` if it appears within `window`.
    async fn dismiss_consent(&mut self, xpath: &str, window: Duration) -> Result<bool, SessionError>;

    /// Enumerates the elements matching `xpath` once and returns how many there are.
    async fn count_affordances(&mut self, xpath: &str) -> Result<usize, SessionError>;

    /// Dispatches a scripted click on the `index`-th element enumerated by the
    /// last [`PageSession::count_affordances`], even if the page changed since.
    async fn activate_affordance(&mut self, index: usize) -> Result<(), SessionError>;

    fn clear_traffic(&mut self);

    fn take_traffic(&mut self) -> Vec<String>;

    /// Shuts the browser down. Dropping a session without closing it must
    /// still release the browser process.
    async fn close(self: Box<Self>);
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError>;
}
