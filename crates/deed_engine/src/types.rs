use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use deed_core::{AssetId, DiscoveryStatus, DownloadOutcome};
use thiserror::Error;

/// Progress reported while the engines run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    AssetStarted {
        asset: AssetId,
        position: usize,
        total: usize,
    },
    ConsentDismissed {
        asset: AssetId,
    },
    AffordancesFound {
        asset: AssetId,
        count: usize,
    },
    DocumentCaptured {
        asset: AssetId,
        url: String,
    },
    AssetDiscovered {
        asset: AssetId,
        status: DiscoveryStatus,
    },
    SessionRecycled,
    DownloadAttempt {
        url: String,
        attempt: u32,
        max_attempts: u32,
    },
    AttemptFailed {
        url: String,
        attempt: u32,
        error: FetchError,
    },
    DownloadFinished {
        asset: AssetId,
        url: String,
        destination: Option<PathBuf>,
        outcome: DownloadOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind.is_transport()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Io,
}

impl FailureKind {
    /// Transport failures are worth another attempt; everything else is final.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FailureKind::HttpStatus(_) | FailureKind::Timeout | FailureKind::Network
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}

/// Failures of the browser session while discovering one asset.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no Chrome/Chromium executable found")]
    BrowserNotFound,
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("invalid page url: {0}")]
    InvalidPageUrl(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("{what} timed out after {after:?}")]
    Timeout { what: &'static str, after: Duration },
    #[error("page script failed: {0}")]
    Script(String),
}
