use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;

use crate::persist::{PersistError, StagedFile};
use crate::{EngineEvent, FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Longest silence tolerated while waiting for the next bytes.
    pub read_timeout: Duration,
    /// Largest slice written to disk in one call.
    pub chunk_size: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            chunk_size: 8 * 1024,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Discards every event.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Performs one download attempt of `url` into `destination`.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_to_file(&self, url: &str, destination: &Path) -> Result<u64, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .read_timeout(self.settings.read_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch_to_file(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = self.build_client()?;

        let response = client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let mut staged = StagedFile::create(destination).map_err(map_persist_error)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: Bytes = chunk.map_err(map_reqwest_error)?;
            staged
                .write_chunked(&chunk, self.settings.chunk_size)
                .map_err(map_persist_error)?;
        }

        staged.commit().map_err(map_persist_error)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

fn map_persist_error(err: PersistError) -> FetchError {
    FetchError::new(FailureKind::Io, err.to_string())
}
