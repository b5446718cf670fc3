//! Deed engine: browser discovery, ledger IO and the download pipeline.
mod assets;
mod browser;
mod discovery;
mod download;
mod fetch;
mod ledger;
mod persist;
mod session;
mod types;

pub use assets::{load_asset_list, AssetListError};
pub use browser::{find_browser_executable, BrowserSettings, ChromiumFactory, ChromiumSession};
pub use discovery::{DiscoveryEngine, DiscoverySettings, ASSET_PLACEHOLDER};
pub use download::{DownloadEngine, DownloadRecord, DownloadReport, DownloadSettings};
pub use fetch::{FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher};
pub use ledger::{read_ledger, write_ledger, LedgerError};
pub use persist::{ensure_output_dir, existing_download_size, AtomicFileWriter, PersistError, StagedFile};
pub use session::{PageSession, SessionFactory};
pub use types::{EngineEvent, FailureKind, FetchError, SessionError};
