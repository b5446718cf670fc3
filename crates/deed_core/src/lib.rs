//! Deed core: domain types and the pure discovery batch state machine.
mod asset;
mod classify;
mod destination;
mod discovery;
mod effect;
mod ledger;
mod links;
mod msg;
mod state;
mod tally;
mod update;
mod view_model;

pub use asset::{parse_asset_list, AssetId};
pub use classify::DocumentClassifier;
pub use destination::{filename_from_url, issuer_dir, DownloadTask};
pub use discovery::{truncate_chars, DiscoveryResult, DiscoveryStatus, ERROR_MESSAGE_LIMIT};
pub use effect::Effect;
pub use ledger::{LedgerRow, LEDGER_HEADERS};
pub use links::{collect_links, total_links, LinkCollection, LinkSet};
pub use msg::Msg;
pub use state::{BatchState, DEFAULT_ERROR_THRESHOLD};
pub use tally::{DownloadOutcome, RunTally};
pub use update::update;
pub use view_model::BatchSummary;
