use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::AssetId;

/// Longest error message kept in a discovery result.
pub const ERROR_MESSAGE_LIMIT: usize = 50;

const FOUND_SUFFIX: &str = " encontrada(s)";
const NONE_FOUND_TEXT: &str = "Nenhuma escritura";
const ERROR_PREFIX: &str = "Erro";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStatus {
    Found(usize),
    NoneFound,
    Error(String),
}

impl DiscoveryStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, DiscoveryStatus::Error(_))
    }

    pub fn has_documents(&self) -> bool {
        matches!(self, DiscoveryStatus::Found(n) if *n > 0)
    }
}

/// Renders the ledger's status column.
impl fmt::Display for DiscoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryStatus::Found(n) => write!(f, "{n}{FOUND_SUFFIX}"),
            DiscoveryStatus::NoneFound => f.write_str(NONE_FOUND_TEXT),
            DiscoveryStatus::Error(message) => write!(f, "{ERROR_PREFIX}: {message}"),
        }
    }
}

/// Parses the ledger's status column. Anything unrecognized is kept as an error.
impl FromStr for DiscoveryStatus {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim();
        if text.contains(NONE_FOUND_TEXT) {
            return Ok(DiscoveryStatus::NoneFound);
        }
        if let Some(count) = text
            .strip_suffix(FOUND_SUFFIX)
            .and_then(|n| n.trim().parse::<usize>().ok())
        {
            return Ok(DiscoveryStatus::Found(count));
        }
        let message = text
            .strip_prefix(ERROR_PREFIX)
            .map(|rest| rest.trim_start_matches(':').trim())
            .unwrap_or(text);
        Ok(DiscoveryStatus::Error(message.to_string()))
    }
}

/// Outcome of discovering one asset. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    asset: AssetId,
    urls: BTreeSet<String>,
    status: DiscoveryStatus,
}

impl DiscoveryResult {
    /// Status follows from the match set: empty means `NoneFound`.
    pub fn from_matches(asset: AssetId, urls: BTreeSet<String>) -> Self {
        let status = if urls.is_empty() {
            DiscoveryStatus::NoneFound
        } else {
            DiscoveryStatus::Found(urls.len())
        };
        Self {
            asset,
            urls,
            status,
        }
    }

    pub fn failed(asset: AssetId, message: impl AsRef<str>) -> Self {
        Self {
            asset,
            urls: BTreeSet::new(),
            status: DiscoveryStatus::Error(truncate_chars(message.as_ref(), ERROR_MESSAGE_LIMIT)),
        }
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn urls(&self) -> &BTreeSet<String> {
        &self.urls
    }

    pub fn status(&self) -> &DiscoveryStatus {
        &self.status
    }

    /// Lexicographically smallest match.
    pub fn original_link(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    /// Lexicographically largest match; equals the original for a single match.
    pub fn recent_link(&self) -> Option<&str> {
        self.urls.last().map(String::as_str)
    }
}

pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
