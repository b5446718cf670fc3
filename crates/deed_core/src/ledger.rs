use crate::{AssetId, DiscoveryResult, DiscoveryStatus};

/// Column headers, in order.
pub const LEDGER_HEADERS: [&str; 4] = ["Ativo", "Link Original", "Link Recente", "Status"];

/// One persisted discovery result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub asset: AssetId,
    pub original_link: String,
    pub recent_link: String,
    pub status: DiscoveryStatus,
}

impl LedgerRow {
    /// The "no documents" rows the link collector drops.
    pub fn has_no_documents(&self) -> bool {
        self.status == DiscoveryStatus::NoneFound || self.original_link.trim().is_empty()
    }
}

impl From<&DiscoveryResult> for LedgerRow {
    fn from(result: &DiscoveryResult) -> Self {
        Self {
            asset: result.asset().clone(),
            original_link: result.original_link().unwrap_or_default().to_string(),
            recent_link: result.recent_link().unwrap_or_default().to_string(),
            status: result.status().clone(),
        }
    }
}
