use std::fmt;

const ISSUER_CODE_LEN: usize = 4;

/// Normalized asset ticker: trimmed and uppercased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(String);

impl AssetId {
    /// Normalizes `raw`; returns `None` when nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First four characters, identifying the issuing entity.
    pub fn issuer_code(&self) -> &str {
        match self.0.char_indices().nth(ISSUER_CODE_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One identifier per line; blank lines are ignored and input order is kept.
pub fn parse_asset_list(raw: &str) -> Vec<AssetId> {
    raw.lines().filter_map(AssetId::parse).collect()
}
