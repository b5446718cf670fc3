use std::collections::BTreeSet;

use crate::{AssetId, DiscoveryResult, LedgerRow};

/// Distinct document URLs for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkSet(BTreeSet<String>);

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trimmed, non-empty URL. Returns false for blanks and duplicates.
    pub fn insert(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        self.0.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains(url)
    }
}

impl<S: AsRef<str>> FromIterator<S> for LinkSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = LinkSet::new();
        for url in iter {
            set.insert(url.as_ref());
        }
        set
    }
}

impl From<&DiscoveryResult> for LinkSet {
    fn from(result: &DiscoveryResult) -> Self {
        result.urls().iter().collect()
    }
}

/// Assets with their link sets, in first-seen order.
pub type LinkCollection = Vec<(AssetId, LinkSet)>;

/// Turns ledger rows into per-asset link sets.
///
/// Rows without documents are skipped. A repeated asset keeps its original
/// position but takes the set from the later row.
pub fn collect_links<'a, I>(rows: I) -> LinkCollection
where
    I: IntoIterator<Item = &'a LedgerRow>,
{
    let mut collected: LinkCollection = Vec::new();
    for row in rows {
        if row.has_no_documents() {
            continue;
        }
        let mut links = LinkSet::new();
        links.insert(&row.original_link);
        if row.recent_link.trim() != row.original_link.trim() {
            links.insert(&row.recent_link);
        }
        if links.is_empty() {
            continue;
        }
        match collected.iter_mut().find(|(asset, _)| *asset == row.asset) {
            Some(entry) => entry.1 = links,
            None => collected.push((row.asset.clone(), links)),
        }
    }
    collected
}

/// Total URL count across a collection.
pub fn total_links(collection: &LinkCollection) -> usize {
    collection.iter().map(|(_, links)| links.len()).sum()
}
