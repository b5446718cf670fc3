use std::path::{Path, PathBuf};

use url::Url;

use crate::AssetId;

/// A URL together with where it should land on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub destination: PathBuf,
}

impl DownloadTask {
    /// `<base>/<issuer_code>/<decoded_filename>`; `None` when the URL has no
    /// file name or the issuer code cannot name a folder.
    pub fn new(base: &Path, asset: &AssetId, url: &str) -> Option<Self> {
        let filename = filename_from_url(url)?;
        Some(Self {
            url: url.to_string(),
            destination: issuer_dir(base, asset)?.join(filename),
        })
    }
}

/// Folder grouping every document of one issuer, always a direct child of `base`.
pub fn issuer_dir(base: &Path, asset: &AssetId) -> Option<PathBuf> {
    path_segment(asset.issuer_code()).map(|segment| base.join(segment))
}

/// Percent-decoded final path segment of `url`.
///
/// Characters that cannot appear in a file name are replaced by `_`, so the
/// result never escapes the issuer folder.
pub fn filename_from_url(url: &str) -> Option<String> {
    let raw_segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_owned),
        Err(_) => {
            let without_query = url.split(['?', '#']).next().unwrap_or(url);
            without_query.rsplit('/').next().map(str::to_owned)
        }
    }?;

    let decoded = urlencoding::decode_binary(raw_segment.as_bytes());
    path_segment(&String::from_utf8_lossy(&decoded))
}

/// `raw` as a single path component: forbidden characters become `_`, and
/// names that would refer to the current or parent folder are refused.
fn path_segment(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}
