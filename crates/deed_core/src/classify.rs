//! Decides whether an intercepted request points at a deed document.
//!
//! The portal gives no stable signal for "this is the deed", so the decision is
//! a heuristic over host, extension and keywords. Keep every rule in here so a
//! change on the target site touches a single place.
use url::Url;

const DEFAULT_HOST_PATTERNS: &[&str] = &["s3.amazonaws.com"];
const DEFAULT_KEYWORDS: &[&str] = &["escritura", "deed", "indenture"];
const DOCUMENT_EXTENSION: &str = ".pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentClassifier {
    host_patterns: Vec<String>,
    keywords: Vec<String>,
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_HOST_PATTERNS.iter().copied(),
            DEFAULT_KEYWORDS.iter().copied(),
        )
    }
}

impl DocumentClassifier {
    pub fn new<H, K>(host_patterns: H, keywords: K) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Self {
            host_patterns: host_patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn host_patterns(&self) -> &[String] {
        &self.host_patterns
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True iff `url` is on an object store, names a PDF and mentions a keyword.
    pub fn is_document_url(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        if !self.is_object_store_host(host) {
            return false;
        }
        if !parsed
            .path()
            .to_ascii_lowercase()
            .ends_with(DOCUMENT_EXTENSION)
        {
            return false;
        }
        let lowered = url.to_lowercase();
        self.keywords.iter().any(|kw| lowered.contains(kw.as_str()))
    }

    fn is_object_store_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.host_patterns.iter().any(|pattern| {
            host == *pattern
                || host.ends_with(&format!(".{pattern}"))
                || is_regional_variant(&host, pattern)
        })
    }
}

/// `s3.amazonaws.com` also serves as `s3.<region>.amazonaws.com` and
/// `s3-<region>.amazonaws.com`, with or without a bucket prefix.
fn is_regional_variant(host: &str, pattern: &str) -> bool {
    let Some((service, domain)) = pattern.split_once('.') else {
        return false;
    };
    let suffix = format!(".{domain}");
    let Some(head) = host.strip_suffix(&suffix) else {
        return false;
    };
    let labels: Vec<&str> = head.split('.').collect();
    labels.iter().enumerate().any(|(idx, label)| {
        let dashed = label
            .strip_prefix(service)
            .is_some_and(|rest| rest.starts_with('-') && rest.len() > 1);
        // `s3.<region>` needs the region label to be the last one before the domain.
        let dotted = *label == service && idx + 2 == labels.len();
        dashed || dotted
    })
}
