//! Tab codec.
//!
//! Shrinks browser tabs into [`TabRecord`]s before they are persisted and
//! rebuilds full URLs when a saved tab is opened again. The synchronized
//! tier has a tight byte budget, so every stored field is shortened:
//!
//! - `u`: URL without scheme, leading `www.` or trailing slash
//! - `t`: title capped at 100 characters
//! - `f`: favicon file name without path or query
//! - `p`: the scheme, so `u` can be expanded again

use thiserror::Error;

use crate::types::{BrowserTab, Protocol, TabRecord};

/// Titles longer than this are truncated.
pub const MAX_TITLE_CHARS: usize = 100;

const ELLIPSIS: &str = "...";
const TRUNCATED_TITLE_CHARS: usize = MAX_TITLE_CHARS - ELLIPSIS.len();

/// Errors compressing a single tab.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host or path: {0}")]
    EmptyLocation(String),
}

/// Whether a tab URL can be saved into a collection (http and https only).
pub fn is_saveable(url: &str) -> bool {
    split_scheme(url).is_some()
}

/// Compress one tab.
pub fn compress(tab: &BrowserTab) -> Result<TabRecord, CodecError> {
    let (p, rest) =
        split_scheme(&tab.url).ok_or_else(|| CodecError::UnsupportedScheme(tab.url.clone()))?;

    let u = strip_location(rest);
    if u.is_empty() {
        return Err(CodecError::EmptyLocation(tab.url.clone()));
    }

    Ok(TabRecord {
        u: u.to_string(),
        t: truncate_title(&tab.title),
        f: tab.fav_icon_url.as_deref().map(favicon_name).unwrap_or_default(),
        p,
    })
}

/// Compress every saveable tab, skipping (and logging) tabs that fail.
///
/// One malformed tab never blocks saving the rest of the window.
pub fn compress_all(tabs: &[BrowserTab]) -> Vec<TabRecord> {
    tabs.iter()
        .filter(|tab| is_saveable(&tab.url))
        .filter_map(|tab| match compress(tab) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(url = %tab.url, error = %e, "Error compressing tab");
                None
            }
        })
        .collect()
}

/// Rebuild the full URL of a saved tab.
pub fn expand(record: &TabRecord) -> String {
    if record.u.starts_with("http://") || record.u.starts_with("https://") {
        return record.u.clone();
    }
    format!("{}://{}", record.p.as_str(), record.u)
}

/// The `u` key a full URL would be stored under.
///
/// Selections in the popup carry expanded URLs; this maps them back to the
/// key used by [`crate::CollectionStore::delete_tab`].
pub fn compressed_key(url: &str) -> String {
    match split_scheme(url) {
        Some((_, rest)) => strip_location(rest).to_string(),
        None => url.to_string(),
    }
}

fn split_scheme(url: &str) -> Option<(Protocol, &str)> {
    if let Some(rest) = url.strip_prefix("https://") {
        Some((Protocol::Https, rest))
    } else {
        url.strip_prefix("http://").map(|rest| (Protocol::Http, rest))
    }
}

fn strip_location(rest: &str) -> &str {
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest.strip_suffix('/').unwrap_or(rest)
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let mut truncated: String = title.chars().take(TRUNCATED_TITLE_CHARS).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

fn favicon_name(fav_icon_url: &str) -> String {
    let file = fav_icon_url.rsplit('/').next().unwrap_or_default();
    file.split('?').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_strips_scheme_www_and_slash() {
        let tab = BrowserTab::new("https://www.example.com/docs/", "Docs")
            .with_favicon("https://www.example.com/static/favicon.png?v=3");
        let record = compress(&tab).unwrap();

        assert_eq!(record.u, "example.com/docs");
        assert_eq!(record.t, "Docs");
        assert_eq!(record.f, "favicon.png");
        assert_eq!(record.p, Protocol::Https);
    }

    #[test]
    fn test_compress_keeps_http_scheme() {
        let record = compress(&BrowserTab::new("http://intranet.local/", "Intranet")).unwrap();
        assert_eq!(record.u, "intranet.local");
        assert_eq!(record.p, Protocol::Http);
        assert_eq!(record.f, "");
    }

    #[test]
    fn test_compress_rejects_other_schemes() {
        let err = compress(&BrowserTab::new("chrome://extensions", "Extensions")).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedScheme(_)));

        let err = compress(&BrowserTab::new("https://www./", "Nothing")).unwrap_err();
        assert!(matches!(err, CodecError::EmptyLocation(_)));
    }

    #[test]
    fn test_title_truncation() {
        let exact = "a".repeat(100);
        assert_eq!(truncate_title(&exact), exact);

        let long = "b".repeat(150);
        let truncated = truncate_title(&long);
        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.ends_with("..."));
        assert!(truncated.starts_with(&"b".repeat(97)));

        // Multi-byte titles are cut on character boundaries.
        let wide = "é".repeat(120);
        assert_eq!(truncate_title(&wide).chars().count(), 100);
    }

    #[test]
    fn test_compress_all_skips_bad_tabs() {
        let tabs = vec![
            BrowserTab::new("https://rust-lang.org/", "Rust"),
            BrowserTab::new("about:blank", "Blank"),
            BrowserTab::new("https://", "Broken"),
            BrowserTab::new("http://example.org/a", "Example"),
        ];

        let records = compress_all(&tabs);
        let keys: Vec<&str> = records.iter().map(|r| r.u.as_str()).collect();
        assert_eq!(keys, vec!["rust-lang.org", "example.org/a"]);
    }

    #[test]
    fn test_expand() {
        let record = TabRecord {
            u: "example.com/a".into(),
            t: String::new(),
            f: String::new(),
            p: Protocol::Http,
        };
        assert_eq!(expand(&record), "http://example.com/a");

        let legacy = TabRecord {
            u: "https://already.full/x".into(),
            ..record
        };
        assert_eq!(expand(&legacy), "https://already.full/x");
    }

    #[test]
    fn test_expand_compress_preserves_scheme_host_and_path() {
        let urls = [
            ("https://example.com/a/b", "https://example.com/a/b"),
            ("https://www.example.com/", "https://example.com"),
            ("http://news.ycombinator.com/item", "http://news.ycombinator.com/item"),
            ("https://docs.rs/serde/latest/serde/", "https://docs.rs/serde/latest/serde"),
        ];

        for (url, expected) in urls {
            let record = compress(&BrowserTab::new(url, "t")).unwrap();
            assert_eq!(expand(&record), expected, "round trip of {url}");
        }
    }

    #[test]
    fn test_compressed_key_matches_compress() {
        let url = "https://www.example.com/page/";
        let record = compress(&BrowserTab::new(url, "Page")).unwrap();
        assert_eq!(compressed_key(url), record.u);
        assert_eq!(compressed_key(&expand(&record)), record.u);
    }
}
