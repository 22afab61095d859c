use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static SHORTS_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/shorts/([^/?]+)").unwrap());

// Fallbacks for strings `Url` refuses to parse (relative paths, bare fragments).
static RAW_WATCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]v=([^&]+)").unwrap());
static RAW_SHORTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"/shorts/([^/?&]+)").unwrap());

/// What kind of player page a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Watch,
    Shorts,
    Other,
}

/// Extract the video identifier from a page URL.
///
/// The `v` query parameter wins; otherwise a `/shorts/<id>` path prefix is
/// matched. Anything else resolves to `None`.
pub fn resolve(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }

    match Url::parse(url) {
        Ok(parsed) => {
            if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                if !id.is_empty() {
                    return Some(id.into_owned());
                }
            }
            SHORTS_PATH
                .captures(parsed.path())
                .map(|c| c[1].to_string())
        }
        Err(_) => {
            if let Some(c) = RAW_WATCH.captures(url) {
                return Some(c[1].to_string());
            }
            RAW_SHORTS.captures(url).map(|c| c[1].to_string())
        }
    }
}

/// Classify a URL as a watch page, a shorts page or neither.
pub fn page_kind(url: &str) -> PageKind {
    match Url::parse(url) {
        Ok(parsed) => {
            let has_watch_id = parsed.query_pairs().any(|(k, v)| k == "v" && !v.is_empty());
            if parsed.path() == "/watch" && has_watch_id {
                PageKind::Watch
            } else if SHORTS_PATH.is_match(parsed.path()) {
                PageKind::Shorts
            } else {
                PageKind::Other
            }
        }
        Err(_) => {
            if RAW_WATCH.is_match(url) {
                PageKind::Watch
            } else if RAW_SHORTS.is_match(url) {
                PageKind::Shorts
            } else {
                PageKind::Other
            }
        }
    }
}
