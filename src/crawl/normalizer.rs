//! URL normalization for the crawl frontier.

use url::Url;

/// True when the URL is http(s) with a non-empty host.
fn is_valid_http_url(url: &Url) -> bool {
    url.has_host() && matches!(url.scheme(), "http" | "https")
}

/// Normalize a raw href against its page's base URL.
///
/// Absolute http(s) URLs pass through; relative references are resolved
/// against `base`. Anything else (empty input, unsupported schemes,
/// unparseable references) yields `None`.
pub fn normalize(raw: &str, base: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(raw) {
        return is_valid_http_url(&url).then(|| url.to_string());
    }

    let base = Url::parse(base).ok()?;
    let resolved = base.join(raw).ok()?;
    is_valid_http_url(&resolved).then(|| resolved.to_string())
}
