use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref HTTP_URL: Regex = Regex::new(r"^https?://[^,\s]+$").expect("valid regex");
}

/// Cheap syntactic check used before parsing user supplied URLs.
pub fn looks_like_http_url(raw: &str) -> bool {
    HTTP_URL.is_match(raw)
}

/// Host of the URL, lowercased, without a leading `www.`.
pub fn registrable_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

pub fn same_domain(a: &Url, b: &Url) -> bool {
    match (registrable_domain(a), registrable_domain(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Site relative path of a page: `/` for the root, otherwise the URL path
/// with trailing slashes removed.
pub fn page_path(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a user supplied URL, accepting only http(s) URLs with a host.
pub fn parse_http_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if !looks_like_http_url(raw) {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url)
}
