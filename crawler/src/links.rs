use lazy_static::lazy_static;
use parking_lot::Mutex;
use scraper::{Html, Selector};
use sitesearch_core::urls::{page_path, registrable_domain, same_domain};
use std::collections::HashSet;
use url::Url;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").expect("valid selector");
}

const ASSET_EXTENSIONS: &[&str] = &[
    "7z", "avi", "bmp", "css", "csv", "doc", "docx", "eps", "exe", "gif", "gz", "ico", "jpeg", "jpg", "js", "json",
    "m4a", "mov", "mp3", "mp4", "nc", "ogg", "pdf", "png", "ppt", "pptx", "rar", "rss", "svg", "tar", "tgz", "tif",
    "tiff", "txt", "wav", "webm", "webp", "woff", "woff2", "xls", "xlsx", "xml", "zip",
];

/// Absolute http(s) targets of every anchor, without fragments.
pub fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    doc.select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| {
            let href = href.trim();
            if href.is_empty() || href.starts_with('#') {
                return None;
            }
            base.join(href).ok()
        })
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(|mut u| {
            u.set_fragment(None);
            u
        })
        .collect()
}

/// True for URLs whose last path segment carries a non-HTML file extension.
pub fn is_asset(url: &Url) -> bool {
    let last = url.path_segments().and_then(|mut s| s.next_back()).unwrap_or("");
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ASSET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        _ => false,
    }
}

/// Dedup key: registrable domain plus normalized page path.
pub fn visit_key(url: &Url) -> Option<String> {
    Some(format!("{}{}", registrable_domain(url)?, page_path(url)))
}

/// Links of `html` worth following from a crawl rooted at `root`.
pub fn candidate_links(html: &str, page: &Url, root: &Url) -> Vec<Url> {
    extract_links(html, page)
        .into_iter()
        .filter(|u| !is_asset(u) && same_domain(u, root))
        .collect()
}

/// URLs already scheduled in one crawl. `claim` is an atomic add-if-absent.
#[derive(Default)]
pub struct VisitedSet {
    keys: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true exactly once per key, for the first caller.
    pub fn claim(&self, url: &Url) -> bool {
        match visit_key(url) {
            Some(key) => self.keys.lock().insert(key),
            None => false,
        }
    }

    pub fn contains(&self, url: &Url) -> bool {
        visit_key(url).is_some_and(|key| self.keys.lock().contains(&key))
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn resolves_and_filters_anchors() {
        let base = url("https://site.test/docs/index.html");
        let html = r##"
            <a href="intro">rel</a>
            <a href="/about#team">abs</a>
            <a href="#top">frag</a>
            <a href="mailto:me@site.test">mail</a>
            <a href="https://other.test/x">ext</a>
            <a>no href</a>
        "##;
        let links: Vec<String> = extract_links(html, &base).into_iter().map(|u| u.to_string()).collect();
        assert_eq!(
            links,
            vec!["https://site.test/docs/intro", "https://site.test/about", "https://other.test/x"]
        );
    }

    #[test]
    fn detects_assets_by_extension() {
        assert!(is_asset(&url("https://site.test/files/report.PDF")));
        assert!(is_asset(&url("https://site.test/img/logo.png?v=2")));
        assert!(!is_asset(&url("https://site.test/page.html")));
        assert!(!is_asset(&url("https://site.test/about")));
        assert!(!is_asset(&url("https://site.test/.well-known")));
    }

    #[test]
    fn keeps_only_same_domain_pages() {
        let root = url("https://www.site.test/");
        let html = r#"<a href="/a">a</a><a href="https://site.test/b">b</a><a href="https://cdn.test/c">c</a><a href="/d.jpg">d</a>"#;
        let links: Vec<String> =
            candidate_links(html, &root, &root).into_iter().map(|u| u.path().to_string()).collect();
        assert_eq!(links, vec!["/a", "/b"]);
    }

    #[test]
    fn claims_each_page_once() {
        let visited = VisitedSet::new();
        assert!(visited.claim(&url("https://site.test/a/")));
        assert!(!visited.claim(&url("https://www.site.test/a")));
        assert!(!visited.claim(&url("https://site.test/a?x=1")));
        assert!(visited.claim(&url("https://site.test/b")));
        assert!(visited.contains(&url("https://site.test/b/")));
        assert_eq!(visited.len(), 2);
    }
}
