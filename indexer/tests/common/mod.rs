//! Shared fixtures for orchestrator and indexer integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::RwLock;
use sitesearch_core::config::{AppConfig, CrawlSettings, SearchSettings, SiteConfig};
use sitesearch_core::index::{Site, SiteId, SiteStatus};
use sitesearch_core::morphology::{word_spans, Morphology};
use sitesearch_core::store::{IndexStore, MemoryStore};
use sitesearch_core::text;
use sitesearch_crawler::{FetchOutcome, FetchedPage, Fetcher};
use sitesearch_indexer::Orchestrator;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// In-memory web whose pages can be edited between fetches.
#[derive(Default)]
pub struct MockWeb {
    pages: RwLock<HashMap<String, FetchOutcome>>,
    slow_hosts: RwLock<HashMap<String, Duration>>,
}

impl MockWeb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn key(url: &str) -> String {
        Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
    }

    pub fn set_page(&self, url: &str, body: &str) {
        let html = format!("<html><head><title>{url}</title></head><body>{body}</body></html>");
        self.set_outcome(url, FetchOutcome::Page(FetchedPage::html(200, html)));
    }

    pub fn set_outcome(&self, url: &str, outcome: FetchOutcome) {
        self.pages.write().insert(Self::key(url), outcome);
    }

    pub fn slow_down(&self, host: &str, latency: Duration) {
        self.slow_hosts.write().insert(host.to_string(), latency);
    }
}

#[async_trait]
impl Fetcher for MockWeb {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        let latency = url.host_str().and_then(|h| self.slow_hosts.read().get(h).copied());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.pages
            .read()
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| FetchOutcome::Page(FetchedPage::html(404, "")))
    }
}

pub fn config(sites: &[(&str, &str)]) -> AppConfig {
    AppConfig {
        sites: sites.iter().map(|(url, name)| SiteConfig { url: url.to_string(), name: name.to_string() }).collect(),
        crawl: CrawlSettings { politeness_delay_ms: 0, concurrency: 2, ..CrawlSettings::default() },
        search: SearchSettings::default(),
    }
}

pub struct Harness {
    pub web: Arc<MockWeb>,
    pub store: Arc<dyn IndexStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub morphology: Morphology,
}

impl Harness {
    pub fn new(sites: &[(&str, &str)], web: Arc<MockWeb>) -> Self {
        Self::with_store(sites, web, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(sites: &[(&str, &str)], web: Arc<MockWeb>, store: Arc<dyn IndexStore>) -> Self {
        let morphology = Morphology::standard();
        let orchestrator = Arc::new(Orchestrator::new(&config(sites), store.clone(), web.clone(), morphology.clone()));
        Self { web, store, orchestrator, morphology }
    }

    pub fn site(&self, url: &str) -> Site {
        self.store.site_by_url(url).unwrap().expect("site row")
    }

    /// Poll until `check` holds, failing after a few seconds.
    pub async fn eventually<F: Fn(&Harness) -> bool>(&self, check: F) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !check(self) {
            assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Three page site: the root links to /a and /b.
pub fn alpha(web: &MockWeb) {
    web.set_page("https://alpha.test/", r#"<p>Welcome home.</p><a href="/a">a</a><a href="/b">b</a><a href="/a/#top">again</a>"#);
    web.set_page("https://alpha.test/a", "<p>The fox met a dog.</p>");
    web.set_page("https://alpha.test/b", "<p>A fox and three foxes chased the cat.</p>");
}

/// Every lemma's document frequency equals the number of its pages.
pub fn assert_document_frequencies(store: &dyn IndexStore, site_id: SiteId) {
    let mut holders: HashMap<u64, HashSet<u64>> = HashMap::new();
    for page in store.site_pages(site_id).unwrap() {
        for posting in store.postings_for_page(page.id).unwrap() {
            assert!(posting.weight > 0.0);
            holders.entry(posting.lemma_id).or_default().insert(page.id);
        }
    }
    let lemmas = store.site_lemmas(site_id).unwrap();
    for lemma in &lemmas {
        let pages = holders.get(&lemma.id).map(HashSet::len).unwrap_or(0);
        assert_eq!(lemma.document_frequency as usize, pages, "document frequency of {}", lemma.text);
    }
    assert_eq!(lemmas.len(), holders.len());
}

/// Sum of posting weights equals the number of lemma readings on the page.
pub fn assert_weight_sums(store: &dyn IndexStore, morphology: &Morphology, site_id: SiteId) {
    for page in store.site_pages(site_id).unwrap() {
        if !page.is_ok() {
            continue;
        }
        let full = text::extract(&page.content).full_text();
        let expected: usize = word_spans(&full).into_iter().map(|r| morphology.lemma_set(&full[r]).len()).sum();
        let actual: f32 = store.postings_for_page(page.id).unwrap().iter().map(|p| p.weight).sum();
        assert_eq!(actual as usize, expected, "weights of {}", page.path);
    }
}

pub fn status_of(h: &Harness, url: &str) -> Option<SiteStatus> {
    h.store.site_by_url(url).ok().flatten().map(|s| s.status)
}
