use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{header, Client};
use sitesearch_core::config::CrawlSettings;
use sitesearch_core::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub status: u16,
    pub content_type: Option<String>,
    /// Empty unless the response is a 200 HTML document.
    pub body: String,
}

impl FetchedPage {
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self { status, content_type: Some("text/html; charset=utf-8".into()), body: body.into() }
    }

    /// Only a plain 200 counts; other 2xx answers are stored without lemmas.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let ct = ct.trim_start().to_ascii_lowercase();
                ct.starts_with("text/html") || ct.starts_with("application/xhtml+xml")
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Page(FetchedPage),
    TimedOut,
    /// Connection, TLS or body errors.
    Failed(String),
}

impl FetchOutcome {
    /// The page, when it is a 200 HTML document worth expanding.
    pub fn html_page(&self) -> Option<&FetchedPage> {
        match self {
            FetchOutcome::Page(page) if page.is_ok() && page.is_html() => Some(page),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchOutcome;
}

pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(settings: &CrawlSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Crawl(format!("http client: {e}")))?;
        Ok(Self { client, max_body_bytes: settings.max_body_bytes })
    }
}

fn failure(e: reqwest::Error) -> FetchOutcome {
    if e.is_timeout() {
        FetchOutcome::TimedOut
    } else {
        FetchOutcome::Failed(e.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        let mut resp = match self.client.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => return failure(e),
        };
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let mut page = FetchedPage { status, content_type, body: String::new() };
        if !(page.is_ok() && page.is_html()) {
            return FetchOutcome::Page(page);
        }
        if resp.content_length().is_some_and(|len| len as usize > self.max_body_bytes) {
            return FetchOutcome::Failed(format!("body exceeds {} bytes", self.max_body_bytes));
        }
        let mut bytes = Vec::new();
        loop {
            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    bytes.extend_from_slice(&chunk);
                    if bytes.len() > self.max_body_bytes {
                        return FetchOutcome::Failed(format!("body exceeds {} bytes", self.max_body_bytes));
                    }
                }
                Ok(None) => break,
                Err(e) => return failure(e),
            }
        }
        page.body = String::from_utf8_lossy(&bytes).into_owned();
        FetchOutcome::Page(page)
    }
}

/// In-memory site for offline runs and tests. Unknown URLs answer 404.
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, FetchOutcome>,
    latency: Duration,
    hits: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(url: &str) -> String {
        Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
    }

    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.with_outcome(url, FetchOutcome::Page(FetchedPage::html(200, html)))
    }

    pub fn with_outcome(mut self, url: &str, outcome: FetchOutcome) -> Self {
        self.responses.insert(Self::key(url), outcome);
        self
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().get(&Self::key(url)).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().values().sum()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        let key = url.to_string();
        *self.hits.lock().entry(key.clone()).or_insert(0) += 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.responses.get(&key) {
            Some(outcome) => outcome.clone(),
            None => FetchOutcome::Page(FetchedPage::html(404, "")),
        }
    }
}
