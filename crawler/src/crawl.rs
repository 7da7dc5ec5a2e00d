use crate::context::CrawlContext;
use crate::fetch::{FetchOutcome, Fetcher};
use crate::links::{candidate_links, VisitedSet};
use sitesearch_core::config::CrawlSettings;
use sitesearch_core::{Error, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

/// Receives every fetch result of a crawl, in completion order.
pub trait PageSink: Send + Sync {
    fn accept(&self, url: &Url, outcome: &FetchOutcome) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// URLs fetched, whatever the outcome.
    pub visited: usize,
    /// Successful HTML pages.
    pub pages: usize,
    /// Timeouts, transport failures and non-200 or non-HTML answers.
    pub failed: usize,
    /// Cancellation was observed while work remained.
    pub interrupted: bool,
    /// Why the root URL did not yield an HTML page, if it did not.
    pub root_error: Option<String>,
}

enum Visit {
    Skipped,
    Done { url: Url, outcome: FetchOutcome, links: Vec<Url> },
}

fn describe(outcome: &FetchOutcome) -> Option<String> {
    match outcome {
        FetchOutcome::TimedOut => Some("request timed out".to_string()),
        FetchOutcome::Failed(e) => Some(e.clone()),
        FetchOutcome::Page(page) if !page.is_ok() => Some(format!("HTTP status {}", page.status)),
        FetchOutcome::Page(page) if !page.is_html() => {
            Some(format!("not an HTML page ({})", page.content_type.as_deref().unwrap_or("no content type")))
        }
        FetchOutcome::Page(_) => None,
    }
}

async fn visit(
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn PageSink>,
    ctx: CrawlContext,
    url: Url,
    root: Url,
    delay: Duration,
) -> Result<Visit> {
    if !delay.is_zero() {
        sleep(delay).await;
    }
    if ctx.is_cancelled() {
        return Ok(Visit::Skipped);
    }
    let outcome = fetcher.fetch(&url).await;
    // Sinks parse, lemmatize and write under a site lock; keep that off the async workers.
    tokio::task::spawn_blocking(move || -> Result<Visit> {
        sink.accept(&url, &outcome)?;
        let links = outcome
            .html_page()
            .map(|page| candidate_links(&page.body, &url, &root))
            .unwrap_or_default();
        Ok(Visit::Done { url, outcome, links })
    })
    .await
    .map_err(|e| Error::Internal(format!("page sink task failed: {e}")))?
}

/// Bounded worker pool over a shared frontier. A crawl ends when the
/// frontier is empty and no fetch is in flight.
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    settings: CrawlSettings,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: CrawlSettings) -> Self {
        Self { fetcher, settings }
    }

    pub async fn crawl(&self, root: &Url, sink: Arc<dyn PageSink>, ctx: &CrawlContext) -> Result<CrawlReport> {
        let mut root = root.clone();
        root.set_fragment(None);
        let visited = VisitedSet::new();
        let mut frontier: VecDeque<Url> = VecDeque::new();
        if visited.claim(&root) {
            frontier.push_back(root.clone());
        }

        let delay = Duration::from_millis(self.settings.politeness_delay_ms);
        let limit = self.settings.concurrency.max(1);
        let mut inflight: JoinSet<Result<Visit>> = JoinSet::new();
        let mut report = CrawlReport::default();

        loop {
            if ctx.is_cancelled() && !frontier.is_empty() {
                report.interrupted = true;
                frontier.clear();
            }
            while inflight.len() < limit {
                let Some(url) = frontier.pop_front() else { break };
                inflight.spawn(visit(
                    self.fetcher.clone(),
                    sink.clone(),
                    ctx.clone(),
                    url,
                    root.clone(),
                    delay,
                ));
            }
            let Some(joined) = inflight.join_next().await else { break };
            let done = joined.map_err(|e| Error::Internal(format!("crawl task failed: {e}")))??;
            let (url, outcome, links) = match done {
                Visit::Skipped => {
                    report.interrupted = true;
                    continue;
                }
                Visit::Done { url, outcome, links } => (url, outcome, links),
            };

            report.visited += 1;
            match describe(&outcome) {
                None => report.pages += 1,
                Some(reason) => {
                    debug!(url = %url, error = %reason, "fetch did not yield a page");
                    report.failed += 1;
                    if url == root {
                        report.root_error = Some(reason);
                    }
                }
            }
            for link in links {
                if ctx.is_cancelled() {
                    report.interrupted = true;
                    break;
                }
                if visited.claim(&link) {
                    frontier.push_back(link);
                }
            }
        }

        info!(
            root = %root,
            visited = report.visited,
            pages = report.pages,
            failed = report.failed,
            interrupted = report.interrupted,
            "crawl finished"
        );
        Ok(report)
    }
}
