//! Full reindex, cancellation and single-page updates over the configured sites.

use crate::page::{IndexOutcome, PageIndexer, SiteSink};
use parking_lot::Mutex;
use sitesearch_core::config::{AppConfig, SiteConfig};
use sitesearch_core::error::STOPPED_BY_USER;
use sitesearch_core::index::{Site, SiteStatus};
use sitesearch_core::morphology::Morphology;
use sitesearch_core::stats::{self, Statistics};
use sitesearch_core::store::IndexStore;
use sitesearch_core::urls::{page_path, parse_http_url, same_domain};
use sitesearch_core::{Error, Result};
use sitesearch_crawler::{CrawlContext, CrawlReport, Crawler, Fetcher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tracing::{info, warn};
use url::Url;

struct RunState {
    start: tokio::sync::Mutex<()>,
    active: AtomicUsize,
    idle: Notify,
    context: Mutex<Option<CrawlContext>>,
    /// Held exclusively while a full reindex wipes and recreates sites.
    reset: RwLock<()>,
    site_rows: Mutex<()>,
}

/// Marks one site crawl as active until dropped.
struct ActiveGuard(Arc<RunState>);

impl ActiveGuard {
    fn new(state: Arc<RunState>) -> Self {
        state.active.fetch_add(1, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if self.0.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct Orchestrator {
    sites: Vec<SiteConfig>,
    store: Arc<dyn IndexStore>,
    fetcher: Arc<dyn Fetcher>,
    crawler: Arc<Crawler>,
    indexer: Arc<PageIndexer>,
    state: Arc<RunState>,
}

fn site_outcome(result: Result<CrawlReport>) -> (SiteStatus, Option<String>) {
    match result {
        Ok(report) if report.interrupted => (SiteStatus::Failed, Some(STOPPED_BY_USER.to_string())),
        Ok(report) if report.pages == 0 => {
            let reason = report.root_error.unwrap_or_else(|| "no pages found".to_string());
            (SiteStatus::Failed, Some(format!("site root is unavailable: {reason}")))
        }
        Ok(_) => (SiteStatus::Indexed, None),
        Err(e) => (SiteStatus::Failed, Some(e.to_string())),
    }
}

impl Orchestrator {
    pub fn new(config: &AppConfig, store: Arc<dyn IndexStore>, fetcher: Arc<dyn Fetcher>, morphology: Morphology) -> Self {
        let crawler = Arc::new(Crawler::new(fetcher.clone(), config.crawl.clone()));
        let indexer = Arc::new(PageIndexer::new(store.clone(), morphology));
        Self {
            sites: config.sites.clone(),
            store,
            fetcher,
            crawler,
            indexer,
            state: Arc::new(RunState {
                start: tokio::sync::Mutex::new(()),
                active: AtomicUsize::new(0),
                idle: Notify::new(),
                context: Mutex::new(None),
                reset: RwLock::new(()),
                site_rows: Mutex::new(()),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    pub fn indexer(&self) -> &Arc<PageIndexer> {
        &self.indexer
    }

    pub fn is_indexing(&self) -> bool {
        self.state.active.load(Ordering::SeqCst) > 0
    }

    pub fn statistics(&self) -> Result<Statistics> {
        stats::collect(self.store.as_ref(), self.is_indexing())
    }

    /// Wipe the index and crawl every configured site in the background.
    pub async fn start_indexing(&self) -> Result<()> {
        let _start = self.state.start.lock().await;
        if self.is_indexing() {
            return Err(Error::AlreadyRunning);
        }
        let _reset = self.state.reset.write().await;
        self.store.clear()?;
        let ctx = CrawlContext::new();
        *self.state.context.lock() = Some(ctx.clone());

        for config in &self.sites {
            let root = parse_http_url(&config.url).ok_or_else(|| Error::InvalidUrl(config.url.clone()))?;
            let site = self.store.insert_site(&config.url, &config.name, SiteStatus::Indexing)?;
            let guard = ActiveGuard::new(self.state.clone());
            let crawler = self.crawler.clone();
            let store = self.store.clone();
            let sink = Arc::new(SiteSink::new(self.indexer.clone(), site.id));
            let ctx = ctx.clone();
            info!(site = %site.name, url = %site.url, "site crawl starting");
            tokio::spawn(async move {
                let _guard = guard;
                let result = crawler.crawl(&root, sink, &ctx).await;
                let (status, error) = site_outcome(result);
                match &error {
                    Some(reason) => warn!(site = %site.name, status = %status, error = %reason, "site crawl finished"),
                    None => info!(site = %site.name, status = %status, "site crawl finished"),
                }
                if let Err(e) = store.update_site_status(site.id, status, error.as_deref()) {
                    warn!(site = %site.name, error = %e, "failed to record site status");
                }
            });
        }
        Ok(())
    }

    /// Ask every running site crawl to stop.
    pub fn stop_indexing(&self) -> Result<()> {
        if !self.is_indexing() {
            return Err(Error::NotRunning);
        }
        if let Some(ctx) = self.state.context.lock().as_ref() {
            ctx.cancel();
        }
        info!("indexing stop requested");
        Ok(())
    }

    /// Resolves once no site crawl is active.
    pub async fn wait_for_completion(&self) {
        loop {
            let idle = self.state.idle.notified();
            if !self.is_indexing() {
                return;
            }
            idle.await;
        }
    }

    fn owning_site(&self, url: &Url) -> Option<&SiteConfig> {
        self.sites
            .iter()
            .find(|site| parse_http_url(&site.url).is_some_and(|root| same_domain(&root, url)))
    }

    fn site_row(&self, config: &SiteConfig) -> Result<(Site, bool)> {
        let _rows = self.state.site_rows.lock();
        match self.store.site_by_url(&config.url)? {
            Some(site) => Ok((site, false)),
            None => Ok((self.store.insert_site(&config.url, &config.name, SiteStatus::Indexing)?, true)),
        }
    }

    /// Replace the stored copy of a single page of a configured site.
    pub async fn index_page(&self, raw_url: &str) -> Result<IndexOutcome> {
        let url = parse_http_url(raw_url).ok_or_else(|| Error::InvalidUrl(raw_url.trim().to_string()))?;
        let config = self
            .owning_site(&url)
            .ok_or_else(|| Error::OutsideConfiguredSites(url.to_string()))?;

        let _reset = self.state.reset.read().await;
        let (site, created) = self.site_row(config)?;
        self.indexer.remove_page(site.id, &page_path(&url))?;
        let outcome = self.indexer.index_url(self.fetcher.as_ref(), site.id, &url).await?;
        if created {
            self.store.update_site_status(site.id, SiteStatus::Indexed, None)?;
        }
        info!(site = %site.name, url = %url, outcome = ?outcome, "page reindexed");
        Ok(outcome)
    }
}
