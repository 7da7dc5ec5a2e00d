//! Per-page index maintenance.

use parking_lot::Mutex;
use sitesearch_core::index::{NewPage, SiteId};
use sitesearch_core::morphology::Morphology;
use sitesearch_core::store::IndexStore;
use sitesearch_core::text;
use sitesearch_core::urls::page_path;
use sitesearch_core::Result;
use sitesearch_crawler::{FetchOutcome, Fetcher, PageSink};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Status recorded for pages whose fetch failed without an HTTP answer.
pub const FAILED_FETCH_STATUS: u16 = 404;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Page stored and lemmatized.
    Indexed { lemmas: usize },
    /// Page stored with its status code only.
    Stored { status: u16 },
    /// A page with the same path already exists.
    AlreadyIndexed,
    /// Fetch timed out; nothing stored.
    Skipped,
}

/// Writes pages, lemmas and postings for one site at a time.
///
/// The page existence check and every document frequency update for a site
/// run under that site's lock, so concurrent crawl workers never race on a
/// lemma row. Different sites do not contend.
pub struct PageIndexer {
    store: Arc<dyn IndexStore>,
    morphology: Morphology,
    locks: Mutex<HashMap<SiteId, Arc<Mutex<()>>>>,
}

impl PageIndexer {
    pub fn new(store: Arc<dyn IndexStore>, morphology: Morphology) -> Self {
        Self { store, morphology, locks: Mutex::new(HashMap::new()) }
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    fn site_lock(&self, site_id: SiteId) -> Arc<Mutex<()>> {
        self.locks.lock().entry(site_id).or_default().clone()
    }

    /// Persist the result of fetching `url` for `site_id`.
    pub fn record(&self, site_id: SiteId, url: &Url, outcome: &FetchOutcome) -> Result<IndexOutcome> {
        let path = page_path(url);
        let (status, content, lemmas) = match outcome {
            FetchOutcome::TimedOut => {
                debug!(url = %url, "fetch timed out, page skipped");
                return Ok(IndexOutcome::Skipped);
            }
            FetchOutcome::Failed(reason) => {
                debug!(url = %url, error = %reason, "fetch failed");
                (FAILED_FETCH_STATUS, String::new(), None)
            }
            FetchOutcome::Page(page) => match outcome.html_page() {
                Some(_) => {
                    let lemmas = self.morphology.collect_lemmas(&text::extract(&page.body).full_text());
                    (page.status, page.body.clone(), Some(lemmas))
                }
                None => (page.status, String::new(), None),
            },
        };

        let lock = self.site_lock(site_id);
        let _guard = lock.lock();
        if self.store.page_by_path(site_id, &path)?.is_some() {
            return Ok(IndexOutcome::AlreadyIndexed);
        }
        let page = self.store.insert_page(NewPage { site_id, path, status_code: status, content })?;
        let Some(lemmas) = lemmas else {
            return Ok(IndexOutcome::Stored { status });
        };
        for (text, count) in &lemmas {
            let lemma = match self.store.lemma(site_id, text)? {
                Some(existing) => {
                    self.store.set_document_frequency(existing.id, existing.document_frequency + 1)?;
                    existing
                }
                None => self.store.insert_lemma(site_id, text, 1)?,
            };
            self.store.add_posting(page.id, lemma.id, *count as f32)?;
        }
        debug!(url = %url, lemmas = lemmas.len(), "page indexed");
        Ok(IndexOutcome::Indexed { lemmas: lemmas.len() })
    }

    /// Fetch and index a single URL.
    pub async fn index_url(&self, fetcher: &dyn Fetcher, site_id: SiteId, url: &Url) -> Result<IndexOutcome> {
        let outcome = fetcher.fetch(url).await;
        self.record(site_id, url, &outcome)
    }

    /// Delete the page at `path` with its postings, decrementing the document
    /// frequency of every lemma it held and deleting lemmas that reach zero.
    /// Returns whether a page was removed.
    pub fn remove_page(&self, site_id: SiteId, path: &str) -> Result<bool> {
        let lock = self.site_lock(site_id);
        let _guard = lock.lock();
        let Some(page) = self.store.page_by_path(site_id, path)? else {
            return Ok(false);
        };
        for posting in self.store.postings_for_page(page.id)? {
            let Some(lemma) = self.store.lemma_by_id(posting.lemma_id)? else {
                continue;
            };
            if lemma.document_frequency <= 1 {
                self.store.delete_lemma(lemma.id)?;
            } else {
                self.store.set_document_frequency(lemma.id, lemma.document_frequency - 1)?;
            }
        }
        self.store.delete_page(page.id)?;
        debug!(site = site_id, path, "page removed");
        Ok(true)
    }
}

/// Feeds crawl results of one site into a [`PageIndexer`].
pub struct SiteSink {
    indexer: Arc<PageIndexer>,
    site_id: SiteId,
}

impl SiteSink {
    pub fn new(indexer: Arc<PageIndexer>, site_id: SiteId) -> Self {
        Self { indexer, site_id }
    }
}

impl PageSink for SiteSink {
    fn accept(&self, url: &Url, outcome: &FetchOutcome) -> Result<()> {
        self.indexer.record(self.site_id, url, outcome)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesearch_core::index::SiteStatus;
    use sitesearch_core::store::MemoryStore;
    use sitesearch_crawler::FetchedPage;

    fn setup() -> (PageIndexer, Arc<MemoryStore>, SiteId) {
        let store = Arc::new(MemoryStore::new());
        let site = store.insert_site("https://site.test", "Site", SiteStatus::Indexing).unwrap();
        (PageIndexer::new(store.clone(), Morphology::standard()), store, site.id)
    }

    fn url(path: &str) -> Url {
        Url::parse("https://site.test").unwrap().join(path).unwrap()
    }

    fn html(body: &str) -> FetchOutcome {
        FetchOutcome::Page(FetchedPage::html(200, format!("<html><body><p>{body}</p></body></html>")))
    }

    #[test]
    fn indexes_lemmas_with_term_frequency() {
        let (indexer, store, site) = setup();
        let out = indexer.record(site, &url("/a/"), &html("The fox and the foxes saw a dog.")).unwrap();
        assert_eq!(out, IndexOutcome::Indexed { lemmas: 3 });
        let page = store.page_by_path(site, "/a").unwrap().unwrap();
        let fox = store.lemma(site, "fox").unwrap().unwrap();
        assert_eq!(fox.document_frequency, 1);
        let postings = store.postings_for_page(page.id).unwrap();
        let weight = postings.iter().find(|p| p.lemma_id == fox.id).unwrap().weight;
        assert_eq!(weight, 2.0);
    }

    #[test]
    fn rediscovery_is_a_no_op() {
        let (indexer, store, site) = setup();
        indexer.record(site, &url("/a"), &html("fox")).unwrap();
        let again = indexer.record(site, &url("/a/"), &html("fox fox")).unwrap();
        assert_eq!(again, IndexOutcome::AlreadyIndexed);
        assert_eq!(store.lemma(site, "fox").unwrap().unwrap().document_frequency, 1);
    }

    #[test]
    fn failures_and_timeouts() {
        let (indexer, store, site) = setup();
        assert_eq!(indexer.record(site, &url("/slow"), &FetchOutcome::TimedOut).unwrap(), IndexOutcome::Skipped);
        assert!(store.page_by_path(site, "/slow").unwrap().is_none());

        let failed = indexer.record(site, &url("/down"), &FetchOutcome::Failed("refused".into())).unwrap();
        assert_eq!(failed, IndexOutcome::Stored { status: FAILED_FETCH_STATUS });

        let missing = FetchOutcome::Page(FetchedPage::html(500, "<p>fox</p>"));
        assert_eq!(indexer.record(site, &url("/err"), &missing).unwrap(), IndexOutcome::Stored { status: 500 });
        assert_eq!(store.count_lemmas(Some(site)).unwrap(), 0);
        assert_eq!(store.count_pages(Some(site)).unwrap(), 2);
    }

    #[test]
    fn only_200_html_pages_are_lemmatized() {
        let (indexer, store, site) = setup();
        let partial = FetchOutcome::Page(FetchedPage::html(203, "<p>fox</p>"));
        assert_eq!(indexer.record(site, &url("/partial"), &partial).unwrap(), IndexOutcome::Stored { status: 203 });

        let pdf = FetchOutcome::Page(FetchedPage {
            status: 200,
            content_type: Some("application/pdf".into()),
            body: String::new(),
        });
        assert_eq!(indexer.record(site, &url("/doc"), &pdf).unwrap(), IndexOutcome::Stored { status: 200 });

        assert_eq!(store.count_lemmas(Some(site)).unwrap(), 0);
        let stored = store.page_by_path(site, "/partial").unwrap().unwrap();
        assert!(!stored.is_ok());
        assert!(stored.content.is_empty());
    }

    #[test]
    fn removal_rolls_back_frequencies() {
        let (indexer, store, site) = setup();
        indexer.record(site, &url("/a"), &html("fox dog")).unwrap();
        indexer.record(site, &url("/b"), &html("fox")).unwrap();
        assert!(indexer.remove_page(site, "/a").unwrap());
        assert_eq!(store.lemma(site, "fox").unwrap().unwrap().document_frequency, 1);
        assert!(store.lemma(site, "dog").unwrap().is_none());
        assert!(!indexer.remove_page(site, "/a").unwrap());
    }
}
