//! Repository interface over the inverted index and its in-memory implementation.

use crate::index::{Lemma, LemmaId, NewPage, Page, PageId, Posting, Site, SiteId, SiteStatus};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use time::OffsetDateTime;

/// Storage of sites, pages, lemmas and postings.
///
/// Implementations own uniqueness: `(site, path)` for pages and
/// `(site, text)` for lemmas. Deleting a page or a lemma removes its
/// postings. Document frequencies are maintained by the caller.
pub trait IndexStore: Send + Sync {
    /// Remove every posting, lemma, page and site.
    fn clear(&self) -> Result<()>;

    fn insert_site(&self, url: &str, name: &str, status: SiteStatus) -> Result<Site>;
    /// Set the status, stamp the status time and replace the last error.
    fn update_site_status(&self, id: SiteId, status: SiteStatus, last_error: Option<&str>) -> Result<()>;
    fn site(&self, id: SiteId) -> Result<Option<Site>>;
    fn site_by_url(&self, url: &str) -> Result<Option<Site>>;
    fn sites(&self) -> Result<Vec<Site>>;

    fn page_by_path(&self, site_id: SiteId, path: &str) -> Result<Option<Page>>;
    /// Fails with [`Error::Duplicate`] when the `(site, path)` pair exists.
    fn insert_page(&self, page: NewPage) -> Result<Page>;
    fn pages_by_ids(&self, ids: &[PageId]) -> Result<Vec<Page>>;
    fn delete_page(&self, id: PageId) -> Result<()>;
    fn count_pages(&self, site_id: Option<SiteId>) -> Result<usize>;
    fn site_pages(&self, site_id: SiteId) -> Result<Vec<Page>>;

    fn lemma(&self, site_id: SiteId, text: &str) -> Result<Option<Lemma>>;
    fn lemma_by_id(&self, id: LemmaId) -> Result<Option<Lemma>>;
    /// Fails with [`Error::Duplicate`] when the `(site, text)` pair exists.
    fn insert_lemma(&self, site_id: SiteId, text: &str, document_frequency: u32) -> Result<Lemma>;
    fn set_document_frequency(&self, id: LemmaId, document_frequency: u32) -> Result<()>;
    fn delete_lemma(&self, id: LemmaId) -> Result<()>;
    /// Rows for `text` on every site, or only on `site_id` when given.
    fn lemmas_by_text(&self, text: &str, site_id: Option<SiteId>) -> Result<Vec<Lemma>>;
    fn count_lemmas(&self, site_id: Option<SiteId>) -> Result<usize>;
    fn site_lemmas(&self, site_id: SiteId) -> Result<Vec<Lemma>>;

    /// Insert a posting, adding `weight` to an existing one for the same pair.
    fn add_posting(&self, page_id: PageId, lemma_id: LemmaId, weight: f32) -> Result<()>;
    fn postings_for_page(&self, page_id: PageId) -> Result<Vec<Posting>>;
    /// Pages holding a posting for a lemma with this text.
    fn page_ids_for_lemma(&self, text: &str, site_id: Option<SiteId>) -> Result<HashSet<PageId>>;
}

#[derive(Default)]
struct Tables {
    next_id: u64,
    sites: BTreeMap<SiteId, Site>,
    pages: BTreeMap<PageId, Page>,
    page_paths: HashMap<(SiteId, String), PageId>,
    lemmas: BTreeMap<LemmaId, Lemma>,
    lemma_keys: HashMap<(SiteId, String), LemmaId>,
    postings: BTreeMap<(PageId, LemmaId), Posting>,
    lemma_pages: HashMap<LemmaId, BTreeSet<PageId>>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn drop_postings_of_page(&mut self, page_id: PageId) {
        let keys: Vec<(PageId, LemmaId)> = self
            .postings
            .range((page_id, LemmaId::MIN)..=(page_id, LemmaId::MAX))
            .map(|(k, _)| *k)
            .collect();
        for key in keys {
            self.postings.remove(&key);
            if let Some(pages) = self.lemma_pages.get_mut(&key.1) {
                pages.remove(&page_id);
            }
        }
    }
}

/// Index kept in process memory; every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexStore for MemoryStore {
    fn clear(&self) -> Result<()> {
        let mut t = self.tables.write();
        let next_id = t.next_id;
        *t = Tables { next_id, ..Tables::default() };
        Ok(())
    }

    fn insert_site(&self, url: &str, name: &str, status: SiteStatus) -> Result<Site> {
        let mut t = self.tables.write();
        let id = t.next_id();
        let site = Site {
            id,
            url: url.to_string(),
            name: name.to_string(),
            status,
            status_time: OffsetDateTime::now_utc(),
            last_error: None,
        };
        t.sites.insert(id, site.clone());
        Ok(site)
    }

    fn update_site_status(&self, id: SiteId, status: SiteStatus, last_error: Option<&str>) -> Result<()> {
        let mut t = self.tables.write();
        if let Some(site) = t.sites.get_mut(&id) {
            site.status = status;
            site.status_time = OffsetDateTime::now_utc();
            site.last_error = last_error.map(str::to_string);
        }
        Ok(())
    }

    fn site(&self, id: SiteId) -> Result<Option<Site>> {
        Ok(self.tables.read().sites.get(&id).cloned())
    }

    fn site_by_url(&self, url: &str) -> Result<Option<Site>> {
        Ok(self.tables.read().sites.values().find(|s| s.url == url).cloned())
    }

    fn sites(&self) -> Result<Vec<Site>> {
        Ok(self.tables.read().sites.values().cloned().collect())
    }

    fn page_by_path(&self, site_id: SiteId, path: &str) -> Result<Option<Page>> {
        let t = self.tables.read();
        Ok(t.page_paths
            .get(&(site_id, path.to_string()))
            .and_then(|id| t.pages.get(id))
            .cloned())
    }

    fn insert_page(&self, page: NewPage) -> Result<Page> {
        let mut t = self.tables.write();
        let key = (page.site_id, page.path.clone());
        if t.page_paths.contains_key(&key) {
            return Err(Error::Duplicate { kind: "page", key: page.path });
        }
        let id = t.next_id();
        let row = Page {
            id,
            site_id: page.site_id,
            path: page.path,
            status_code: page.status_code,
            content: page.content,
        };
        t.page_paths.insert(key, id);
        t.pages.insert(id, row.clone());
        Ok(row)
    }

    fn pages_by_ids(&self, ids: &[PageId]) -> Result<Vec<Page>> {
        let t = self.tables.read();
        Ok(ids.iter().filter_map(|id| t.pages.get(id).cloned()).collect())
    }

    fn delete_page(&self, id: PageId) -> Result<()> {
        let mut t = self.tables.write();
        if let Some(page) = t.pages.remove(&id) {
            t.page_paths.remove(&(page.site_id, page.path));
            t.drop_postings_of_page(id);
        }
        Ok(())
    }

    fn count_pages(&self, site_id: Option<SiteId>) -> Result<usize> {
        let t = self.tables.read();
        Ok(match site_id {
            Some(site) => t.pages.values().filter(|p| p.site_id == site).count(),
            None => t.pages.len(),
        })
    }

    fn site_pages(&self, site_id: SiteId) -> Result<Vec<Page>> {
        let t = self.tables.read();
        Ok(t.pages.values().filter(|p| p.site_id == site_id).cloned().collect())
    }

    fn lemma(&self, site_id: SiteId, text: &str) -> Result<Option<Lemma>> {
        let t = self.tables.read();
        Ok(t.lemma_keys
            .get(&(site_id, text.to_string()))
            .and_then(|id| t.lemmas.get(id))
            .cloned())
    }

    fn lemma_by_id(&self, id: LemmaId) -> Result<Option<Lemma>> {
        Ok(self.tables.read().lemmas.get(&id).cloned())
    }

    fn insert_lemma(&self, site_id: SiteId, text: &str, document_frequency: u32) -> Result<Lemma> {
        let mut t = self.tables.write();
        let key = (site_id, text.to_string());
        if t.lemma_keys.contains_key(&key) {
            return Err(Error::Duplicate { kind: "lemma", key: text.to_string() });
        }
        let id = t.next_id();
        let lemma = Lemma { id, site_id, text: text.to_string(), document_frequency };
        t.lemma_keys.insert(key, id);
        t.lemmas.insert(id, lemma.clone());
        Ok(lemma)
    }

    fn set_document_frequency(&self, id: LemmaId, document_frequency: u32) -> Result<()> {
        if let Some(lemma) = self.tables.write().lemmas.get_mut(&id) {
            lemma.document_frequency = document_frequency;
        }
        Ok(())
    }

    fn delete_lemma(&self, id: LemmaId) -> Result<()> {
        let mut t = self.tables.write();
        if let Some(lemma) = t.lemmas.remove(&id) {
            t.lemma_keys.remove(&(lemma.site_id, lemma.text));
            if let Some(pages) = t.lemma_pages.remove(&id) {
                for page_id in pages {
                    t.postings.remove(&(page_id, id));
                }
            }
        }
        Ok(())
    }

    fn lemmas_by_text(&self, text: &str, site_id: Option<SiteId>) -> Result<Vec<Lemma>> {
        let t = self.tables.read();
        let rows = match site_id {
            Some(site) => t
                .lemma_keys
                .get(&(site, text.to_string()))
                .and_then(|id| t.lemmas.get(id))
                .cloned()
                .into_iter()
                .collect(),
            None => t.lemmas.values().filter(|l| l.text == text).cloned().collect(),
        };
        Ok(rows)
    }

    fn count_lemmas(&self, site_id: Option<SiteId>) -> Result<usize> {
        let t = self.tables.read();
        Ok(match site_id {
            Some(site) => t.lemmas.values().filter(|l| l.site_id == site).count(),
            None => t.lemmas.len(),
        })
    }

    fn site_lemmas(&self, site_id: SiteId) -> Result<Vec<Lemma>> {
        let t = self.tables.read();
        Ok(t.lemmas.values().filter(|l| l.site_id == site_id).cloned().collect())
    }

    fn add_posting(&self, page_id: PageId, lemma_id: LemmaId, weight: f32) -> Result<()> {
        let mut t = self.tables.write();
        if let Some(existing) = t.postings.get_mut(&(page_id, lemma_id)) {
            existing.weight += weight;
            return Ok(());
        }
        let id = t.next_id();
        t.postings.insert((page_id, lemma_id), Posting { id, page_id, lemma_id, weight });
        t.lemma_pages.entry(lemma_id).or_default().insert(page_id);
        Ok(())
    }

    fn postings_for_page(&self, page_id: PageId) -> Result<Vec<Posting>> {
        let t = self.tables.read();
        Ok(t.postings
            .range((page_id, LemmaId::MIN)..=(page_id, LemmaId::MAX))
            .map(|(_, p)| p.clone())
            .collect())
    }

    fn page_ids_for_lemma(&self, text: &str, site_id: Option<SiteId>) -> Result<HashSet<PageId>> {
        let t = self.tables.read();
        let mut ids = HashSet::new();
        for lemma in t.lemmas.values() {
            if lemma.text != text || site_id.is_some_and(|s| s != lemma.site_id) {
                continue;
            }
            if let Some(pages) = t.lemma_pages.get(&lemma.id) {
                ids.extend(pages.iter().copied());
            }
        }
        Ok(ids)
    }
}
