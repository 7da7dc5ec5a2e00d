//! Query evaluation: lemma filtering, posting intersection, ranking and snippets.

mod filter;
mod rank;
mod snippet;

pub use filter::{filter_lemmas, matching_pages, query_lemmas, QueryLemma};
pub use rank::{WordClass, WordIndex, PHRASE_RUN};
pub use snippet::{highlight, snippets, split_sentences, Snippet};

use crate::config::SearchSettings;
use crate::index::{LemmaId, PageId, Site, SiteId};
use crate::morphology::Morphology;
use crate::store::IndexStore;
use crate::text;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Root URL of a site to restrict results to.
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub offset: usize,
    /// Zero or absent means the configured default.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub site: String,
    pub site_name: String,
    pub title: String,
    pub uri: String,
    pub snippet: String,
    pub relevance: f32,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SearchResults {
    /// Entries before pagination.
    pub count: usize,
    pub data: Vec<SearchHit>,
}

struct Entry {
    page_id: PageId,
    order: usize,
    matches: usize,
    hit: SearchHit,
}

#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn IndexStore>,
    morphology: Morphology,
    settings: SearchSettings,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn IndexStore>, morphology: Morphology, settings: SearchSettings) -> Self {
        Self { store, morphology, settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    fn resolve_site(&self, url: &str) -> Result<Site> {
        let trimmed = url.trim();
        let bare = trimmed.trim_end_matches('/');
        let candidates = [trimmed.to_string(), bare.to_string(), format!("{bare}/")];
        for candidate in &candidates {
            if let Some(site) = self.store.site_by_url(candidate)? {
                return Ok(site);
            }
        }
        Err(Error::UnknownSite(trimmed.to_string()))
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let scope = match request.site.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(url) => Some(self.resolve_site(url)?),
            None => None,
        };
        let site_id: Option<SiteId> = scope.as_ref().map(|s| s.id);

        let requested = query_lemmas(&self.morphology, query);
        let lemmas = filter_lemmas(self.store.as_ref(), &requested, site_id, self.settings.frequency_threshold)?;
        if lemmas.is_empty() {
            tracing::debug!(query, "no query lemmas survived filtering");
            return Ok(SearchResults::default());
        }
        let page_ids = matching_pages(self.store.as_ref(), &lemmas, site_id)?;
        if page_ids.is_empty() {
            return Ok(SearchResults::default());
        }

        let lemma_texts: HashSet<String> = lemmas.iter().map(|l| l.text.clone()).collect();
        let lemma_ids: BTreeSet<LemmaId> = lemmas.iter().flat_map(|l| l.ids.iter().copied()).collect();
        let check_phrase = requested.len() >= PHRASE_RUN;

        let pages = self.store.pages_by_ids(&page_ids)?;
        let mut words = WordIndex::new(&self.morphology, &lemma_texts);
        let mut highlighted: HashSet<String> = HashSet::new();
        let mut scored = Vec::with_capacity(pages.len());
        let mut scores = Vec::with_capacity(pages.len());
        for page in pages {
            let extracted = text::extract(&page.content);
            let full = extracted.full_text();
            words.surface_words(&full, &mut highlighted);
            let postings = self.store.postings_for_page(page.id)?;
            let base = rank::base_score(&postings, &lemma_ids);
            let boosted = check_phrase && words.has_phrase(&full);
            scores.push((base, boosted));
            scored.push((page, extracted.title, full));
        }
        let relevance = rank::normalize(&mut scores);

        let mut sites: HashMap<SiteId, Site> = HashMap::new();
        if let Some(site) = scope {
            sites.insert(site.id, site);
        }
        let mut entries = Vec::new();
        for ((page, title, full), relevance) in scored.into_iter().zip(relevance) {
            let site = match sites.get(&page.site_id) {
                Some(site) => site.clone(),
                None => match self.store.site(page.site_id)? {
                    Some(site) => {
                        sites.insert(site.id, site.clone());
                        site
                    }
                    None => continue,
                },
            };
            for (order, snippet) in snippets(&full, &highlighted, self.settings.snippet_length).into_iter().enumerate() {
                entries.push(Entry {
                    page_id: page.id,
                    order,
                    matches: snippet.matches,
                    hit: SearchHit {
                        site: site.url.clone(),
                        site_name: site.name.clone(),
                        title: title.clone(),
                        uri: page.path.clone(),
                        snippet: snippet.text,
                        relevance,
                    },
                });
            }
        }

        entries.sort_by(|a, b| {
            b.hit
                .relevance
                .partial_cmp(&a.hit.relevance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.matches.cmp(&a.matches))
                .then_with(|| a.page_id.cmp(&b.page_id))
                .then_with(|| a.order.cmp(&b.order))
        });

        let count = entries.len();
        let limit = match request.limit {
            Some(n) if n > 0 => n,
            _ => self.settings.default_limit,
        };
        let data = entries.into_iter().skip(request.offset).take(limit).map(|e| e.hit).collect();
        Ok(SearchResults { count, data })
    }
}
