//! Query lemma selection and posting-set intersection.

use crate::index::{LemmaId, PageId, SiteId};
use crate::morphology::Morphology;
use crate::store::IndexStore;
use crate::Result;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A query lemma that survived frequency filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLemma {
    pub text: String,
    /// Document frequency summed over the sites in scope.
    pub frequency: u64,
    /// Lemma rows in scope, one per site.
    pub ids: Vec<LemmaId>,
}

/// Lemmas of every whitespace separated query token.
pub fn query_lemmas(morphology: &Morphology, query: &str) -> BTreeSet<String> {
    query
        .split_whitespace()
        .flat_map(|token| morphology.lemma_set(token))
        .collect()
}

/// Drop lemmas that are absent from the scope or too common to discriminate,
/// and order the rest by ascending document frequency.
///
/// A lemma is too common when, on any site in scope, it occurs on more than
/// `threshold` of that site's pages.
pub fn filter_lemmas(
    store: &dyn IndexStore,
    lemmas: &BTreeSet<String>,
    site_id: Option<SiteId>,
    threshold: f64,
) -> Result<Vec<QueryLemma>> {
    let mut site_pages: HashMap<SiteId, usize> = HashMap::new();
    let mut kept = Vec::new();
    for text in lemmas {
        let rows = store.lemmas_by_text(text, site_id)?;
        if rows.is_empty() {
            continue;
        }
        let mut too_common = false;
        let mut frequency = 0u64;
        for row in &rows {
            let total = match site_pages.get(&row.site_id) {
                Some(n) => *n,
                None => {
                    let n = store.count_pages(Some(row.site_id))?;
                    site_pages.insert(row.site_id, n);
                    n
                }
            };
            if total > 0 && f64::from(row.document_frequency) / total as f64 > threshold {
                too_common = true;
                break;
            }
            frequency += u64::from(row.document_frequency);
        }
        if too_common {
            tracing::debug!(lemma = %text, "dropping lemma above frequency threshold");
            continue;
        }
        kept.push(QueryLemma { text: text.clone(), frequency, ids: rows.iter().map(|r| r.id).collect() });
    }
    kept.sort_by(|a, b| a.frequency.cmp(&b.frequency).then_with(|| a.text.cmp(&b.text)));
    Ok(kept)
}

/// Pages holding every lemma, intersecting from the rarest lemma up.
pub fn matching_pages(store: &dyn IndexStore, lemmas: &[QueryLemma], site_id: Option<SiteId>) -> Result<Vec<PageId>> {
    let Some((first, rest)) = lemmas.split_first() else {
        return Ok(Vec::new());
    };
    let mut pages: HashSet<PageId> = store.page_ids_for_lemma(&first.text, site_id)?;
    for lemma in rest {
        if pages.is_empty() {
            break;
        }
        let next = store.page_ids_for_lemma(&lemma.text, site_id)?;
        pages.retain(|id| next.contains(id));
    }
    let mut ids: Vec<PageId> = pages.into_iter().collect();
    ids.sort_unstable();
    Ok(ids)
}
