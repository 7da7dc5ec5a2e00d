use crate::store::IndexStore;
use crate::Result;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: usize,
    pub lemmas: usize,
    pub indexing: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStatisticsItem {
    pub url: String,
    pub name: String,
    pub status: String,
    /// Seconds since the Unix epoch.
    pub status_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pages: usize,
    pub lemmas: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<DetailedStatisticsItem>,
}

/// Aggregate counts over the whole index. `indexing` reports whether a crawl is active.
pub fn collect(store: &dyn IndexStore, indexing: bool) -> Result<Statistics> {
    let sites = store.sites()?;
    let mut detailed = Vec::with_capacity(sites.len());
    for site in &sites {
        detailed.push(DetailedStatisticsItem {
            url: site.url.clone(),
            name: site.name.clone(),
            status: site.status.to_string(),
            status_time: site.status_time.unix_timestamp(),
            error: site.last_error.clone(),
            pages: store.count_pages(Some(site.id))?,
            lemmas: store.count_lemmas(Some(site.id))?,
        });
    }
    Ok(Statistics {
        total: TotalStatistics {
            sites: sites.len(),
            pages: store.count_pages(None)?,
            lemmas: store.count_lemmas(None)?,
            indexing,
        },
        detailed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{NewPage, SiteStatus};
    use crate::store::MemoryStore;

    #[test]
    fn aggregates_per_site() {
        let store = MemoryStore::new();
        let a = store.insert_site("https://a.com", "A", SiteStatus::Indexed).unwrap();
        let b = store.insert_site("https://b.com", "B", SiteStatus::Indexing).unwrap();
        store.update_site_status(b.id, SiteStatus::Failed, Some("stopped by user")).unwrap();
        for path in ["/", "/x"] {
            store
                .insert_page(NewPage { site_id: a.id, path: path.into(), status_code: 200, content: String::new() })
                .unwrap();
        }
        store.insert_lemma(a.id, "fox", 2).unwrap();

        let stats = collect(&store, false).unwrap();
        assert_eq!(stats.total, TotalStatistics { sites: 2, pages: 2, lemmas: 1, indexing: false });
        let a_row = stats.detailed.iter().find(|d| d.name == "A").unwrap();
        assert_eq!((a_row.pages, a_row.lemmas), (2, 1));
        assert_eq!(a_row.status, "INDEXED");
        let b_row = stats.detailed.iter().find(|d| d.name == "B").unwrap();
        assert_eq!(b_row.status, "FAILED");
        assert_eq!(b_row.error.as_deref(), Some("stopped by user"));

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["detailed"][0]["statusTime"].is_i64());
    }
}
