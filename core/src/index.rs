use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

pub type SiteId = u64;
pub type PageId = u64;
pub type LemmaId = u64;
pub type PostingId = u64;

/// Lifecycle of a crawled site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SiteStatus::Indexing => "INDEXING",
            SiteStatus::Indexed => "INDEXED",
            SiteStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    #[serde(with = "time::serde::timestamp")]
    pub status_time: OffsetDateTime,
    pub last_error: Option<String>,
}

/// A fetched page. `path` is site-relative and normalized (see [`crate::urls::page_path`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub site_id: SiteId,
    pub path: String,
    pub status_code: u16,
    pub content: String,
}

impl Page {
    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }
}

/// Fields of a page row before the store assigns it an id.
#[derive(Debug, Clone)]
pub struct NewPage {
    pub site_id: SiteId,
    pub path: String,
    pub status_code: u16,
    pub content: String,
}

/// A lemma within one site. `document_frequency` counts the distinct pages
/// of that site holding a posting for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lemma {
    pub id: LemmaId,
    pub site_id: SiteId,
    pub text: String,
    pub document_frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub id: PostingId,
    pub page_id: PageId,
    pub lemma_id: LemmaId,
    pub weight: f32, // term frequency of the lemma on the page
}
