//! Same-domain site crawling with cooperative cancellation.

pub mod context;
pub mod crawl;
pub mod fetch;
pub mod links;

pub use context::CrawlContext;
pub use crawl::{CrawlReport, Crawler, PageSink};
pub use fetch::{FetchOutcome, FetchedPage, Fetcher, HttpFetcher, StaticFetcher};
pub use links::VisitedSet;
