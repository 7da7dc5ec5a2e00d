//! Page indexing and crawl orchestration.

pub mod orchestrator;
pub mod page;

pub use orchestrator::Orchestrator;
pub use page::{IndexOutcome, PageIndexer, SiteSink};
