use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-invocation crawl state shared by every task of one crawl.
#[derive(Clone, Debug, Default)]
pub struct CrawlContext {
    cancelled: Arc<AtomicBool>,
}

impl CrawlContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every task holding this context to stop spawning work.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let ctx = CrawlContext::new();
        let other = ctx.clone();
        assert!(!other.is_cancelled());
        ctx.cancel();
        assert!(other.is_cancelled());
        assert!(!CrawlContext::new().is_cancelled());
    }
}
