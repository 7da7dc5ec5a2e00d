use crate::urls::parse_http_url;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Pause before every fetch.
    #[serde(default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,
    /// Concurrent fetches per site.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}
fn default_user_agent() -> String { "sitesearch-bot/0.1 (+https://example.com/bot)".to_string() }
fn default_timeout_secs() -> u64 { 10 }
fn default_politeness_delay_ms() -> u64 { 500 }
fn default_concurrency() -> usize { 8 }
fn default_max_body_bytes() -> usize { 2 * 1024 * 1024 }
fn default_max_redirects() -> usize { 5 }

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            politeness_delay_ms: default_politeness_delay_ms(),
            concurrency: default_concurrency(),
            max_body_bytes: default_max_body_bytes(),
            max_redirects: default_max_redirects(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Lemmas found on a larger share of a site's pages than this are
    /// dropped from queries against that site.
    #[serde(default = "default_frequency_threshold")]
    pub frequency_threshold: f64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,
}
fn default_frequency_threshold() -> f64 { 0.8 }
fn default_limit() -> usize { 20 }
fn default_snippet_length() -> usize { 150 }

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            frequency_threshold: default_frequency_threshold(),
            default_limit: default_limit(),
            snippet_length: default_snippet_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub crawl: CrawlSettings,
    #[serde(default)]
    pub search: SearchSettings,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(Error::Config("no sites configured".into()));
        }
        for site in &self.sites {
            if parse_http_url(&site.url).is_none() {
                return Err(Error::Config(format!("site {} has an invalid url: {}", site.name, site.url)));
            }
        }
        let t = self.search.frequency_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(Error::Config(format!("frequency_threshold must be in (0, 1], got {t}")));
        }
        if self.crawl.concurrency == 0 {
            return Err(Error::Config("crawl concurrency must be at least 1".into()));
        }
        Ok(())
    }
}
