use anyhow::{anyhow, Result};
use clap::Parser;
use parking_lot::Mutex;
use serde::Serialize;
use sha1::{Digest, Sha1};
use sitesearch_core::config::CrawlSettings;
use sitesearch_core::text;
use sitesearch_core::urls::parse_http_url;
use sitesearch_crawler::{CrawlContext, Crawler, FetchOutcome, HttpFetcher, PageSink};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl one site and write its pages as JSONL")]
struct Cli {
    /// Root URL of the site
    #[arg(long)]
    root: String,
    /// Output JSONL file path
    #[arg(long, default_value = "./data/crawl.jsonl")]
    output: String,
    /// Concurrent fetches
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// Pause before each fetch, in milliseconds
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,
    #[arg(long)]
    user_agent: Option<String>,
}

#[derive(Serialize)]
struct OutDoc<'a> {
    id: String,
    url: &'a str,
    status: u16,
    title: &'a str,
    body: &'a str,
    timestamp: String,
}

struct JsonlSink {
    out: Mutex<BufWriter<File>>,
}

impl PageSink for JsonlSink {
    fn accept(&self, url: &Url, outcome: &FetchOutcome) -> sitesearch_core::Result<()> {
        let Some(page) = outcome.html_page() else {
            return Ok(());
        };
        let extracted = text::extract(&page.body);
        let mut hasher = Sha1::new();
        hasher.update(url.as_str().as_bytes());
        let rec = OutDoc {
            id: format!("{:x}", hasher.finalize()),
            url: url.as_str(),
            status: page.status,
            title: &extracted.title,
            body: &extracted.body,
            timestamp: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        };
        let mut out = self.out.lock();
        serde_json::to_writer(&mut *out, &rec)?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    let root = parse_http_url(&args.root).ok_or_else(|| anyhow!("invalid root url: {}", args.root))?;
    if let Some(dir) = std::path::Path::new(&args.output).parent() {
        fs::create_dir_all(dir)?;
    }

    let mut settings = CrawlSettings {
        concurrency: args.concurrency.max(1),
        timeout_secs: args.timeout_secs,
        politeness_delay_ms: args.delay_ms,
        ..CrawlSettings::default()
    };
    if let Some(ua) = args.user_agent {
        settings.user_agent = ua;
    }

    let fetcher = Arc::new(HttpFetcher::new(&settings)?);
    let sink = Arc::new(JsonlSink { out: Mutex::new(BufWriter::new(File::create(&args.output)?)) });
    let ctx = CrawlContext::new();

    let stop = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping crawl");
            stop.cancel();
        }
    });

    info!(root = %root, output = %args.output, concurrency = settings.concurrency, "crawl starting");
    let report = Crawler::new(fetcher, settings).crawl(&root, sink.clone(), &ctx).await?;
    sink.out.lock().flush()?;
    if let Some(reason) = &report.root_error {
        warn!(root = %root, error = %reason, "root page unavailable");
    }
    info!(
        pages = report.pages,
        failed = report.failed,
        interrupted = report.interrupted,
        output = %args.output,
        "done"
    );
    Ok(())
}
