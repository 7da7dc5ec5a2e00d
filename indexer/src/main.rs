use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sitesearch_core::config::AppConfig;
use sitesearch_core::morphology::Morphology;
use sitesearch_core::persist::SledStore;
use sitesearch_core::store::IndexStore;
use sitesearch_crawler::HttpFetcher;
use sitesearch_indexer::{IndexOutcome, Orchestrator};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Crawl configured sites into a lemmatized inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Site list and crawl settings (JSON)
    #[arg(long, default_value = "./config/sites.json")]
    config: String,
    /// sled database directory
    #[arg(long, default_value = "./data/index")]
    data: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Reindex every configured site and wait for the crawl to finish
    Crawl {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Replace a single page of a configured site
    Page {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        url: String,
    },
}

#[derive(Serialize)]
struct PageReport<'a> {
    url: &'a str,
    outcome: String,
}

fn open(args: &StoreArgs) -> Result<(AppConfig, Arc<SledStore>)> {
    let config = AppConfig::load(&args.config).with_context(|| format!("loading {}", args.config))?;
    let store = SledStore::open(&args.data).with_context(|| format!("opening {}", args.data))?;
    Ok((config, Arc::new(store)))
}

fn describe(outcome: IndexOutcome) -> String {
    match outcome {
        IndexOutcome::Indexed { lemmas } => format!("indexed ({lemmas} lemmas)"),
        IndexOutcome::Stored { status } => format!("stored with status {status}"),
        IndexOutcome::AlreadyIndexed => "already indexed".to_string(),
        IndexOutcome::Skipped => "skipped after timeout".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl { store } => {
            let (config, store) = open(&store)?;
            let fetcher = Arc::new(HttpFetcher::new(&config.crawl)?);
            let orchestrator = Arc::new(Orchestrator::new(&config, store.clone(), fetcher, Morphology::standard()));
            orchestrator.start_indexing().await?;

            let stopper = orchestrator.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping crawl");
                    if let Err(e) = stopper.stop_indexing() {
                        warn!(error = %e, "stop failed");
                    }
                }
            });

            orchestrator.wait_for_completion().await;
            store.flush()?;
            let stats = orchestrator.statistics()?;
            info!(sites = stats.total.sites, pages = stats.total.pages, lemmas = stats.total.lemmas, "crawl complete");
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Page { store, url } => {
            let (config, store) = open(&store)?;
            let fetcher = Arc::new(HttpFetcher::new(&config.crawl)?);
            let shared: Arc<dyn IndexStore> = store.clone();
            let orchestrator = Orchestrator::new(&config, shared, fetcher, Morphology::standard());
            let outcome = orchestrator.index_page(&url).await?;
            store.flush()?;
            println!("{}", serde_json::to_string(&PageReport { url: &url, outcome: describe(outcome) })?);
        }
    }
    Ok(())
}
