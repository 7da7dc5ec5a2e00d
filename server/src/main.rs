use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use sitesearch_core::config::AppConfig;
use sitesearch_core::morphology::Morphology;
use sitesearch_core::persist::SledStore;
use sitesearch_core::store::{IndexStore, MemoryStore};
use sitesearch_crawler::HttpFetcher;
use sitesearch_server::{build_app, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Site list and crawl settings (JSON)
    #[arg(long, default_value = "./config/sites.json")]
    config: String,
    /// sled database directory
    #[arg(long, default_value = "./data/index")]
    data: String,
    /// Keep the index in memory instead of on disk
    #[arg(long, default_value_t = false)]
    memory: bool,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = AppConfig::load(&args.config).with_context(|| format!("loading {}", args.config))?;

    let store: Arc<dyn IndexStore> = if args.memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SledStore::open(&args.data).with_context(|| format!("opening {}", args.data))?)
    };
    let fetcher = Arc::new(HttpFetcher::new(&config.crawl)?);
    let state = AppState::new(&config, store, fetcher, Morphology::standard());
    let app: Router = build_app(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, sites = config.sites.len(), "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
