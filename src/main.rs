//! NewsHub Ingestion Service
//! Multi-language news harvesting with feed, scrape and headless fallback
//!
//! Features:
//! - Language-grouped source catalog (built-in or JSON file)
//! - Feed → static scrape → headless browser fallback per source
//! - Semaphore-based concurrency limiting across refreshes
//! - Guid-keyed dedup-upsert into Postgres
//! - Read-through Redis cache with per-source invalidation
//! - Periodic refresh scheduler
//! - Graceful shutdown with SIGTERM handling
//! - Prometheus metrics per source and fetch step

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use newshub_ingestion::cache::{MemoryCache, NewsCache, RedisCache};
use newshub_ingestion::config::Config;
use newshub_ingestion::http_client::HttpFetcher;
use newshub_ingestion::metrics::start_metrics_server;
use newshub_ingestion::scheduler::RefreshScheduler;
use newshub_ingestion::sources::StrategyChain;
use newshub_ingestion::storage::{MemoryStore, NewsStore, PgStore};
use newshub_ingestion::{NewsService, SourceCatalog};

/// NewsHub Ingestion Service - multi-language news harvesting
#[derive(Parser, Debug)]
#[command(name = "newshub-ingestion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-language news harvesting with dedup persistence and caching")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, default_value = "false", global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the service: scheduled refreshes plus the metrics endpoint
    Run,

    /// Refresh once and print a summary
    Refresh {
        /// Refresh only this source id (default: every source)
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Print the source catalog as JSON
    Sources,

    /// Print stored news for a source or a language as JSON
    News {
        #[arg(short, long, conflicts_with = "language", required_unless_present = "language")]
        source: Option<String>,

        #[arg(short = 'L', long)]
        language: Option<String>,

        /// Maximum number of items
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

/// Sets up structured logging with tracing
fn setup_logging(log_level: &str, json_output: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

/// Handles graceful shutdown on SIGTERM/SIGINT
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    let _ = shutdown_tx.send(());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting NewsHub Ingestion Service");

    let config = Config::load()?;
    config.validate()?;

    info!(
        catalog = ?config.catalog_path,
        max_concurrent = config.max_concurrent_fetches,
        refresh_interval = %config.refresh_interval,
        postgres = config.database_url.is_some(),
        redis = config.redis_url.is_some(),
        "Configuration loaded"
    );

    let service = build_service(&config).await?;

    match cli.command {
        Commands::Run => run_daemon(config, service).await?,
        Commands::Refresh { source } => refresh_once(&service, source.as_deref()).await?,
        Commands::Sources => {
            let snapshot = service.sources_snapshot().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::News {
            source,
            language,
            limit,
        } => {
            let items = match (source, language) {
                (Some(source), _) => service.get_cached_news(&source, limit).await?,
                (None, Some(language)) => service.get_news_by_language(&language, limit).await?,
                (None, None) => anyhow::bail!("either --source or --language is required"),
            };
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }

    Ok(())
}

/// Wires catalog, fetch chain, store and cache from configuration
async fn build_service(config: &Config) -> Result<NewsService> {
    let catalog = match &config.catalog_path {
        Some(path) => SourceCatalog::load(path)?,
        None => SourceCatalog::builtin()?,
    };
    info!(sources = catalog.len(), "Source catalog loaded");

    let http = HttpFetcher::new(config.http_client_config())?;
    let chain = StrategyChain::new(http, &catalog)?;

    #[cfg(feature = "headless")]
    let chain = {
        use newshub_ingestion::sources::ChromiumRenderer;
        let renderer = ChromiumRenderer::new(config.chrome_executable.clone(), config.browser_user_agent.clone());
        chain.with_renderer(Arc::new(renderer), config.browser_timeout(), config.selector_wait())
    };

    if !cfg!(feature = "headless") && config.chrome_executable.is_some() {
        warn!("chrome_executable is set but the headless feature is disabled; rendering fallback is off");
    }

    let store: Arc<dyn NewsStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url, config.database_max_connections).await?),
        None => {
            warn!("DATABASE_URL not set, news is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let cache: Arc<dyn NewsCache> = match &config.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url, config.news_cache_ttl()).await?),
        None => Arc::new(MemoryCache::new(config.news_cache_ttl())),
    };

    Ok(NewsService::new(
        Arc::new(catalog),
        Arc::new(chain),
        store,
        cache,
        config.service_config(),
    ))
}

/// Runs the scheduler and metrics endpoint until shutdown
async fn run_daemon(config: Config, service: NewsService) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    if config.metrics_enabled {
        let metrics_addr: SocketAddr = format!("0.0.0.0:{}", config.metrics_port).parse()?;
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(metrics_addr).await {
                error!(error = %e, "Metrics server failed");
            }
        });
        info!(port = config.metrics_port, "Metrics server started at /metrics");
    }

    // First tick fires immediately and serves as the startup refresh
    let scheduler = RefreshScheduler::new(service, config.refresh_interval()?);
    let scheduler_handle = scheduler.spawn(shutdown_rx);

    info!("NewsHub Ingestion Service running");
    shutdown_signal(shutdown_tx).await;

    if let Err(e) = scheduler_handle.await {
        error!(error = %e, "Scheduler task failed");
    }

    info!("NewsHub Ingestion Service stopped");
    Ok(())
}

/// Refreshes one source or all of them and prints the outcome
async fn refresh_once(service: &NewsService, source: Option<&str>) -> Result<()> {
    match source {
        Some(source_id) => {
            let count = service.refresh_source(source_id).await?;
            println!("\nRefresh Summary");
            println!("===============");
            println!("Source: {}", source_id);
            println!("Items:  {}", count);
            if let Some(status) = service.refresh_status(source_id) {
                if let Some(origin) = status.last_origin {
                    println!("Step:   {}", origin);
                }
                if let Some(err) = status.last_error {
                    println!("Error:  {}", err);
                }
            }
        }
        None => {
            let summary = service.refresh_all().await;
            println!("\nRefresh Summary");
            println!("===============");
            println!("Sources:   {}", summary.sources);
            println!("Succeeded: {}", summary.succeeded);
            println!("Failed:    {}", summary.failed);
            println!("Skipped:   {}", summary.skipped);
            println!("Items:     {}", summary.items);

            let failing: Vec<_> = service
                .statuses()
                .into_iter()
                .filter(|s| s.last_error.is_some())
                .collect();
            if !failing.is_empty() {
                println!("\nFailing sources:");
                for status in failing {
                    println!(
                        "  - {}: {}",
                        status.source_id,
                        status.last_error.unwrap_or_default()
                    );
                }
            }
        }
    }
    Ok(())
}
