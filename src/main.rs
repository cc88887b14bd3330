use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use review_search::{
    api::{build_router, AppState},
    catalog::{ContentSource, InMemoryContentSource},
    config::Config,
    jobs::{run_retention, MaintenanceScheduler},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "review-search", version, about = "Search service for document review", long_about = None)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, env = "CONFIG_PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve,

    /// Rebuild every shard from the catalog and exit
    Reindex,

    /// Delete search logs older than the given number of days and exit
    Cleanup {
        #[arg(short, long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config);

    if config.observability.prometheus_enabled {
        if let Err(e) = review_search::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
        }
    }

    let source: Arc<dyn ContentSource> = match config.catalog.path {
        Some(ref path) => Arc::new(
            InMemoryContentSource::load(path).context("Failed to load catalog snapshot")?,
        ),
        None => {
            tracing::warn!("No catalog configured, starting with empty content");
            Arc::new(InMemoryContentSource::new())
        }
    };

    let state = AppState::from_config(&config, source).context("Failed to initialize services")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, state).await,
        Commands::Reindex => {
            let counts = state.maintainer.rebuild_all().await?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
            Ok(())
        }
        Commands::Cleanup { days } => {
            let days = days.unwrap_or(config.analytics.retention_days);
            let deleted = run_retention(&state.analytics, days).await?;
            println!("Deleted {} search log entries older than {} days", deleted, days);
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "review_search={level},tower_http={level}",
            level = config.observability.log_level
        )
        .into()
    });

    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(config: Config, state: AppState) -> Result<()> {
    tracing::info!("Starting review-search v{}", env!("CARGO_PKG_VERSION"));

    if config.server.rebuild_on_start {
        state
            .maintainer
            .rebuild_all()
            .await
            .context("Initial index rebuild failed")?;
    }

    let scheduler = MaintenanceScheduler::start(Arc::clone(&state.analytics), &config.analytics).await?;

    let app = build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("HTTP API listening on http://{}", addr);
    tracing::info!("   Search: http://{}/v1/search?q=...", addr);
    tracing::info!("   Metrics: http://{}/metrics", addr);

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("Failed to stop scheduler: {}", e);
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
