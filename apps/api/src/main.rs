mod ai_client;
mod cache;
mod config;
mod db;
mod errors;
mod jobs;
mod listing;
mod models;
mod routes;
mod scoring;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_client::AiClient;
use crate::cache::pg::PgScoreCache;
use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::PgJobCorpus;
use crate::listing::ListingMerger;
use crate::routes::build_router;
use crate::scoring::background::BackgroundScorer;
use crate::scoring::client::ScoreClient;
use crate::scoring::health::HealthMonitor;
use crate::scoring::retry::RetryPolicy;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fit-score API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url, config.database_pool_size).await?;

    // AI service client behind the shared health monitor
    let remote = Arc::new(AiClient::new(config.ai_service_url.clone())?);
    let health = Arc::new(HealthMonitor::new(Duration::from_secs(60)));
    info!("AI client initialized ({})", config.ai_service_url);

    // Scoring pipeline: tiered client, persistent cache, corpus provider
    let scorer = Arc::new(ScoreClient::new(
        remote,
        Arc::clone(&health),
        RetryPolicy::default(),
    ));
    let cache: Arc<dyn cache::ScoreCache> = Arc::new(PgScoreCache::new(pool.clone()));
    let corpus: Arc<dyn jobs::JobCorpus> = Arc::new(PgJobCorpus::new(pool));

    let background = BackgroundScorer::new(
        Arc::clone(&scorer),
        Arc::clone(&cache),
        Arc::clone(&corpus),
    );
    let listings = Arc::new(ListingMerger::new(
        Arc::clone(&cache),
        corpus,
        Arc::clone(&scorer),
    ));

    // Build app state
    let state = AppState {
        config: config.clone(),
        scorer,
        cache,
        background,
        listings,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
