/// Night sky report service: sun/moon calculator and cached satellite/planet tables
mod astro;
mod clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod repo;
mod routes;
mod services;
mod utils;

use crate::clients::HeavensAboveClient;
use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::repo::{init_db, AnyCacheStore, MemoryCacheStore, PgCacheStore};
use crate::routes::build_router;
use crate::services::{RemoteDataCache, SkyService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Cache store: Postgres when configured, process memory otherwise
    let store = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            info!("Database connection pool established");
            init_db(&pool).await?;
            info!("Database schema initialized");
            AnyCacheStore::Postgres(PgCacheStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, caching in memory");
            AnyCacheStore::Memory(MemoryCacheStore::new())
        }
    };

    // Initialize services
    let client = HeavensAboveClient::new(&config.heavens_above_url, config.fetch_timeout, config.altitude_meters)?;
    let cache = RemoteDataCache::new(store, config.cache_ttls);
    let sky_service = Arc::new(SkyService::new(cache, client));

    let state = AppState { sky_service };
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("stars_at_night service listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
