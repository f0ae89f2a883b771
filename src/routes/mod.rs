/// Application routes configuration
use crate::handlers::{get_iridium, get_iss, get_night_sky, get_planets, get_sun_moon, health, AppState};
use axum::{routing::get, Router};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Calculated tables
        .route("/sun-moon", get(get_sun_moon))
        // Cached remote tables
        .route("/iss", get(get_iss))
        .route("/iridium", get(get_iridium))
        .route("/planets", get(get_planets))
        // Everything at once
        .route("/night-sky", get(get_night_sky))
        .with_state(state)
}
