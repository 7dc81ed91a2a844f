pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::listing::handlers as listing_handlers;
use crate::scoring::handlers as scoring_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Score API
        .route(
            "/api/v1/scores",
            get(scoring_handlers::handle_get_cached_scores),
        )
        .route(
            "/api/v1/scores/recompute",
            post(scoring_handlers::handle_trigger_recompute),
        )
        .route(
            "/api/v1/scores/compute",
            post(listing_handlers::handle_compute_one),
        )
        // Listing API
        .route("/api/v1/listings", get(listing_handlers::handle_get_page))
        .with_state(state)
}
