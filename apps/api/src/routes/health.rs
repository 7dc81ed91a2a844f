use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

#[derive(Deserialize)]
pub struct HealthQuery {
    /// Bypass the cached AI-service health sample.
    #[serde(default)]
    pub force: bool,
}

/// GET /health
/// Service liveness plus the (cached) health of the AI scoring service.
pub async fn health_handler(
    State(state): State<AppState>,
    Query(params): Query<HealthQuery>,
) -> Json<Value> {
    let ai_healthy = state.scorer.health_probe(params.force).await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ai_service": if ai_healthy { "healthy" } else { "unhealthy" },
        "ai_service_url": state.config.ai_service_url,
    }))
}
