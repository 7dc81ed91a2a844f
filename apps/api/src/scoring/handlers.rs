use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeProfile;
use crate::models::score::ScoreRecord;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CachedScoresQuery {
    pub user_id: Uuid,
    /// Comma-separated job ids.
    pub job_ids: String,
}

/// GET /api/v1/scores?user_id=...&job_ids=a,b,c
/// Bulk cache lookup; absent keys are omitted from the map.
pub async fn handle_get_cached_scores(
    State(state): State<AppState>,
    Query(params): Query<CachedScoresQuery>,
) -> Result<Json<HashMap<Uuid, ScoreRecord>>, AppError> {
    let job_ids = parse_job_ids(&params.job_ids)?;
    let scores = state.cache.get(params.user_id, &job_ids).await?;
    Ok(Json(scores))
}

/// POST /api/v1/scores/recompute
/// Fire-and-forget: accepts the resume profile and returns immediately
/// while the corpus recompute runs in the background.
pub async fn handle_trigger_recompute(
    State(state): State<AppState>,
    Json(profile): Json<ResumeProfile>,
) -> (StatusCode, Json<serde_json::Value>) {
    let user_id = profile.user_id;
    state.background.trigger(profile);
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "accepted", "user_id": user_id })),
    )
}

fn parse_job_ids(raw: &str) -> Result<Vec<Uuid>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Uuid>()
                .map_err(|_| AppError::Validation(format!("Invalid job id: {s}")))
        })
        .collect()
}
