use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::JobFilters;
use crate::listing::{ListingPage, ScoredResult};
use crate::models::job::JobPosting;
use crate::models::resume::ResumeProfile;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListingQuery {
    pub user_id: Uuid,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    pub search: Option<String>,
    /// Comma-separated skill filter.
    pub skills: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

/// GET /api/v1/listings
/// Deterministic merged page: scored jobs first, unscored after.
pub async fn handle_get_page(
    State(state): State<AppState>,
    Query(params): Query<ListingQuery>,
) -> Result<Json<ListingPage>, AppError> {
    let filters = JobFilters {
        search: params.search,
        skills: params
            .skills
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
    };

    let page = state
        .listings
        .build_page(params.user_id, &filters, params.page, params.page_size)
        .await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
pub struct ComputeOneRequest {
    pub resume: ResumeProfile,
    pub job: JobPosting,
}

/// POST /api/v1/scores/compute
/// Synchronous, bounded-latency scoring of one job. May return a
/// provisional result if the AI service is slow; the authoritative score
/// lands in the cache once the compute settles.
pub async fn handle_compute_one(
    State(state): State<AppState>,
    Json(req): Json<ComputeOneRequest>,
) -> Result<Json<ScoredResult>, AppError> {
    let result = state.listings.compute_and_cache_one(req.resume, req.job).await;
    Ok(Json(result))
}
