//! Persistent score cache keyed by (user_id, job_id).
//!
//! The cache is a side effect of scoring, never the primary result: write
//! failures are logged and swallowed via [`write_silently`] so a cache
//! outage can not fail the computation that produced the score.

pub mod memory;
pub mod pg;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::models::score::ScoreRecord;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache store error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache record corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[async_trait]
pub trait ScoreCache: Send + Sync {
    /// Bulk lookup. Absent keys are omitted from the map, never an error.
    async fn get(
        &self,
        user_id: Uuid,
        job_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ScoreRecord>, CacheError>;

    /// Idempotent keyed upsert: each record overwrites any existing record
    /// sharing its (user_id, job_id). `calculated_at` never moves backwards.
    async fn upsert_batch(&self, records: &[ScoreRecord]) -> Result<(), CacheError>;

    /// Deletes every record for the user. Returns the number removed.
    async fn invalidate_for_user(&self, user_id: Uuid) -> Result<u64, CacheError>;
}

/// Write path for callers that treat the cache as a side effect: failures
/// are logged, not propagated.
pub async fn write_silently(cache: &dyn ScoreCache, records: &[ScoreRecord]) {
    if records.is_empty() {
        return;
    }
    if let Err(e) = cache.upsert_batch(records).await {
        warn!(count = records.len(), "Score cache write failed (dropped): {e}");
    }
}
