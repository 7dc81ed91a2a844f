//! Postgres-backed `ScoreCache` over the `fit_scores` table.
//!
//! Expected schema:
//! ```sql
//! CREATE TABLE fit_scores (
//!     user_id        UUID        NOT NULL,
//!     job_id         UUID        NOT NULL,
//!     fit_score      INT         NOT NULL,
//!     breakdown      JSONB       NOT NULL,
//!     strengths      JSONB       NOT NULL,
//!     gaps           JSONB       NOT NULL,
//!     recommendation TEXT        NOT NULL,
//!     calculated_at  TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (user_id, job_id)
//! );
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{CacheError, ScoreCache};
use crate::models::score::{clamp_score, Recommendation, ScoreRecord};

pub struct PgScoreCache {
    pool: PgPool,
}

impl PgScoreCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ScoreRow {
    user_id: Uuid,
    job_id: Uuid,
    fit_score: i32,
    breakdown: Value,
    strengths: Value,
    gaps: Value,
    recommendation: String,
    calculated_at: DateTime<Utc>,
}

impl TryFrom<ScoreRow> for ScoreRecord {
    type Error = CacheError;

    fn try_from(row: ScoreRow) -> Result<Self, Self::Error> {
        Ok(ScoreRecord {
            user_id: row.user_id,
            job_id: row.job_id,
            fit_score: clamp_score(row.fit_score as i64),
            breakdown: serde_json::from_value(row.breakdown)?,
            strengths: serde_json::from_value(row.strengths)?,
            gaps: serde_json::from_value(row.gaps)?,
            recommendation: serde_json::from_value(Value::String(row.recommendation))?,
            calculated_at: row.calculated_at,
        })
    }
}

fn recommendation_label(recommendation: Recommendation) -> Result<String, CacheError> {
    match serde_json::to_value(recommendation)? {
        Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

#[async_trait]
impl ScoreCache for PgScoreCache {
    async fn get(
        &self,
        user_id: Uuid,
        job_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ScoreRecord>, CacheError> {
        if job_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<ScoreRow> = sqlx::query_as(
            "SELECT user_id, job_id, fit_score, breakdown, strengths, gaps,
                    recommendation, calculated_at
             FROM fit_scores
             WHERE user_id = $1 AND job_id = ANY($2)",
        )
        .bind(user_id)
        .bind(job_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut found = HashMap::with_capacity(rows.len());
        for row in rows {
            let record = ScoreRecord::try_from(row)?;
            found.insert(record.job_id, record);
        }
        Ok(found)
    }

    async fn upsert_batch(&self, records: &[ScoreRecord]) -> Result<(), CacheError> {
        for record in records {
            sqlx::query(
                "INSERT INTO fit_scores
                     (user_id, job_id, fit_score, breakdown, strengths, gaps,
                      recommendation, calculated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (user_id, job_id) DO UPDATE SET
                     fit_score      = EXCLUDED.fit_score,
                     breakdown      = EXCLUDED.breakdown,
                     strengths      = EXCLUDED.strengths,
                     gaps           = EXCLUDED.gaps,
                     recommendation = EXCLUDED.recommendation,
                     calculated_at  = GREATEST(fit_scores.calculated_at, EXCLUDED.calculated_at)",
            )
            .bind(record.user_id)
            .bind(record.job_id)
            .bind(record.fit_score as i32)
            .bind(serde_json::to_value(record.breakdown)?)
            .bind(serde_json::to_value(&record.strengths)?)
            .bind(serde_json::to_value(&record.gaps)?)
            .bind(recommendation_label(record.recommendation)?)
            .bind(record.calculated_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn invalidate_for_user(&self, user_id: Uuid) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM fit_scores WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
