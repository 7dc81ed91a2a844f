#![allow(dead_code)]

//! In-memory `ScoreCache`, used by tests and local development. Semantics
//! match the Postgres implementation, including timestamp monotonicity.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{CacheError, ScoreCache};
use crate::models::score::ScoreRecord;

#[derive(Default)]
pub struct MemoryScoreCache {
    records: Mutex<HashMap<(Uuid, Uuid), ScoreRecord>>,
}

impl MemoryScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ScoreCache for MemoryScoreCache {
    async fn get(
        &self,
        user_id: Uuid,
        job_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ScoreRecord>, CacheError> {
        let guard = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(job_ids
            .iter()
            .filter_map(|job_id| {
                guard
                    .get(&(user_id, *job_id))
                    .map(|r| (*job_id, r.clone()))
            })
            .collect())
    }

    async fn upsert_batch(&self, records: &[ScoreRecord]) -> Result<(), CacheError> {
        let mut guard = self.records.lock().unwrap_or_else(|e| e.into_inner());
        for record in records {
            let key = (record.user_id, record.job_id);
            let mut record = record.clone();
            if let Some(existing) = guard.get(&key) {
                // Last write wins for content, but the timestamp is monotonic.
                record.calculated_at = record.calculated_at.max(existing.calculated_at);
            }
            guard.insert(key, record);
        }
        Ok(())
    }

    async fn invalidate_for_user(&self, user_id: Uuid) -> Result<u64, CacheError> {
        let mut guard = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let before = guard.len();
        guard.retain(|(u, _), _| *u != user_id);
        Ok((before - guard.len()) as u64)
    }
}
