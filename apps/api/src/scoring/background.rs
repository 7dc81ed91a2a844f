//! Background recompute — fires when a user's resume changes. Invalidates
//! the user's cached scores, then rescoring the entire active corpus with
//! bounded concurrency, persisting incrementally so listings see partial
//! progress before the run finishes.
//!
//! Re-triggering while a previous run is in flight is safe: invalidation
//! plus keyed upserts give last-write-wins, and no record is permanently
//! corrupted by interleaving.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{write_silently, ScoreCache};
use crate::errors::AppError;
use crate::jobs::JobCorpus;
use crate::models::job::JobPosting;
use crate::models::resume::ResumeProfile;
use crate::models::score::ScoreRecord;
use crate::scoring::client::ScoreClient;

/// Jobs per batch call; matches the AI service's sweet spot.
const BATCH_WINDOW: usize = 20;
/// Batch calls in flight at once.
const MAX_BATCHES_IN_FLIGHT: usize = 3;
/// Per-job calls in flight when a chunk degrades to single scoring.
const MAX_SINGLES_IN_FLIGHT: usize = 5;

#[derive(Clone)]
pub struct BackgroundScorer {
    scorer: Arc<ScoreClient>,
    cache: Arc<dyn ScoreCache>,
    corpus: Arc<dyn JobCorpus>,
}

impl BackgroundScorer {
    pub fn new(
        scorer: Arc<ScoreClient>,
        cache: Arc<dyn ScoreCache>,
        corpus: Arc<dyn JobCorpus>,
    ) -> Self {
        Self {
            scorer,
            cache,
            corpus,
        }
    }

    /// Fire-and-forget: returns immediately, handing the recompute to a
    /// supervised task whose outcome is logged, never silently dropped.
    /// The handle is returned so callers that care (tests, shutdown paths)
    /// can await completion; detaching it is fine.
    pub fn trigger(&self, profile: ResumeProfile) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let user_id = profile.user_id;
            match this.run_recompute(profile).await {
                Ok(scored) => info!(%user_id, scored, "Background recompute finished"),
                Err(e) => error!(%user_id, "Background recompute failed: {e}"),
            }
        })
    }

    /// The recompute body: invalidate, fetch corpus, score in bounded
    /// windows, persist incrementally. Returns the number of jobs scored.
    pub async fn run_recompute(&self, profile: ResumeProfile) -> Result<usize, AppError> {
        let started = Instant::now();
        let user_id = profile.user_id;

        // Stale entries must go first so readers never mix score rows from
        // two resume versions.
        let invalidated = self.cache.invalidate_for_user(user_id).await?;
        debug!(%user_id, invalidated, "Invalidated cached scores");

        let jobs = self.corpus.list_active().await?;
        if jobs.is_empty() {
            return Ok(0);
        }
        let total = jobs.len();

        let profile = Arc::new(profile);
        let semaphore = Arc::new(Semaphore::new(MAX_BATCHES_IN_FLIGHT));
        let mut handles = Vec::new();

        for chunk in jobs.chunks(BATCH_WINDOW) {
            let chunk = chunk.to_vec();
            let this = self.clone();
            let profile = Arc::clone(&profile);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("recompute semaphore closed");
                this.score_chunk(&profile, chunk).await
            }));
        }

        let mut scored = 0usize;
        for handle in handles {
            match handle.await {
                Ok(count) => scored += count,
                Err(e) => error!(%user_id, "Recompute chunk task panicked: {e}"),
            }
        }

        info!(
            %user_id,
            scored,
            total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Corpus recompute complete"
        );
        Ok(scored)
    }

    /// One batch window. Falls back to bounded per-job scoring when the
    /// batch call fails outright.
    async fn score_chunk(&self, profile: &ResumeProfile, chunk: Vec<JobPosting>) -> usize {
        match self.scorer.compute_batch(profile, &chunk).await {
            Ok(records) => {
                let count = records.len();
                write_silently(self.cache.as_ref(), &records).await;
                count
            }
            Err(e) => {
                warn!(
                    user_id = %profile.user_id,
                    jobs = chunk.len(),
                    "Batch window failed, degrading to per-job scoring: {e}"
                );
                self.score_chunk_individually(profile, chunk).await
            }
        }
    }

    /// Per-job fallback with a fixed concurrency window. Each job is
    /// wrapped so an individual failure writes a zero-score record rather
    /// than aborting the rest of the chunk.
    async fn score_chunk_individually(&self, profile: &ResumeProfile, chunk: Vec<JobPosting>) -> usize {
        let semaphore = Arc::new(Semaphore::new(MAX_SINGLES_IN_FLIGHT));
        let profile = Arc::new(profile.clone());
        let mut handles = Vec::new();

        for job in chunk {
            let job_id = job.id;
            let scorer = Arc::clone(&self.scorer);
            let cache = Arc::clone(&self.cache);
            let profile = Arc::clone(&profile);
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("single-scoring semaphore closed");
                let record = scorer.compute_score(&profile, &job).await;
                write_silently(cache.as_ref(), std::slice::from_ref(&record)).await;
            });
            handles.push((job_id, handle));
        }

        let mut scored = 0usize;
        for (job_id, handle) in handles {
            if let Err(e) = handle.await {
                error!(%job_id, "Per-job scoring task panicked: {e}");
                let record = ScoreRecord::zero(profile.user_id, job_id, "Error calculating match");
                write_silently(self.cache.as_ref(), std::slice::from_ref(&record)).await;
            }
            scored += 1;
        }
        scored
    }
}
