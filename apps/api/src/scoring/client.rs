//! Resilient scoring client. Wraps the remote AI capability in an ordered
//! fallback chain so `compute_score` always produces a record:
//!
//! 1. batch remote (single-element batch, amortized path)
//! 2. single remote structured analysis
//! 3. retrieval-augmented remote against the resume index
//! 4. local heuristic (never fails)
//!
//! Transient errors retry under the [`RetryPolicy`] before the chain falls
//! through; malformed responses fall through immediately.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::ai_client::{parse_score_payload, prompts, AiError, RemoteScoring};
use crate::models::job::JobPosting;
use crate::models::resume::ResumeProfile;
use crate::models::score::ScoreRecord;
use crate::scoring::health::HealthMonitor;
use crate::scoring::heuristic::heuristic_score;
use crate::scoring::retry::RetryPolicy;

/// One tier in the fallback chain. Each tier is a discrete, independently
/// testable unit; the chain-runner in [`ScoreClient`] tries them in order.
#[async_trait]
pub trait ScoreTier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(
        &self,
        resume: &ResumeProfile,
        job: &JobPosting,
    ) -> Result<ScoreRecord, AiError>;
}

/// Tier 1: the batch call with a single-element batch. Preferred because
/// it shares the amortized path the background scorer exercises. A reply
/// that omits the requested job counts as a failure here, so the chain
/// keeps falling rather than accepting a hole as a score.
pub struct BatchRemoteTier {
    remote: Arc<dyn RemoteScoring>,
}

#[async_trait]
impl ScoreTier for BatchRemoteTier {
    fn name(&self) -> &'static str {
        "batch-remote"
    }

    async fn score(
        &self,
        resume: &ResumeProfile,
        job: &JobPosting,
    ) -> Result<ScoreRecord, AiError> {
        let payloads = self
            .remote
            .batch_score(resume, std::slice::from_ref(job))
            .await?;
        let wanted = job.id.to_string();
        let payload = payloads
            .into_iter()
            .find(|p| p.job_id.as_deref() == Some(wanted.as_str()))
            .ok_or(AiError::EmptyContent)?;
        Ok(payload.into_record(resume.user_id, job.id))
    }
}

/// Tier 2: one resume/job pair as a standalone structured analysis.
pub struct SingleRemoteTier {
    remote: Arc<dyn RemoteScoring>,
}

#[async_trait]
impl ScoreTier for SingleRemoteTier {
    fn name(&self) -> &'static str {
        "single-remote"
    }

    async fn score(
        &self,
        resume: &ResumeProfile,
        job: &JobPosting,
    ) -> Result<ScoreRecord, AiError> {
        let payload = self.remote.single_score(resume, job).await?;
        Ok(payload.into_record(resume.user_id, job.id))
    }
}

/// Tier 3: the analysis prompt executed against the user's resume
/// knowledge index. Slower, but works when structured resume data is thin
/// as long as the resume was indexed.
pub struct RagRemoteTier {
    remote: Arc<dyn RemoteScoring>,
}

#[async_trait]
impl ScoreTier for RagRemoteTier {
    fn name(&self) -> &'static str {
        "rag-remote"
    }

    async fn score(
        &self,
        resume: &ResumeProfile,
        job: &JobPosting,
    ) -> Result<ScoreRecord, AiError> {
        let prompt = prompts::RAG_SCORE_PROMPT_TEMPLATE
            .replace("{job_summary}", &job.summary().to_string());
        let text = self
            .remote
            .rag_query(&resume.user_id.to_string(), &prompt)
            .await?;
        let payload = parse_score_payload(&text)?;
        Ok(payload.into_record(resume.user_id, job.id))
    }
}

pub struct ScoreClient {
    remote: Arc<dyn RemoteScoring>,
    tiers: Vec<Box<dyn ScoreTier>>,
    health: Arc<HealthMonitor>,
    retry: RetryPolicy,
}

impl ScoreClient {
    pub fn new(
        remote: Arc<dyn RemoteScoring>,
        health: Arc<HealthMonitor>,
        retry: RetryPolicy,
    ) -> Self {
        let tiers: Vec<Box<dyn ScoreTier>> = vec![
            Box::new(BatchRemoteTier {
                remote: Arc::clone(&remote),
            }),
            Box::new(SingleRemoteTier {
                remote: Arc::clone(&remote),
            }),
            Box::new(RagRemoteTier {
                remote: Arc::clone(&remote),
            }),
        ];
        Self {
            remote,
            tiers,
            health,
            retry,
        }
    }

    /// Computes a fit score for one (resume, job) pair. Never fails: if
    /// every remote tier is exhausted the local heuristic supplies the
    /// result, degrading quality rather than raising an error.
    pub async fn compute_score(&self, resume: &ResumeProfile, job: &JobPosting) -> ScoreRecord {
        for tier in &self.tiers {
            match self.run_tier(tier.as_ref(), resume, job).await {
                Ok(record) => {
                    debug!(tier = tier.name(), job_id = %job.id, fit_score = record.fit_score,
                           "Tier produced a score");
                    return record;
                }
                Err(e) => {
                    warn!(tier = tier.name(), job_id = %job.id, "Tier exhausted: {e}");
                }
            }
        }

        debug!(job_id = %job.id, "All remote tiers failed; using local heuristic");
        heuristic_score(resume, job)
    }

    /// Tier 1 exposed directly for corpus-wide recomputes. Unlike
    /// [`compute_score`] this can fail, so the background job can degrade
    /// to per-job scoring.
    pub async fn compute_batch(
        &self,
        resume: &ResumeProfile,
        jobs: &[JobPosting],
    ) -> Result<Vec<ScoreRecord>, AiError> {
        let mut attempt = 0;
        let payloads = loop {
            match self.remote.batch_score(resume, jobs).await {
                Ok(payloads) => break payloads,
                Err(e) if e.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64,
                          "Batch scoring failed, retrying: {e}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let mut by_id = std::collections::HashMap::new();
        for payload in payloads {
            if let Some(id) = payload
                .job_id
                .as_deref()
                .and_then(|s| s.parse::<uuid::Uuid>().ok())
            {
                by_id.insert(id, payload);
            }
        }

        Ok(jobs
            .iter()
            .map(|job| match by_id.remove(&job.id) {
                Some(payload) => payload.into_record(resume.user_id, job.id),
                None => ScoreRecord::zero(resume.user_id, job.id, "Unable to calculate match"),
            })
            .collect())
    }

    /// Cached AI-service health, shared across all callers of this client.
    pub async fn health_probe(&self, force: bool) -> bool {
        self.health.probe(self.remote.as_ref(), force).await
    }

    async fn run_tier(
        &self,
        tier: &dyn ScoreTier,
        resume: &ResumeProfile,
        job: &JobPosting,
    ) -> Result<ScoreRecord, AiError> {
        let mut attempt = 0;
        loop {
            match tier.score(resume, job).await {
                Ok(record) => return Ok(record),
                Err(e) if e.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(tier = tier.name(), attempt, delay_ms = delay.as_millis() as u64,
                           "Transient tier failure, retrying: {e}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                // Malformed responses are not retried: the same request
                // would come back just as broken.
                Err(e) => return Err(e),
            }
        }
    }
}
