//! Read-time merge of cached scores into job listings. This path only
//! reads the cache — it never waits on the AI service — so listing latency
//! stays flat even while a background recompute is running or the remote
//! capability is degraded.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::cache::{write_silently, ScoreCache};
use crate::errors::AppError;
use crate::jobs::{JobCorpus, JobFilters};
use crate::models::job::JobPosting;
use crate::models::resume::ResumeProfile;
use crate::models::score::ScoreRecord;
use crate::scoring::client::ScoreClient;

/// Budget for the synchronous on-demand scoring path before the caller is
/// released with a provisional result.
pub const ON_DEMAND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
pub struct ListingItem {
    pub job: JobPosting,
    /// Present on cache hit; `None` while the job is still unscored.
    pub score: Option<ScoreRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub items: Vec<ListingItem>,
    pub total: usize,
    pub scored_count: usize,
}

/// Result of the on-demand path. `provisional` marks a response produced
/// before the authoritative computation finished; the caller may retry
/// later and the cache will have silently caught up.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredResult {
    pub record: ScoreRecord,
    pub provisional: bool,
}

pub struct ListingMerger {
    cache: Arc<dyn ScoreCache>,
    corpus: Arc<dyn JobCorpus>,
    scorer: Arc<ScoreClient>,
    on_demand_timeout: Duration,
}

impl ListingMerger {
    pub fn new(
        cache: Arc<dyn ScoreCache>,
        corpus: Arc<dyn JobCorpus>,
        scorer: Arc<ScoreClient>,
    ) -> Self {
        Self {
            cache,
            corpus,
            scorer,
            on_demand_timeout: ON_DEMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.on_demand_timeout = timeout;
        self
    }

    /// Builds one listing page: scored jobs first (fit score descending),
    /// then unscored jobs (newest first). The ordering is stable across
    /// page boundaries, so any page size slices the same concatenation.
    pub async fn build_page(
        &self,
        user_id: Uuid,
        filters: &JobFilters,
        page: usize,
        page_size: usize,
    ) -> Result<ListingPage, AppError> {
        let jobs = self.corpus.list_filtered(filters).await?;
        let ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
        let mut scores = self.cache.get(user_id, &ids).await?;

        let (mut scored, mut unscored): (Vec<ListingItem>, Vec<ListingItem>) = jobs
            .into_iter()
            .map(|job| {
                let score = scores.remove(&job.id);
                ListingItem { job, score }
            })
            .partition(|item| item.score.is_some());

        // Ties resolve by recency then id so pagination is deterministic.
        scored.sort_by(|a, b| {
            let fa = a.score.as_ref().map(|s| s.fit_score).unwrap_or(0);
            let fb = b.score.as_ref().map(|s| s.fit_score).unwrap_or(0);
            fb.cmp(&fa)
                .then(b.job.posted_at.cmp(&a.job.posted_at))
                .then(a.job.id.cmp(&b.job.id))
        });
        unscored.sort_by(|a, b| {
            b.job
                .posted_at
                .cmp(&a.job.posted_at)
                .then(a.job.id.cmp(&b.job.id))
        });

        let scored_count = scored.len();
        let mut all = scored;
        all.append(&mut unscored);
        let total = all.len();

        let page = page.max(1);
        let page_size = page_size.max(1);
        let start = (page - 1).saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);

        Ok(ListingPage {
            items: all[start..end].to_vec(),
            total,
            scored_count,
        })
    }

    /// Synchronous, bounded-latency scoring for a single job: races the
    /// compute against a fixed timeout. The compute is not cancelled on
    /// timeout — only the caller is released early — so the late result
    /// still lands in the cache for future reads.
    pub async fn compute_and_cache_one(
        &self,
        profile: ResumeProfile,
        job: JobPosting,
    ) -> ScoredResult {
        let user_id = profile.user_id;
        let job_id = job.id;

        let scorer = Arc::clone(&self.scorer);
        let cache = Arc::clone(&self.cache);
        let compute = tokio::spawn(async move {
            let record = scorer.compute_score(&profile, &job).await;
            write_silently(cache.as_ref(), std::slice::from_ref(&record)).await;
            record
        });

        match tokio::time::timeout(self.on_demand_timeout, compute).await {
            Ok(Ok(record)) => ScoredResult {
                record,
                provisional: false,
            },
            Ok(Err(e)) => {
                error!(%job_id, "On-demand scoring task panicked: {e}");
                ScoredResult {
                    record: ScoreRecord::zero(user_id, job_id, "Error calculating match"),
                    provisional: true,
                }
            }
            Err(_) => {
                warn!(%job_id, timeout_s = self.on_demand_timeout.as_secs(),
                      "On-demand scoring timed out; returning provisional result");
                let best = match self.cache.get(user_id, &[job_id]).await {
                    Ok(mut cached) => cached.remove(&job_id),
                    Err(e) => {
                        warn!("Cache lookup for provisional result failed: {e}");
                        None
                    }
                };
                ScoredResult {
                    record: best.unwrap_or_else(|| {
                        ScoreRecord::zero(user_id, job_id, "Calculating fit score")
                    }),
                    provisional: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::ai_client::{AiError, PayloadBreakdown, RemoteScoring, ScorePayload};
    use crate::cache::memory::MemoryScoreCache;
    use crate::jobs::MemoryJobCorpus;
    use crate::scoring::health::HealthMonitor;
    use crate::scoring::retry::RetryPolicy;

    /// Remote whose batch tier answers after a fixed delay.
    struct DelayedRemote {
        delay: Duration,
        fit: i64,
    }

    #[async_trait]
    impl RemoteScoring for DelayedRemote {
        async fn batch_score(
            &self,
            _resume: &ResumeProfile,
            jobs: &[JobPosting],
        ) -> Result<Vec<ScorePayload>, AiError> {
            tokio::time::sleep(self.delay).await;
            Ok(jobs
                .iter()
                .map(|j| ScorePayload {
                    job_id: Some(j.id.to_string()),
                    fit_score: self.fit,
                    breakdown: PayloadBreakdown::default(),
                    strengths: vec![],
                    gaps: vec![],
                    recommendation: None,
                })
                .collect())
        }

        async fn single_score(
            &self,
            _resume: &ResumeProfile,
            _job: &JobPosting,
        ) -> Result<ScorePayload, AiError> {
            Err(AiError::EmptyContent)
        }

        async fn rag_query(&self, _index_id: &str, _prompt: &str) -> Result<String, AiError> {
            Err(AiError::EmptyContent)
        }

        async fn health(&self, _timeout: Duration) -> bool {
            true
        }
    }

    fn job_posted(hours_ago: i64) -> JobPosting {
        JobPosting {
            id: Uuid::new_v4(),
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            skills: vec![],
            experience_display: String::new(),
            description: String::new(),
            posted_at: Utc::now() - chrono::Duration::hours(hours_ago),
        }
    }

    fn record(user_id: Uuid, job_id: Uuid, fit: i64) -> ScoreRecord {
        ScoreRecord::from_parts(user_id, job_id, fit, Default::default(), vec![], vec![])
    }

    fn merger(
        jobs: Vec<JobPosting>,
        cache: Arc<MemoryScoreCache>,
        delay: Duration,
        timeout: Duration,
    ) -> ListingMerger {
        let scorer = Arc::new(ScoreClient::new(
            Arc::new(DelayedRemote { delay, fit: 81 }),
            Arc::new(HealthMonitor::default()),
            RetryPolicy::new(0, Duration::from_millis(0)),
        ));
        ListingMerger::new(cache, Arc::new(MemoryJobCorpus::new(jobs)), scorer)
            .with_timeout(timeout)
    }

    #[tokio::test]
    async fn test_no_resume_lists_everything_unscored() {
        let jobs = vec![job_posted(1), job_posted(2), job_posted(3)];
        let cache = Arc::new(MemoryScoreCache::new());
        let merger = merger(jobs, cache, Duration::ZERO, ON_DEMAND_TIMEOUT);

        let page = merger
            .build_page(Uuid::new_v4(), &JobFilters::default(), 1, 10)
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.scored_count, 0);
        assert!(page.items.iter().all(|i| i.score.is_none()));
        // Unscored partition: newest first.
        assert!(page.items[0].job.posted_at > page.items[2].job.posted_at);
    }

    #[tokio::test]
    async fn test_scored_jobs_precede_unscored_at_every_page_size() {
        let jobs: Vec<JobPosting> = (0..5).map(|i| job_posted(i)).collect();
        let user_id = Uuid::new_v4();
        let cache = Arc::new(MemoryScoreCache::new());
        cache
            .upsert_batch(&[
                record(user_id, jobs[3].id, 40),
                record(user_id, jobs[1].id, 90),
            ])
            .await
            .unwrap();
        let merger = merger(jobs, cache, Duration::ZERO, ON_DEMAND_TIMEOUT);

        for page_size in [1, 5, 6] {
            let mut seen_unscored = false;
            let mut page_no = 1;
            loop {
                let page = merger
                    .build_page(user_id, &JobFilters::default(), page_no, page_size)
                    .await
                    .unwrap();
                if page.items.is_empty() {
                    break;
                }
                for item in &page.items {
                    if item.score.is_none() {
                        seen_unscored = true;
                    } else {
                        assert!(!seen_unscored, "scored job after unscored at size {page_size}");
                    }
                }
                page_no += 1;
            }
        }
    }

    #[tokio::test]
    async fn test_page_of_two_returns_exactly_the_scored_pair_in_order() {
        let jobs: Vec<JobPosting> = (0..5).map(|i| job_posted(i)).collect();
        let user_id = Uuid::new_v4();
        let cache = Arc::new(MemoryScoreCache::new());
        // Cache order deliberately differs from corpus order.
        cache
            .upsert_batch(&[
                record(user_id, jobs[4].id, 40),
                record(user_id, jobs[2].id, 90),
            ])
            .await
            .unwrap();
        let expected = [jobs[2].id, jobs[4].id];
        let merger = merger(jobs, cache, Duration::ZERO, ON_DEMAND_TIMEOUT);

        let page = merger
            .build_page(user_id, &JobFilters::default(), 1, 2)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.scored_count, 2);
        let got: Vec<Uuid> = page.items.iter().map(|i| i.job.id).collect();
        assert_eq!(got, expected);
        assert_eq!(page.items[0].score.as_ref().unwrap().fit_score, 90);
        assert_eq!(page.items[1].score.as_ref().unwrap().fit_score, 40);
    }

    #[tokio::test]
    async fn test_filters_restrict_the_merged_set() {
        let mut jobs: Vec<JobPosting> = (0..3).map(|i| job_posted(i)).collect();
        jobs[0].title = "Rust Engineer".to_string();
        let cache = Arc::new(MemoryScoreCache::new());
        let merger = merger(jobs, cache, Duration::ZERO, ON_DEMAND_TIMEOUT);

        let filters = JobFilters {
            search: Some("rust".to_string()),
            skills: vec![],
        };
        let page = merger
            .build_page(Uuid::new_v4(), &filters, 1, 10)
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].job.title, "Rust Engineer");
    }

    #[tokio::test]
    async fn test_on_demand_fast_path_is_authoritative_and_cached() {
        let job = job_posted(0);
        let cache = Arc::new(MemoryScoreCache::new());
        let merger = merger(
            vec![job.clone()],
            cache.clone(),
            Duration::ZERO,
            ON_DEMAND_TIMEOUT,
        );

        let profile = ResumeProfile {
            user_id: Uuid::new_v4(),
            ..Default::default()
        };
        let result = merger.compute_and_cache_one(profile.clone(), job.clone()).await;
        assert!(!result.provisional);
        assert_eq!(result.record.fit_score, 81);

        let cached = cache.get(profile.user_id, &[job.id]).await.unwrap();
        assert_eq!(cached[&job.id].fit_score, 81);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_demand_timeout_returns_provisional_then_backfills_cache() {
        let job = job_posted(0);
        let cache = Arc::new(MemoryScoreCache::new());
        let merger = merger(
            vec![job.clone()],
            cache.clone(),
            Duration::from_secs(5),
            Duration::from_millis(100),
        );

        let profile = ResumeProfile {
            user_id: Uuid::new_v4(),
            ..Default::default()
        };
        let result = merger.compute_and_cache_one(profile.clone(), job.clone()).await;
        assert!(result.provisional);
        assert_eq!(result.record.fit_score, 0);
        assert!(result
            .record
            .gaps
            .contains(&"Calculating fit score".to_string()));

        // The compute was released, not cancelled: once it settles, the
        // cache holds the authoritative record.
        tokio::time::sleep(Duration::from_secs(10)).await;
        let cached = cache.get(profile.user_id, &[job.id]).await.unwrap();
        assert_eq!(cached[&job.id].fit_score, 81);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_demand_timeout_prefers_previous_cached_value() {
        let job = job_posted(0);
        let user_id = Uuid::new_v4();
        let cache = Arc::new(MemoryScoreCache::new());
        cache
            .upsert_batch(&[record(user_id, job.id, 63)])
            .await
            .unwrap();
        let merger = merger(
            vec![job.clone()],
            cache.clone(),
            Duration::from_secs(5),
            Duration::from_millis(100),
        );

        let profile = ResumeProfile {
            user_id,
            ..Default::default()
        };
        let result = merger.compute_and_cache_one(profile, job).await;
        assert!(result.provisional);
        assert_eq!(result.record.fit_score, 63);
    }
}
