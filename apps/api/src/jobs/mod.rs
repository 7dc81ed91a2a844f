//! Job corpus provider — read-only access to active postings. The scoring
//! pipeline never mutates jobs; it only needs the full active corpus (for
//! recomputes) and filtered subsets (for listings).

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::JobPosting;

/// Listing filters. Search matches title or company, case-insensitive;
/// skills require every listed skill to appear on the posting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilters {
    pub search: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl JobFilters {
    pub fn matches(&self, job: &JobPosting) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !job.title.to_lowercase().contains(&needle)
                && !job.company.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        self.skills.iter().all(|wanted| {
            let wanted = wanted.to_lowercase();
            job.skills.iter().any(|s| s.to_lowercase() == wanted)
        })
    }
}

#[async_trait]
pub trait JobCorpus: Send + Sync {
    /// Every active posting — the corpus a background recompute covers.
    async fn list_active(&self) -> Result<Vec<JobPosting>, AppError>;

    /// Active postings matching the filters, for listing pages.
    async fn list_filtered(&self, filters: &JobFilters) -> Result<Vec<JobPosting>, AppError>;
}

/// Postgres corpus over the `jobs` table. The substring filter runs in
/// SQL; the skills filter runs in Rust since skills are a text array.
pub struct PgJobCorpus {
    pool: PgPool,
}

impl PgJobCorpus {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobCorpus for PgJobCorpus {
    async fn list_active(&self) -> Result<Vec<JobPosting>, AppError> {
        let jobs: Vec<JobPosting> = sqlx::query_as(
            "SELECT id, title, company, skills, experience_display, description, posted_at
             FROM jobs
             WHERE active
             ORDER BY posted_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    async fn list_filtered(&self, filters: &JobFilters) -> Result<Vec<JobPosting>, AppError> {
        let pattern = filters
            .search
            .as_ref()
            .map(|s| format!("%{s}%"))
            .unwrap_or_else(|| "%".to_string());

        let jobs: Vec<JobPosting> = sqlx::query_as(
            "SELECT id, title, company, skills, experience_display, description, posted_at
             FROM jobs
             WHERE active AND (title ILIKE $1 OR company ILIKE $1)
             ORDER BY posted_at DESC",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs.into_iter().filter(|j| filters.matches(j)).collect())
    }
}

/// Fixed in-memory corpus for tests.
#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryJobCorpus {
    jobs: Vec<JobPosting>,
}

#[allow(dead_code)]
impl MemoryJobCorpus {
    pub fn new(jobs: Vec<JobPosting>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl JobCorpus for MemoryJobCorpus {
    async fn list_active(&self) -> Result<Vec<JobPosting>, AppError> {
        Ok(self.jobs.clone())
    }

    async fn list_filtered(&self, filters: &JobFilters) -> Result<Vec<JobPosting>, AppError> {
        Ok(self
            .jobs
            .iter()
            .filter(|j| filters.matches(j))
            .cloned()
            .collect())
    }
}
