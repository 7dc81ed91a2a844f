//! AI service client — the single point of entry for all calls to the
//! external scoring capability.
//!
//! ARCHITECTURAL RULE: no other module may call the AI service directly.
//! The three remote call shapes (batch scoring, single structured
//! analysis, retrieval-augmented query) all live behind [`RemoteScoring`]
//! so the fallback chain and tests can swap the transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::job::JobPosting;
use crate::models::resume::ResumeProfile;
use crate::models::score::{ScoreBreakdown, ScoreRecord};

pub mod prompts;

/// Batch calls may score dozens of jobs in one request, so their budget is
/// minutes-scale. The other shapes are tighter.
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(120);
pub const SINGLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const RAG_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service timed out")]
    Timeout,

    #[error("AI service unreachable: {0}")]
    Connection(String),

    #[error("AI service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed AI response: {0}")]
    Malformed(String),

    #[error("AI service returned empty content")]
    EmptyContent,
}

impl AiError {
    /// Transient errors are worth retrying with backoff before the chain
    /// falls to the next tier. Malformed payloads are not — the same
    /// request would come back just as broken.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Timeout | AiError::Connection(_) => true,
            AiError::Api { status, .. } => *status == 429 || *status >= 500,
            AiError::Malformed(_) | AiError::EmptyContent => false,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AiError::Timeout
        } else {
            AiError::Connection(e.to_string())
        }
    }
}

/// Wire shape of one scored job as the AI service emits it. Fields default
/// so a sparse payload still parses; everything is re-clamped and the
/// recommendation re-derived when converted into a [`ScoreRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorePayload {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(rename = "fitScore", default)]
    pub fit_score: i64,
    #[serde(default)]
    pub breakdown: PayloadBreakdown,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    /// Label as emitted by the model. Ignored — thresholds win.
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadBreakdown {
    #[serde(default)]
    pub skills_match: i64,
    #[serde(default)]
    pub experience_match: i64,
    #[serde(default)]
    pub education_match: i64,
    #[serde(default)]
    pub overall_alignment: i64,
}

impl ScorePayload {
    pub fn into_record(self, user_id: uuid::Uuid, job_id: uuid::Uuid) -> ScoreRecord {
        ScoreRecord::from_parts(
            user_id,
            job_id,
            self.fit_score,
            ScoreBreakdown::clamped(
                self.breakdown.skills_match,
                self.breakdown.experience_match,
                self.breakdown.education_match,
                self.breakdown.overall_alignment,
            ),
            self.strengths,
            self.gaps,
        )
    }
}

/// The three remote call shapes consumed by the fallback chain, plus the
/// health probe. Implemented by [`AiClient`] in production and by mocks in
/// tests.
#[async_trait]
pub trait RemoteScoring: Send + Sync {
    /// Scores many jobs against one resume in a single call. The model
    /// occasionally drops jobs from large batches; those are simply absent
    /// from the result, and the caller decides whether that shortfall is a
    /// failure (single-job tier) or a zero-fill (corpus recompute).
    async fn batch_score(
        &self,
        resume: &ResumeProfile,
        jobs: &[JobPosting],
    ) -> Result<Vec<ScorePayload>, AiError>;

    /// One resume/job pair as a standalone structured-analysis request.
    async fn single_score(
        &self,
        resume: &ResumeProfile,
        job: &JobPosting,
    ) -> Result<ScorePayload, AiError>;

    /// Runs a prompt against a resume-specific knowledge index.
    async fn rag_query(&self, index_id: &str, prompt: &str) -> Result<String, AiError>;

    /// Liveness of the AI service, bounded by `timeout`.
    async fn health(&self, timeout: Duration) -> bool;
}

#[derive(Debug, Deserialize)]
struct BatchScoresResponse {
    #[serde(default)]
    scores: Vec<ScorePayload>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RagResponse {
    #[serde(default)]
    answer: Option<String>,
}

/// HTTP client for the AI service.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
}

impl AiClient {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        Ok(Self {
            // Per-request timeouts are set at each call site; the builder
            // timeout is only a ceiling.
            client: Client::builder().timeout(BATCH_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteScoring for AiClient {
    async fn batch_score(
        &self,
        resume: &ResumeProfile,
        jobs: &[JobPosting],
    ) -> Result<Vec<ScorePayload>, AiError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let summaries: Vec<serde_json::Value> = jobs.iter().map(JobPosting::summary).collect();
        let body = json!({
            "resume_data": resume,
            "jobs": summaries,
        });

        let response = self
            .client
            .post(format!("{}/fast/batch-fit-scores", self.base_url))
            .timeout(BATCH_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(AiError::from_reqwest)?;

        let response = Self::check_status(response).await?;
        let parsed: BatchScoresResponse = response
            .json()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))?;

        debug!(scores = parsed.scores.len(), jobs = jobs.len(), "Batch scoring call succeeded");
        Ok(parsed.scores)
    }

    async fn single_score(
        &self,
        resume: &ResumeProfile,
        job: &JobPosting,
    ) -> Result<ScorePayload, AiError> {
        let prompt = prompts::SINGLE_SCORE_PROMPT_TEMPLATE
            .replace("{resume_summary}", &resume.summary())
            .replace("{job_summary}", &job.summary().to_string());

        let body = json!({
            "prompt": prompt,
            "system_message": prompts::SINGLE_SCORE_SYSTEM,
        });

        let response = self
            .client
            .post(format!("{}/ai/analyze", self.base_url))
            .timeout(SINGLE_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(AiError::from_reqwest)?;

        let response = Self::check_status(response).await?;
        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(AiError::Api {
                status: 200,
                message: error,
            });
        }

        let text = parsed.response.ok_or(AiError::EmptyContent)?;
        parse_score_payload(&text)
    }

    async fn rag_query(&self, index_id: &str, prompt: &str) -> Result<String, AiError> {
        let body = json!({
            "pdf_id": index_id,
            "question": prompt,
        });

        let response = self
            .client
            .post(format!("{}/pdf/query", self.base_url))
            .timeout(RAG_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(AiError::from_reqwest)?;

        let response = Self::check_status(response).await?;
        let parsed: RagResponse = response
            .json()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))?;

        parsed.answer.ok_or(AiError::EmptyContent)
    }

    async fn health(&self, timeout: Duration) -> bool {
        let result = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(timeout)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("AI service health check failed: {e}");
                false
            }
        }
    }
}

/// Parses AI output into a [`ScorePayload`], tolerating the usual wrapper
/// noise: raw JSON, JSON inside a fenced code block, or the first JSON
/// object embedded in free text.
pub fn parse_score_payload(text: &str) -> Result<ScorePayload, AiError> {
    let value = extract_json_object(text)?;
    serde_json::from_value(value).map_err(|e| AiError::Malformed(e.to_string()))
}

/// Tolerant JSON extraction. Tries, in order: the whole (fence-stripped)
/// text, then the first balanced `{…}` object found anywhere in it.
pub fn extract_json_object(text: &str) -> Result<serde_json::Value, AiError> {
    let stripped = strip_json_fences(text);
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(stripped) {
        if value.is_object() {
            return Ok(value);
        }
    }

    if let Some(candidate) = first_json_object(stripped) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate) {
            return Ok(value);
        }
    }

    Err(AiError::Malformed(format!(
        "no JSON object in response: {}",
        text.chars().take(120).collect::<String>()
    )))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Finds the first balanced top-level `{…}` span, skipping braces inside
/// string literals.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
