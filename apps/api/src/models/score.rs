//! Score records — the cached result of one fit-score computation for a
//! (user, job) pair. All score fields are clamped to 0–100 at construction
//! so nothing out of range ever reaches the cache, regardless of which
//! tier produced the numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recommendation label, a pure function of the fit score. Wire labels
/// match the original listing UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Highly recommended")]
    HighlyRecommended,
    #[serde(rename = "Recommended")]
    Recommended,
    #[serde(rename = "Consider")]
    Consider,
    #[serde(rename = "Not recommended")]
    NotRecommended,
}

impl Recommendation {
    /// ≥80 Highly, ≥65 Recommended, ≥50 Consider, else Not recommended.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Recommendation::HighlyRecommended,
            65..=79 => Recommendation::Recommended,
            50..=64 => Recommendation::Consider,
            _ => Recommendation::NotRecommended,
        }
    }
}

/// Named sub-scores behind a fit score, each 0–100.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub skills_match: u8,
    pub experience_match: u8,
    pub education_match: u8,
    pub overall_alignment: u8,
}

impl ScoreBreakdown {
    pub fn clamped(skills: i64, experience: i64, education: i64, alignment: i64) -> Self {
        Self {
            skills_match: clamp_score(skills),
            experience_match: clamp_score(experience),
            education_match: clamp_score(education),
            overall_alignment: clamp_score(alignment),
        }
    }
}

/// One cached fit-score computation. Exactly one record exists per
/// (user_id, job_id) — all writes are keyed upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub fit_score: u8,
    pub breakdown: ScoreBreakdown,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub recommendation: Recommendation,
    pub calculated_at: DateTime<Utc>,
}

impl ScoreRecord {
    /// Builds a record from raw (possibly out-of-range) tier output.
    /// The recommendation is always re-derived from the clamped fit score;
    /// whatever label the tier emitted is discarded.
    pub fn from_parts(
        user_id: Uuid,
        job_id: Uuid,
        fit_score: i64,
        breakdown: ScoreBreakdown,
        strengths: Vec<String>,
        gaps: Vec<String>,
    ) -> Self {
        let fit_score = clamp_score(fit_score);
        Self {
            user_id,
            job_id,
            fit_score,
            breakdown,
            strengths,
            gaps,
            recommendation: Recommendation::from_score(fit_score),
            calculated_at: Utc::now(),
        }
    }

    /// Zero-score record written when a job could not be scored at all.
    /// Keeps the job present in the cache so listings stay complete.
    pub fn zero(user_id: Uuid, job_id: Uuid, gap: &str) -> Self {
        Self {
            user_id,
            job_id,
            fit_score: 0,
            breakdown: ScoreBreakdown::default(),
            strengths: Vec::new(),
            gaps: vec![gap.to_string()],
            recommendation: Recommendation::NotRecommended,
            calculated_at: Utc::now(),
        }
    }
}

pub fn clamp_score(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}
