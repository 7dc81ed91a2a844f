use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An active job posting. Read-only input to the scoring pipeline —
/// postings are owned and mutated elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    /// Required skills as listed on the posting.
    pub skills: Vec<String>,
    /// Human-readable experience range, e.g. "2-4 years".
    pub experience_display: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
}

impl JobPosting {
    /// Compact summary sent to the AI service. Description is truncated to
    /// keep batch prompts small; the first 300 chars carry enough signal.
    pub fn summary(&self) -> serde_json::Value {
        let description: String = self.description.chars().take(300).collect();
        serde_json::json!({
            "id": self.id.to_string(),
            "title": self.title,
            "company": self.company,
            "skills": self.skills,
            "experience": self.experience_display,
            "description": description,
        })
    }
}
