//! Local heuristic scorer — the final, network-free fallback tier.
//! Deterministic and always succeeds, so the chain has a guaranteed floor.

use crate::models::job::JobPosting;
use crate::models::resume::ResumeProfile;
use crate::models::score::{clamp_score, ScoreBreakdown, ScoreRecord};

/// Ceiling when the resume has real work history. Never 100: a heuristic
/// guess should not outrank a remote analysis.
const CAP_WITH_EXPERIENCE: u8 = 90;
/// Lower ceiling without work history, matching the original service's
/// anti-inflation rule for fresher profiles.
const CAP_WITHOUT_EXPERIENCE: u8 = 70;

const WITH_WORK_HISTORY: i64 = 75;
const INTERNSHIPS_ONLY: i64 = 50;
const PROJECTS_ONLY: i64 = 30;
const NO_EXPERIENCE_SIGNAL: i64 = 10;

/// Computes a fit score from skill overlap, a coarse experience-presence
/// signal, and a fixed education baseline. Missing structured fields
/// degrade the score; they never error.
pub fn heuristic_score(resume: &ResumeProfile, job: &JobPosting) -> ScoreRecord {
    let (skills_match, matched, missing) = skills_overlap(resume, job);
    let experience_match = experience_signal(resume);
    let education_match = if resume.education.is_empty() { 30 } else { 60 };
    let overall_alignment = (skills_match + experience_match) / 2;

    let weighted = (skills_match * 40 + experience_match * 30 + education_match * 20
        + overall_alignment * 10)
        / 100;

    let cap = if resume.has_work_experience() {
        CAP_WITH_EXPERIENCE
    } else {
        CAP_WITHOUT_EXPERIENCE
    };
    let fit_score = clamp_score(weighted).min(cap);

    let mut gaps: Vec<String> = missing
        .iter()
        .map(|s| format!("Missing required skill: {s}"))
        .collect();
    if !resume.has_work_experience() {
        gaps.push("No professional work experience".to_string());
    }

    let strengths: Vec<String> = matched
        .iter()
        .map(|s| format!("Has required skill: {s}"))
        .collect();

    ScoreRecord::from_parts(
        resume.user_id,
        job.id,
        fit_score as i64,
        ScoreBreakdown::clamped(skills_match, experience_match, education_match, overall_alignment),
        strengths,
        gaps,
    )
}

/// Case-insensitive overlap ratio of resume skills vs job skills, scaled
/// to 0–100. A job that lists no skills gives a neutral 50.
fn skills_overlap<'a>(
    resume: &ResumeProfile,
    job: &'a JobPosting,
) -> (i64, Vec<&'a String>, Vec<&'a String>) {
    if job.skills.is_empty() {
        return (50, Vec::new(), Vec::new());
    }

    let resume_skills: Vec<String> = resume.skills.iter().map(|s| s.to_lowercase()).collect();
    let (matched, missing): (Vec<&String>, Vec<&String>) = job
        .skills
        .iter()
        .partition(|s| resume_skills.iter().any(|r| r == &s.to_lowercase()));

    let ratio = matched.len() as i64 * 100 / job.skills.len() as i64;
    (ratio, matched, missing)
}

/// Coarse presence signal: real work history beats internships-only beats
/// projects-only beats nothing.
fn experience_signal(resume: &ResumeProfile) -> i64 {
    if !resume.experience.is_empty() {
        WITH_WORK_HISTORY
    } else if !resume.internships.is_empty() {
        INTERNSHIPS_ONLY
    } else if !resume.projects.is_empty() {
        PROJECTS_ONLY
    } else {
        NO_EXPERIENCE_SIGNAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::resume::{EducationEntry, ExperienceEntry, ProjectEntry};
    use crate::models::score::Recommendation;

    fn job_with_skills(skills: &[&str]) -> JobPosting {
        JobPosting {
            id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_display: "2-4 years".to_string(),
            description: String::new(),
            posted_at: Utc::now(),
        }
    }

    fn experienced_resume(skills: &[&str]) -> ResumeProfile {
        ResumeProfile {
            user_id: Uuid::new_v4(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience: vec![ExperienceEntry {
                title: "Engineer".to_string(),
                company: "Acme".to_string(),
                duration: "3 years".to_string(),
            }],
            education: vec![EducationEntry {
                degree: "BSc CS".to_string(),
                institution: "State".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_full_overlap_with_experience_scores_high() {
        let job = job_with_skills(&["Rust", "SQL"]);
        let resume = experienced_resume(&["rust", "sql"]);
        let record = heuristic_score(&resume, &job);
        assert!(record.fit_score >= 65, "got {}", record.fit_score);
        assert_eq!(record.breakdown.skills_match, 100);
        assert!(record.gaps.is_empty());
    }

    #[test]
    fn test_skill_match_is_case_insensitive() {
        let job = job_with_skills(&["RuSt"]);
        let resume = experienced_resume(&["RUST"]);
        assert_eq!(heuristic_score(&resume, &job).breakdown.skills_match, 100);
    }

    #[test]
    fn test_no_experience_capped_at_70() {
        let job = job_with_skills(&["rust"]);
        let resume = ResumeProfile {
            user_id: Uuid::new_v4(),
            skills: vec!["rust".to_string()],
            education: vec![EducationEntry::default()],
            ..Default::default()
        };
        let record = heuristic_score(&resume, &job);
        assert!(record.fit_score <= CAP_WITHOUT_EXPERIENCE);
        assert!(record
            .gaps
            .contains(&"No professional work experience".to_string()));
    }

    #[test]
    fn test_with_experience_never_exceeds_90() {
        let job = job_with_skills(&["rust"]);
        let record = heuristic_score(&experienced_resume(&["rust"]), &job);
        assert!(record.fit_score <= CAP_WITH_EXPERIENCE);
    }

    #[test]
    fn test_internships_outrank_projects() {
        let base = ResumeProfile {
            user_id: Uuid::new_v4(),
            ..Default::default()
        };
        let with_internship = ResumeProfile {
            internships: vec![ExperienceEntry::default()],
            ..base.clone()
        };
        let with_project = ResumeProfile {
            projects: vec![ProjectEntry::default()],
            ..base
        };
        assert!(experience_signal(&with_internship) > experience_signal(&with_project));
    }

    #[test]
    fn test_missing_skills_become_gaps() {
        let job = job_with_skills(&["rust", "kafka"]);
        let record = heuristic_score(&experienced_resume(&["rust"]), &job);
        assert_eq!(record.breakdown.skills_match, 50);
        assert!(record.gaps.iter().any(|g| g.contains("kafka")));
        assert!(record.strengths.iter().any(|s| s.contains("rust")));
    }

    #[test]
    fn test_empty_resume_is_deterministic_and_bounded() {
        let job = job_with_skills(&["rust"]);
        let empty = ResumeProfile {
            user_id: Uuid::new_v4(),
            ..Default::default()
        };
        let a = heuristic_score(&empty, &job);
        let b = heuristic_score(&empty, &job);
        assert_eq!(a.fit_score, b.fit_score);
        assert!(a.fit_score <= 100);
        assert_eq!(a.recommendation, Recommendation::NotRecommended);
    }

    #[test]
    fn test_job_without_skills_gets_neutral_skills_score() {
        let job = job_with_skills(&[]);
        let record = heuristic_score(&experienced_resume(&["rust"]), &job);
        assert_eq!(record.breakdown.skills_match, 50);
    }
}
