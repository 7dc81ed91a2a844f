use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A position held at a company. Shared by work experience and internships.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub duration: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
}

/// A candidate's extracted resume. Replaced wholesale when the user
/// re-uploads — there is no partial merge, which is what makes full-user
/// cache invalidation safe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub user_id: Uuid,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub internships: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<String>,
    pub raw_text: Option<String>,
}

impl ResumeProfile {
    pub fn has_work_experience(&self) -> bool {
        !self.experience.is_empty()
    }

    /// Renders the compact plain-text summary embedded in every remote
    /// scoring prompt. Work experience, internships, and projects are
    /// labelled separately so the model does not conflate them.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.skills.is_empty() {
            let top: Vec<&str> = self.skills.iter().take(20).map(String::as_str).collect();
            parts.push(format!("Skills: {}", top.join(", ")));
        }

        if self.experience.is_empty() {
            parts.push("WORK EXPERIENCE: NONE (no professional work experience)".to_string());
        } else {
            parts.push(format!(
                "WORK EXPERIENCE: {} professional position(s)",
                self.experience.len()
            ));
            for e in self.experience.iter().take(3) {
                parts.push(format!("  - {} at {} ({})", e.title, e.company, e.duration));
            }
        }

        if self.internships.is_empty() {
            parts.push("Internships: NONE".to_string());
        } else {
            parts.push(format!("Internships: {} internship(s)", self.internships.len()));
            for i in self.internships.iter().take(2) {
                parts.push(format!("  - {} at {} ({})", i.title, i.company, i.duration));
            }
        }

        if !self.projects.is_empty() {
            parts.push(format!(
                "Projects (NOT work experience, shows skills only): {} project(s)",
                self.projects.len()
            ));
            for p in self.projects.iter().take(3) {
                let tech: Vec<&str> = p.technologies.iter().take(5).map(String::as_str).collect();
                parts.push(format!("  - {} (Tech: {})", p.name, tech.join(", ")));
            }
        }

        for e in self.education.iter().take(2) {
            parts.push(format!("Education: {} from {}", e.degree, e.institution));
        }

        if !self.certifications.is_empty() {
            let certs: Vec<&str> = self.certifications.iter().take(5).map(String::as_str).collect();
            parts.push(format!("Certifications: {}", certs.join(", ")));
        }

        // Raw text is the fallback when nothing structured was extracted.
        if parts.is_empty() {
            if let Some(raw) = &self.raw_text {
                let truncated: String = raw.chars().take(1000).collect();
                parts.push(format!("Resume Text: {truncated}"));
            }
        }

        if parts.is_empty() {
            "Resume data available".to_string()
        } else {
            parts.join("\n")
        }
    }
}
