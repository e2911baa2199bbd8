//! Job postings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::application::{Application, ApplicationId};
use crate::user::UserId;

/// Unique identifier for a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Required experience level for a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[serde(rename = "Entry Level")]
    Entry,
    #[serde(rename = "Mid Level")]
    Mid,
    #[serde(rename = "Senior Level")]
    Senior,
    #[serde(rename = "Expert Level")]
    Expert,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "Entry Level",
            ExperienceLevel::Mid => "Mid Level",
            ExperienceLevel::Senior => "Senior Level",
            ExperienceLevel::Expert => "Expert Level",
        }
    }

    /// Parse from the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Entry Level" => Some(ExperienceLevel::Entry),
            "Mid Level" => Some(ExperienceLevel::Mid),
            "Senior Level" => Some(ExperienceLevel::Senior),
            "Expert Level" => Some(ExperienceLevel::Expert),
            _ => None,
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Employment arrangement for a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentType {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    #[serde(rename = "Contract")]
    Contract,
    #[serde(rename = "Internship")]
    Internship,
    #[serde(rename = "Remote")]
    Remote,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "Full-time",
            EmploymentType::PartTime => "Part-time",
            EmploymentType::Contract => "Contract",
            EmploymentType::Internship => "Internship",
            EmploymentType::Remote => "Remote",
        }
    }

    /// Parse from the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Full-time" => Some(EmploymentType::FullTime),
            "Part-time" => Some(EmploymentType::PartTime),
            "Contract" => Some(EmploymentType::Contract),
            "Internship" => Some(EmploymentType::Internship),
            "Remote" => Some(EmploymentType::Remote),
            _ => None,
        }
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job posting owned by a single company.
///
/// Applications live inside the document; there is no separate applications
/// collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,

    pub title: String,

    pub description: String,

    #[serde(default)]
    pub requirements: Vec<String>,

    pub experience_level: ExperienceLevel,

    pub employment_type: EmploymentType,

    /// Number of open positions, at least 1.
    #[serde(default = "default_openings")]
    pub openings: u32,

    pub location: String,

    /// Free text ("$90k-120k", "competitive", ...).
    pub salary: String,

    /// Must be strictly in the future when the job is created.
    pub deadline_date: DateTime<Utc>,

    /// Set semantics; duplicates are dropped on construction.
    #[serde(default)]
    pub key_skills: Vec<String>,

    #[serde(default)]
    pub job_highlights: Vec<String>,

    /// Owning company, bound from the authenticated identity. Immutable.
    pub company_id: UserId,

    #[serde(default)]
    pub applicants: Vec<Application>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn default_openings() -> u32 {
    1
}

impl Job {
    /// Whether the posting still accepts applications at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.deadline_date > now
    }

    /// The student's existing application, if any. At most one per student.
    pub fn application_of(&self, student_id: &UserId) -> Option<&Application> {
        self.applicants.iter().find(|a| &a.student_id == student_id)
    }

    /// Look up an application by its ID.
    pub fn application_mut(&mut self, application_id: &ApplicationId) -> Option<&mut Application> {
        self.applicants.iter_mut().find(|a| &a.id == application_id)
    }

    /// Listing view with applicant data stripped.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            requirements: self.requirements.clone(),
            experience_level: self.experience_level,
            employment_type: self.employment_type,
            openings: self.openings,
            location: self.location.clone(),
            salary: self.salary.clone(),
            deadline_date: self.deadline_date,
            key_skills: self.key_skills.clone(),
            job_highlights: self.job_highlights.clone(),
            company_id: self.company_id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Job view without embedded applications, used for public listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub employment_type: EmploymentType,
    pub openings: u32,
    pub location: String,
    pub salary: String,
    pub deadline_date: DateTime<Utc>,
    pub key_skills: Vec<String>,
    pub job_highlights: Vec<String>,
    pub company_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Drop duplicate skills while preserving first-seen order.
pub fn dedup_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    skills
        .into_iter()
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_job(deadline: DateTime<Utc>) -> Job {
        let now = Utc::now();
        Job {
            id: JobId::new(),
            title: "Backend Engineer".to_string(),
            description: "Build the thing".to_string(),
            requirements: vec!["3y Rust".to_string()],
            experience_level: ExperienceLevel::Mid,
            employment_type: EmploymentType::FullTime,
            openings: 2,
            location: "Berlin".to_string(),
            salary: "competitive".to_string(),
            deadline_date: deadline,
            key_skills: vec!["rust".to_string()],
            job_highlights: vec![],
            company_id: UserId::from_string("company-1"),
            applicants: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_experience_level_wire_values() {
        assert_eq!(
            serde_json::to_string(&ExperienceLevel::Expert).unwrap(),
            "\"Expert Level\""
        );
        assert_eq!(ExperienceLevel::parse("Mid Level"), Some(ExperienceLevel::Mid));
        assert_eq!(ExperienceLevel::parse("mid level"), None);
    }

    #[test]
    fn test_employment_type_wire_values() {
        assert_eq!(
            serde_json::to_string(&EmploymentType::PartTime).unwrap(),
            "\"Part-time\""
        );
        assert_eq!(EmploymentType::parse("Remote"), Some(EmploymentType::Remote));
        assert_eq!(EmploymentType::parse("remote"), None);
    }

    #[test]
    fn test_is_open_is_strict() {
        let now = Utc::now();
        assert!(sample_job(now + Duration::seconds(1)).is_open(now));
        assert!(!sample_job(now).is_open(now));
        assert!(!sample_job(now - Duration::seconds(1)).is_open(now));
    }

    #[test]
    fn test_application_lookup() {
        let mut job = sample_job(Utc::now() + Duration::days(1));
        let student = UserId::from_string("student-1");
        assert!(job.application_of(&student).is_none());

        job.applicants.push(Application::new(student.clone()));
        assert!(job.application_of(&student).is_some());
        assert!(job
            .application_of(&UserId::from_string("student-2"))
            .is_none());
    }

    #[test]
    fn test_summary_excludes_applicants() {
        let mut job = sample_job(Utc::now() + Duration::days(1));
        job.applicants
            .push(Application::new(UserId::from_string("student-1")));
        let json = serde_json::to_value(job.summary()).unwrap();
        assert!(json.get("applicants").is_none());
        assert_eq!(json["title"], "Backend Engineer");
    }

    #[test]
    fn test_dedup_skills_keeps_order() {
        let skills = vec![
            "Rust".to_string(),
            "sql".to_string(),
            "rust".to_string(),
            "SQL".to_string(),
        ];
        assert_eq!(dedup_skills(skills), vec!["Rust", "sql"]);
    }
}
