//! Job posting handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jobdesk_firestore::{JobFilters, JobPatch};
use jobdesk_models::{
    dedup_skills, EmploymentType, ExperienceLevel, Job, JobId, JobSummary, UserId, UserSummary,
};

use crate::auth::{CompanyUser, StudentUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

/// Job creation payload. Required fields are optional here so absence maps to
/// a 400 with a field name rather than a body-rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub employment_type: Option<EmploymentType>,
    pub openings: Option<u32>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub deadline_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub key_skills: Vec<String>,
    #[serde(default)]
    pub job_highlights: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateJobBatchRequest {
    pub jobs: Option<Vec<CreateJobRequest>>,
}

/// Partial update payload for PATCH /jobs/:id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub experience_level: Option<ExperienceLevel>,
    pub employment_type: Option<EmploymentType>,
    pub openings: Option<u32>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub deadline_date: Option<DateTime<Utc>>,
    pub key_skills: Option<Vec<String>>,
    pub job_highlights: Option<Vec<String>>,
}

/// Query parameters for the open-jobs listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    /// Comma-separated skill list.
    pub key_skills: Option<String>,
}

/// Job detail with the owning company's summary attached and applicant data
/// excluded.
#[derive(Debug, Serialize)]
pub struct JobDetailResponse {
    #[serde(flatten)]
    pub job: JobSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub message: String,
}

fn require<T>(value: Option<T>, field: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::validation(format!("Missing required field: {}", field)))
}

/// Validate a creation payload and build the job it describes.
fn build_job(company_id: &UserId, req: CreateJobRequest, now: DateTime<Utc>) -> ApiResult<Job> {
    let title = require(req.title, "title")?;
    let description = require(req.description, "description")?;
    let experience_level = require(req.experience_level, "experienceLevel")?;
    let employment_type = require(req.employment_type, "employmentType")?;
    let location = require(req.location, "location")?;
    let salary = require(req.salary, "salary")?;
    let deadline_date = require(req.deadline_date, "deadlineDate")?;

    if deadline_date <= now {
        return Err(ApiError::validation("deadlineDate must be in the future"));
    }

    let openings = req.openings.unwrap_or(1);
    if openings < 1 {
        return Err(ApiError::validation("openings must be at least 1"));
    }

    Ok(Job {
        id: JobId::new(),
        title,
        description,
        requirements: req.requirements,
        experience_level,
        employment_type,
        openings,
        location,
        salary,
        deadline_date,
        key_skills: dedup_skills(req.key_skills),
        job_highlights: req.job_highlights,
        company_id: company_id.clone(),
        applicants: Vec::new(),
        created_at: now,
        updated_at: now,
    })
}

fn parse_filters(query: ListJobsQuery) -> ApiResult<JobFilters> {
    let employment_type = match query.employment_type {
        Some(s) => Some(EmploymentType::parse(&s).ok_or_else(|| {
            ApiError::validation(format!("Unknown employment type: {}", s))
        })?),
        None => None,
    };
    let experience_level = match query.experience_level {
        Some(s) => Some(ExperienceLevel::parse(&s).ok_or_else(|| {
            ApiError::validation(format!("Unknown experience level: {}", s))
        })?),
        None => None,
    };
    let key_skills = query
        .key_skills
        .map(|s| {
            s.split(',')
                .map(|skill| skill.trim().to_string())
                .filter(|skill| !skill.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(JobFilters {
        location: query.location,
        employment_type,
        experience_level,
        key_skills,
    })
}

/// GET /jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    _student: StudentUser,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobSummary>>> {
    let filters = parse_filters(query)?;
    let jobs = state.jobs.list_open(&filters, Utc::now()).await?;
    Ok(Json(jobs.iter().map(Job::summary).collect()))
}

/// GET /jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    _student: StudentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<JobDetailResponse>> {
    let job = state
        .jobs
        .get(&JobId::from_string(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let company = state
        .users
        .get(&job.company_id)
        .await?
        .map(|u| u.summary());

    Ok(Json(JobDetailResponse {
        job: job.summary(),
        company,
    }))
}

/// POST /jobs
pub async fn create_job(
    State(state): State<AppState>,
    CompanyUser(company): CompanyUser,
    ApiJson(req): ApiJson<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let job = build_job(&company.id, req, Utc::now())?;
    state.jobs.create(&job).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// POST /jobs/multiple
///
/// All payloads are validated up front, then written as one atomic batch;
/// either every job is created or none are.
pub async fn create_jobs_batch(
    State(state): State<AppState>,
    CompanyUser(company): CompanyUser,
    ApiJson(req): ApiJson<CreateJobBatchRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Job>>)> {
    let requests = require(req.jobs, "jobs")?;
    if requests.is_empty() {
        return Err(ApiError::validation("jobs must not be empty"));
    }

    let now = Utc::now();
    let mut jobs = Vec::with_capacity(requests.len());
    let mut errors = Vec::new();
    for (i, item) in requests.into_iter().enumerate() {
        match build_job(&company.id, item, now) {
            Ok(job) => jobs.push(job),
            Err(e) => errors.push(format!("jobs[{}]: {}", i, e)),
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors.join("; ")));
    }

    state.jobs.create_batch(&jobs).await?;

    Ok((StatusCode::CREATED, Json(jobs)))
}

/// GET /jobs/my/:id
///
/// The path ID must match the authenticated company; one company cannot pull
/// another's postings (which include full applicant data).
pub async fn list_my_jobs(
    State(state): State<AppState>,
    CompanyUser(company): CompanyUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Job>>> {
    if company.id.as_str() != id {
        return Err(ApiError::forbidden("Cannot list another company's jobs"));
    }

    let jobs = state.jobs.list_by_company(&company.id).await?;
    Ok(Json(jobs))
}

/// PATCH /jobs/:id
///
/// A job owned by another company reports the same `NotFound` as a missing
/// one, so existence does not leak across accounts.
pub async fn update_job(
    State(state): State<AppState>,
    CompanyUser(company): CompanyUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateJobRequest>,
) -> ApiResult<Json<Job>> {
    if let Some(deadline) = req.deadline_date {
        if deadline <= Utc::now() {
            return Err(ApiError::validation("deadlineDate must be in the future"));
        }
    }
    if let Some(openings) = req.openings {
        if openings < 1 {
            return Err(ApiError::validation("openings must be at least 1"));
        }
    }

    let patch = JobPatch {
        title: req.title,
        description: req.description,
        requirements: req.requirements,
        experience_level: req.experience_level,
        employment_type: req.employment_type,
        openings: req.openings,
        location: req.location,
        salary: req.salary,
        deadline_date: req.deadline_date,
        key_skills: req.key_skills.map(dedup_skills),
        job_highlights: req.job_highlights,
    };
    if patch.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }

    let job = state
        .jobs
        .update_owned(&company.id, &JobId::from_string(id), &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(job))
}

/// DELETE /jobs/:id
///
/// Same ownership-combined-with-existence masking as update.
pub async fn delete_job(
    State(state): State<AppState>,
    CompanyUser(company): CompanyUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    let deleted = state
        .jobs
        .delete_owned(&company.id, &JobId::from_string(id))
        .await?;

    if !deleted {
        return Err(ApiError::not_found("Job not found"));
    }

    Ok(Json(DeletedResponse {
        message: "Job deleted".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn base_request(deadline: DateTime<Utc>) -> CreateJobRequest {
        serde_json::from_value(json!({
            "title": "Backend Engineer",
            "description": "Build the thing",
            "experienceLevel": "Mid Level",
            "employmentType": "Full-time",
            "location": "Berlin",
            "salary": "competitive",
            "deadlineDate": deadline.to_rfc3339(),
            "keySkills": ["Rust", "rust", "SQL"]
        }))
        .unwrap()
    }

    #[test]
    fn test_build_job_dedups_skills_and_defaults_openings() {
        let now = Utc::now();
        let job = build_job(
            &UserId::from_string("company-1"),
            base_request(now + Duration::days(7)),
            now,
        )
        .unwrap();
        assert_eq!(job.key_skills, vec!["Rust", "SQL"]);
        assert_eq!(job.openings, 1);
        assert!(job.applicants.is_empty());
    }

    #[test]
    fn test_build_job_rejects_past_deadline() {
        let now = Utc::now();
        let err = build_job(
            &UserId::from_string("company-1"),
            base_request(now - Duration::seconds(1)),
            now,
        )
        .unwrap_err();
        assert!(err.to_string().contains("deadlineDate"));
    }

    #[test]
    fn test_build_job_accepts_deadline_one_second_ahead() {
        let now = Utc::now();
        assert!(build_job(
            &UserId::from_string("company-1"),
            base_request(now + Duration::seconds(1)),
            now,
        )
        .is_ok());
    }

    #[test]
    fn test_build_job_requires_title() {
        let now = Utc::now();
        let mut req = base_request(now + Duration::days(1));
        req.title = None;
        let err = build_job(&UserId::from_string("company-1"), req, now).unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_parse_filters_rejects_unknown_enum_values() {
        let err = parse_filters(ListJobsQuery {
            employment_type: Some("Gig".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("employment type"));
    }

    #[test]
    fn test_parse_filters_splits_skills() {
        let filters = parse_filters(ListJobsQuery {
            key_skills: Some("rust, sql, ,tokio".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filters.key_skills, vec!["rust", "sql", "tokio"]);
    }
}
