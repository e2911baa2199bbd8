//! Application submission and status handlers.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jobdesk_firestore::{ApplyOutcome, StatusOutcome};
use jobdesk_models::{
    Application, ApplicationId, ApplicationStatus, Job, JobId, UserId, UserSummary,
};

use crate::auth::{CompanyUser, StudentUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: Option<String>,
}

/// Query parameters for the applicant listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantsQuery {
    /// Restrict the listing to one posting.
    pub job_id: Option<String>,
}

/// One applicant row in the company's applicant listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantView {
    pub application_id: ApplicationId,
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    /// Missing when the student account was deleted after applying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<UserSummary>,
}

/// Applicants grouped per job posting.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplicantsView {
    pub job_id: JobId,
    pub title: String,
    pub applicants: Vec<ApplicantView>,
}

/// POST /jobs/:id/apply
pub async fn apply(
    State(state): State<AppState>,
    StudentUser(student): StudentUser,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Application>)> {
    match state.jobs.apply(&student.id, &JobId::from_string(id)).await? {
        ApplyOutcome::Applied(application) => Ok((StatusCode::CREATED, Json(application))),
        ApplyOutcome::JobNotFound => Err(ApiError::not_found("Job not found")),
        ApplyOutcome::DeadlinePassed => {
            Err(ApiError::validation("The application deadline has passed"))
        }
        ApplyOutcome::AlreadyApplied => {
            Err(ApiError::validation("You have already applied to this job"))
        }
    }
}

/// Keep only the requested posting, or all of them when no ID was given.
/// An ID the company does not own is indistinguishable from a missing job.
fn select_jobs(jobs: Vec<Job>, job_id: Option<&str>) -> ApiResult<Vec<Job>> {
    match job_id {
        Some(id) => {
            let selected: Vec<Job> = jobs.into_iter().filter(|j| j.id.as_str() == id).collect();
            if selected.is_empty() {
                Err(ApiError::not_found("Job not found"))
            } else {
                Ok(selected)
            }
        }
        None => Ok(jobs),
    }
}

/// GET /jobs/applicants/:companyId
///
/// The path ID must match the authenticated company. Returns every posting
/// with its applicants and their profile summaries, or a single posting when
/// `?jobId=` is given.
pub async fn list_applicants(
    State(state): State<AppState>,
    CompanyUser(company): CompanyUser,
    Path(company_id): Path<String>,
    Query(query): Query<ApplicantsQuery>,
) -> ApiResult<Json<Vec<JobApplicantsView>>> {
    if company.id.as_str() != company_id {
        return Err(ApiError::forbidden(
            "Cannot list another company's applicants",
        ));
    }

    let jobs = state.jobs.list_by_company(&company.id).await?;
    let jobs = select_jobs(jobs, query.job_id.as_deref())?;

    // Resolve each distinct applicant once across all postings.
    let mut students: HashMap<UserId, UserSummary> = HashMap::new();
    for job in &jobs {
        for application in &job.applicants {
            if !students.contains_key(&application.student_id) {
                if let Some(user) = state.users.get(&application.student_id).await? {
                    students.insert(application.student_id.clone(), user.summary());
                }
            }
        }
    }

    let views = jobs
        .into_iter()
        .map(|job| JobApplicantsView {
            job_id: job.id,
            title: job.title,
            applicants: job
                .applicants
                .into_iter()
                .map(|application| ApplicantView {
                    application_id: application.id,
                    applied_at: application.applied_at,
                    status: application.status,
                    student: students.get(&application.student_id).cloned(),
                })
                .collect(),
        })
        .collect();

    Ok(Json(views))
}

/// PUT /jobs/:id/status/:applicationId
pub async fn change_status(
    State(state): State<AppState>,
    CompanyUser(company): CompanyUser,
    Path((job_id, application_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<ChangeStatusRequest>,
) -> ApiResult<Json<Application>> {
    let status_str = req
        .status
        .ok_or_else(|| ApiError::validation("Missing required field: status"))?;
    let status = ApplicationStatus::parse(&status_str).ok_or_else(|| {
        ApiError::validation("status must be one of \"pending\", \"accepted\", \"rejected\"")
    })?;

    let outcome = state
        .jobs
        .change_status(
            &company.id,
            &JobId::from_string(job_id),
            &ApplicationId::from_string(application_id),
            status,
        )
        .await?;

    match outcome {
        StatusOutcome::Updated(application) => Ok(Json(application)),
        StatusOutcome::NotFound => Err(ApiError::not_found("Job or application not found")),
    }
}
