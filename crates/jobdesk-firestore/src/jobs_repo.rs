//! Typed repository for job postings and their embedded applications.
//!
//! Applications live inside the job document, so every application mutation
//! rewrites the `applicants` array. Those writes are guarded by an
//! `updateTime` precondition and retried on conflict, which keeps two
//! concurrent applies (or an apply racing a status change) from overwriting
//! each other.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{info, warn};

use jobdesk_models::{
    Application, ApplicationId, ApplicationStatus, EmploymentType, ExperienceLevel, Job, JobId,
    UserId,
};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{
    json_to_value, string_value, timestamp_value, CollectionSelector, Document, FieldFilter,
    Filter, Order, StructuredQuery, Write,
};

const JOBS: &str = "jobs";

/// Attempts before giving up on an optimistic-concurrency write.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// Filters for the open-jobs listing. All are optional and combined with AND.
#[derive(Debug, Default, Clone)]
pub struct JobFilters {
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub experience_level: Option<ExperienceLevel>,
    pub key_skills: Vec<String>,
}

/// Partial update for a job. `None` fields are left untouched; `companyId`
/// and `applicants` are never patchable through this type.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<EmploymentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openings: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_highlights: Option<Vec<String>>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.requirements.is_none()
            && self.experience_level.is_none()
            && self.employment_type.is_none()
            && self.openings.is_none()
            && self.location.is_none()
            && self.salary.is_none()
            && self.deadline_date.is_none()
            && self.key_skills.is_none()
            && self.job_highlights.is_none()
    }
}

/// Result of a student's apply attempt.
#[derive(Debug)]
pub enum ApplyOutcome {
    Applied(Application),
    JobNotFound,
    DeadlinePassed,
    AlreadyApplied,
}

/// Result of a company's status-change attempt. Jobs owned by someone else
/// report `NotFound`, indistinguishable from a missing job.
#[derive(Debug)]
pub enum StatusOutcome {
    Updated(Application),
    NotFound,
}

/// Decide whether `student_id` may apply to `job` at `now`. The deadline is
/// checked before the duplicate check, so an expired posting reports
/// `DeadlinePassed` even to a student who already applied.
fn vet_application(job: &Job, student_id: &UserId, now: DateTime<Utc>) -> Option<ApplyOutcome> {
    if !job.is_open(now) {
        return Some(ApplyOutcome::DeadlinePassed);
    }
    if job.application_of(student_id).is_some() {
        return Some(ApplyOutcome::AlreadyApplied);
    }
    None
}

/// Find an application on a job owned by `owner`. A job owned by someone
/// else yields `None`, same as a missing application.
fn find_owned_application<'a>(
    job: &'a mut Job,
    owner: &UserId,
    application_id: &ApplicationId,
) -> Option<&'a mut Application> {
    if &job.company_id != owner {
        return None;
    }
    job.application_mut(application_id)
}

/// Newest postings first, by creation time.
fn sort_newest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Insert that fails if the job document already exists.
fn job_insert_write(name: String, job: &Job) -> FirestoreResult<Write> {
    let doc = Document::from_model(job)?;
    Ok(Write::insert(name, doc.fields.unwrap_or_default()))
}

/// Repository for job documents.
#[derive(Clone)]
pub struct JobsRepo {
    client: FirestoreClient,
}

impl JobsRepo {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Persist a new job posting.
    pub async fn create(&self, job: &Job) -> FirestoreResult<()> {
        let doc = Document::from_model(job)?;
        self.client
            .create_document(JOBS, job.id.as_str(), doc.fields.unwrap_or_default())
            .await?;
        info!(job_id = %job.id, company_id = %job.company_id, "created job posting");
        counter!("jobs_created_total").increment(1);
        Ok(())
    }

    /// Persist several postings in one atomic batch. Either every job is
    /// written or none are.
    pub async fn create_batch(&self, jobs: &[Job]) -> FirestoreResult<()> {
        let writes = jobs
            .iter()
            .map(|job| {
                job_insert_write(self.client.full_document_name(JOBS, job.id.as_str()), job)
            })
            .collect::<FirestoreResult<Vec<_>>>()?;

        self.client.batch_write(writes).await?;
        info!(count = jobs.len(), "created job postings");
        counter!("jobs_created_total").increment(jobs.len() as u64);
        Ok(())
    }

    /// Get a job by ID.
    pub async fn get(&self, id: &JobId) -> FirestoreResult<Option<Job>> {
        match self.client.get_document(JOBS, id.as_str()).await? {
            Some(doc) => Ok(Some(doc.into_model()?)),
            None => Ok(None),
        }
    }

    /// Get a job along with its document version, for guarded writes.
    async fn get_versioned(&self, id: &JobId) -> FirestoreResult<Option<(Job, Option<String>)>> {
        match self.client.get_document(JOBS, id.as_str()).await? {
            Some(doc) => {
                let job = doc.into_model()?;
                Ok(Some((job, doc.update_time)))
            }
            None => Ok(None),
        }
    }

    /// List jobs whose deadline is still in the future, applying any filters.
    /// Ordered by creation time, newest first.
    pub async fn list_open(
        &self,
        filters: &JobFilters,
        now: DateTime<Utc>,
    ) -> FirestoreResult<Vec<Job>> {
        let mut predicates = vec![FieldFilter::greater_than(
            "deadlineDate",
            timestamp_value(now),
        )];

        if let Some(location) = &filters.location {
            predicates.push(FieldFilter::equal("location", string_value(location)));
        }
        if let Some(et) = filters.employment_type {
            predicates.push(FieldFilter::equal("employmentType", string_value(et.as_str())));
        }
        if let Some(el) = filters.experience_level {
            predicates.push(FieldFilter::equal(
                "experienceLevel",
                string_value(el.as_str()),
            ));
        }
        if !filters.key_skills.is_empty() {
            predicates.push(FieldFilter::array_contains_any(
                "keySkills",
                filters.key_skills.iter().map(string_value).collect(),
            ));
        }

        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: JOBS.to_string(),
            }],
            filter: Filter::and(predicates),
            // Firestore requires the inequality field first in the order-by,
            // so the creation-time ordering happens after the fetch.
            order_by: Some(vec![Order::ascending("deadlineDate")]),
            limit: None,
        };

        let docs = self.client.run_query(query).await?;
        let mut jobs = docs
            .iter()
            .map(|d| d.into_model())
            .collect::<FirestoreResult<Vec<Job>>>()?;
        sort_newest_first(&mut jobs);
        Ok(jobs)
    }

    /// List a company's own jobs, newest first.
    pub async fn list_by_company(&self, company_id: &UserId) -> FirestoreResult<Vec<Job>> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: JOBS.to_string(),
            }],
            filter: Filter::and(vec![FieldFilter::equal(
                "companyId",
                string_value(company_id.as_str()),
            )]),
            order_by: Some(vec![Order::descending("createdAt")]),
            limit: None,
        };

        let docs = self.client.run_query(query).await?;
        docs.iter().map(|d| d.into_model()).collect()
    }

    /// Apply a partial update to a job owned by `owner`.
    ///
    /// Returns the updated job, or `None` when the job does not exist or is
    /// owned by a different company. The patch never touches `applicants`, so
    /// no version guard is needed.
    pub async fn update_owned(
        &self,
        owner: &UserId,
        id: &JobId,
        patch: &JobPatch,
    ) -> FirestoreResult<Option<Job>> {
        let existing = match self.get(id).await? {
            Some(job) if &job.company_id == owner => job,
            _ => return Ok(None),
        };

        let patch_doc = Document::from_model(patch)?;
        let mut fields = patch_doc.fields.unwrap_or_default();
        fields.insert("updatedAt".to_string(), timestamp_value(Utc::now()));
        let mask: Vec<String> = fields.keys().cloned().collect();

        let doc = self
            .client
            .patch_document(JOBS, existing.id.as_str(), fields, Some(mask), None)
            .await?;
        doc.into_model().map(Some)
    }

    /// Delete a job owned by `owner`, along with its embedded applications.
    ///
    /// Returns false when the job does not exist or is owned by a different
    /// company.
    pub async fn delete_owned(&self, owner: &UserId, id: &JobId) -> FirestoreResult<bool> {
        match self.get(id).await? {
            Some(job) if &job.company_id == owner => {
                self.client.delete_document(JOBS, id.as_str()).await?;
                info!(job_id = %id, "deleted job posting");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Submit an application for `student_id`.
    ///
    /// Read-check-append under an `updateTime` guard, retried on conflict, so
    /// a concurrent apply for the same job cannot drop either application and
    /// a double-submit from the same student cannot slip past the duplicate
    /// check.
    pub async fn apply(&self, student_id: &UserId, job_id: &JobId) -> FirestoreResult<ApplyOutcome> {
        for attempt in 0..MAX_CAS_ATTEMPTS {
            let (mut job, version) = match self.get_versioned(job_id).await? {
                Some(pair) => pair,
                None => return Ok(ApplyOutcome::JobNotFound),
            };

            let now = Utc::now();
            if let Some(outcome) = vet_application(&job, student_id, now) {
                return Ok(outcome);
            }

            let application = Application::new(student_id.clone());
            job.applicants.push(application.clone());

            match self
                .write_applicants(&job, now, version.as_deref())
                .await?
            {
                true => {
                    info!(job_id = %job_id, student_id = %student_id, "application submitted");
                    counter!("applications_submitted_total").increment(1);
                    return Ok(ApplyOutcome::Applied(application));
                }
                false => {
                    warn!(
                        job_id = %job_id,
                        attempt = attempt + 1,
                        "applicants write conflicted, retrying"
                    );
                }
            }
        }

        Err(crate::error::FirestoreError::PreconditionFailed(format!(
            "applicants write for job {} kept conflicting",
            job_id
        )))
    }

    /// Overwrite an application's status on a job owned by `owner`.
    ///
    /// Any transition between valid statuses is allowed. Missing jobs, jobs
    /// owned by someone else, and missing applications all report `NotFound`.
    pub async fn change_status(
        &self,
        owner: &UserId,
        job_id: &JobId,
        application_id: &ApplicationId,
        new_status: ApplicationStatus,
    ) -> FirestoreResult<StatusOutcome> {
        for attempt in 0..MAX_CAS_ATTEMPTS {
            let (mut job, version) = match self.get_versioned(job_id).await? {
                Some(pair) => pair,
                None => return Ok(StatusOutcome::NotFound),
            };

            let updated = match find_owned_application(&mut job, owner, application_id) {
                Some(application) => {
                    application.status = new_status;
                    application.clone()
                }
                None => return Ok(StatusOutcome::NotFound),
            };

            match self
                .write_applicants(&job, Utc::now(), version.as_deref())
                .await?
            {
                true => {
                    info!(
                        job_id = %job_id,
                        application_id = %application_id,
                        status = %new_status.as_str(),
                        "application status changed"
                    );
                    return Ok(StatusOutcome::Updated(updated));
                }
                false => {
                    warn!(
                        job_id = %job_id,
                        attempt = attempt + 1,
                        "applicants write conflicted, retrying"
                    );
                }
            }
        }

        Err(crate::error::FirestoreError::PreconditionFailed(format!(
            "applicants write for job {} kept conflicting",
            job_id
        )))
    }

    /// Write the applicants array under a version guard. Returns false when
    /// the guard failed and the caller should re-read and retry.
    async fn write_applicants(
        &self,
        job: &Job,
        now: DateTime<Utc>,
        version: Option<&str>,
    ) -> FirestoreResult<bool> {
        let mut fields = HashMap::new();
        fields.insert(
            "applicants".to_string(),
            json_to_value(&serde_json::to_value(&job.applicants)?),
        );
        fields.insert("updatedAt".to_string(), timestamp_value(now));

        let result = self
            .client
            .patch_document(
                JOBS,
                job.id.as_str(),
                fields,
                Some(vec!["applicants".to_string(), "updatedAt".to_string()]),
                version,
            )
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_precondition_failed() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_job(company: &str, deadline: DateTime<Utc>, created_at: DateTime<Utc>) -> Job {
        Job {
            id: JobId::new(),
            title: "Backend Engineer".to_string(),
            description: "Build the thing".to_string(),
            requirements: vec![],
            experience_level: ExperienceLevel::Mid,
            employment_type: EmploymentType::FullTime,
            openings: 1,
            location: "Berlin".to_string(),
            salary: "competitive".to_string(),
            deadline_date: deadline,
            key_skills: vec!["rust".to_string()],
            job_highlights: vec![],
            company_id: UserId::from_string(company),
            applicants: vec![],
            created_at,
            updated_at: created_at,
        }
    }

    fn wire_json(filters: &JobFilters, now: DateTime<Utc>) -> serde_json::Value {
        let mut predicates = vec![FieldFilter::greater_than(
            "deadlineDate",
            timestamp_value(now),
        )];
        if let Some(location) = &filters.location {
            predicates.push(FieldFilter::equal("location", string_value(location)));
        }
        if let Some(et) = filters.employment_type {
            predicates.push(FieldFilter::equal("employmentType", string_value(et.as_str())));
        }
        serde_json::to_value(Filter::and(predicates)).unwrap()
    }

    #[test]
    fn test_open_jobs_filter_always_bounds_deadline() {
        let now = Utc::now();
        let json = wire_json(&JobFilters::default(), now);
        assert_eq!(json["fieldFilter"]["field"]["fieldPath"], "deadlineDate");
        assert_eq!(json["fieldFilter"]["op"], "GREATER_THAN");
    }

    #[test]
    fn test_open_jobs_filter_composes_with_and() {
        let filters = JobFilters {
            location: Some("Berlin".to_string()),
            employment_type: Some(EmploymentType::Remote),
            ..Default::default()
        };
        let json = wire_json(&filters, Utc::now());
        assert_eq!(json["compositeFilter"]["op"], "AND");
        assert_eq!(json["compositeFilter"]["filters"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_job_patch_skips_unset_fields() {
        let patch = JobPatch {
            title: Some("Senior Backend Engineer".to_string()),
            openings: Some(4),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(json.get("title").is_some());
        assert!(json.get("openings").is_some());
        assert!(json.get("deadlineDate").is_none());
    }

    #[test]
    fn test_empty_patch_detection() {
        assert!(JobPatch::default().is_empty());
        assert!(!JobPatch {
            salary: Some("competitive".to_string()),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_open_listing_sorted_by_creation_newest_first() {
        let now = Utc::now();
        let old = sample_job("company-1", now + Duration::days(1), now - Duration::days(3));
        let new = sample_job("company-1", now + Duration::days(30), now - Duration::hours(1));
        let old_id = old.id.clone();
        let new_id = new.id.clone();

        // Wire order is by deadline ascending, so the older posting with the
        // nearer deadline arrives first.
        let mut jobs = vec![old, new];
        sort_newest_first(&mut jobs);

        assert_eq!(jobs[0].id, new_id);
        assert_eq!(jobs[1].id, old_id);
    }

    #[test]
    fn test_vet_application_allows_open_job() {
        let now = Utc::now();
        let job = sample_job("company-1", now + Duration::days(1), now);
        let student = UserId::from_string("student-1");
        assert!(vet_application(&job, &student, now).is_none());
    }

    #[test]
    fn test_vet_application_rejects_duplicate() {
        let now = Utc::now();
        let mut job = sample_job("company-1", now + Duration::days(1), now);
        let student = UserId::from_string("student-1");
        job.applicants.push(Application::new(student.clone()));

        assert!(matches!(
            vet_application(&job, &student, now),
            Some(ApplyOutcome::AlreadyApplied)
        ));
    }

    #[test]
    fn test_vet_application_checks_deadline_before_duplicate() {
        let now = Utc::now();
        let mut job = sample_job("company-1", now - Duration::seconds(1), now - Duration::days(7));
        let student = UserId::from_string("student-1");
        job.applicants.push(Application::new(student.clone()));

        // An expired posting reports the deadline even to a student who
        // already applied.
        assert!(matches!(
            vet_application(&job, &student, now),
            Some(ApplyOutcome::DeadlinePassed)
        ));
    }

    #[test]
    fn test_status_lookup_masks_foreign_jobs() {
        let now = Utc::now();
        let mut job = sample_job("company-a", now + Duration::days(1), now);
        let application = Application::new(UserId::from_string("student-1"));
        let application_id = application.id.clone();
        job.applicants.push(application);

        let other = UserId::from_string("company-b");
        assert!(find_owned_application(&mut job, &other, &application_id).is_none());

        let owner = UserId::from_string("company-a");
        assert!(find_owned_application(&mut job, &owner, &application_id).is_some());
    }

    #[test]
    fn test_status_lookup_misses_unknown_application() {
        let now = Utc::now();
        let mut job = sample_job("company-a", now + Duration::days(1), now);
        let owner = UserId::from_string("company-a");
        let unknown = ApplicationId::from_string("no-such-application");
        assert!(find_owned_application(&mut job, &owner, &unknown).is_none());
    }

    #[test]
    fn test_job_insert_write_guards_existence() {
        let now = Utc::now();
        let job = sample_job("company-1", now + Duration::days(1), now);
        let write = job_insert_write("projects/p/databases/(default)/documents/jobs/j1".into(), &job)
            .unwrap();

        assert_eq!(write.current_document.as_ref().unwrap().exists, Some(false));
        let fields = write.update.as_ref().unwrap().fields.as_ref().unwrap();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("companyId"));
    }
}
