use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::directory::{ProviderDirectory, PublicUser};
use super::domain::{
    Identity, JobCategory, JobId, JobRequest, JobResponse, JobStatus, Review, UserId,
};
use super::service::{require_identity, EngagementError, EngagementService};
use super::store::{EngagementStore, JobQuery, Mutation, UnitOfWork};
use super::validation::{InputViolation, JobPosting};
use super::visibility::{project_responses, ProviderIdentityView, ResponseView};

const SUMMARY_DESCRIPTION_CHARS: usize = 200;

/// Query-string filters for browsing jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BrowseParams {
    /// `ALL` lists every status; absent defaults to `OPEN`.
    pub status: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
}

/// Compact job card used by the browse listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummaryView {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub category: Option<JobCategory>,
    pub category_label: Option<&'static str>,
    pub materials: Vec<String>,
    pub budget_min: Option<u32>,
    pub budget_max: Option<u32>,
    pub budget_label: String,
    pub deadline: Option<NaiveDate>,
    pub city: String,
    pub status: JobStatus,
    pub response_count: usize,
    pub customer_name: String,
    pub customer_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDetailView {
    #[serde(flatten)]
    pub job: JobRequest,
    pub budget_label: String,
    pub customer: Option<PublicUser>,
    pub responses: Vec<ResponseView>,
    pub reviews: Vec<Review>,
    pub is_owner: bool,
    pub can_respond: bool,
}

/// Fails unless `identity` owns `job`.
pub fn ensure_owner(
    job: &JobRequest,
    identity: &Identity,
    message: &str,
) -> Result<(), EngagementError> {
    if job.is_owned_by(&identity.user_id) {
        Ok(())
    } else {
        Err(EngagementError::forbidden(message))
    }
}

/// Fails with `InvalidTransition` unless `job` may move from `from` to `to` right now.
pub fn ensure_transition(
    job: &JobRequest,
    from: JobStatus,
    to: JobStatus,
    message: &str,
) -> Result<(), EngagementError> {
    if job.status == from && from.can_transition_to(to) {
        Ok(())
    } else {
        Err(EngagementError::invalid_transition(message))
    }
}

/// A provider may bid on someone else's open job once.
pub fn can_respond(job: &JobRequest, responses: &[JobResponse], viewer: Option<&Identity>) -> bool {
    let Some(identity) = viewer else {
        return false;
    };
    identity.is_provider()
        && !job.is_owned_by(&identity.user_id)
        && job.status == JobStatus::Open
        && !responses
            .iter()
            .any(|response| response.provider_user_id == identity.user_id)
}

fn summarize_description(description: &str) -> String {
    if description.chars().count() > SUMMARY_DESCRIPTION_CHARS {
        let head: String = description.chars().take(SUMMARY_DESCRIPTION_CHARS).collect();
        format!("{head}...")
    } else {
        description.to_string()
    }
}

impl<S, D> EngagementService<S, D>
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    /// Create an `OPEN` job owned by the caller.
    pub fn post_job(
        &self,
        viewer: Option<&Identity>,
        posting: JobPosting,
    ) -> Result<JobRequest, EngagementError> {
        let identity = require_identity(viewer)?;
        let posting = self.intake.posting(posting)?;

        let job = JobRequest {
            id: JobId::generate(),
            customer_id: identity.user_id.clone(),
            title: posting.title,
            description: posting.description,
            category: posting.category,
            materials: posting.materials,
            budget: posting.budget,
            deadline: posting.deadline,
            city: posting.city,
            status: JobStatus::Open,
            accepted_response_id: None,
            reference_images: posting.reference_images,
            created_at: Utc::now(),
        };

        let stored = self.store.insert_job(job)?;
        info!(
            job_id = %stored.id,
            customer_id = %stored.customer_id,
            images = stored.reference_images.len(),
            "job posted"
        );
        Ok(stored)
    }

    /// Move an `IN_PROGRESS` job to `COMPLETED`. Repeating the call fails.
    pub fn complete_job(
        &self,
        viewer: Option<&Identity>,
        job_id: &JobId,
    ) -> Result<JobRequest, EngagementError> {
        let identity = require_identity(viewer)?;
        let mut job = self.load_job(job_id)?;
        ensure_owner(&job, identity, "only the job owner can complete the job")?;
        ensure_transition(
            &job,
            JobStatus::InProgress,
            JobStatus::Completed,
            "job must be in progress to complete",
        )?;

        self.store
            .commit(UnitOfWork::new().with(Mutation::TransitionJob {
                job_id: job.id.clone(),
                from: JobStatus::InProgress,
                to: JobStatus::Completed,
                accepted_response_id: None,
            }))
            .map_err(|err| match EngagementError::from(err) {
                EngagementError::InvalidTransition(_) => {
                    EngagementError::invalid_transition("job must be in progress to complete")
                }
                other => other,
            })?;

        job.status = JobStatus::Completed;
        info!(job_id = %job.id, "job completed");
        Ok(job)
    }

    /// Public job listing, newest first.
    pub fn browse_jobs(&self, params: &BrowseParams) -> Result<Vec<JobSummaryView>, EngagementError> {
        let status = match params.status.as_deref().map(str::trim) {
            None | Some("") => Some(JobStatus::Open),
            Some(value) if value.eq_ignore_ascii_case("ALL") => None,
            Some(value) => Some(
                value
                    .parse::<JobStatus>()
                    .map_err(|_| InputViolation::UnknownStatus(value.to_string()))?,
            ),
        };
        let category = match params.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(
                value
                    .parse::<JobCategory>()
                    .map_err(|_| InputViolation::UnknownCategory(value.to_string()))?,
            ),
        };

        let query = JobQuery {
            status,
            search: params.search.clone(),
            category,
            limit: self.config.job_page_size,
        };

        let mut customers: HashMap<UserId, Option<PublicUser>> = HashMap::new();
        let mut summaries = Vec::new();
        for job in self.store.list_jobs(&query)? {
            let customer = match customers.get(&job.customer_id) {
                Some(cached) => cached.clone(),
                None => {
                    let fetched = self.directory.user(&job.customer_id)?;
                    customers.insert(job.customer_id.clone(), fetched.clone());
                    fetched
                }
            };
            let response_count = self.store.count_responses(&job.id)?;
            summaries.push(JobSummaryView {
                description: summarize_description(&job.description),
                budget_label: job.budget.label(),
                budget_min: job.budget.min,
                budget_max: job.budget.max,
                customer_name: customer
                    .as_ref()
                    .and_then(|user| user.name.clone())
                    .unwrap_or_else(|| "Anonymous".to_string()),
                customer_image: customer.and_then(|user| user.image),
                response_count,
                id: job.id,
                title: job.title,
                category: job.category,
                category_label: job.category.map(JobCategory::label),
                materials: job.materials,
                deadline: job.deadline,
                city: job.city,
                status: job.status,
                created_at: job.created_at,
            });
        }
        Ok(summaries)
    }

    /// Job detail with responses projected for `viewer`.
    pub fn job_detail(
        &self,
        viewer: Option<&Identity>,
        job_id: &JobId,
    ) -> Result<JobDetailView, EngagementError> {
        let job = self.load_job(job_id)?;
        let customer = self.directory.user(&job.customer_id)?;
        let responses = self.store.responses_for_job(&job.id)?;

        let mut identities: HashMap<UserId, ProviderIdentityView> = HashMap::new();
        for response in &responses {
            if !identities.contains_key(&response.provider_user_id) {
                let identity = self.provider_identity(response)?;
                identities.insert(response.provider_user_id.clone(), identity);
            }
        }
        let projected = project_responses(&job, &responses, viewer, |response| {
            identities
                .get(&response.provider_user_id)
                .cloned()
                .unwrap_or_else(|| ProviderIdentityView::anonymous(response.provider_user_id.clone()))
        });

        let reviews = self
            .store
            .reviews_for_job(&job.id)?
            .into_iter()
            .filter(|review| !review.hidden)
            .collect();

        let is_owner = viewer.map_or(false, |identity| job.is_owned_by(&identity.user_id));
        let can_respond = can_respond(&job, &responses, viewer);

        Ok(JobDetailView {
            budget_label: job.budget.label(),
            customer,
            responses: projected,
            reviews,
            is_owner,
            can_respond,
            job,
        })
    }
}
