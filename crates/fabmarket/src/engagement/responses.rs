use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::directory::ProviderDirectory;
use super::domain::{Identity, JobId, JobRequest, JobResponse, JobStatus, ResponseId, ResponseStatus};
use super::lifecycle::{ensure_owner, ensure_transition};
use super::service::{require_identity, EngagementError, EngagementService};
use super::store::{EngagementStore, Mutation, StoreError, UnitOfWork};
use super::validation::BidSubmission;

const NOT_ACCEPTING: &str = "job is no longer accepting responses";
const ALREADY_RESPONDED: &str = "you have already responded to this job";
const NOT_OPEN_FOR_ACCEPT: &str = "job is not open for accepting responses";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AcceptRequest {
    pub response_id: ResponseId,
}

/// State after a successful accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptOutcome {
    pub job: JobRequest,
    pub accepted: JobResponse,
    pub declined: usize,
}

/// Builds the all-or-nothing accept: job to `IN_PROGRESS`, the chosen bid to `ACCEPTED`, every
/// other pending bid to `DECLINED`.
pub fn accept_unit(job_id: &JobId, response_id: &ResponseId) -> UnitOfWork {
    UnitOfWork::new()
        .with(Mutation::TransitionJob {
            job_id: job_id.clone(),
            from: JobStatus::Open,
            to: JobStatus::InProgress,
            accepted_response_id: Some(response_id.clone()),
        })
        .with(Mutation::TransitionResponse {
            job_id: job_id.clone(),
            response_id: response_id.clone(),
            from: ResponseStatus::Sent,
            to: ResponseStatus::Accepted,
        })
        .with(Mutation::DeclineRemaining {
            job_id: job_id.clone(),
            except: response_id.clone(),
        })
}

impl<S, D> EngagementService<S, D>
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    /// Record a provider bid on an open job.
    pub fn submit_response(
        &self,
        viewer: Option<&Identity>,
        job_id: &JobId,
        submission: BidSubmission,
    ) -> Result<JobResponse, EngagementError> {
        let identity = require_identity(viewer)?;
        if !identity.is_provider() {
            return Err(EngagementError::forbidden(
                "only providers can respond to jobs",
            ));
        }

        let job = self.load_job(job_id)?;
        if job.status != JobStatus::Open {
            return Err(EngagementError::invalid_transition(NOT_ACCEPTING));
        }
        if job.is_owned_by(&identity.user_id) {
            return Err(EngagementError::forbidden("cannot respond to your own job"));
        }
        let already = self
            .store
            .responses_for_job(&job.id)?
            .iter()
            .any(|response| response.provider_user_id == identity.user_id);
        if already {
            return Err(EngagementError::Conflict(ALREADY_RESPONDED.to_string()));
        }

        let bid = self.intake.bid(submission)?;
        let profile = self.directory.provider_for_user(&identity.user_id)?;

        let response = JobResponse {
            id: ResponseId::generate(),
            job_id: job.id.clone(),
            provider_user_id: identity.user_id.clone(),
            provider_profile_id: profile.map(|profile| profile.id),
            message: bid.message,
            estimated_price: bid.estimated_price,
            turnaround_days: bid.turnaround_days,
            status: ResponseStatus::Sent,
            created_at: Utc::now(),
        };

        let stored = self.store.insert_response(response).map_err(|err| match err {
            StoreError::Conflict(_) => EngagementError::Conflict(ALREADY_RESPONDED.to_string()),
            StoreError::PreconditionFailed(_) => EngagementError::invalid_transition(NOT_ACCEPTING),
            other => EngagementError::from(other),
        })?;

        info!(
            job_id = %stored.job_id,
            response_id = %stored.id,
            provider_user_id = %stored.provider_user_id,
            linked_profile = stored.provider_profile_id.is_some(),
            "response submitted"
        );
        Ok(stored)
    }

    /// Accept one pending bid and decline the rest in a single commit.
    pub fn accept_response(
        &self,
        viewer: Option<&Identity>,
        job_id: &JobId,
        response_id: &ResponseId,
    ) -> Result<AcceptOutcome, EngagementError> {
        let identity = require_identity(viewer)?;
        let mut job = self.load_job(job_id)?;
        ensure_owner(&job, identity, "only the job owner can accept responses")?;
        ensure_transition(&job, JobStatus::Open, JobStatus::InProgress, NOT_OPEN_FOR_ACCEPT)?;

        let responses = self.store.responses_for_job(&job.id)?;
        let mut accepted = responses
            .iter()
            .find(|response| &response.id == response_id)
            .cloned()
            .ok_or_else(|| EngagementError::NotFound("response not found".to_string()))?;
        if accepted.status != ResponseStatus::Sent {
            return Err(EngagementError::invalid_transition(
                "response is no longer pending",
            ));
        }
        let declined = responses
            .iter()
            .filter(|response| {
                response.id != accepted.id && response.status == ResponseStatus::Sent
            })
            .count();

        self.store
            .commit(accept_unit(&job.id, &accepted.id))
            .map_err(|err| match err {
                StoreError::PreconditionFailed(_) => {
                    EngagementError::invalid_transition(NOT_OPEN_FOR_ACCEPT)
                }
                other => EngagementError::from(other),
            })?;

        job.status = JobStatus::InProgress;
        job.accepted_response_id = Some(accepted.id.clone());
        accepted.status = ResponseStatus::Accepted;

        info!(
            job_id = %job.id,
            response_id = %accepted.id,
            declined,
            "response accepted"
        );
        Ok(AcceptOutcome {
            job,
            accepted,
            declined,
        })
    }
}
