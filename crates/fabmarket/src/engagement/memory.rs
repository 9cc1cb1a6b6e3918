use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{JobId, JobRequest, JobResponse, JobStatus, ResponseStatus, Review, ReviewId};
use super::store::{EngagementStore, JobQuery, Mutation, ReviewSubject, StoreError, UnitOfWork};

/// Rows kept in insertion order so ties on `created_at` list deterministically.
#[derive(Debug, Clone, Default)]
struct StoreState {
    jobs: Vec<JobRequest>,
    responses: Vec<JobResponse>,
    reviews: Vec<Review>,
}

impl StoreState {
    fn job_mut(&mut self, id: &JobId) -> Result<&mut JobRequest, StoreError> {
        self.jobs
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))
    }

    fn apply(&mut self, mutation: Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::TransitionJob {
                job_id,
                from,
                to,
                accepted_response_id,
            } => {
                let job = self.job_mut(&job_id)?;
                if job.status != from {
                    return Err(StoreError::PreconditionFailed(format!(
                        "job {job_id} is {} (expected {from})",
                        job.status
                    )));
                }
                job.status = to;
                if accepted_response_id.is_some() {
                    job.accepted_response_id = accepted_response_id;
                }
            }
            Mutation::TransitionResponse {
                job_id,
                response_id,
                from,
                to,
            } => {
                let response = self
                    .responses
                    .iter_mut()
                    .find(|response| response.id == response_id && response.job_id == job_id)
                    .ok_or_else(|| StoreError::NotFound(format!("response {response_id}")))?;
                if response.status != from {
                    return Err(StoreError::PreconditionFailed(format!(
                        "response {response_id} is {} (expected {from})",
                        response.status
                    )));
                }
                response.status = to;
            }
            Mutation::DeclineRemaining { job_id, except } => {
                self.responses
                    .iter_mut()
                    .filter(|response| {
                        response.job_id == job_id
                            && response.id != except
                            && response.status == ResponseStatus::Sent
                    })
                    .for_each(|response| response.status = ResponseStatus::Declined);
            }
        }
        Ok(())
    }
}

/// Mutex-guarded store used by the API service, the demo, and tests.
///
/// A unit of work is applied to a staged copy of the state; the copy replaces the live state only
/// when every mutation succeeded, so readers never observe a partial commit.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEngagementStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

fn newest_first<T>(
    rows: impl DoubleEndedIterator<Item = T>,
    key: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

impl EngagementStore for InMemoryEngagementStore {
    fn insert_job(&self, job: JobRequest) -> Result<JobRequest, StoreError> {
        let mut state = self.lock()?;
        if state.jobs.iter().any(|existing| existing.id == job.id) {
            return Err(StoreError::Conflict(format!("job {}", job.id)));
        }
        state.jobs.push(job.clone());
        Ok(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<JobRequest>, StoreError> {
        let state = self.lock()?;
        Ok(state.jobs.iter().find(|job| &job.id == id).cloned())
    }

    fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRequest>, StoreError> {
        let state = self.lock()?;
        let mut jobs = newest_first(
            state.jobs.iter().filter(|job| query.matches(job)).cloned(),
            |job: &JobRequest| job.created_at,
        );
        jobs.truncate(query.limit);
        Ok(jobs)
    }

    fn count_responses(&self, job_id: &JobId) -> Result<usize, StoreError> {
        let state = self.lock()?;
        Ok(state
            .responses
            .iter()
            .filter(|response| &response.job_id == job_id)
            .count())
    }

    fn responses_for_job(&self, job_id: &JobId) -> Result<Vec<JobResponse>, StoreError> {
        let state = self.lock()?;
        Ok(newest_first(
            state
                .responses
                .iter()
                .filter(|response| &response.job_id == job_id)
                .cloned(),
            |response: &JobResponse| response.created_at,
        ))
    }

    fn insert_response(&self, response: JobResponse) -> Result<JobResponse, StoreError> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .iter()
            .find(|job| job.id == response.job_id)
            .ok_or_else(|| StoreError::NotFound(format!("job {}", response.job_id)))?;
        if job.status != JobStatus::Open {
            return Err(StoreError::PreconditionFailed(format!(
                "job {} is {}",
                job.id, job.status
            )));
        }
        let duplicate = state.responses.iter().any(|existing| {
            existing.job_id == response.job_id
                && existing.provider_user_id == response.provider_user_id
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "response by {} on job {}",
                response.provider_user_id, response.job_id
            )));
        }
        state.responses.push(response.clone());
        Ok(response)
    }

    fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let mut staged = state.clone();
        for mutation in unit.into_mutations() {
            staged.apply(mutation)?;
        }
        *state = staged;
        Ok(())
    }

    fn insert_review(&self, review: Review) -> Result<Review, StoreError> {
        let mut state = self.lock()?;
        let duplicate = state.reviews.iter().any(|existing| {
            existing.job_id == review.job_id && existing.reviewer_id == review.reviewer_id
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "review by {} on job {}",
                review.reviewer_id, review.job_id
            )));
        }
        state.reviews.push(review.clone());
        Ok(review)
    }

    fn reviews_for(
        &self,
        subject: &ReviewSubject,
        include_hidden: bool,
    ) -> Result<Vec<Review>, StoreError> {
        let state = self.lock()?;
        Ok(newest_first(
            state
                .reviews
                .iter()
                .filter(|review| subject.matches(review))
                .filter(|review| include_hidden || !review.hidden)
                .cloned(),
            |review: &Review| review.created_at,
        ))
    }

    fn reviews_for_job(&self, job_id: &JobId) -> Result<Vec<Review>, StoreError> {
        let state = self.lock()?;
        Ok(newest_first(
            state
                .reviews
                .iter()
                .filter(|review| &review.job_id == job_id)
                .cloned(),
            |review: &Review| review.created_at,
        ))
    }

    fn set_review_hidden(&self, id: &ReviewId, hidden: bool) -> Result<Review, StoreError> {
        let mut state = self.lock()?;
        let review = state
            .reviews
            .iter_mut()
            .find(|review| &review.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("review {id}")))?;
        review.hidden = hidden;
        Ok(review.clone())
    }
}
