use super::domain::{
    JobCategory, JobId, JobRequest, JobResponse, JobStatus, ProviderProfileId, ResponseId,
    ResponseStatus, Review, ReviewId, UserId,
};

/// Guarded change applied as part of a [`UnitOfWork`].
///
/// Every transition names the status it expects to find. If the stored row has moved on, the
/// whole unit is rejected with [`StoreError::PreconditionFailed`] and nothing is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    TransitionJob {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
        accepted_response_id: Option<ResponseId>,
    },
    TransitionResponse {
        job_id: JobId,
        response_id: ResponseId,
        from: ResponseStatus,
        to: ResponseStatus,
    },
    /// Every `Sent` response on the job other than `except` becomes `Declined`.
    DeclineRemaining { job_id: JobId, except: ResponseId },
}

/// All-or-nothing list of mutations committed in a single store transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitOfWork {
    mutations: Vec<Mutation>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Filter applied when browsing jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    /// `None` matches every status.
    pub status: Option<JobStatus>,
    pub search: Option<String>,
    pub category: Option<JobCategory>,
    pub limit: usize,
}

impl JobQuery {
    pub fn matches(&self, job: &JobRequest) -> bool {
        if let Some(status) = self.status {
            if job.status != status {
                return false;
            }
        }
        if let Some(category) = self.category {
            if job.category != Some(category) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                job.title.to_lowercase().contains(&term)
                    || job.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Whose reviews to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewSubject {
    Provider(ProviderProfileId),
    Reviewee(UserId),
}

impl ReviewSubject {
    pub fn matches(&self, review: &Review) -> bool {
        match self {
            ReviewSubject::Provider(id) => review.provider_profile_id.as_ref() == Some(id),
            ReviewSubject::Reviewee(id) => &review.reviewee_id == id,
        }
    }
}

/// Transactional store backing jobs, responses, and reviews.
///
/// Listing methods return newest rows first.
pub trait EngagementStore: Send + Sync {
    fn insert_job(&self, job: JobRequest) -> Result<JobRequest, StoreError>;
    fn fetch_job(&self, id: &JobId) -> Result<Option<JobRequest>, StoreError>;
    fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRequest>, StoreError>;
    fn count_responses(&self, job_id: &JobId) -> Result<usize, StoreError>;
    fn responses_for_job(&self, job_id: &JobId) -> Result<Vec<JobResponse>, StoreError>;
    /// Rejects a second response for the same (job, provider user) pair with `Conflict`, and a
    /// response to a job that is no longer `Open` with `PreconditionFailed`, both checked at
    /// write time.
    fn insert_response(&self, response: JobResponse) -> Result<JobResponse, StoreError>;
    fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError>;
    /// Rejects a second review for the same (job, reviewer) pair with `Conflict`.
    fn insert_review(&self, review: Review) -> Result<Review, StoreError>;
    fn reviews_for(
        &self,
        subject: &ReviewSubject,
        include_hidden: bool,
    ) -> Result<Vec<Review>, StoreError>;
    fn reviews_for_job(&self, job_id: &JobId) -> Result<Vec<Review>, StoreError>;
    fn set_review_hidden(&self, id: &ReviewId, hidden: bool) -> Result<Review, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("uniqueness constraint violated: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
