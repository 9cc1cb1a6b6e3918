use std::sync::Arc;

use tracing::error;

use super::directory::{DirectoryError, ProviderDirectory};
use super::domain::{Identity, JobId, JobRequest, JobResponse};
use super::store::{EngagementStore, StoreError};
use super::validation::{InputViolation, IntakeGuard};
use super::visibility::ProviderIdentityView;

/// Tunables for the engagement service, normally derived from the marketplace configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementConfig {
    pub default_city: String,
    pub job_page_size: usize,
    pub review_feed_size: usize,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            default_city: "Charlotte".to_string(),
            job_page_size: 50,
            review_feed_size: 20,
        }
    }
}

/// Stateless facade over the job lifecycle, response, review, and visibility rules.
///
/// Every operation takes the caller identity explicitly and reads current state from the store;
/// nothing about jobs or responses is cached between calls.
pub struct EngagementService<S, D> {
    pub(super) store: Arc<S>,
    pub(super) directory: Arc<D>,
    pub(super) intake: IntakeGuard,
    pub(super) config: EngagementConfig,
}

impl<S, D> EngagementService<S, D>
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, config: EngagementConfig) -> Self {
        let intake = IntakeGuard::new(config.default_city.clone());
        Self {
            store,
            directory,
            intake,
            config,
        }
    }

    pub(super) fn load_job(&self, job_id: &JobId) -> Result<JobRequest, EngagementError> {
        self.store
            .fetch_job(job_id)?
            .ok_or_else(|| EngagementError::NotFound("job not found".to_string()))
    }

    pub(super) fn provider_identity(
        &self,
        response: &JobResponse,
    ) -> Result<ProviderIdentityView, EngagementError> {
        let user = self.directory.user(&response.provider_user_id)?;
        let profile = self
            .directory
            .provider_for_user(&response.provider_user_id)?;
        Ok(ProviderIdentityView::from_parts(
            response.provider_user_id.clone(),
            user.as_ref(),
            profile.as_ref(),
        ))
    }
}

/// Rejects anonymous callers.
pub fn require_identity(viewer: Option<&Identity>) -> Result<&Identity, EngagementError> {
    viewer.ok_or(EngagementError::Unauthorized)
}

/// Error raised by the engagement service, one variant per stable error kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngagementError {
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    ValidationFailed(#[from] InputViolation),
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngagementError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngagementError::Unauthorized => "unauthorized",
            EngagementError::Forbidden(_) => "forbidden",
            EngagementError::NotFound(_) => "not_found",
            EngagementError::InvalidTransition(_) => "invalid_transition",
            EngagementError::InvalidState(_) => "invalid_state",
            EngagementError::Conflict(_) => "conflict",
            EngagementError::ValidationFailed(_) => "validation_failed",
            EngagementError::Internal(_) => "internal",
        }
    }

    pub(super) fn forbidden(message: &str) -> Self {
        EngagementError::Forbidden(message.to_string())
    }

    pub(super) fn invalid_transition(message: &str) -> Self {
        EngagementError::InvalidTransition(message.to_string())
    }
}

impl From<StoreError> for EngagementError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(detail) => EngagementError::Conflict(detail),
            StoreError::NotFound(detail) => EngagementError::NotFound(detail),
            StoreError::PreconditionFailed(detail) => EngagementError::InvalidTransition(detail),
            StoreError::Unavailable(detail) => {
                error!(%detail, "engagement store failure");
                EngagementError::Internal(detail)
            }
        }
    }
}

impl From<DirectoryError> for EngagementError {
    fn from(value: DirectoryError) -> Self {
        error!(error = %value, "provider directory failure");
        EngagementError::Internal(value.to_string())
    }
}
