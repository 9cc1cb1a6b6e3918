use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::directory::ProviderDirectory;
use super::domain::{Identity, JobId, ReviewId, UserId, UserRole};
use super::lifecycle::BrowseParams;
use super::providers::ProviderSearch;
use super::responses::AcceptRequest;
use super::reviews::ReviewFeedQuery;
use super::service::{EngagementError, EngagementService};
use super::store::EngagementStore;
use super::validation::{BidSubmission, InputViolation, JobPosting, ReviewSubmission};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_ADMIN_HEADER: &str = "x-user-admin";
pub const USER_ONBOARDED_HEADER: &str = "x-user-onboarded";

/// Caller identity forwarded by the session gateway; `None` for anonymous requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer(pub Option<Identity>);

impl Viewer {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };
        let flag = |name: &str| {
            header(name).map_or(false, |value| {
                value == "1" || value.eq_ignore_ascii_case("true")
            })
        };

        let identity = header(USER_ID_HEADER).map(|user_id| Identity {
            user_id: UserId::from(user_id),
            role: header(USER_ROLE_HEADER)
                .map(UserRole::from_session)
                .unwrap_or(UserRole::Customer),
            is_admin: flag(USER_ADMIN_HEADER),
            has_onboarded: flag(USER_ONBOARDED_HEADER),
        });
        Viewer(identity)
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

#[axum::async_trait]
impl<T> FromRequestParts<T> for Viewer
where
    T: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &T) -> Result<Self, Self::Rejection> {
        Ok(Viewer::from_headers(&parts.headers))
    }
}

impl IntoResponse for EngagementError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngagementError::Unauthorized => StatusCode::UNAUTHORIZED,
            EngagementError::Forbidden(_) => StatusCode::FORBIDDEN,
            EngagementError::NotFound(_) => StatusCode::NOT_FOUND,
            EngagementError::InvalidTransition(_) | EngagementError::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            EngagementError::Conflict(_) => StatusCode::CONFLICT,
            EngagementError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngagementError::Internal(detail) => {
                error!(%detail, "engagement request failed");
                let payload = json!({
                    "error": "internal server error",
                    "kind": self.kind(),
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
            }
        };

        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(payload)).into_response()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityRequest {
    pub hidden: bool,
}

/// Unwraps a JSON body, reporting shape errors as `validation_failed` instead of axum's plain
/// text rejection.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, EngagementError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| InputViolation::MalformedBody(rejection.body_text()).into())
}

/// Router exposing the engagement endpoints.
pub fn engagement_router<S, D>(service: Arc<EngagementService<S, D>>) -> Router
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/jobs",
            get(browse_handler::<S, D>).post(post_job_handler::<S, D>),
        )
        .route("/api/v1/jobs/:job_id", get(job_detail_handler::<S, D>))
        .route(
            "/api/v1/jobs/:job_id/responses",
            post(submit_response_handler::<S, D>),
        )
        .route("/api/v1/jobs/:job_id/accept", post(accept_handler::<S, D>))
        .route(
            "/api/v1/jobs/:job_id/complete",
            post(complete_handler::<S, D>),
        )
        .route(
            "/api/v1/reviews",
            get(review_feed_handler::<S, D>).post(submit_review_handler::<S, D>),
        )
        .route(
            "/api/v1/admin/reviews/:review_id",
            put(review_visibility_handler::<S, D>),
        )
        .route("/api/v1/providers", get(providers_handler::<S, D>))
        .route(
            "/api/v1/providers/:slug",
            get(provider_detail_handler::<S, D>),
        )
        .with_state(service)
}

pub(crate) async fn browse_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    Query(params): Query<BrowseParams>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    match service.browse_jobs(&params) {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn post_job_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    viewer: Viewer,
    posting: Result<Json<JobPosting>, JsonRejection>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    let posting = match json_body(posting) {
        Ok(posting) => posting,
        Err(err) => return err.into_response(),
    };
    match service.post_job(viewer.identity(), posting) {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn job_detail_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    viewer: Viewer,
    Path(job_id): Path<String>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    match service.job_detail(viewer.identity(), &JobId(job_id)) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn submit_response_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    viewer: Viewer,
    Path(job_id): Path<String>,
    bid: Result<Json<BidSubmission>, JsonRejection>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    let bid = match json_body(bid) {
        Ok(bid) => bid,
        Err(err) => return err.into_response(),
    };
    match service.submit_response(viewer.identity(), &JobId(job_id), bid) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn accept_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    viewer: Viewer,
    Path(job_id): Path<String>,
    request: Result<Json<AcceptRequest>, JsonRejection>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    let request = match json_body(request) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match service.accept_response(viewer.identity(), &JobId(job_id), &request.response_id) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn complete_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    viewer: Viewer,
    Path(job_id): Path<String>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    match service.complete_job(viewer.identity(), &JobId(job_id)) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn review_feed_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    Query(query): Query<ReviewFeedQuery>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    match service.review_feed(&query) {
        Ok(feed) => (StatusCode::OK, Json(feed)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn submit_review_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    viewer: Viewer,
    submission: Result<Json<ReviewSubmission>, JsonRejection>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    let submission = match json_body(submission) {
        Ok(submission) => submission,
        Err(err) => return err.into_response(),
    };
    match service.submit_review(viewer.identity(), submission) {
        Ok(review) => (StatusCode::CREATED, Json(review)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn review_visibility_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    viewer: Viewer,
    Path(review_id): Path<String>,
    request: Result<Json<VisibilityRequest>, JsonRejection>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    let request = match json_body(request) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match service.set_review_hidden(viewer.identity(), &ReviewId(review_id), request.hidden) {
        Ok(review) => (StatusCode::OK, Json(review)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn providers_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    viewer: Viewer,
    Query(search): Query<ProviderSearch>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    match service.list_providers(viewer.identity(), &search) {
        Ok(providers) => (StatusCode::OK, Json(providers)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn provider_detail_handler<S, D>(
    State(service): State<Arc<EngagementService<S, D>>>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Response
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    match service.provider_detail(viewer.identity(), &slug) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}
