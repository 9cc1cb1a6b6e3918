use std::sync::Arc;

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::engagement::directory::{
    ContactDetails, InMemoryDirectory, ProviderProfile, ProviderStatus, PublicUser,
};
use crate::engagement::domain::{
    Identity, JobId, JobRequest, JobResponse, JobStatus, ProviderProfileId, Review, ReviewId,
    UserId,
};
use crate::engagement::memory::InMemoryEngagementStore;
use crate::engagement::service::{EngagementConfig, EngagementService};
use crate::engagement::store::{EngagementStore, JobQuery, ReviewSubject, StoreError, UnitOfWork};
use crate::engagement::validation::{BidSubmission, JobPosting, ReviewSubmission};

pub(super) type MemoryService = EngagementService<InMemoryEngagementStore, InMemoryDirectory>;

pub(super) fn owner() -> Identity {
    Identity::customer("usr-owner")
}

pub(super) fn provider_a() -> Identity {
    Identity::provider("usr-provider-a")
}

pub(super) fn provider_b() -> Identity {
    Identity::provider("usr-provider-b")
}

pub(super) fn admin() -> Identity {
    Identity {
        is_admin: true,
        ..Identity::customer("usr-admin")
    }
}

pub(super) fn config() -> EngagementConfig {
    EngagementConfig {
        default_city: "Charlotte".to_string(),
        job_page_size: 50,
        review_feed_size: 20,
    }
}

pub(super) fn profile(user: &str, slug: &str, display_name: &str) -> ProviderProfile {
    ProviderProfile {
        id: ProviderProfileId(format!("prv-{slug}")),
        user_id: UserId::from(user),
        slug: slug.to_string(),
        display_name: display_name.to_string(),
        headline: Some("FDM and resin printing".to_string()),
        bio: Some("Small shop near South End".to_string()),
        city: "Charlotte".to_string(),
        lat: Some(35.2271),
        lng: Some(-80.8431),
        materials: vec!["PLA".to_string(), "PETG".to_string()],
        processes: vec!["FDM".to_string()],
        capabilities: vec!["Prototyping".to_string()],
        thumbnail_url: None,
        contact: ContactDetails {
            contact_email: Some(format!("{slug}@example.com")),
            phone: None,
            website_url: Some(format!("https://{slug}.example.com")),
            instagram_url: None,
        },
        status: ProviderStatus::Approved,
        created_at: Utc
            .with_ymd_and_hms(2025, 1, 10, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub(super) fn directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    for (id, name) in [
        ("usr-owner", Some("Olive Owner")),
        ("usr-provider-a", Some("Avery")),
        ("usr-provider-b", None),
    ] {
        directory
            .insert_user(PublicUser {
                id: UserId::from(id),
                name: name.map(str::to_string),
                image: None,
            })
            .expect("user");
    }
    directory
        .insert_provider(profile("usr-provider-a", "avery-prints", "Avery Prints"))
        .expect("provider a");
    directory
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryEngagementStore>) {
    let store = Arc::new(InMemoryEngagementStore::new());
    let service = EngagementService::new(store.clone(), Arc::new(directory()), config());
    (service, store)
}

pub(super) fn posting() -> JobPosting {
    JobPosting {
        title: "Bracket reprint".to_string(),
        description: "Reprint a cracked shelf bracket in PETG".to_string(),
        category: None,
        materials: vec!["PETG".to_string()],
        budget_min: Some(20),
        budget_max: Some(60),
        deadline: None,
        city: None,
        image_urls: Vec::new(),
    }
}

pub(super) fn bid(price: i64) -> BidSubmission {
    BidSubmission {
        message: format!("Can print this for ${price}"),
        estimated_price: Some(price),
        turnaround_days: Some(3),
    }
}

pub(super) fn review(job_id: &JobId, rating: i64) -> ReviewSubmission {
    ReviewSubmission {
        job_id: job_id.clone(),
        reviewee_id: None,
        rating,
        text: Some("Fast turnaround".to_string()),
    }
}

pub(super) fn open_job(service: &MemoryService) -> JobRequest {
    service
        .post_job(Some(&owner()), posting())
        .expect("job posted")
}

/// Job with bids from A (40) and B (55).
pub(super) fn job_with_bids(service: &MemoryService) -> (JobRequest, JobResponse, JobResponse) {
    let job = open_job(service);
    let a = service
        .submit_response(Some(&provider_a()), &job.id, bid(40))
        .expect("bid a");
    let b = service
        .submit_response(Some(&provider_b()), &job.id, bid(55))
        .expect("bid b");
    (job, a, b)
}

/// Job where A was accepted and the owner marked it complete.
pub(super) fn completed_job(service: &MemoryService) -> (JobRequest, JobResponse, JobResponse) {
    let (job, a, b) = job_with_bids(service);
    service
        .accept_response(Some(&owner()), &job.id, &a.id)
        .expect("accepted");
    let job = service
        .complete_job(Some(&owner()), &job.id)
        .expect("completed");
    (job, a, b)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose every call fails as if the database were offline.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("database offline".to_string()))
}

impl EngagementStore for UnavailableStore {
    fn insert_job(&self, _job: JobRequest) -> Result<JobRequest, StoreError> {
        offline()
    }

    fn fetch_job(&self, _id: &JobId) -> Result<Option<JobRequest>, StoreError> {
        offline()
    }

    fn list_jobs(&self, _query: &JobQuery) -> Result<Vec<JobRequest>, StoreError> {
        offline()
    }

    fn count_responses(&self, _job_id: &JobId) -> Result<usize, StoreError> {
        offline()
    }

    fn responses_for_job(&self, _job_id: &JobId) -> Result<Vec<JobResponse>, StoreError> {
        offline()
    }

    fn insert_response(&self, _response: JobResponse) -> Result<JobResponse, StoreError> {
        offline()
    }

    fn commit(&self, _unit: UnitOfWork) -> Result<(), StoreError> {
        offline()
    }

    fn insert_review(&self, _review: Review) -> Result<Review, StoreError> {
        offline()
    }

    fn reviews_for(
        &self,
        _subject: &ReviewSubject,
        _include_hidden: bool,
    ) -> Result<Vec<Review>, StoreError> {
        offline()
    }

    fn reviews_for_job(&self, _job_id: &JobId) -> Result<Vec<Review>, StoreError> {
        offline()
    }

    fn set_review_hidden(&self, _id: &ReviewId, _hidden: bool) -> Result<Review, StoreError> {
        offline()
    }
}

/// In-memory store whose transactions always abort.
#[derive(Default)]
pub(super) struct AbortingCommitStore {
    pub(super) inner: InMemoryEngagementStore,
}

impl EngagementStore for AbortingCommitStore {
    fn insert_job(&self, job: JobRequest) -> Result<JobRequest, StoreError> {
        self.inner.insert_job(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<JobRequest>, StoreError> {
        self.inner.fetch_job(id)
    }

    fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRequest>, StoreError> {
        self.inner.list_jobs(query)
    }

    fn count_responses(&self, job_id: &JobId) -> Result<usize, StoreError> {
        self.inner.count_responses(job_id)
    }

    fn responses_for_job(&self, job_id: &JobId) -> Result<Vec<JobResponse>, StoreError> {
        self.inner.responses_for_job(job_id)
    }

    fn insert_response(&self, response: JobResponse) -> Result<JobResponse, StoreError> {
        self.inner.insert_response(response)
    }

    fn commit(&self, _unit: UnitOfWork) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("transaction aborted".to_string()))
    }

    fn insert_review(&self, review: Review) -> Result<Review, StoreError> {
        self.inner.insert_review(review)
    }

    fn reviews_for(
        &self,
        subject: &ReviewSubject,
        include_hidden: bool,
    ) -> Result<Vec<Review>, StoreError> {
        self.inner.reviews_for(subject, include_hidden)
    }

    fn reviews_for_job(&self, job_id: &JobId) -> Result<Vec<Review>, StoreError> {
        self.inner.reviews_for_job(job_id)
    }

    fn set_review_hidden(&self, id: &ReviewId, hidden: bool) -> Result<Review, StoreError> {
        self.inner.set_review_hidden(id, hidden)
    }
}

/// In-memory store whose reads lag behind its writes: jobs always read back as `OPEN` and no
/// responses are visible, so only the write-time checks can reject a bid.
#[derive(Default)]
pub(super) struct StaleReadStore {
    pub(super) inner: InMemoryEngagementStore,
}

impl EngagementStore for StaleReadStore {
    fn insert_job(&self, job: JobRequest) -> Result<JobRequest, StoreError> {
        self.inner.insert_job(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<JobRequest>, StoreError> {
        Ok(self.inner.fetch_job(id)?.map(|job| JobRequest {
            status: JobStatus::Open,
            accepted_response_id: None,
            ..job
        }))
    }

    fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRequest>, StoreError> {
        self.inner.list_jobs(query)
    }

    fn count_responses(&self, _job_id: &JobId) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn responses_for_job(&self, _job_id: &JobId) -> Result<Vec<JobResponse>, StoreError> {
        Ok(Vec::new())
    }

    fn insert_response(&self, response: JobResponse) -> Result<JobResponse, StoreError> {
        self.inner.insert_response(response)
    }

    fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        self.inner.commit(unit)
    }

    fn insert_review(&self, review: Review) -> Result<Review, StoreError> {
        self.inner.insert_review(review)
    }

    fn reviews_for(
        &self,
        subject: &ReviewSubject,
        include_hidden: bool,
    ) -> Result<Vec<Review>, StoreError> {
        self.inner.reviews_for(subject, include_hidden)
    }

    fn reviews_for_job(&self, job_id: &JobId) -> Result<Vec<Review>, StoreError> {
        self.inner.reviews_for_job(job_id)
    }

    fn set_review_hidden(&self, id: &ReviewId, hidden: bool) -> Result<Review, StoreError> {
        self.inner.set_review_hidden(id, hidden)
    }
}
