use super::common::*;

use crate::engagement::domain::{JobCategory, JobId, JobStatus, UserId};
use crate::engagement::lifecycle::{ensure_transition, BrowseParams};
use crate::engagement::service::EngagementError;
use crate::engagement::store::EngagementStore;
use crate::engagement::validation::InputViolation;

#[test]
fn post_job_requires_identity() {
    let (service, _) = build_service();

    let err = service.post_job(None, posting()).expect_err("anonymous");
    assert_eq!(err, EngagementError::Unauthorized);
}

#[test]
fn post_job_opens_job_owned_by_caller() {
    let (service, store) = build_service();
    let mut payload = posting();
    payload.image_urls = vec![
        "https://cdn.example.com/front.jpg".to_string(),
        "https://cdn.example.com/side.jpg".to_string(),
    ];

    let job = service
        .post_job(Some(&provider_a()), payload)
        .expect("providers may post too");

    assert_eq!(job.status, JobStatus::Open);
    assert_eq!(job.customer_id, UserId::from("usr-provider-a"));
    assert_eq!(job.city, "Charlotte");
    assert!(job.accepted_response_id.is_none());
    assert_eq!(job.reference_images[1].url, "https://cdn.example.com/side.jpg");
    assert!(store.fetch_job(&job.id).expect("fetch").is_some());
}

#[test]
fn post_job_rejects_malformed_input() {
    let (service, _) = build_service();
    let mut payload = posting();
    payload.title = String::new();

    let err = service
        .post_job(Some(&owner()), payload)
        .expect_err("empty title");
    assert!(matches!(
        err,
        EngagementError::ValidationFailed(InputViolation::TitleLength { .. })
    ));
}

#[test]
fn complete_requires_in_progress_job() {
    let (service, _) = build_service();
    let job = open_job(&service);

    let err = service
        .complete_job(Some(&owner()), &job.id)
        .expect_err("never accepted");
    assert_eq!(err.kind(), "invalid_transition");
}

#[test]
fn complete_is_not_idempotent() {
    let (service, store) = build_service();
    let (job, _, _) = completed_job(&service);
    assert_eq!(job.status, JobStatus::Completed);

    let err = service
        .complete_job(Some(&owner()), &job.id)
        .expect_err("second completion");
    assert!(matches!(err, EngagementError::InvalidTransition(_)));
    let stored = store.fetch_job(&job.id).expect("fetch").expect("present");
    assert_eq!(stored.status, JobStatus::Completed);
}

#[test]
fn only_owner_may_complete() {
    let (service, _) = build_service();
    let (job, a, _) = job_with_bids(&service);
    service
        .accept_response(Some(&owner()), &job.id, &a.id)
        .expect("accepted");

    let err = service
        .complete_job(Some(&provider_a()), &job.id)
        .expect_err("provider cannot complete");
    assert!(matches!(err, EngagementError::Forbidden(_)));

    let err = service
        .complete_job(Some(&owner()), &JobId::from("job_missing"))
        .expect_err("unknown job");
    assert!(matches!(err, EngagementError::NotFound(_)));
}

#[test]
fn completed_job_cannot_reopen_or_accept() {
    let (service, _) = build_service();
    let (job, _, b) = completed_job(&service);

    let err = service
        .accept_response(Some(&owner()), &job.id, &b.id)
        .expect_err("completed jobs accept nothing");
    assert!(matches!(err, EngagementError::InvalidTransition(_)));
}

#[test]
fn transition_guard_refuses_skips_and_reversals() {
    let (service, _) = build_service();
    let job = open_job(&service);

    assert!(ensure_transition(&job, JobStatus::Open, JobStatus::InProgress, "x").is_ok());
    assert!(ensure_transition(&job, JobStatus::Open, JobStatus::Completed, "x").is_err());
    assert!(ensure_transition(&job, JobStatus::InProgress, JobStatus::Completed, "x").is_err());
    assert!(!JobStatus::Completed.can_transition_to(JobStatus::Open));
    assert!(!JobStatus::InProgress.can_transition_to(JobStatus::Open));
}

#[test]
fn browse_defaults_to_open_jobs_newest_first() {
    let (service, _) = build_service();
    let (completed, _, _) = completed_job(&service);
    let mut long = posting();
    long.title = "Cosplay helmet".to_string();
    long.description = "x".repeat(250);
    long.category = Some(JobCategory::Cosplay);
    let open = service.post_job(Some(&owner()), long).expect("posted");

    let listed = service
        .browse_jobs(&BrowseParams::default())
        .expect("browse");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, open.id);
    assert_eq!(listed[0].description.chars().count(), 203);
    assert!(listed[0].description.ends_with("..."));
    assert_eq!(listed[0].customer_name, "Olive Owner");
    assert_eq!(listed[0].budget_label, "$20 - $60");
    assert_eq!(listed[0].category_label, Some("Cosplay / Props"));

    let all = service
        .browse_jobs(&BrowseParams {
            status: Some("ALL".to_string()),
            ..BrowseParams::default()
        })
        .expect("browse all");
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].id, completed.id);
    assert_eq!(all[1].response_count, 2);
    assert_eq!(all[1].category_label, None);
}

#[test]
fn browse_filters_by_search_and_rejects_unknown_status() {
    let (service, _) = build_service();
    open_job(&service);
    service
        .post_job(Some(&provider_b()), {
            let mut other = posting();
            other.title = "Drone arm".to_string();
            other.description = "Carbon-filled nylon arm for a quadcopter".to_string();
            other
        })
        .expect("posted");

    let hits = service
        .browse_jobs(&BrowseParams {
            search: Some("QUADCOPTER".to_string()),
            ..BrowseParams::default()
        })
        .expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Drone arm");
    assert_eq!(hits[0].customer_name, "Anonymous");

    let err = service
        .browse_jobs(&BrowseParams {
            status: Some("CANCELLED".to_string()),
            ..BrowseParams::default()
        })
        .expect_err("no such status");
    assert_eq!(err.kind(), "validation_failed");
}
