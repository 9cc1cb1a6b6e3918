use std::sync::Arc;

use super::common::*;

use crate::engagement::domain::{
    JobId, ProviderProfileId, ReviewId, ReviewerRole, UserId,
};
use crate::engagement::memory::InMemoryEngagementStore;
use crate::engagement::reviews::{RatingSummary, ReviewFeedQuery};
use crate::engagement::service::{EngagementConfig, EngagementError, EngagementService};
use crate::engagement::validation::InputViolation;

fn by_slug(slug: &str) -> ReviewFeedQuery {
    ReviewFeedQuery {
        provider_slug: Some(slug.to_string()),
        user_id: None,
    }
}

#[test]
fn both_participants_review_exactly_once() {
    let (service, _) = build_service();
    let (job, _, _) = completed_job(&service);

    let from_customer = service
        .submit_review(Some(&owner()), review(&job.id, 5))
        .expect("customer review");
    assert_eq!(from_customer.reviewer_role, ReviewerRole::Customer);
    assert_eq!(from_customer.reviewee_id, UserId::from("usr-provider-a"));
    assert_eq!(
        from_customer.provider_profile_id,
        Some(ProviderProfileId::from("prv-avery-prints"))
    );

    let from_provider = service
        .submit_review(Some(&provider_a()), review(&job.id, 4))
        .expect("provider review");
    assert_eq!(from_provider.reviewer_role, ReviewerRole::Provider);
    assert_eq!(from_provider.reviewee_id, UserId::from("usr-owner"));
    assert!(from_provider.provider_profile_id.is_none());

    for reviewer in [owner(), provider_a()] {
        let err = service
            .submit_review(Some(&reviewer), review(&job.id, 3))
            .expect_err("second review");
        assert_eq!(
            err,
            EngagementError::Conflict("you have already reviewed this job".to_string())
        );
    }
}

#[test]
fn reviews_wait_for_completion() {
    let (service, _) = build_service();
    let (job, a, _) = job_with_bids(&service);
    service
        .accept_response(Some(&owner()), &job.id, &a.id)
        .expect("accepted");

    let err = service
        .submit_review(Some(&owner()), review(&job.id, 5))
        .expect_err("still in progress");
    assert!(matches!(err, EngagementError::InvalidState(_)));
    assert_eq!(err.kind(), "invalid_state");
}

#[test]
fn only_participants_may_review() {
    let (service, _) = build_service();
    let (job, _, _) = completed_job(&service);

    let err = service
        .submit_review(Some(&provider_b()), review(&job.id, 1))
        .expect_err("declined provider");
    assert!(matches!(err, EngagementError::Forbidden(_)));

    let err = service
        .submit_review(Some(&owner()), review(&JobId::from("job_missing"), 5))
        .expect_err("unknown job");
    assert!(matches!(err, EngagementError::NotFound(_)));

    let err = service
        .submit_review(None, review(&job.id, 5))
        .expect_err("anonymous");
    assert_eq!(err, EngagementError::Unauthorized);
}

#[test]
fn claimed_reviewee_must_match_counterpart() {
    let (service, _) = build_service();
    let (job, _, _) = completed_job(&service);

    let mut submission = review(&job.id, 5);
    submission.reviewee_id = Some(UserId::from("usr-provider-b"));
    let err = service
        .submit_review(Some(&owner()), submission)
        .expect_err("wrong reviewee");
    assert_eq!(
        err,
        EngagementError::ValidationFailed(InputViolation::RevieweeMismatch)
    );

    let mut submission = review(&job.id, 5);
    submission.reviewee_id = Some(UserId::from("usr-provider-a"));
    service
        .submit_review(Some(&owner()), submission)
        .expect("matching reviewee");
}

#[test]
fn rating_must_be_one_to_five() {
    let (service, _) = build_service();
    let (job, _, _) = completed_job(&service);

    let err = service
        .submit_review(Some(&owner()), review(&job.id, 6))
        .expect_err("out of range");
    assert_eq!(
        err,
        EngagementError::ValidationFailed(InputViolation::RatingOutOfRange(6))
    );
}

#[test]
fn rating_summary_rounds_to_one_decimal() {
    assert_eq!(RatingSummary::from_ratings([5, 4, 4]).avg_rating, 4.3);
    assert_eq!(RatingSummary::from_ratings([5, 4]).avg_rating, 4.5);
    let empty = RatingSummary::from_ratings(Vec::<u8>::new());
    assert_eq!(empty.avg_rating, 0.0);
    assert_eq!(empty.count, 0);
}

#[test]
fn feed_by_slug_and_by_user() {
    let (service, _) = build_service();
    let (job, _, _) = completed_job(&service);
    service
        .submit_review(Some(&owner()), review(&job.id, 4))
        .expect("customer review");
    service
        .submit_review(Some(&provider_a()), review(&job.id, 5))
        .expect("provider review");

    let feed = service.review_feed(&by_slug("avery-prints")).expect("feed");
    assert_eq!(feed.summary.count, 1);
    assert_eq!(feed.summary.avg_rating, 4.0);
    assert_eq!(feed.reviews[0].reviewer_name, "Olive Owner");
    assert_eq!(feed.reviews[0].job_title.as_deref(), Some("Bracket reprint"));

    let feed = service
        .review_feed(&ReviewFeedQuery {
            provider_slug: None,
            user_id: Some(UserId::from("usr-owner")),
        })
        .expect("feed");
    assert_eq!(feed.summary.count, 1);
    assert_eq!(feed.reviews[0].reviewer_role, ReviewerRole::Provider);

    let empty = service.review_feed(&by_slug("nobody")).expect("feed");
    assert_eq!(empty.summary.count, 0);
    assert!(empty.reviews.is_empty());

    let err = service
        .review_feed(&ReviewFeedQuery::default())
        .expect_err("no subject");
    assert_eq!(err.kind(), "validation_failed");
}

#[test]
fn feed_is_capped_but_summary_covers_every_visible_review() {
    let store = Arc::new(InMemoryEngagementStore::new());
    let service = EngagementService::new(
        store,
        Arc::new(directory()),
        EngagementConfig {
            review_feed_size: 1,
            ..config()
        },
    );
    for rating in [5, 2] {
        let (job, _, _) = completed_job(&service);
        service
            .submit_review(Some(&owner()), review(&job.id, rating))
            .expect("review");
    }

    let feed = service.review_feed(&by_slug("avery-prints")).expect("feed");
    assert_eq!(feed.reviews.len(), 1);
    assert_eq!(feed.reviews[0].rating, 2);
    assert_eq!(feed.summary.count, 2);
    assert_eq!(feed.summary.avg_rating, 3.5);
}

#[test]
fn hidden_reviews_leave_feeds_and_job_detail() {
    let (service, _) = build_service();
    let (job, _, _) = completed_job(&service);
    let created = service
        .submit_review(Some(&owner()), review(&job.id, 1))
        .expect("review");

    let err = service
        .set_review_hidden(Some(&owner()), &created.id, true)
        .expect_err("not an admin");
    assert!(matches!(err, EngagementError::Forbidden(_)));
    let err = service
        .set_review_hidden(Some(&admin()), &ReviewId::from("rev_missing"), true)
        .expect_err("unknown review");
    assert!(matches!(err, EngagementError::NotFound(_)));

    let hidden = service
        .set_review_hidden(Some(&admin()), &created.id, true)
        .expect("hidden");
    assert!(hidden.hidden);
    assert_eq!(
        service
            .review_feed(&by_slug("avery-prints"))
            .expect("feed")
            .summary
            .count,
        0
    );
    assert!(service
        .job_detail(None, &job.id)
        .expect("detail")
        .reviews
        .is_empty());

    service
        .set_review_hidden(Some(&admin()), &created.id, false)
        .expect("restored");
    assert_eq!(
        service
            .review_feed(&by_slug("avery-prints"))
            .expect("feed")
            .summary
            .count,
        1
    );
}
