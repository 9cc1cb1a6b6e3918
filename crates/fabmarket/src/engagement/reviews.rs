use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::directory::ProviderDirectory;
use super::domain::{
    Identity, JobId, JobRequest, JobResponse, JobStatus, ResponseStatus, Review, ReviewId,
    ReviewerRole, UserId,
};
use super::service::{require_identity, EngagementError, EngagementService};
use super::store::{EngagementStore, ReviewSubject, StoreError};
use super::validation::{InputViolation, ReviewSubmission};

/// Which side of a completed job the caller is on, with the counterpart they review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEligibility {
    pub role: ReviewerRole,
    pub reviewee_id: UserId,
}

/// Decide whether `reviewer` may review `job`.
///
/// Checks run in order: the job is `COMPLETED`, then the caller is a participant. The
/// (job, reviewer) uniqueness is left to the store.
pub fn review_eligibility(
    job: &JobRequest,
    accepted: Option<&JobResponse>,
    reviewer: &UserId,
) -> Result<ReviewEligibility, EngagementError> {
    if job.status != JobStatus::Completed {
        return Err(EngagementError::InvalidState(
            "can only review after job completion".to_string(),
        ));
    }

    let role = if job.is_owned_by(reviewer) {
        ReviewerRole::Customer
    } else if accepted.map_or(false, |response| &response.provider_user_id == reviewer) {
        ReviewerRole::Provider
    } else {
        return Err(EngagementError::forbidden(
            "only job participants can leave reviews",
        ));
    };

    let accepted = accepted.ok_or_else(|| {
        EngagementError::InvalidState("job has no accepted response".to_string())
    })?;
    Ok(ReviewEligibility {
        role,
        reviewee_id: role.reviewee(job, accepted).clone(),
    })
}

/// Average of `ratings` rounded to one decimal; empty input averages to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    pub avg_rating: f64,
    pub count: usize,
}

impl RatingSummary {
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0usize), |(sum, count), rating| {
                (sum + u64::from(rating), count + 1)
            });
        if count == 0 {
            return Self::default();
        }
        let average = sum as f64 / count as f64;
        Self {
            avg_rating: (average * 10.0).round() / 10.0,
            count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewFeedQuery {
    pub provider_slug: Option<String>,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewFeedEntry {
    pub id: ReviewId,
    pub rating: u8,
    pub text: Option<String>,
    pub reviewer_role: ReviewerRole,
    pub reviewer_name: String,
    pub reviewer_image: Option<String>,
    pub job_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewFeed {
    #[serde(flatten)]
    pub summary: RatingSummary,
    pub reviews: Vec<ReviewFeedEntry>,
}

impl<S, D> EngagementService<S, D>
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    /// Leave the caller's single review for a completed job.
    pub fn submit_review(
        &self,
        viewer: Option<&Identity>,
        submission: ReviewSubmission,
    ) -> Result<Review, EngagementError> {
        let identity = require_identity(viewer)?;
        let submission = self.intake.review(submission)?;

        let job = self.load_job(&submission.job_id)?;
        let accepted = self.accepted_response(&job)?;
        let eligibility = review_eligibility(&job, accepted.as_ref(), &identity.user_id)?;
        if let Some(claimed) = &submission.reviewee_id {
            if claimed != &eligibility.reviewee_id {
                return Err(InputViolation::RevieweeMismatch.into());
            }
        }

        let provider_profile_id = match eligibility.role {
            ReviewerRole::Customer => self
                .directory
                .provider_for_user(&eligibility.reviewee_id)?
                .map(|profile| profile.id),
            ReviewerRole::Provider => None,
        };

        let review = Review {
            id: ReviewId::generate(),
            job_id: job.id.clone(),
            reviewer_id: identity.user_id.clone(),
            reviewee_id: eligibility.reviewee_id,
            provider_profile_id,
            reviewer_role: eligibility.role,
            rating: submission.rating,
            text: submission.text,
            hidden: false,
            created_at: Utc::now(),
        };

        let stored = self.store.insert_review(review).map_err(|err| match err {
            StoreError::Conflict(_) => {
                EngagementError::Conflict("you have already reviewed this job".to_string())
            }
            other => EngagementError::from(other),
        })?;

        info!(
            job_id = %stored.job_id,
            review_id = %stored.id,
            reviewer_role = stored.reviewer_role.label(),
            rating = stored.rating,
            "review created"
        );
        Ok(stored)
    }

    /// Rating summary and newest visible reviews for a provider profile or any reviewee.
    pub fn review_feed(&self, query: &ReviewFeedQuery) -> Result<ReviewFeed, EngagementError> {
        let subject = match (query.provider_slug.as_deref(), &query.user_id) {
            (Some(slug), _) if !slug.trim().is_empty() => {
                match self.directory.provider_by_slug(slug.trim())? {
                    Some(profile) => ReviewSubject::Provider(profile.id),
                    None => return Ok(ReviewFeed::default()),
                }
            }
            (_, Some(user_id)) if !user_id.as_str().trim().is_empty() => {
                ReviewSubject::Reviewee(user_id.clone())
            }
            _ => return Err(InputViolation::MissingReviewSubject.into()),
        };

        let reviews = self.store.reviews_for(&subject, false)?;
        let summary = RatingSummary::from_ratings(reviews.iter().map(|review| review.rating));

        let mut job_titles: HashMap<JobId, Option<String>> = HashMap::new();
        let mut entries = Vec::new();
        for review in reviews.into_iter().take(self.config.review_feed_size) {
            let reviewer = self.directory.user(&review.reviewer_id)?;
            let job_title = match job_titles.get(&review.job_id) {
                Some(title) => title.clone(),
                None => {
                    let title = self.store.fetch_job(&review.job_id)?.map(|job| job.title);
                    job_titles.insert(review.job_id.clone(), title.clone());
                    title
                }
            };
            entries.push(ReviewFeedEntry {
                reviewer_name: reviewer
                    .as_ref()
                    .and_then(|user| user.name.clone())
                    .unwrap_or_else(|| "Anonymous".to_string()),
                reviewer_image: reviewer.and_then(|user| user.image),
                job_title,
                id: review.id,
                rating: review.rating,
                text: review.text,
                reviewer_role: review.reviewer_role,
                created_at: review.created_at,
            });
        }

        Ok(ReviewFeed {
            summary,
            reviews: entries,
        })
    }

    /// Admin moderation: hide or restore a review.
    pub fn set_review_hidden(
        &self,
        viewer: Option<&Identity>,
        review_id: &ReviewId,
        hidden: bool,
    ) -> Result<Review, EngagementError> {
        let identity = require_identity(viewer)?;
        if !identity.is_admin {
            return Err(EngagementError::forbidden("forbidden"));
        }

        let review = self
            .store
            .set_review_hidden(review_id, hidden)
            .map_err(|err| match err {
                StoreError::NotFound(_) => EngagementError::NotFound("review not found".to_string()),
                other => EngagementError::from(other),
            })?;

        info!(
            review_id = %review.id,
            admin_id = %identity.user_id,
            hidden = review.hidden,
            "review visibility changed"
        );
        Ok(review)
    }

    /// The bid recorded as accepted on `job`, if any.
    fn accepted_response(&self, job: &JobRequest) -> Result<Option<JobResponse>, EngagementError> {
        let responses = self.store.responses_for_job(&job.id)?;
        let accepted = responses.into_iter().find(|response| {
            job.accepted_response_id.as_ref() == Some(&response.id)
                && response.status == ResponseStatus::Accepted
        });
        Ok(accepted)
    }
}
