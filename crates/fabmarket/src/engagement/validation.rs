use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::domain::{BudgetRange, JobCategory, JobId, ReferenceImage, UserId};

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 5000;
pub const MAX_REFERENCE_IMAGES: usize = 5;
pub const MESSAGE_MAX_CHARS: usize = 2000;
pub const REVIEW_TEXT_MAX_CHARS: usize = 1000;

/// Malformed input rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputViolation {
    #[error("title must be between 1 and {max} characters")]
    TitleLength { max: usize },
    #[error("description must be between {min} and {max} characters")]
    DescriptionLength { min: usize, max: usize },
    #[error("at most {max} reference images may be attached (found {found})")]
    TooManyImages { max: usize, found: usize },
    #[error("reference image '{0}' is not an http(s) URL")]
    InvalidImageUrl(String),
    #[error("{field} must be zero or greater")]
    NegativeAmount { field: &'static str },
    #[error("{field} is too large")]
    AmountTooLarge { field: &'static str },
    #[error("message must be between 1 and {max} characters")]
    MessageLength { max: usize },
    #[error("turnaround_days must be at least 1")]
    TurnaroundTooShort,
    #[error("rating must be an integer from 1 to 5 (found {0})")]
    RatingOutOfRange(i64),
    #[error("review text must be at most {max} characters")]
    ReviewTextLength { max: usize },
    #[error("reviewee does not match the other participant of this job")]
    RevieweeMismatch,
    #[error("unknown job status '{0}'")]
    UnknownStatus(String),
    #[error("unknown job category '{0}'")]
    UnknownCategory(String),
    #[error("user_id or provider_slug required")]
    MissingReviewSubject,
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

/// Inbound payload for posting a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<JobCategory>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub budget_min: Option<i64>,
    #[serde(default)]
    pub budget_max: Option<i64>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Inbound payload for a provider bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSubmission {
    pub message: String,
    #[serde(default)]
    pub estimated_price: Option<i64>,
    #[serde(default)]
    pub turnaround_days: Option<i64>,
}

/// Inbound payload for a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub job_id: JobId,
    #[serde(default)]
    pub reviewee_id: Option<UserId>,
    pub rating: i64,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPosting {
    pub title: String,
    pub description: String,
    pub category: Option<JobCategory>,
    pub materials: Vec<String>,
    pub budget: BudgetRange,
    pub deadline: Option<NaiveDate>,
    pub city: String,
    pub reference_images: Vec<ReferenceImage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBid {
    pub message: String,
    pub estimated_price: Option<u32>,
    pub turnaround_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReview {
    pub job_id: JobId,
    pub reviewee_id: Option<UserId>,
    pub rating: u8,
    pub text: Option<String>,
}

/// Shape and range checks for inbound engagement payloads.
#[derive(Debug, Clone)]
pub struct IntakeGuard {
    default_city: String,
}

impl IntakeGuard {
    pub fn new(default_city: impl Into<String>) -> Self {
        Self {
            default_city: default_city.into(),
        }
    }

    pub fn posting(&self, posting: JobPosting) -> Result<ValidatedPosting, InputViolation> {
        let title = posting.title.trim().to_string();
        let title_len = title.chars().count();
        if title_len == 0 || title_len > TITLE_MAX_CHARS {
            return Err(InputViolation::TitleLength {
                max: TITLE_MAX_CHARS,
            });
        }

        let description = posting.description.trim().to_string();
        let description_len = description.chars().count();
        if !(DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS).contains(&description_len) {
            return Err(InputViolation::DescriptionLength {
                min: DESCRIPTION_MIN_CHARS,
                max: DESCRIPTION_MAX_CHARS,
            });
        }

        if posting.image_urls.len() > MAX_REFERENCE_IMAGES {
            return Err(InputViolation::TooManyImages {
                max: MAX_REFERENCE_IMAGES,
                found: posting.image_urls.len(),
            });
        }
        if let Some(bad) = posting.image_urls.iter().find(|url| !is_http_url(url)) {
            return Err(InputViolation::InvalidImageUrl(bad.clone()));
        }

        let budget = BudgetRange {
            min: amount("budget_min", posting.budget_min)?,
            max: amount("budget_max", posting.budget_max)?,
        };

        let city = posting
            .city
            .map(|city| city.trim().to_string())
            .filter(|city| !city.is_empty())
            .unwrap_or_else(|| self.default_city.clone());

        let reference_images = posting
            .image_urls
            .into_iter()
            .zip(0u32..)
            .map(|(url, sort_order)| ReferenceImage { url, sort_order })
            .collect();

        Ok(ValidatedPosting {
            title,
            description,
            category: posting.category,
            materials: posting
                .materials
                .into_iter()
                .map(|material| material.trim().to_string())
                .filter(|material| !material.is_empty())
                .collect(),
            budget,
            deadline: posting.deadline,
            city,
            reference_images,
        })
    }

    pub fn bid(&self, bid: BidSubmission) -> Result<ValidatedBid, InputViolation> {
        let message_len = bid.message.trim().chars().count();
        if message_len == 0 || bid.message.chars().count() > MESSAGE_MAX_CHARS {
            return Err(InputViolation::MessageLength {
                max: MESSAGE_MAX_CHARS,
            });
        }

        let estimated_price = amount("estimated_price", bid.estimated_price)?;
        let turnaround_days = match bid.turnaround_days {
            Some(days) if days < 1 => return Err(InputViolation::TurnaroundTooShort),
            Some(days) => Some(
                u32::try_from(days).map_err(|_| InputViolation::AmountTooLarge {
                    field: "turnaround_days",
                })?,
            ),
            None => None,
        };

        Ok(ValidatedBid {
            message: bid.message,
            estimated_price,
            turnaround_days,
        })
    }

    pub fn review(&self, review: ReviewSubmission) -> Result<ValidatedReview, InputViolation> {
        if !(1..=5).contains(&review.rating) {
            return Err(InputViolation::RatingOutOfRange(review.rating));
        }
        let text = review.text.filter(|text| !text.trim().is_empty());
        if let Some(text) = &text {
            if text.chars().count() > REVIEW_TEXT_MAX_CHARS {
                return Err(InputViolation::ReviewTextLength {
                    max: REVIEW_TEXT_MAX_CHARS,
                });
            }
        }

        Ok(ValidatedReview {
            job_id: review.job_id,
            reviewee_id: review.reviewee_id,
            rating: review.rating as u8,
            text,
        })
    }
}

fn amount(field: &'static str, value: Option<i64>) -> Result<Option<u32>, InputViolation> {
    match value {
        Some(value) if value < 0 => Err(InputViolation::NegativeAmount { field }),
        Some(value) => u32::try_from(value)
            .map(Some)
            .map_err(|_| InputViolation::AmountTooLarge { field }),
        None => Ok(None),
    }
}

fn is_http_url(candidate: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").ok())
        .as_ref()
        .map_or(false, |pattern| pattern.is_match(candidate))
}
