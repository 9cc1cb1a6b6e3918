use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "_{}"), Uuid::new_v4().simple()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier of a signed-in marketplace user, issued by the session gateway.
    UserId,
    "usr"
);
identifier!(
    /// Identifier wrapper for posted fabrication jobs.
    JobId,
    "job"
);
identifier!(
    /// Identifier wrapper for provider bids.
    ResponseId,
    "rsp"
);
identifier!(ReviewId, "rev");
identifier!(
    /// Identifier of a provider profile owned by the external profile store.
    ProviderProfileId,
    "prv"
);

/// Capability carried by the calling identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Customer,
    Provider,
}

impl UserRole {
    /// Session role strings default to customer unless they name the provider role.
    pub fn from_session(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("provider") {
            Self::Provider
        } else {
            Self::Customer
        }
    }
}

/// Identity resolved by the session gateway for the current request. Trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: UserRole,
    pub is_admin: bool,
    pub has_onboarded: bool,
}

impl Identity {
    pub fn customer(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role: UserRole::Customer,
            is_admin: false,
            has_onboarded: true,
        }
    }

    pub fn provider(user_id: impl Into<String>) -> Self {
        Self {
            role: UserRole::Provider,
            ..Self::customer(user_id)
        }
    }

    pub fn is_provider(&self) -> bool {
        self.role == UserRole::Provider
    }
}

/// Lifecycle of a posted job. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Open => "OPEN",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
        }
    }

    /// The only status reachable from `self`, if any.
    pub const fn successor(self) -> Option<JobStatus> {
        match self {
            JobStatus::Open => Some(JobStatus::InProgress),
            JobStatus::InProgress => Some(JobStatus::Completed),
            JobStatus::Completed => None,
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self.successor() == Some(next)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for JobStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(JobStatus::Open),
            "IN_PROGRESS" => Ok(JobStatus::InProgress),
            "COMPLETED" => Ok(JobStatus::Completed),
            _ => Err(UnknownVariant(value.to_string())),
        }
    }
}

/// Status of a provider bid. Only `Sent` bids may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Sent,
    Accepted,
    Declined,
}

impl ResponseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ResponseStatus::Sent => "SENT",
            ResponseStatus::Accepted => "ACCEPTED",
            ResponseStatus::Declined => "DECLINED",
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fabrication categories offered when posting a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobCategory {
    Auto,
    Prototype,
    ReplacementPart,
    Cosplay,
    Home,
    Industrial,
    Other,
}

impl JobCategory {
    pub const fn label(self) -> &'static str {
        match self {
            JobCategory::Auto => "Automotive",
            JobCategory::Prototype => "Prototype",
            JobCategory::ReplacementPart => "Replacement Part",
            JobCategory::Cosplay => "Cosplay / Props",
            JobCategory::Home => "Home / Decor",
            JobCategory::Industrial => "Industrial",
            JobCategory::Other => "Other",
        }
    }
}

impl FromStr for JobCategory {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(JobCategory::Auto),
            "PROTOTYPE" => Ok(JobCategory::Prototype),
            "REPLACEMENT_PART" => Ok(JobCategory::ReplacementPart),
            "COSPLAY" => Ok(JobCategory::Cosplay),
            "HOME" => Ok(JobCategory::Home),
            "INDUSTRIAL" => Ok(JobCategory::Industrial),
            "OTHER" => Ok(JobCategory::Other),
            _ => Err(UnknownVariant(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

/// Budget bounds in whole dollars; each side is optional and set independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl BudgetRange {
    pub fn label(&self) -> String {
        match (self.min.filter(|v| *v > 0), self.max.filter(|v| *v > 0)) {
            (Some(min), Some(max)) => format!("${min} - ${max}"),
            (Some(min), None) => format!("${min}+"),
            (None, Some(max)) => format!("Up to ${max}"),
            (None, None) => "Flexible".to_string(),
        }
    }
}

/// Reference image attached when the job was posted, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub url: String,
    pub sort_order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub id: JobId,
    pub customer_id: UserId,
    pub title: String,
    pub description: String,
    pub category: Option<JobCategory>,
    pub materials: Vec<String>,
    pub budget: BudgetRange,
    pub deadline: Option<NaiveDate>,
    pub city: String,
    pub status: JobStatus,
    pub accepted_response_id: Option<ResponseId>,
    pub reference_images: Vec<ReferenceImage>,
    pub created_at: DateTime<Utc>,
}

impl JobRequest {
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.customer_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: ResponseId,
    pub job_id: JobId,
    pub provider_user_id: UserId,
    pub provider_profile_id: Option<ProviderProfileId>,
    pub message: String,
    pub estimated_price: Option<u32>,
    pub turnaround_days: Option<u32>,
    pub status: ResponseStatus,
    pub created_at: DateTime<Utc>,
}

/// Side of the engagement the reviewer was on when the review was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewerRole {
    Customer,
    Provider,
}

impl ReviewerRole {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewerRole::Customer => "CUSTOMER",
            ReviewerRole::Provider => "PROVIDER",
        }
    }

    /// The counterpart this role reviews on a job with the given accepted bid.
    pub fn reviewee<'a>(self, job: &'a JobRequest, accepted: &'a JobResponse) -> &'a UserId {
        match self {
            ReviewerRole::Customer => &accepted.provider_user_id,
            ReviewerRole::Provider => &job.customer_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub job_id: JobId,
    pub reviewer_id: UserId,
    pub reviewee_id: UserId,
    pub provider_profile_id: Option<ProviderProfileId>,
    pub reviewer_role: ReviewerRole,
    pub rating: u8,
    pub text: Option<String>,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}
