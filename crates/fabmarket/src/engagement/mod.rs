//! Job engagement lifecycle: posting, bidding, acceptance, completion, reviews, and the
//! per-viewer visibility rules that guard bids and provider contact details.
//!
//! All state lives behind [`EngagementStore`]; the service itself holds no job or response
//! state between calls.

pub mod directory;
pub mod domain;
pub mod lifecycle;
pub mod memory;
pub mod providers;
pub mod responses;
pub mod reviews;
pub mod router;
pub mod service;
pub mod store;
pub mod validation;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use directory::{
    ContactDetails, DirectoryError, DirectorySeed, InMemoryDirectory, ProviderDirectory,
    ProviderProfile, ProviderStatus, PublicUser,
};
pub use domain::{
    BudgetRange, Identity, JobCategory, JobId, JobRequest, JobResponse, JobStatus,
    ProviderProfileId, ReferenceImage, ResponseId, ResponseStatus, Review, ReviewId,
    ReviewerRole, UserId, UserRole,
};
pub use lifecycle::{BrowseParams, JobDetailView, JobSummaryView};
pub use memory::InMemoryEngagementStore;
pub use providers::{ProviderDetailView, ProviderListingView, ProviderSearch};
pub use responses::{AcceptOutcome, AcceptRequest};
pub use reviews::{RatingSummary, ReviewFeed, ReviewFeedEntry, ReviewFeedQuery};
pub use router::{engagement_router, Viewer};
pub use service::{EngagementConfig, EngagementError, EngagementService};
pub use store::{EngagementStore, JobQuery, Mutation, ReviewSubject, StoreError, UnitOfWork};
pub use validation::{BidSubmission, InputViolation, JobPosting, ReviewSubmission};
pub use visibility::{BidDetails, ProviderIdentityView, ResponseView};
