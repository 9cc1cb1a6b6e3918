use chrono::{DateTime, Utc};
use serde::Serialize;

use super::directory::{ContactDetails, ProviderProfile, PublicUser};
use super::domain::{
    Identity, JobId, JobRequest, JobResponse, ProviderProfileId, ResponseId, ResponseStatus,
    UserId,
};

/// Public identity of the provider behind a bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderIdentityView {
    pub user_id: UserId,
    pub name: Option<String>,
    pub image: Option<String>,
    pub profile_slug: Option<String>,
    pub display_name: Option<String>,
}

impl ProviderIdentityView {
    pub fn anonymous(user_id: UserId) -> Self {
        Self {
            user_id,
            name: None,
            image: None,
            profile_slug: None,
            display_name: None,
        }
    }

    pub fn from_parts(
        user_id: UserId,
        user: Option<&PublicUser>,
        profile: Option<&ProviderProfile>,
    ) -> Self {
        Self {
            name: user.and_then(|user| user.name.clone()),
            image: user.and_then(|user| user.image.clone()),
            profile_slug: profile.map(|profile| profile.slug.clone()),
            display_name: profile.map(|profile| profile.display_name.clone()),
            user_id,
        }
    }
}

/// The parts of a bid only its author and the job owner may read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidDetails {
    pub provider_profile_id: Option<ProviderProfileId>,
    pub message: String,
    pub estimated_price: Option<u32>,
    pub turnaround_days: Option<u32>,
}

/// A response as rendered for one particular viewer.
///
/// The stripped variant keeps identifier, provider, status and timestamp and omits the bid
/// fields entirely rather than nulling them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseView {
    pub id: ResponseId,
    pub job_id: JobId,
    pub provider: ProviderIdentityView,
    pub status: ResponseStatus,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub bid: Option<BidDetails>,
}

impl ResponseView {
    pub fn is_stripped(&self) -> bool {
        self.bid.is_none()
    }
}

/// Whether `viewer` may read the message, price and turnaround of `response`.
pub fn can_view_bid(job: &JobRequest, response: &JobResponse, viewer: Option<&Identity>) -> bool {
    match viewer {
        Some(identity) => {
            job.is_owned_by(&identity.user_id) || response.provider_user_id == identity.user_id
        }
        None => false,
    }
}

/// Projects every response of `job` for `viewer`, deciding bid visibility per response.
///
/// `provider_of` resolves the public identity for a response; the projection itself is pure.
pub fn project_responses<F>(
    job: &JobRequest,
    responses: &[JobResponse],
    viewer: Option<&Identity>,
    mut provider_of: F,
) -> Vec<ResponseView>
where
    F: FnMut(&JobResponse) -> ProviderIdentityView,
{
    responses
        .iter()
        .map(|response| {
            let bid = can_view_bid(job, response, viewer).then(|| BidDetails {
                provider_profile_id: response.provider_profile_id.clone(),
                message: response.message.clone(),
                estimated_price: response.estimated_price,
                turnaround_days: response.turnaround_days,
            });
            ResponseView {
                id: response.id.clone(),
                job_id: response.job_id.clone(),
                provider: provider_of(response),
                status: response.status,
                created_at: response.created_at,
                bid,
            }
        })
        .collect()
}

/// Contact fields are released to any authenticated viewer, whatever their role.
pub fn gate_contact(contact: &ContactDetails, viewer: Option<&Identity>) -> Option<ContactDetails> {
    viewer.map(|_| contact.clone())
}
