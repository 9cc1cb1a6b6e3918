use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::directory::{ContactDetails, ProviderDirectory, ProviderProfile, ProviderStatus};
use super::domain::{Identity, ProviderProfileId};
use super::reviews::RatingSummary;
use super::service::{EngagementError, EngagementService};
use super::store::{EngagementStore, ReviewSubject};
use super::visibility::gate_contact;

/// Query-string filters for the public provider listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderSearch {
    pub search: Option<String>,
    /// Comma-separated; a provider matches when it offers any listed value.
    pub materials: Option<String>,
    pub processes: Option<String>,
    pub capabilities: Option<String>,
    /// `1` or `true` keeps only geolocated providers.
    pub map_mode: Option<String>,
}

impl ProviderSearch {
    fn map_mode(&self) -> bool {
        matches!(
            self.map_mode.as_deref().map(str::trim),
            Some("1") | Some("true")
        )
    }

    fn matches(&self, profile: &ProviderProfile) -> bool {
        if self.map_mode() && (profile.lat.is_none() || profile.lng.is_none()) {
            return false;
        }

        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let hit = profile.display_name.to_lowercase().contains(&term)
                || profile
                    .headline
                    .as_deref()
                    .map_or(false, |headline| headline.to_lowercase().contains(&term))
                || profile.city.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }

        any_listed(self.materials.as_deref(), &profile.materials)
            && any_listed(self.processes.as_deref(), &profile.processes)
            && any_listed(self.capabilities.as_deref(), &profile.capabilities)
    }
}

fn any_listed(filter: Option<&str>, offered: &[String]) -> bool {
    let wanted: Vec<&str> = filter
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();
    wanted.is_empty()
        || wanted
            .iter()
            .any(|value| offered.iter().any(|offer| offer == value))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderListingView {
    pub id: ProviderProfileId,
    pub slug: String,
    pub display_name: String,
    pub headline: Option<String>,
    pub city: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub materials: Vec<String>,
    pub processes: Vec<String>,
    pub capabilities: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub avg_rating: f64,
    pub review_count: usize,
    /// Present, with every key, only for authenticated viewers.
    #[serde(flatten)]
    pub contact: Option<ContactDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDetailView {
    #[serde(flatten)]
    pub listing: ProviderListingView,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl<S, D> EngagementService<S, D>
where
    S: EngagementStore + 'static,
    D: ProviderDirectory + 'static,
{
    /// Approved providers matching `search`, newest first.
    pub fn list_providers(
        &self,
        viewer: Option<&Identity>,
        search: &ProviderSearch,
    ) -> Result<Vec<ProviderListingView>, EngagementError> {
        self.directory
            .providers(ProviderStatus::Approved)?
            .into_iter()
            .filter(|profile| search.matches(profile))
            .map(|profile| self.listing_view(profile, viewer))
            .collect()
    }

    /// A single approved provider by slug.
    pub fn provider_detail(
        &self,
        viewer: Option<&Identity>,
        slug: &str,
    ) -> Result<ProviderDetailView, EngagementError> {
        let profile = self
            .directory
            .provider_by_slug(slug)?
            .filter(ProviderProfile::is_public)
            .ok_or_else(|| EngagementError::NotFound("provider not found".to_string()))?;

        let bio = profile.bio.clone();
        let created_at = profile.created_at;
        Ok(ProviderDetailView {
            listing: self.listing_view(profile, viewer)?,
            bio,
            created_at,
        })
    }

    fn listing_view(
        &self,
        profile: ProviderProfile,
        viewer: Option<&Identity>,
    ) -> Result<ProviderListingView, EngagementError> {
        let ratings = self
            .store
            .reviews_for(&ReviewSubject::Provider(profile.id.clone()), false)?;
        let summary = RatingSummary::from_ratings(ratings.iter().map(|review| review.rating));

        Ok(ProviderListingView {
            contact: gate_contact(&profile.contact, viewer),
            id: profile.id,
            slug: profile.slug,
            display_name: profile.display_name,
            headline: profile.headline,
            city: profile.city,
            lat: profile.lat,
            lng: profile.lng,
            materials: profile.materials,
            processes: profile.processes,
            capabilities: profile.capabilities,
            thumbnail_url: profile.thumbnail_url,
            avg_rating: summary.avg_rating,
            review_count: summary.count,
        })
    }
}
