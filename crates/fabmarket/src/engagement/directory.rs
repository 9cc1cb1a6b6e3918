use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ProviderProfileId, UserId};

/// Public identity of a marketplace user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: UserId,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Approval state owned by the external profile store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderStatus {
    Pending,
    Approved,
    Rejected,
}

/// Contact fields soft-gated behind authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub website_url: Option<String>,
    pub instagram_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: ProviderProfileId,
    pub user_id: UserId,
    pub slug: String,
    pub display_name: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub city: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub processes: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub contact: ContactDetails,
    pub status: ProviderStatus,
    pub created_at: DateTime<Utc>,
}

impl ProviderProfile {
    pub fn is_public(&self) -> bool {
        self.status == ProviderStatus::Approved
    }
}

/// Read-only view of users and provider profiles maintained outside the engagement core.
pub trait ProviderDirectory: Send + Sync {
    fn user(&self, id: &UserId) -> Result<Option<PublicUser>, DirectoryError>;
    fn provider_for_user(&self, id: &UserId) -> Result<Option<ProviderProfile>, DirectoryError>;
    fn provider_by_slug(&self, slug: &str) -> Result<Option<ProviderProfile>, DirectoryError>;
    /// Profiles in the given status, newest first.
    fn providers(&self, status: ProviderStatus) -> Result<Vec<ProviderProfile>, DirectoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Snapshot format accepted by [`InMemoryDirectory::from_seed`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub users: Vec<PublicUser>,
    #[serde(default)]
    pub providers: Vec<ProviderProfile>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<UserId, PublicUser>,
    providers: Vec<ProviderProfile>,
}

/// Directory adapter backed by process memory, optionally seeded from JSON.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Result<Self, DirectoryError> {
        let directory = Self::new();
        for user in seed.users {
            directory.insert_user(user)?;
        }
        for provider in seed.providers {
            directory.insert_provider(provider)?;
        }
        Ok(directory)
    }

    pub fn insert_user(&self, user: PublicUser) -> Result<(), DirectoryError> {
        let mut state = self.write()?;
        state.users.insert(user.id.clone(), user);
        Ok(())
    }

    /// Adds or replaces the profile owned by `provider.user_id`.
    pub fn insert_provider(&self, provider: ProviderProfile) -> Result<(), DirectoryError> {
        let mut state = self.write()?;
        state
            .providers
            .retain(|existing| existing.user_id != provider.user_id);
        state.providers.push(provider);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DirectoryState>, DirectoryError> {
        self.state
            .read()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DirectoryState>, DirectoryError> {
        self.state
            .write()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))
    }
}

impl ProviderDirectory for InMemoryDirectory {
    fn user(&self, id: &UserId) -> Result<Option<PublicUser>, DirectoryError> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn provider_for_user(&self, id: &UserId) -> Result<Option<ProviderProfile>, DirectoryError> {
        Ok(self
            .read()?
            .providers
            .iter()
            .find(|provider| &provider.user_id == id)
            .cloned())
    }

    fn provider_by_slug(&self, slug: &str) -> Result<Option<ProviderProfile>, DirectoryError> {
        Ok(self
            .read()?
            .providers
            .iter()
            .find(|provider| provider.slug == slug)
            .cloned())
    }

    fn providers(&self, status: ProviderStatus) -> Result<Vec<ProviderProfile>, DirectoryError> {
        let mut providers: Vec<ProviderProfile> = self
            .read()?
            .providers
            .iter()
            .filter(|provider| provider.status == status)
            .cloned()
            .collect();
        providers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(providers)
    }
}
