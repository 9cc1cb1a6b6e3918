use chrono::Utc;
use fabmarket::engagement::{
    ContactDetails, DirectorySeed, InMemoryDirectory, ProviderProfile, ProviderProfileId,
    ProviderStatus, PublicUser, UserId,
};
use fabmarket::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Builds the provider directory, hydrating it from a JSON snapshot when one is configured.
pub(crate) fn load_directory(seed: Option<&Path>) -> Result<InMemoryDirectory, AppError> {
    let Some(path) = seed else {
        return Ok(InMemoryDirectory::new());
    };
    let raw = std::fs::read_to_string(path)?;
    let seed: DirectorySeed = serde_json::from_str(&raw).map_err(|source| AppError::Seed {
        path: path.to_path_buf(),
        source,
    })?;
    let (users, providers) = (seed.users.len(), seed.providers.len());
    let directory = InMemoryDirectory::from_seed(seed)?;
    info!(path = %path.display(), users, providers, "provider directory seeded");
    Ok(directory)
}

/// Small built-in cast used by the CLI demo when no snapshot is supplied.
pub(crate) fn sample_seed() -> DirectorySeed {
    let users = [
        ("usr-casey", "Casey Customer"),
        ("usr-avery", "Avery"),
        ("usr-bo", "Bo"),
    ]
    .into_iter()
    .map(|(id, name)| PublicUser {
        id: UserId::from(id),
        name: Some(name.to_string()),
        image: None,
    })
    .collect();

    let providers = [
        ("usr-avery", "avery-prints", "Avery Prints", "FDM"),
        ("usr-bo", "bo-resin-lab", "Bo's Resin Lab", "SLA"),
    ]
    .into_iter()
    .map(|(user, slug, display_name, process)| ProviderProfile {
        id: ProviderProfileId(format!("prv-{slug}")),
        user_id: UserId::from(user),
        slug: slug.to_string(),
        display_name: display_name.to_string(),
        headline: Some(format!("{process} printing in Charlotte")),
        bio: None,
        city: "Charlotte".to_string(),
        lat: None,
        lng: None,
        materials: vec!["PLA".to_string(), "PETG".to_string()],
        processes: vec![process.to_string()],
        capabilities: Vec::new(),
        thumbnail_url: None,
        contact: ContactDetails {
            contact_email: Some(format!("hello@{slug}.example.com")),
            ..ContactDetails::default()
        },
        status: ProviderStatus::Approved,
        created_at: Utc::now(),
    })
    .collect();

    DirectorySeed { users, providers }
}
