//! Engagement core for a local fabrication marketplace: job lifecycle, provider bids, reviews,
//! and viewer-dependent visibility, plus the configuration and telemetry shared by its binaries.

pub mod config;
pub mod engagement;
pub mod error;
pub mod telemetry;

pub use error::AppError;
