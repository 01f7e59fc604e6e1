// src/models/mod.rs

//! Domain models for the grabber.

mod config;
mod platform;
mod profile;
mod record;
mod response;

// Re-export all public types
pub use config::{Config, DownloadConfig, FetchConfig};
pub use platform::Platform;
pub use profile::{ProfileCounts, UserProfile};
pub use record::{Author, ContentType, Counts, ExtractionResult, Media, Timestamps};
pub use response::{BatchOutcome, ServiceResponse};
