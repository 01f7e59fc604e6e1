//! Service layer for the grabber.
//!
//! This module contains the business logic for:
//! - Embedded-state extraction (`state`)
//! - Field normalization helpers (`normalize`)
//! - Media downloading (`MediaDownloader`)
//! - Platform clients (`PlatformClient`, `WebClient`)

mod client;
mod download;
pub mod normalize;
pub mod state;

pub use client::{PlatformClient, WebClient};
pub use download::{HttpMediaSource, MediaDownloader, MediaSource, content_filename};
pub use state::{StateLocator, extract_first, extract_state};
