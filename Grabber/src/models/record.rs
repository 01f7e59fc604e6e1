//! Platform-neutral post record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;

/// Normalized metadata for a single post.
///
/// Every field has a default so a record can be built from a sparse source:
/// strings are empty, counts are zero, lists are empty and timestamps absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Platform-specific post identifier
    pub id: String,

    /// Page the record was read from
    pub url: String,

    /// Source platform
    pub platform: Platform,

    pub title: String,

    pub description: String,

    /// Whether the post is a video or a set of images
    pub content_type: ContentType,

    pub author: Author,

    pub counts: Counts,

    pub media: Media,

    pub tags: Vec<String>,

    pub timestamps: Timestamps,
}

impl ExtractionResult {
    /// All downloadable media URLs: video first, then images.
    ///
    /// The cover is only included when there is nothing else to fetch.
    pub fn media_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        if !self.media.video_url.is_empty() {
            urls.push(self.media.video_url.clone());
        }
        urls.extend(self.media.images.iter().filter(|u| !u.is_empty()).cloned());
        if urls.is_empty() && !self.media.cover_url.is_empty() {
            urls.push(self.media.cover_url.clone());
        }
        urls
    }
}

/// Kind of content carried by a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Video,
    #[default]
    ImageSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

/// Engagement counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub collects: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub cover_url: String,
    pub video_url: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}
