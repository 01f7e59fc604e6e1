//! Platform-neutral user profile.

use serde::{Deserialize, Serialize};

use super::Platform;

/// Public profile of a creator, read from their profile page.
///
/// Like [`super::ExtractionResult`], every field defaults when the source
/// omits it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Platform-specific user identifier (Douyin `sec_uid`, TikTok handle)
    pub id: String,

    /// Page the profile was read from
    pub url: String,

    pub platform: Platform,

    /// Display name
    pub name: String,

    /// Public handle (Xiaohongshu red id, Douyin unique id, TikTok unique id)
    pub handle: String,

    pub bio: String,

    pub avatar_url: String,

    pub counts: ProfileCounts,

    /// Post ids listed on the profile page, in page order
    pub note_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCounts {
    pub follows: u64,
    pub fans: u64,
    /// Likes received (Xiaohongshu counts likes and collects together)
    pub likes: u64,
    /// Posts published, when the page reports it
    pub posts: u64,
}
