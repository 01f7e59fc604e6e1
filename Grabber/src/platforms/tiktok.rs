//! TikTok videos and photo posts.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    Author, ContentType, Counts, ExtractionResult, Media, Platform, ProfileCounts, Timestamps,
    UserProfile,
};
use crate::services::normalize::{
    EpochUnit, count_at, epoch_at, first_str, str_at, strings_at, tags_or_hashtags,
};
use crate::services::state::StateLocator;
use crate::utils::path_segments;

pub const LOCATORS: &[StateLocator] = &[
    StateLocator::ScriptId {
        id: "__UNIVERSAL_DATA_FOR_REHYDRATION__",
        url_encoded: false,
    },
    StateLocator::ScriptId {
        id: "SIGI_STATE",
        url_encoded: false,
    },
];

pub const REFERER: &str = "https://www.tiktok.com/";

const ITEM_STRUCT: &str = "/__DEFAULT_SCOPE__/webapp.video-detail/itemInfo/itemStruct";
const STATUS_CODE: &str = "/__DEFAULT_SCOPE__/webapp.video-detail/statusCode";
const USER_INFO: &str = "/__DEFAULT_SCOPE__/webapp.user-detail/userInfo";

/// Item id from `/@user/video/<id>` or `/@user/photo/<id>`.
pub fn post_id(url: &str) -> Option<String> {
    path_segments(url)
        .windows(2)
        .find(|pair| matches!(pair[0].as_str(), "video" | "photo" | "v"))
        .map(|pair| pair[1].trim_end_matches(".html").to_string())
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
}

/// Handle from a profile URL `/@<handle>`.
pub fn user_id(url: &str) -> Option<String> {
    match path_segments(url).as_slice() {
        [handle] => handle.strip_prefix('@').map(str::to_string),
        _ => None,
    }
    .filter(|handle| !handle.is_empty())
}

/// TikTok redirects `/@/video/<id>` to the author's canonical path.
pub fn canonical_url(id: &str) -> String {
    format!("https://www.tiktok.com/@/video/{id}")
}

/// The item struct from either the rehydration blob or the older SIGI store.
pub fn find_note<'a>(state: &'a Value, id: Option<&str>) -> Result<&'a Value> {
    let status = count_at(state, &[STATUS_CODE]);
    if status != 0 {
        return Err(AppError::not_found(format!(
            "item {} unavailable (status {status})",
            id.unwrap_or("<any>")
        )));
    }

    let matches_id = |item: &&Value| {
        let item_id = str_at(item, "/id");
        id.is_none_or(|id| item_id.is_empty() || item_id == id)
    };
    let from_sigi = || {
        let items = state.get("ItemModule")?.as_object()?;
        match id {
            Some(id) => items.get(id),
            None => items.values().next(),
        }
    };

    state
        .pointer(ITEM_STRUCT)
        .filter(matches_id)
        .or_else(from_sigi)
        .filter(|item| item.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or_else(|| {
            AppError::not_found(format!(
                "item {} not in page state",
                id.unwrap_or("<any>")
            ))
        })
}

/// Map an item struct into a record. Missing fields take defaults.
pub fn normalize(item: &Value) -> ExtractionResult {
    let description = str_at(item, "/desc");
    let images = strings_at(item, "/imagePost/images", &["/imageURL/urlList/0"]);
    let content_type = if images.is_empty() {
        ContentType::Video
    } else {
        ContentType::ImageSet
    };

    let tags: Vec<String> = strings_at(item, "/challenges", &["/title"])
        .into_iter()
        .chain(strings_at(item, "/textExtra", &["/hashtagName"]))
        .fold(Vec::new(), |mut acc, tag| {
            if !acc.contains(&tag) {
                acc.push(tag);
            }
            acc
        });

    let count = |name: &str| {
        let stats = format!("/stats/{name}");
        let stats_v2 = format!("/statsV2/{name}");
        count_at(item, &[stats.as_str(), stats_v2.as_str()])
    };

    ExtractionResult {
        id: str_at(item, "/id"),
        url: String::new(),
        platform: Platform::TikTok,
        tags: tags_or_hashtags(tags, "", &description),
        title: description.clone(),
        description,
        content_type,
        author: Author {
            id: first_str(item, &["/author/id", "/authorId"]),
            name: first_str(item, &["/author/nickname", "/nickname"]),
        },
        counts: Counts {
            likes: count("diggCount"),
            comments: count("commentCount"),
            shares: count("shareCount"),
            collects: count("collectCount"),
        },
        media: Media {
            cover_url: first_str(item, &["/video/cover", "/video/originCover"]),
            video_url: if content_type == ContentType::Video {
                first_str(item, &["/video/playAddr", "/video/downloadAddr"])
            } else {
                String::new()
            },
            images,
        },
        timestamps: Timestamps {
            created: epoch_at(item, "/createTime", EpochUnit::Seconds),
            updated: None,
        },
    }
}

/// Map a profile page state into a profile.
///
/// Reads `webapp.user-detail` from the rehydration blob, or the `UserModule`
/// of the older SIGI store.
pub fn normalize_user(state: &Value) -> Result<UserProfile> {
    let (user, stats) = match state.pointer(USER_INFO) {
        Some(info) => (info.get("user"), info.get("stats")),
        None => {
            let users = state.pointer("/UserModule/users").and_then(Value::as_object);
            let first = users.and_then(|users| users.iter().next());
            let stats = first.and_then(|(handle, _)| {
                state.pointer("/UserModule/stats")?.get(handle.as_str())
            });
            (first.map(|(_, user)| user), stats)
        }
    };
    let user = user
        .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or_else(|| AppError::not_found("user detail missing from page state"))?;
    let null = Value::Null;
    let stats = stats.unwrap_or(&null);

    Ok(UserProfile {
        id: str_at(user, "/id"),
        url: String::new(),
        platform: Platform::TikTok,
        name: str_at(user, "/nickname"),
        handle: str_at(user, "/uniqueId"),
        bio: str_at(user, "/signature"),
        avatar_url: first_str(user, &["/avatarLarger", "/avatarMedium", "/avatarThumb"]),
        counts: ProfileCounts {
            follows: count_at(stats, &["/followingCount"]),
            fans: count_at(stats, &["/followerCount"]),
            likes: count_at(stats, &["/heartCount", "/heart"]),
            posts: count_at(stats, &["/videoCount"]),
        },
        note_ids: Vec::new(),
    })
}
