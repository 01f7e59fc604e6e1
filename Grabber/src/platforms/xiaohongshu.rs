//! Xiaohongshu (Red Note) notes.
//!
//! Note pages assign the whole store to `window.__INITIAL_STATE__`; the note
//! lives under `note.noteDetailMap.<noteId>.note`. Profile pages use the same
//! store with the user under `user.userPageData` and their notes in
//! `user.notes[0]`.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    Author, ContentType, Counts, ExtractionResult, Media, Platform, ProfileCounts, Timestamps,
    UserProfile,
};
use crate::services::normalize::{
    EpochUnit, array_at, count_at, epoch_at, first_str, str_at, strings_at, tags_or_hashtags,
};
use crate::services::state::StateLocator;
use crate::utils::{path_segments, strip_query};

pub const LOCATORS: &[StateLocator] = &[StateLocator::Assignment {
    variable: "window.__INITIAL_STATE__",
}];

pub const REFERER: &str = "https://www.xiaohongshu.com/";

const VIDEO_CDN: &str = "https://sns-video-bd.xhscdn.com";
const IMAGE_FORMAT: &str = "?imageView2/format/png";

/// Note id from `/explore/<id>`, `/discovery/item/<id>` or
/// `/user/profile/<uid>/<id>`.
pub fn post_id(url: &str) -> Option<String> {
    let segments = path_segments(url);
    let after = |marker: &str| {
        segments
            .iter()
            .position(|s| s == marker)
            .and_then(|i| segments.get(i + 1))
            .cloned()
    };

    after("explore")
        .or_else(|| after("item"))
        .or_else(|| match segments.as_slice() {
            [user, profile, _, id] if user == "user" && profile == "profile" => Some(id.clone()),
            _ => None,
        })
        .filter(|id| is_hex_id(id))
}

/// User id from `/user/profile/<uid>`.
pub fn user_id(url: &str) -> Option<String> {
    match path_segments(url).as_slice() {
        [user, profile, id, ..] if user == "user" && profile == "profile" => Some(id.clone()),
        _ => None,
    }
    .filter(|id| is_hex_id(id))
}

/// Note and user ids are both 24-char object ids.
fn is_hex_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn canonical_url(id: &str) -> String {
    format!("https://www.xiaohongshu.com/explore/{id}")
}

/// The note object inside the page store.
///
/// With an `id`, only the entry keyed by it is accepted. Without one, the
/// first entry that carries a note. Placeholder entries (empty `note`) are
/// skipped.
pub fn find_note<'a>(state: &'a Value, id: Option<&str>) -> Result<&'a Value> {
    let map = state
        .pointer("/note/noteDetailMap")
        .or_else(|| state.pointer("/noteDetailMap"))
        .and_then(Value::as_object)
        .ok_or_else(|| AppError::not_found("noteDetailMap missing from page state"))?;

    let has_note = |entry: &&Value| {
        entry
            .get("note")
            .and_then(Value::as_object)
            .is_some_and(|note| !note.is_empty())
    };

    let entry = match id {
        Some(id) => map.get(id).filter(has_note),
        None => map.values().find(has_note),
    };
    entry
        .and_then(|entry| entry.get("note"))
        .ok_or_else(|| {
            AppError::not_found(format!(
                "note {} not in page state",
                id.unwrap_or("<any>")
            ))
        })
}

/// Map a note object into a record. Missing fields take defaults.
pub fn normalize(note: &Value) -> ExtractionResult {
    let title = str_at(note, "/title");
    let description = str_at(note, "/desc");

    let images: Vec<String> = strings_at(note, "/imageList", &["/urlDefault", "/url"])
        .iter()
        .map(|url| format!("{}{IMAGE_FORMAT}", strip_query(url)))
        .collect();

    let video_key = first_str(
        note,
        &["/video/consumer/originVideoKey", "/consumer/originVideoKey"],
    );
    let video_url = if video_key.is_empty() {
        first_str(
            note,
            &[
                "/video/media/stream/h264/0/masterUrl",
                "/video/media/stream/h265/0/masterUrl",
            ],
        )
    } else {
        format!("{VIDEO_CDN}/{video_key}")
    };

    let content_type = if str_at(note, "/type") == "video" {
        ContentType::Video
    } else {
        ContentType::ImageSet
    };
    let tags = strings_at(note, "/tagList", &["/name"]);

    ExtractionResult {
        id: first_str(note, &["/noteId", "/id"]),
        url: String::new(),
        platform: Platform::Xiaohongshu,
        tags: tags_or_hashtags(tags, &title, &description),
        title,
        description,
        content_type,
        author: Author {
            id: str_at(note, "/user/userId"),
            name: first_str(note, &["/user/nickname", "/user/nickName"]),
        },
        counts: Counts {
            likes: count_at(note, &["/interactInfo/likedCount"]),
            comments: count_at(note, &["/interactInfo/commentCount"]),
            shares: count_at(note, &["/interactInfo/shareCount"]),
            collects: count_at(note, &["/interactInfo/collectedCount"]),
        },
        media: Media {
            cover_url: images.first().cloned().unwrap_or_default(),
            video_url,
            images,
        },
        timestamps: Timestamps {
            created: epoch_at(note, "/time", EpochUnit::Millis),
            updated: epoch_at(note, "/lastUpdateTime", EpochUnit::Millis),
        },
    }
}

/// Map a profile page store into a profile.
pub fn normalize_user(state: &Value) -> Result<UserProfile> {
    let page = state
        .pointer("/user/userPageData")
        .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or_else(|| AppError::not_found("userPageData missing from page state"))?;

    let interaction = |kind: &str| {
        array_at(page, "/interactions")
            .iter()
            .find(|item| str_at(item, "/type") == kind)
            .map(|item| count_at(item, &["/count"]))
            .unwrap_or(0)
    };
    let note_ids = strings_at(state, "/user/notes/0", &["/noteCard/noteId", "/id"]);

    Ok(UserProfile {
        id: first_str(page, &["/basicInfo/userId", "/userId"]),
        url: String::new(),
        platform: Platform::Xiaohongshu,
        name: str_at(page, "/basicInfo/nickname"),
        handle: str_at(page, "/basicInfo/redId"),
        bio: str_at(page, "/basicInfo/desc"),
        avatar_url: first_str(page, &["/basicInfo/images", "/basicInfo/imageb"]),
        counts: ProfileCounts {
            follows: interaction("follows"),
            fans: interaction("fans"),
            likes: interaction("interaction"),
            posts: note_ids.len() as u64,
        },
        note_ids,
    })
}
