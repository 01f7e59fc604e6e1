//! Field normalization helpers.
//!
//! Every lookup takes a JSON pointer into the source structure and falls back
//! to an empty/zero value when the path is absent or has the wrong type.
//! Platform normalizers in [`crate::platforms`] are built from these.

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Author, ContentType, Counts, ExtractionResult, Media, Platform, Timestamps};
use crate::utils::{extract_hashtags, parse_count, path_segments, resolve, strip_query};

/// Unit of an epoch timestamp in the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochUnit {
    Seconds,
    Millis,
}

/// String at `pointer`; numbers are stringified, anything else is `""`.
pub fn str_at(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// First non-empty string among several candidate paths.
pub fn first_str(value: &Value, pointers: &[&str]) -> String {
    pointers
        .iter()
        .map(|p| str_at(value, p))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Counter at the first present path, parsed leniently.
pub fn count_at(value: &Value, pointers: &[&str]) -> u64 {
    pointers
        .iter()
        .find_map(|p| value.pointer(p).filter(|v| !v.is_null()))
        .map(parse_count)
        .unwrap_or(0)
}

/// Array at `pointer`, or an empty slice.
pub fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// For each item of the array at `array`, the first non-empty string among
/// `item_pointers`. Items with no value are skipped.
pub fn strings_at(value: &Value, array: &str, item_pointers: &[&str]) -> Vec<String> {
    array_at(value, array)
        .iter()
        .map(|item| first_str(item, item_pointers))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Epoch timestamp at `pointer`, given as a number or numeric string.
pub fn epoch_at(value: &Value, pointer: &str, unit: EpochUnit) -> Option<DateTime<Utc>> {
    let raw = match value.pointer(pointer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if raw <= 0 {
        return None;
    }
    match unit {
        EpochUnit::Seconds => DateTime::from_timestamp(raw, 0),
        EpochUnit::Millis => DateTime::from_timestamp_millis(raw),
    }
}

/// Hashtags from the title and description when the source has no tag list.
pub fn tags_or_hashtags(tags: Vec<String>, title: &str, description: &str) -> Vec<String> {
    if !tags.is_empty() {
        return tags;
    }
    extract_hashtags(&format!("{title} {description}"))
}

/// Normalize a yt-dlp style info dictionary.
///
/// Used for generic video sites whose metadata comes from an external
/// extractor rather than from page state.
pub fn normalize_info_dict(info: &Value) -> ExtractionResult {
    let title = str_at(info, "/title");
    let description = str_at(info, "/description");

    let mut video_url = str_at(info, "/url");
    if video_url.is_empty() {
        if let Some(last) = array_at(info, "/formats").last() {
            video_url = str_at(last, "/url");
        }
    }

    let tags = array_at(info, "/tags")
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    let created = epoch_at(info, "/timestamp", EpochUnit::Seconds)
        .or_else(|| epoch_at(info, "/epoch", EpochUnit::Seconds));

    ExtractionResult {
        id: str_at(info, "/id"),
        url: first_str(info, &["/webpage_url", "/original_url"]),
        platform: Platform::Generic,
        tags: tags_or_hashtags(tags, &title, &description),
        title,
        description,
        content_type: ContentType::Video,
        author: Author {
            id: first_str(info, &["/uploader_id", "/channel_id"]),
            name: first_str(info, &["/uploader", "/channel"]),
        },
        counts: Counts {
            likes: count_at(info, &["/like_count"]),
            comments: count_at(info, &["/comment_count"]),
            shares: count_at(info, &["/repost_count"]),
            collects: 0,
        },
        media: Media {
            cover_url: str_at(info, "/thumbnail"),
            video_url,
            images: Vec::new(),
        },
        timestamps: Timestamps {
            created,
            updated: created,
        },
    }
}

/// Normalize a page from its OpenGraph `<meta>` tags.
///
/// Fails with `NotFound` when the page has neither a title nor any media.
pub fn normalize_open_graph(html: &str, url: &str) -> Result<ExtractionResult> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("meta[content]")
        .map_err(|e| AppError::parse("meta", format!("{e:?}")))?;

    let mut og = std::collections::HashMap::new();
    let mut images = Vec::new();
    for element in document.select(&selector) {
        let meta = element.value();
        let Some(key) = meta.attr("property").or_else(|| meta.attr("name")) else {
            continue;
        };
        let content = meta.attr("content").unwrap_or("").trim().to_string();
        if content.is_empty() {
            continue;
        }
        let key = key.to_lowercase();
        if key == "og:image" {
            images.push(resolve(url, &content).unwrap_or(content.clone()));
        }
        og.entry(key).or_insert(content);
    }

    let get = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| og.get(*k).cloned())
            .unwrap_or_default()
    };

    let title = get(&["og:title", "twitter:title"]);
    let description = get(&["og:description", "twitter:description", "description"]);
    let video = get(&["og:video:secure_url", "og:video:url", "og:video"]);
    let video_url = if video.is_empty() {
        video
    } else {
        resolve(url, &video).unwrap_or(video)
    };

    if title.is_empty() && images.is_empty() && video_url.is_empty() {
        return Err(AppError::not_found(format!("no OpenGraph metadata at {url}")));
    }

    let page_url = {
        let og_url = get(&["og:url"]);
        if og_url.is_empty() { strip_query(url) } else { og_url }
    };
    let is_video = !video_url.is_empty() || get(&["og:type"]).starts_with("video");

    Ok(ExtractionResult {
        id: path_segments(&page_url).pop().unwrap_or_default(),
        url: page_url,
        platform: Platform::Generic,
        tags: tags_or_hashtags(Vec::new(), &title, &description),
        title,
        description,
        content_type: if is_video {
            ContentType::Video
        } else {
            ContentType::ImageSet
        },
        author: Author {
            id: String::new(),
            name: get(&["og:site_name", "author"]),
        },
        counts: Counts::default(),
        media: Media {
            cover_url: images.first().cloned().unwrap_or_default(),
            video_url,
            images: if is_video { Vec::new() } else { images },
        },
        timestamps: Timestamps::default(),
    })
}
