//! Per-platform page knowledge.
//!
//! Each platform module knows where its pages keep state, how to find the
//! post inside it, and how to map that post to an [`ExtractionResult`].
//! Pages from unknown sites go through OpenGraph tags.

pub mod douyin;
pub mod tiktok;
pub mod xiaohongshu;

use crate::error::{AppError, Result};
use crate::models::{ExtractionResult, Platform, UserProfile};
use crate::services::normalize::normalize_open_graph;
use crate::services::state::extract_first;
use crate::utils::{get_domain, strip_query};

/// Hosts that only redirect to a post page.
const SHORT_LINK_HOSTS: &[&str] = &["xhslink.com", "v.douyin.com", "vm.tiktok.com", "vt.tiktok.com"];

/// Whether a URL is a share short link that must be resolved first.
pub fn is_short_link(url: &str) -> bool {
    get_domain(url).is_some_and(|host| {
        SHORT_LINK_HOSTS
            .iter()
            .any(|short| host == *short || host.ends_with(&format!(".{short}")))
    })
}

/// Post id embedded in a URL, if the platform uses one.
///
/// Generic pages are identified by their URL without query.
pub fn post_id(platform: Platform, url: &str) -> Option<String> {
    match platform {
        Platform::Xiaohongshu => xiaohongshu::post_id(url),
        Platform::Douyin => douyin::post_id(url),
        Platform::TikTok => tiktok::post_id(url),
        Platform::Generic => Some(strip_query(url)).filter(|u| u.starts_with("http")),
    }
}

/// User id embedded in a profile URL.
pub fn user_id(platform: Platform, url: &str) -> Option<String> {
    match platform {
        Platform::Xiaohongshu => xiaohongshu::user_id(url),
        Platform::Douyin => douyin::user_id(url),
        Platform::TikTok => tiktok::user_id(url),
        Platform::Generic => None,
    }
}

/// Page URL to fetch for a post id.
pub fn canonical_url(platform: Platform, id: &str) -> String {
    match platform {
        Platform::Xiaohongshu => xiaohongshu::canonical_url(id),
        Platform::Douyin => douyin::canonical_url(id),
        Platform::TikTok => tiktok::canonical_url(id),
        Platform::Generic => id.to_string(),
    }
}

/// Referer sent with page and media requests.
pub fn referer(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Xiaohongshu => Some(xiaohongshu::REFERER),
        Platform::Douyin => Some(douyin::REFERER),
        Platform::TikTok => Some(tiktok::REFERER),
        Platform::Generic => None,
    }
}

/// Turn a fetched page into a record.
///
/// `url` is the page address after redirects; it supplies the post id used
/// to pick the right entry when the state holds several posts.
pub fn parse_page(platform: Platform, html: &str, url: &str) -> Result<ExtractionResult> {
    let id = post_id(platform, url);

    let mut record = match platform {
        Platform::Generic => normalize_open_graph(html, url)?,
        Platform::Xiaohongshu => {
            let state = extract_first(html, xiaohongshu::LOCATORS)?;
            xiaohongshu::normalize(xiaohongshu::find_note(&state, id.as_deref())?)
        }
        Platform::Douyin => {
            let state = extract_first(html, douyin::LOCATORS)?;
            douyin::normalize(douyin::find_note(&state, id.as_deref())?)
        }
        Platform::TikTok => {
            let state = extract_first(html, tiktok::LOCATORS)?;
            tiktok::normalize(tiktok::find_note(&state, id.as_deref())?)
        }
    };

    if record.id.is_empty() {
        record.id = id.unwrap_or_default();
    }
    if platform != Platform::Generic || record.url.is_empty() {
        record.url = strip_query(url);
    }
    log::debug!("Parsed {} post {} from {}", platform, record.id, url);
    Ok(record)
}

/// Turn a fetched profile page into a profile.
pub fn parse_profile(platform: Platform, html: &str, url: &str) -> Result<UserProfile> {
    let mut profile = match platform {
        Platform::Xiaohongshu => {
            xiaohongshu::normalize_user(&extract_first(html, xiaohongshu::LOCATORS)?)?
        }
        Platform::Douyin => douyin::normalize_user(&extract_first(html, douyin::LOCATORS)?)?,
        Platform::TikTok => tiktok::normalize_user(&extract_first(html, tiktok::LOCATORS)?)?,
        Platform::Generic => {
            return Err(AppError::unsupported(format!("no user profiles on {url}")));
        }
    };

    if profile.id.is_empty() {
        profile.id = user_id(platform, url).unwrap_or_default();
    }
    profile.url = strip_query(url);
    log::debug!("Parsed {} user {} from {}", platform, profile.id, url);
    Ok(profile)
}
