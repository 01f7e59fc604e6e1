//! Douyin videos and image posts.
//!
//! Share pages (`iesdouyin.com/share/video/<id>`) carry `window._ROUTER_DATA`
//! with the aweme under `loaderData.<route>.videoInfoRes.item_list[0]`. The
//! web app instead ships a percent-encoded `RENDER_DATA` script where the
//! aweme sits at `<route>.aweme.detail` with camel-cased keys. Profile pages
//! follow the same split: `user_info` on share pages, `<route>.user.user`
//! in `RENDER_DATA`.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    Author, ContentType, Counts, ExtractionResult, Media, Platform, ProfileCounts, Timestamps,
    UserProfile,
};
use crate::services::normalize::{
    EpochUnit, count_at, epoch_at, first_str, strings_at, tags_or_hashtags,
};
use crate::services::state::StateLocator;
use crate::utils::{path_segments, query_param};

pub const LOCATORS: &[StateLocator] = &[
    StateLocator::Assignment {
        variable: "window._ROUTER_DATA",
    },
    StateLocator::ScriptId {
        id: "RENDER_DATA",
        url_encoded: true,
    },
];

pub const REFERER: &str = "https://www.douyin.com/";

/// Aweme id from `/video/<id>`, `/note/<id>`, `/share/video/<id>` or the
/// `modal_id` query parameter.
pub fn post_id(url: &str) -> Option<String> {
    if let Some(id) = query_param(url, "modal_id") {
        return Some(id).filter(|id| is_aweme_id(id));
    }

    let segments = path_segments(url);
    segments
        .windows(2)
        .find(|pair| matches!(pair[0].as_str(), "video" | "note" | "slides"))
        .map(|pair| pair[1].clone())
        .filter(|id| is_aweme_id(id))
}

fn is_aweme_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

/// `sec_uid` from `/user/<sec_uid>` or `/share/user/<sec_uid>`.
pub fn user_id(url: &str) -> Option<String> {
    path_segments(url)
        .windows(2)
        .find(|pair| pair[0] == "user")
        .map(|pair| pair[1].clone())
        .filter(|id| !id.is_empty() && id != "self")
}

/// Share pages render state without request signing.
pub fn canonical_url(id: &str) -> String {
    format!("https://www.iesdouyin.com/share/video/{id}/")
}

/// The aweme object in either state layout.
///
/// An aweme whose id differs from the requested `id` is never returned.
pub fn find_note<'a>(state: &'a Value, id: Option<&str>) -> Result<&'a Value> {
    let routes = state
        .get("loaderData")
        .and_then(Value::as_object)
        .into_iter()
        .chain(state.as_object())
        .flat_map(|map| map.values());

    for route in routes {
        let aweme = route
            .pointer("/videoInfoRes/item_list/0")
            .or_else(|| route.pointer("/aweme/detail"))
            .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()));
        let Some(aweme) = aweme else {
            continue;
        };
        let aweme_id = first_str(aweme, &["/aweme_id", "/awemeId"]);
        if id.is_none_or(|id| aweme_id.is_empty() || aweme_id == id) {
            return Ok(aweme);
        }
        log::debug!("Skipping aweme {} while looking for {:?}", aweme_id, id);
    }

    Err(AppError::not_found(format!(
        "aweme {} not in page state",
        id.unwrap_or("<any>")
    )))
}

/// Map an aweme object into a record. Missing fields take defaults.
pub fn normalize(aweme: &Value) -> ExtractionResult {
    let description = first_str(aweme, &["/desc"]);
    let title = first_str(aweme, &["/preview_title", "/desc"]);

    let images = strings_at(aweme, "/images", &["/url_list/0", "/urlList/0"]);
    let content_type = if images.is_empty() {
        ContentType::Video
    } else {
        ContentType::ImageSet
    };

    let video_url = if content_type == ContentType::Video {
        // "playwm" serves the watermarked rendition
        first_str(
            aweme,
            &["/video/play_addr/url_list/0", "/video/playAddr/0/src"],
        )
        .replace("/playwm/", "/play/")
    } else {
        String::new()
    };

    let tags: Vec<String> = strings_at(aweme, "/text_extra", &["/hashtag_name"])
        .into_iter()
        .chain(strings_at(aweme, "/textExtra", &["/hashtagName"]))
        .collect();

    ExtractionResult {
        id: first_str(aweme, &["/aweme_id", "/awemeId"]),
        url: String::new(),
        platform: Platform::Douyin,
        tags: tags_or_hashtags(tags, "", &description),
        title,
        description,
        content_type,
        author: Author {
            id: first_str(aweme, &["/author/uid", "/authorInfo/uid"]),
            name: first_str(aweme, &["/author/nickname", "/authorInfo/nickname"]),
        },
        counts: Counts {
            likes: count_at(aweme, &["/statistics/digg_count", "/stats/diggCount"]),
            comments: count_at(aweme, &["/statistics/comment_count", "/stats/commentCount"]),
            shares: count_at(aweme, &["/statistics/share_count", "/stats/shareCount"]),
            collects: count_at(aweme, &["/statistics/collect_count", "/stats/collectCount"]),
        },
        media: Media {
            cover_url: first_str(
                aweme,
                &[
                    "/video/cover/url_list/0",
                    "/video/origin_cover/url_list/0",
                    "/video/cover",
                ],
            ),
            video_url: with_scheme(video_url),
            images,
        },
        timestamps: Timestamps {
            created: epoch_at(aweme, "/create_time", EpochUnit::Seconds)
                .or_else(|| epoch_at(aweme, "/createTime", EpochUnit::Seconds)),
            updated: None,
        },
    }
}

/// Web app URLs are often protocol-relative.
fn with_scheme(url: String) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url
    }
}

/// Map a profile page state into a profile.
pub fn normalize_user(state: &Value) -> Result<UserProfile> {
    let routes = state
        .get("loaderData")
        .and_then(Value::as_object)
        .into_iter()
        .chain(state.as_object())
        .flat_map(|map| map.values());

    for route in routes {
        let user = route
            .pointer("/user_info")
            .or_else(|| route.pointer("/userInfo/user"))
            .or_else(|| route.pointer("/user/user"))
            .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()));
        let Some(user) = user else {
            continue;
        };

        let note_ids = strings_at(route, "/post/data", &["/awemeId", "/aweme_id"]);
        return Ok(UserProfile {
            id: first_str(user, &["/sec_uid", "/secUid"]),
            url: String::new(),
            platform: Platform::Douyin,
            name: first_str(user, &["/nickname"]),
            handle: first_str(user, &["/unique_id", "/uniqueId", "/short_id", "/shortId"]),
            bio: first_str(user, &["/signature", "/desc"]),
            avatar_url: first_str(
                user,
                &["/avatar_larger/url_list/0", "/avatar_thumb/url_list/0", "/avatarUrl"],
            ),
            counts: ProfileCounts {
                follows: count_at(user, &["/following_count", "/followingCount"]),
                fans: count_at(
                    user,
                    &["/follower_count", "/followerCount", "/mplatformFollowersCount"],
                ),
                likes: count_at(user, &["/total_favorited", "/totalFavorited"]),
                posts: count_at(user, &["/aweme_count", "/awemeCount"]),
            },
            note_ids,
        });
    }

    Err(AppError::not_found("user info missing from page state"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use serde_json::json;

    const AWEME_ID: &str = "7475254041207950642";

    fn router_state() -> Value {
        json!({"loaderData": {
            "video_layout": null,
            "video_(id)/page": {"videoInfoRes": {"item_list": [{
                "aweme_id": AWEME_ID,
                "desc": "海边日落 #旅行 #vlog",
                "author": {"uid": "1088", "nickname": "阿杰"},
                "statistics": {"digg_count": 5321, "comment_count": 87, "share_count": 12, "collect_count": 300},
                "video": {
                    "cover": {"url_list": ["https://p3.douyinpic.com/cover.jpeg"]},
                    "play_addr": {"url_list": ["https://aweme.snssdk.com/aweme/v1/playwm/?video_id=v0200"]}
                },
                "text_extra": [{"hashtag_name": "旅行"}, {"hashtag_name": ""}, {"hashtag_name": "vlog"}],
                "create_time": 1740758405
            }]}}
        }})
    }

    #[test]
    fn test_post_id_from_urls() {
        assert_eq!(
            post_id(&format!("https://www.douyin.com/video/{AWEME_ID}")),
            Some(AWEME_ID.to_string())
        );
        assert_eq!(
            post_id(&format!("https://www.iesdouyin.com/share/video/{AWEME_ID}/?region=CN")),
            Some(AWEME_ID.to_string())
        );
        assert_eq!(
            post_id(&format!("https://www.douyin.com/jingxuan?modal_id={AWEME_ID}")),
            Some(AWEME_ID.to_string())
        );
        assert_eq!(post_id("https://v.douyin.com/iRNBho6u/"), None);
    }

    #[test]
    fn test_find_note_in_router_data() {
        let state = router_state();
        let aweme = find_note(&state, Some(AWEME_ID)).unwrap();
        assert_eq!(aweme["aweme_id"], AWEME_ID);
    }

    #[test]
    fn test_find_note_in_render_data() {
        let state = json!({"app": {}, "45": {"aweme": {"detail": {"awemeId": AWEME_ID, "desc": "x"}}}});
        let aweme = find_note(&state, None).unwrap();
        assert_eq!(aweme["awemeId"], AWEME_ID);
    }

    #[test]
    fn test_find_note_other_aweme_is_not_found() {
        let state = json!({"loaderData": {"video_(id)/page": {"videoInfoRes": {"item_list": [
            {"aweme_id": "222", "desc": "other"}
        ]}}}});
        assert!(matches!(
            find_note(&state, Some("111")),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(find_note(&state, None).unwrap()["aweme_id"], "222");
    }

    #[test]
    fn test_find_note_removed_post() {
        let state = json!({"loaderData": {"video_(id)/page": {"videoInfoRes": {"item_list": [], "filter_list": [{"aweme_id": AWEME_ID}]}}}});
        assert!(matches!(
            find_note(&state, Some(AWEME_ID)),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_normalize_video() {
        let state = router_state();
        let record = normalize(find_note(&state, None).unwrap());

        assert_eq!(record.id, AWEME_ID);
        assert_eq!(record.title, "海边日落 #旅行 #vlog");
        assert_eq!(record.content_type, ContentType::Video);
        assert_eq!(record.author.id, "1088");
        assert_eq!(record.counts.likes, 5321);
        assert_eq!(record.counts.collects, 300);
        assert_eq!(
            record.media.video_url,
            "https://aweme.snssdk.com/aweme/v1/play/?video_id=v0200"
        );
        assert_eq!(record.media.cover_url, "https://p3.douyinpic.com/cover.jpeg");
        assert_eq!(record.tags, vec!["旅行", "vlog"]);
        assert_eq!(record.timestamps.created, DateTime::from_timestamp(1740758405, 0));
    }

    #[test]
    fn test_normalize_image_post() {
        let aweme = json!({
            "aweme_id": "1",
            "desc": "相册 #春天",
            "images": [{"url_list": ["https://p3/a.webp"]}, {"url_list": ["https://p3/b.webp"]}],
            "video": {"play_addr": {"url_list": ["https://music/only.mp3"]}}
        });
        let record = normalize(&aweme);
        assert_eq!(record.content_type, ContentType::ImageSet);
        assert_eq!(record.media.images.len(), 2);
        assert_eq!(record.media.video_url, "");
        assert_eq!(record.tags, vec!["春天"]);
    }

    #[test]
    fn test_normalize_camel_case_detail() {
        let aweme = json!({
            "awemeId": AWEME_ID,
            "authorInfo": {"uid": "9", "nickname": "nick"},
            "stats": {"diggCount": "1.5w"},
            "video": {"playAddr": [{"src": "//v.douyinvod.com/x.mp4"}], "cover": "https://p3/c.jpg"},
            "createTime": 1740758405
        });
        let record = normalize(&aweme);
        assert_eq!(record.id, AWEME_ID);
        assert_eq!(record.author.name, "nick");
        assert_eq!(record.counts.likes, 15_000);
        assert_eq!(record.media.video_url, "https://v.douyinvod.com/x.mp4");
        assert_eq!(record.media.cover_url, "https://p3/c.jpg");
    }

    #[test]
    fn test_user_id_from_urls() {
        let sec = "MS4wLjABAAAAv7iSuuXDJGDvJkmH_vz1qkDZYo1apxgzaxdBlP0e6jE";
        assert_eq!(
            user_id(&format!("https://www.douyin.com/user/{sec}?from_tab_name=main")),
            Some(sec.to_string())
        );
        assert_eq!(
            user_id(&format!("https://www.iesdouyin.com/share/user/{sec}")),
            Some(sec.to_string())
        );
        assert_eq!(user_id("https://www.douyin.com/user/self"), None);
        assert_eq!(user_id(&format!("https://www.douyin.com/video/{AWEME_ID}")), None);
    }

    #[test]
    fn test_normalize_user_share_page() {
        let state = json!({"loaderData": {"user_(id)/page": {"user_info": {
            "uid": "58958068057",
            "sec_uid": "MS4wLjABAAAA",
            "nickname": "旅行日记",
            "signature": "记录路上的风景",
            "unique_id": "travel_diary",
            "following_count": 120,
            "follower_count": 35_000,
            "total_favorited": "120万",
            "aweme_count": 88,
            "avatar_larger": {"url_list": ["https://p3.douyinpic.com/avatar.jpeg"]}
        }}}});
        let profile = normalize_user(&state).unwrap();

        assert_eq!(profile.id, "MS4wLjABAAAA");
        assert_eq!(profile.name, "旅行日记");
        assert_eq!(profile.handle, "travel_diary");
        assert_eq!(profile.bio, "记录路上的风景");
        assert_eq!(
            profile.counts,
            ProfileCounts { follows: 120, fans: 35_000, likes: 1_200_000, posts: 88 }
        );
        assert_eq!(profile.avatar_url, "https://p3.douyinpic.com/avatar.jpeg");
    }

    #[test]
    fn test_normalize_user_render_data() {
        let state = json!({"app": {}, "41": {
            "user": {"user": {"secUid": "MS4w", "nickname": "n", "followerCount": 7, "awemeCount": 2}},
            "post": {"data": [{"awemeId": "111"}, {"awemeId": "222"}]}
        }});
        let profile = normalize_user(&state).unwrap();
        assert_eq!(profile.id, "MS4w");
        assert_eq!(profile.counts.fans, 7);
        assert_eq!(profile.note_ids, vec!["111", "222"]);

        assert!(matches!(normalize_user(&json!({"app": {}})), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_normalize_empty_object() {
        let record = normalize(&json!({}));
        assert_eq!(record.id, "");
        assert_eq!(record.description, "");
        assert_eq!(record.counts, Counts::default());
        assert!(record.tags.is_empty());
    }
}
