//! Utility functions and helpers.

pub mod http;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([^\s#\[\]]+)").expect("hashtag pattern is valid"));

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Extract the lowercase host from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_lowercase()))
}

/// Drop the query string and fragment (tracking tokens, share params).
pub fn strip_query(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => url_str
            .split(['?', '#'])
            .next()
            .unwrap_or(url_str)
            .to_string(),
    }
}

/// Non-empty path segments of a URL.
pub fn path_segments(url_str: &str) -> Vec<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .map(|segs| segs.filter(|s| !s.is_empty()).map(str::to_string).collect())
        })
        .unwrap_or_default()
}

/// Value of a query parameter, if present and non-empty.
pub fn query_param(url_str: &str, key: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    url.query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

/// Collect `#tag` hashtags from free text, in order, without duplicates.
///
/// Stops at `[` so Xiaohongshu's `#tag[话题]#` markup yields `tag`.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    HASHTAG
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Parse an engagement counter that may be a number or a display string.
///
/// Handles `"1.2万"`, `"3.4w"`, `"1.5k"`, `"2M"`, `"1,024"`, and `"10+"`.
/// Anything unparsable counts as zero.
pub fn parse_count(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        serde_json::Value::String(s) => parse_count_str(s),
        _ => 0,
    }
}

fn parse_count_str(raw: &str) -> u64 {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('+')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    let mut chars = cleaned.chars();
    let unit = match chars.next_back() {
        Some('万' | 'w' | 'W') => Some(10_000.0),
        Some('亿') => Some(100_000_000.0),
        Some('k' | 'K') => Some(1_000.0),
        Some('m' | 'M') => Some(1_000_000.0),
        _ => None,
    };
    let (number, multiplier) = match unit {
        Some(multiplier) => (chars.as_str(), multiplier),
        None => (cleaned.as_str(), 1.0),
    };

    number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|n| (n * multiplier).round() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve("https://example.com/a/b", "//cdn.example.com/x.png"),
            Some("https://cdn.example.com/x.png".to_string())
        );
    }

    #[test]
    fn test_get_domain() {
        assert_eq!(
            get_domain("https://Sub.Example.com:8080/path"),
            Some("sub.example.com".to_string())
        );
        assert_eq!(get_domain("invalid-url"), None);
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(
            strip_query("https://www.xiaohongshu.com/explore/abc?xsec_token=T&xsec_source=pc_feed"),
            "https://www.xiaohongshu.com/explore/abc"
        );
        assert_eq!(strip_query("not/a/url?x=1"), "not/a/url");
    }

    #[test]
    fn test_path_segments_and_query() {
        assert_eq!(
            path_segments("https://www.douyin.com/video/7475254041207950642/"),
            vec!["video".to_string(), "7475254041207950642".to_string()]
        );
        assert_eq!(
            query_param("https://www.douyin.com/jingxuan?modal_id=123", "modal_id"),
            Some("123".to_string())
        );
        assert_eq!(query_param("https://x.com/?modal_id=", "modal_id"), None);
    }

    #[test]
    fn test_extract_hashtags() {
        assert_eq!(
            extract_hashtags("周末去哪 #旅行[话题]# #美食[话题]# #旅行"),
            vec!["旅行".to_string(), "美食".to_string()]
        );
        assert_eq!(
            extract_hashtags("ai tools #ai #makemoney\n#chatgpt"),
            vec!["ai".to_string(), "makemoney".to_string(), "chatgpt".to_string()]
        );
        assert!(extract_hashtags("").is_empty());
    }

    #[test]
    fn test_parse_count_numbers() {
        assert_eq!(parse_count(&json!(42)), 42);
        assert_eq!(parse_count(&json!(-3)), 0);
        assert_eq!(parse_count(&json!(12.6)), 13);
        assert_eq!(parse_count(&json!(null)), 0);
    }

    #[test]
    fn test_parse_count_display_strings() {
        assert_eq!(parse_count(&json!("1024")), 1024);
        assert_eq!(parse_count(&json!("1,024")), 1024);
        assert_eq!(parse_count(&json!("1.2万")), 12_000);
        assert_eq!(parse_count(&json!("3.4w")), 34_000);
        assert_eq!(parse_count(&json!("2亿")), 200_000_000);
        assert_eq!(parse_count(&json!("1.5k")), 1_500);
        assert_eq!(parse_count(&json!("2M")), 2_000_000);
        assert_eq!(parse_count(&json!("10+")), 10);
        assert_eq!(parse_count(&json!("")), 0);
        assert_eq!(parse_count(&json!("赞")), 0);
    }
}
