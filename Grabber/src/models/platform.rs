//! Source platform of a post.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Platforms the grabber knows how to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Xiaohongshu,
    Douyin,
    TikTok,
    /// Any other page; read through OpenGraph tags
    #[default]
    Generic,
}

impl Platform {
    /// Detect the platform from a post or share URL.
    ///
    /// Unparsable URLs and unknown hosts map to [`Platform::Generic`].
    pub fn detect(url: &str) -> Self {
        let Some(host) = crate::utils::get_domain(url) else {
            return Platform::Generic;
        };
        let is = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        if is("xiaohongshu.com") || is("xhslink.com") {
            Platform::Xiaohongshu
        } else if is("douyin.com") || is("iesdouyin.com") {
            Platform::Douyin
        } else if is("tiktok.com") {
            Platform::TikTok
        } else {
            Platform::Generic
        }
    }

    /// Stable lowercase name, used for directory names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Xiaohongshu => "xiaohongshu",
            Platform::Douyin => "douyin",
            Platform::TikTok => "tiktok",
            Platform::Generic => "generic",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
