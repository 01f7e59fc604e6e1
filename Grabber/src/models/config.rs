//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Page and media request settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Media download settings
    #[serde(default)]
    pub download: DownloadConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.fetch.validate()?;
        if self.download.max_concurrent == 0 {
            return Err(AppError::validation("download.max_concurrent must be > 0"));
        }
        if self.download.output_dir.as_os_str().is_empty() {
            return Err(AppError::validation("download.output_dir is empty"));
        }
        Ok(())
    }
}

/// Per-request HTTP settings.
///
/// Passed by reference into every fetch; nothing here is global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Extra headers sent with every request (override the built-in ones)
    #[serde(default = "defaults::headers")]
    pub headers: BTreeMap<String, String>,

    /// Proxy URL applied to all schemes
    #[serde(default)]
    pub proxy: Option<String>,

    /// Raw `Cookie` header value
    #[serde(default)]
    pub cookie: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl FetchConfig {
    /// Read a cookie string from a file (e.g. a copied browser `Cookie` header).
    pub fn with_cookie_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let cookie = raw.trim();
        if cookie.is_empty() {
            return Err(AppError::config(format!(
                "Cookie file {:?} is empty",
                path.as_ref()
            )));
        }
        self.cookie = Some(cookie.to_string());
        Ok(self)
    }

    /// Return a copy with the given cookie set.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// Return a copy routed through the given proxy.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if let Some(proxy) = &self.proxy {
            url::Url::parse(proxy)
                .map_err(|e| AppError::validation(format!("fetch.proxy is invalid: {e}")))?;
        }
        Ok(())
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            headers: defaults::headers(),
            proxy: None,
            cookie: None,
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Media download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum simultaneous in-flight media requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Root directory for downloaded media
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Write `record.json` next to the media
    #[serde(default = "defaults::save_metadata")]
    pub save_metadata: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            output_dir: defaults::output_dir(),
            save_metadata: defaults::save_metadata(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            .into()
    }
    pub fn headers() -> BTreeMap<String, String> {
        [
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
            ("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8"),
            ("Sec-Fetch-Dest", "document"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Upgrade-Insecure-Requests", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }
    pub fn timeout() -> u64 {
        10
    }

    // Download defaults
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("downloads")
    }
    pub fn save_metadata() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.fetch.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.download.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_proxy() {
        let mut config = Config::default();
        config.fetch.proxy = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [fetch]
            cookie = "a=1; b=2"
            timeout_secs = 3

            [download]
            max_concurrent = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.cookie.as_deref(), Some("a=1; b=2"));
        assert_eq!(config.fetch.timeout_secs, 3);
        assert!(config.fetch.headers.contains_key("Accept"));
        assert_eq!(config.download.max_concurrent, 2);
        assert_eq!(config.download.output_dir, PathBuf::from("downloads"));
        assert!(config.download.save_metadata);
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_default(tmp.path().join("missing.toml"));
        assert_eq!(config.download.max_concurrent, 5);
    }

    #[test]
    fn cookie_file_is_trimmed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cookies.txt");
        fs::write(&path, "  web_session=abc; a1=xyz\n").unwrap();

        let fetch = FetchConfig::default().with_cookie_file(&path).unwrap();
        assert_eq!(fetch.cookie.as_deref(), Some("web_session=abc; a1=xyz"));
    }

    #[test]
    fn empty_cookie_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cookies.txt");
        fs::write(&path, "\n").unwrap();

        assert!(FetchConfig::default().with_cookie_file(&path).is_err());
    }
}
