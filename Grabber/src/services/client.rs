//! Platform clients.
//!
//! A [`PlatformClient`] turns a share URL into post ids, an id into a
//! normalized record, and a record into files on disk. It can also read a
//! creator's profile. [`WebClient`] does this by fetching the public page and
//! reading its embedded state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{BatchOutcome, DownloadConfig, ExtractionResult, Platform, UserProfile};
use crate::platforms;
use crate::services::download::{HttpMediaSource, MediaDownloader};
use crate::utils::http::{fetch_text, resolve_redirect};

#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> Platform;

    /// Post ids referenced by a URL. Share short links are resolved first.
    async fn extract_ids(&self, url: &str) -> Result<Vec<String>>;

    /// Fetch and normalize a single post.
    async fn get_detail(&self, id: &str) -> Result<ExtractionResult>;

    /// Download a record's media into `dir`.
    async fn download(&self, record: &ExtractionResult, dir: &Path) -> Result<BatchOutcome<PathBuf>>;

    /// Fetch the post a URL points at.
    async fn get_detail_from_url(&self, url: &str) -> Result<ExtractionResult> {
        let ids = self.extract_ids(url).await?;
        let id = ids
            .first()
            .ok_or_else(|| AppError::unsupported(format!("no post id in {url}")))?;
        self.get_detail(id).await
    }

    /// Read the profile a user URL points at.
    async fn get_user(&self, url: &str) -> Result<UserProfile> {
        Err(AppError::unsupported(format!(
            "{} client has no user profiles: {url}",
            self.platform()
        )))
    }
}

/// Reads posts from public web pages.
pub struct WebClient {
    platform: Platform,
    client: Client,
    downloader: MediaDownloader<HttpMediaSource>,
}

impl WebClient {
    pub fn new(platform: Platform, client: Client, download: &DownloadConfig) -> Self {
        let source = HttpMediaSource::new(client.clone(), platforms::referer(platform));
        Self {
            platform,
            client,
            downloader: MediaDownloader::new(source, download.max_concurrent),
        }
    }

    /// Resolve a share short link, leaving other URLs untouched.
    async fn expand(&self, url: &str) -> Result<String> {
        if platforms::is_short_link(url) {
            resolve_redirect(&self.client, url).await
        } else {
            Ok(url.to_string())
        }
    }

    /// Fetch a post page and parse it.
    async fn fetch_page(&self, url: &str) -> Result<ExtractionResult> {
        let html = fetch_text(&self.client, url, platforms::referer(self.platform)).await?;
        platforms::parse_page(self.platform, &html, url)
    }
}

#[async_trait]
impl PlatformClient for WebClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn extract_ids(&self, url: &str) -> Result<Vec<String>> {
        let resolved = self.expand(url).await?;
        platforms::post_id(self.platform, &resolved)
            .map(|id| vec![id])
            .ok_or_else(|| AppError::unsupported(format!("no {} post id in {resolved}", self.platform)))
    }

    async fn get_detail(&self, id: &str) -> Result<ExtractionResult> {
        let url = platforms::canonical_url(self.platform, id);
        self.fetch_page(&url).await
    }

    async fn download(&self, record: &ExtractionResult, dir: &Path) -> Result<BatchOutcome<PathBuf>> {
        self.downloader.download_all(&record.media_urls(), dir).await
    }

    /// Fetch the given page directly so access tokens in the query survive.
    async fn get_detail_from_url(&self, url: &str) -> Result<ExtractionResult> {
        let resolved = self.expand(url).await?;
        self.fetch_page(&resolved).await
    }

    async fn get_user(&self, url: &str) -> Result<UserProfile> {
        let resolved = self.expand(url).await?;
        if platforms::user_id(self.platform, &resolved).is_none() {
            return Err(AppError::unsupported(format!(
                "no {} user id in {resolved}",
                self.platform
            )));
        }
        let html = fetch_text(&self.client, &resolved, platforms::referer(self.platform)).await?;
        platforms::parse_profile(self.platform, &html, &resolved)
    }
}
