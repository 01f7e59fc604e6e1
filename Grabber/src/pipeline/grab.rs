// src/pipeline/grab.rs

//! Service boundary: fetch post info and download media for URLs.
//!
//! Every public operation returns a [`ServiceResponse`]. Errors and panics
//! inside the pipeline are logged and folded into `success = false`.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{BatchOutcome, Config, ExtractionResult, Platform, ServiceResponse, UserProfile};
use crate::services::{PlatformClient, WebClient};
use crate::storage::{LocalStorage, RecordStorage, StoredRecord};
use crate::utils::http::create_async_client;

/// A post together with the media files saved for it.
#[derive(Debug, Clone, Serialize)]
pub struct GrabbedPost {
    pub record: ExtractionResult,
    pub files: Vec<PathBuf>,
}

/// Routes URLs to platform clients and stores what they return.
pub struct Grabber {
    config: Arc<Config>,
    clients: HashMap<Platform, Arc<dyn PlatformClient>>,
    storage: Arc<dyn RecordStorage>,
}

impl Grabber {
    /// Build a grabber that reads public web pages for every platform.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let http = create_async_client(&config.fetch)?;

        let clients: Vec<Arc<dyn PlatformClient>> = [
            Platform::Xiaohongshu,
            Platform::Douyin,
            Platform::TikTok,
            Platform::Generic,
        ]
        .into_iter()
        .map(|platform| {
            Arc::new(WebClient::new(platform, http.clone(), &config.download))
                as Arc<dyn PlatformClient>
        })
        .collect();

        let storage = Arc::new(LocalStorage::new(config.download.output_dir.clone()));
        Ok(Self::with_parts(config, clients, storage))
    }

    /// Build a grabber from explicit clients and storage.
    pub fn with_parts(
        config: Config,
        clients: Vec<Arc<dyn PlatformClient>>,
        storage: Arc<dyn RecordStorage>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            clients: clients.into_iter().map(|c| (c.platform(), c)).collect(),
            storage,
        }
    }

    fn client_for(&self, url: &str) -> Result<&Arc<dyn PlatformClient>> {
        let platform = Platform::detect(url);
        self.clients
            .get(&platform)
            .or_else(|| self.clients.get(&Platform::Generic))
            .ok_or_else(|| AppError::unsupported(url))
    }

    async fn fetch_record(&self, url: &str) -> Result<ExtractionResult> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::validation("URL is empty"));
        }
        self.client_for(url)?.get_detail_from_url(url).await
    }

    /// Directory for a post: `save_dir` itself, or the storage layout.
    fn post_dir(&self, record: &ExtractionResult, save_dir: Option<&Path>) -> PathBuf {
        match save_dir {
            Some(dir) => dir.to_path_buf(),
            None => self.storage.record_dir(record.platform, &record.id),
        }
    }

    async fn fetch_and_download(
        &self,
        url: &str,
        dir_for: impl Fn(&ExtractionResult) -> PathBuf,
    ) -> Result<GrabbedPost> {
        let client = self.client_for(url.trim())?;
        let record = self.fetch_record(url).await?;

        let dir = dir_for(&record);
        let outcome = client.download(&record, &dir).await?;

        if outcome.total > 0 && outcome.items.is_empty() {
            return Err(AppError::download(
                url,
                format!("all {} media downloads failed", outcome.total),
            ));
        }

        if self.config.download.save_metadata {
            let stored = StoredRecord::new(record.clone(), &outcome.items);
            if let Err(e) = self.storage.save_record(&dir, &stored).await {
                log::warn!("Failed to save metadata for {}: {}", record.id, e);
            }
        }

        Ok(GrabbedPost {
            record,
            files: outcome.items,
        })
    }

    /// Fetch and normalize the post behind `url`.
    pub async fn get_info(&self, url: &str) -> ServiceResponse<ExtractionResult> {
        const CONTEXT: &str = "Failed to get post info";
        guarded(CONTEXT, async {
            self.fetch_record(url).await.map(|record| {
                let message = format!("Fetched {} post {}", record.platform, record.id);
                (message, record)
            })
        })
        .await
    }

    /// Download the media of the post behind `url`.
    ///
    /// Files go to `save_dir` when given, otherwise to the post's directory
    /// under the configured output directory.
    pub async fn download_media(&self, url: &str, save_dir: Option<&Path>) -> ServiceResponse<Vec<PathBuf>> {
        const CONTEXT: &str = "Failed to download media";
        guarded(CONTEXT, async {
            let dir_for = |record: &ExtractionResult| self.post_dir(record, save_dir);
            self.fetch_and_download(url, dir_for).await.map(|post| {
                let message = format!(
                    "Downloaded {} files for {} post {}",
                    post.files.len(),
                    post.record.platform,
                    post.record.id
                );
                (message, post.files)
            })
        })
        .await
    }

    /// Read the creator profile behind a user URL.
    pub async fn get_user_info(&self, url: &str) -> ServiceResponse<UserProfile> {
        const CONTEXT: &str = "Failed to get user info";
        guarded(CONTEXT, async {
            let url = url.trim();
            if url.is_empty() {
                return Err(AppError::validation("URL is empty"));
            }
            let profile = self.client_for(url)?.get_user(url).await?;
            let message = format!("Fetched {} user {}", profile.platform, profile.id);
            Ok((message, profile))
        })
        .await
    }

    /// Fetch info for many URLs with bounded concurrency.
    ///
    /// Succeeds as a whole; failed URLs are logged and counted.
    pub async fn get_many(&self, urls: &[String]) -> ServiceResponse<BatchOutcome<ExtractionResult>> {
        const CONTEXT: &str = "Failed to get posts";
        guarded(CONTEXT, async {
            let mut outcome = BatchOutcome {
                total: urls.len(),
                ..BatchOutcome::default()
            };

            let mut results = stream::iter(urls)
                .map(|url| async move { (url, self.fetch_record(url).await) })
                .buffer_unordered(self.config.download.max_concurrent.max(1));

            while let Some((url, result)) = results.next().await {
                match result {
                    Ok(record) => outcome.items.push(record),
                    Err(error) => {
                        outcome.failures += 1;
                        log::warn!("Skipping {}: {}", url, error);
                    }
                }
            }

            let message = format!("Fetched {}/{} posts", outcome.succeeded(), outcome.total);
            Ok((message, outcome))
        })
        .await
    }

    /// Download media for many URLs, one post at a time.
    ///
    /// Each post gets its own `<platform>/<id>` directory under `save_dir`
    /// (or the configured output directory). A post's media is still fetched
    /// concurrently.
    pub async fn download_many(
        &self,
        urls: &[String],
        save_dir: Option<&Path>,
    ) -> ServiceResponse<BatchOutcome<GrabbedPost>> {
        const CONTEXT: &str = "Failed to download posts";
        guarded(CONTEXT, async {
            let mut outcome = BatchOutcome {
                total: urls.len(),
                ..BatchOutcome::default()
            };

            let dir_for = |record: &ExtractionResult| match save_dir {
                Some(root) => LocalStorage::new(root).record_dir(record.platform, &record.id),
                None => self.storage.record_dir(record.platform, &record.id),
            };

            for url in urls {
                match self.fetch_and_download(url, &dir_for).await {
                    Ok(post) => outcome.items.push(post),
                    Err(error) => {
                        outcome.failures += 1;
                        log::warn!("Skipping {}: {}", url, error);
                    }
                }
            }

            let message = format!("Downloaded {}/{} posts", outcome.succeeded(), outcome.total);
            Ok((message, outcome))
        })
        .await
    }
}

/// Run a pipeline step, turning errors and panics into a failed response.
async fn guarded<T, F>(context: &str, step: F) -> ServiceResponse<T>
where
    F: Future<Output = Result<(String, T)>>,
{
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(Ok((message, data))) => {
            log::info!("{}", message);
            ServiceResponse::ok(message, data)
        }
        Ok(Err(error)) => {
            log::error!("{}: {}", context, error);
            ServiceResponse::failed(context, &error)
        }
        Err(_) => {
            log::error!("{}: panicked", context);
            ServiceResponse::panicked(context)
        }
    }
}

/// Grab every URL into the configured output directory.
pub async fn run_grabber(config: &Config, urls: &[String]) -> Result<BatchOutcome<GrabbedPost>> {
    let start_time = Utc::now();
    log::info!("Grabbing {} posts", urls.len());

    let grabber = Grabber::new(config.clone())?;
    let response = grabber.download_many(urls, None).await;
    let (success, message, data) = response.into_parts();
    let outcome = match data {
        Some(outcome) if success => outcome,
        _ => return Err(AppError::validation(message)),
    };

    let elapsed = Utc::now() - start_time;
    log::info!(
        "Grabbed {}/{} posts ({} files) in {}s",
        outcome.succeeded(),
        outcome.total,
        outcome.items.iter().map(|p| p.files.len()).sum::<usize>(),
        elapsed.num_seconds()
    );
    Ok(outcome)
}
