//! Media downloader.
//!
//! Fetches media URLs with bounded concurrency and writes each body under a
//! content-derived name: the hex SHA-256 of the bytes plus an extension.
//! Identical content therefore lands in a single file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::BatchOutcome;
use crate::utils::http::{FetchedBytes, fetch_bytes};
use crate::utils::path_segments;

/// Where media bytes come from.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedBytes>;
}

/// Media fetched over HTTP with an optional platform referer.
#[derive(Clone)]
pub struct HttpMediaSource {
    client: Client,
    referer: Option<String>,
}

impl HttpMediaSource {
    pub fn new(client: Client, referer: Option<&str>) -> Self {
        Self {
            client,
            referer: referer.map(str::to_string),
        }
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn fetch(&self, url: &str) -> Result<FetchedBytes> {
        fetch_bytes(&self.client, url, self.referer.as_deref())
            .await
            .map_err(|e| match e {
                AppError::Status { status, .. } => AppError::from_media_status(url, status),
                other => AppError::download(url, other),
            })
    }
}

/// Downloads batches of media URLs, at most `max_concurrent` at a time.
pub struct MediaDownloader<S = HttpMediaSource> {
    source: S,
    max_concurrent: usize,
}

impl<S: MediaSource> MediaDownloader<S> {
    pub fn new(source: S, max_concurrent: usize) -> Self {
        Self {
            source,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Download every URL into `dest`.
    ///
    /// Individual failures are logged and counted. When every URL fails, the
    /// first failure is returned so callers see why.
    pub async fn download_all(&self, urls: &[String], dest: &Path) -> Result<BatchOutcome<PathBuf>> {
        tokio::fs::create_dir_all(dest).await?;

        let mut seen = HashSet::new();
        let jobs: Vec<String> = urls
            .iter()
            .filter(|url| !url.is_empty() && seen.insert(url.as_str()))
            .cloned()
            .collect();

        let mut outcome = BatchOutcome {
            total: jobs.len(),
            ..BatchOutcome::default()
        };

        let mut downloads = stream::iter(jobs.into_iter().enumerate())
            .map(|(index, url): (usize, String)| async move {
                let result = self.download_one(index, &url, dest).await;
                (url, result)
            })
            .buffer_unordered(self.max_concurrent);

        let mut saved = HashSet::new();
        let mut first_error = None;
        while let Some((url, result)) = downloads.next().await {
            match result {
                Ok(path) => {
                    if saved.insert(path.clone()) {
                        outcome.items.push(path);
                    }
                }
                Err(error) => {
                    outcome.failures += 1;
                    log::warn!("Failed to download {}: {}", url, error);
                    first_error.get_or_insert(error);
                }
            }
        }

        log::info!(
            "Downloaded {}/{} media files to {}",
            outcome.total - outcome.failures,
            outcome.total,
            dest.display()
        );
        match first_error {
            Some(error) if outcome.items.is_empty() => Err(error),
            _ => Ok(outcome),
        }
    }

    async fn download_one(&self, index: usize, url: &str, dest: &Path) -> Result<PathBuf> {
        let fetched = self.source.fetch(url).await?;
        if fetched.bytes.is_empty() {
            return Err(AppError::download(url, "empty response body"));
        }

        let name = content_filename(&fetched);
        let path = dest.join(&name);
        if tokio::fs::try_exists(&path).await? {
            log::debug!("{} already saved as {}", url, name);
            return Ok(path);
        }

        write_atomic(&path, &dest.join(format!(".{name}.{index}.part")), &fetched.bytes)
            .await
            .map_err(|e| AppError::download(url, e))?;
        log::debug!("Saved {} -> {}", url, path.display());
        Ok(path)
    }
}

/// Write bytes to `tmp`, then rename over `path`. `tmp` never outlives a
/// failed write.
async fn write_atomic(path: &Path, tmp: &Path, bytes: &[u8]) -> Result<()> {
    let written = async {
        let mut file = tokio::fs::File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(tmp, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// `<sha256>.<ext>` for a fetched body.
pub fn content_filename(fetched: &FetchedBytes) -> String {
    let digest = Sha256::digest(&fetched.bytes);
    let ext = fetched
        .content_type
        .as_deref()
        .and_then(extension_for_mime)
        .map(str::to_string)
        .or_else(|| extension_from_url(&fetched.final_url))
        .unwrap_or_else(|| "bin".to_string());
    format!("{}.{}", hex::encode(digest), ext)
}

fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match essence.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        "image/avif" => "avif",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        _ => return None,
    };
    Some(ext)
}

fn extension_from_url(url: &str) -> Option<String> {
    let last = path_segments(url).pop()?;
    let (_, ext) = last.rsplit_once('.')?;
    let valid = (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// In-memory source that records peak concurrency.
    #[derive(Default)]
    struct FakeSource {
        bodies: HashMap<String, (Option<String>, Vec<u8>)>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeSource {
        fn with(mut self, url: &str, content_type: Option<&str>, body: &[u8]) -> Self {
            self.bodies.insert(
                url.to_string(),
                (content_type.map(str::to_string), body.to_vec()),
            );
            self
        }
    }

    #[async_trait]
    impl MediaSource for FakeSource {
        async fn fetch(&self, url: &str) -> Result<FetchedBytes> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let (content_type, bytes) = self
                .bodies
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::download(url, "404"))?;
            Ok(FetchedBytes {
                final_url: url.to_string(),
                content_type,
                bytes,
            })
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://cdn.example/{i}.jpg")).collect()
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_cap() {
        let list = urls(12);
        let source = list.iter().enumerate().fold(FakeSource::default(), |s, (i, u)| {
            s.with(u, Some("image/jpeg"), format!("body-{i}").as_bytes())
        });
        let downloader = MediaDownloader::new(source, 3);
        let dir = TempDir::new().unwrap();

        let outcome = downloader.download_all(&list, dir.path()).await.unwrap();

        assert_eq!(outcome.total, 12);
        assert_eq!(outcome.items.len(), 12);
        assert_eq!(outcome.failures, 0);
        let peak = downloader.source.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency was {peak}");
        assert!(peak >= 2, "downloads did not overlap");
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_siblings() {
        let list = vec![
            "https://cdn.example/ok1.png".to_string(),
            "https://cdn.example/missing.png".to_string(),
            "https://cdn.example/empty.png".to_string(),
            "https://cdn.example/ok2.png".to_string(),
        ];
        let source = FakeSource::default()
            .with(&list[0], Some("image/png"), b"one")
            .with(&list[2], Some("image/png"), b"")
            .with(&list[3], Some("image/png"), b"two");
        let dir = TempDir::new().unwrap();

        let outcome = MediaDownloader::new(source, 2)
            .download_all(&list, dir.path())
            .await
            .unwrap();

        assert_eq!(outcome.total, 4);
        assert_eq!(outcome.failures, 2);
        assert_eq!(outcome.items.len(), 2);
        for path in &outcome.items {
            assert!(path.exists());
            assert_eq!(path.extension().unwrap(), "png");
        }
    }

    #[tokio::test]
    async fn test_identical_content_is_saved_once() {
        let list = vec![
            "https://a.example/x.jpg".to_string(),
            "https://b.example/y.jpg".to_string(),
            "https://a.example/x.jpg".to_string(),
        ];
        let source = FakeSource::default()
            .with(&list[0], Some("image/jpeg"), b"same")
            .with(&list[1], Some("image/jpeg"), b"same");
        let dir = TempDir::new().unwrap();

        let outcome = MediaDownloader::new(source, 1)
            .download_all(&list, dir.path())
            .await
            .unwrap();

        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.items.len(), 1);
        let expected = format!("{}.jpg", hex::encode(Sha256::digest(b"same")));
        assert_eq!(outcome.items[0], dir.path().join(expected));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_content_filename_extensions() {
        let fetched = |content_type: Option<&str>, url: &str| FetchedBytes {
            final_url: url.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: b"abc".to_vec(),
        };
        let hash = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

        assert_eq!(
            content_filename(&fetched(Some("video/mp4; codecs=avc1"), "https://v/x")),
            format!("{hash}.mp4")
        );
        assert_eq!(
            content_filename(&fetched(Some("application/octet-stream"), "https://v/a/clip.MOV?sig=1")),
            format!("{hash}.mov")
        );
        assert_eq!(
            content_filename(&fetched(None, "https://v/play/?video_id=1")),
            format!("{hash}.bin")
        );
    }

    #[tokio::test]
    async fn test_all_failures_return_first_error() {
        let list = vec![
            "https://cdn.example/a.jpg".to_string(),
            "https://cdn.example/b.jpg".to_string(),
        ];
        let dir = TempDir::new().unwrap();

        let err = MediaDownloader::new(FakeSource::default(), 2)
            .download_all(&list, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Download { .. }));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_part_file() {
        let dir = TempDir::new().unwrap();

        // rename onto a non-empty directory fails after tmp was written
        let blocked = dir.path().join("target");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), b"x").unwrap();
        let tmp = dir.path().join(".target.0.part");
        assert!(write_atomic(&blocked, &tmp, b"bytes").await.is_err());
        assert!(!tmp.exists());

        let missing = dir.path().join("missing").join(".x.1.part");
        assert!(write_atomic(&dir.path().join("x"), &missing, b"bytes").await.is_err());

        let parts: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(parts.is_empty());
    }

    #[tokio::test]
    async fn test_http_source_classifies_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        for (route, status) in [("/limited.mp4", 403), ("/gone.mp4", 404), ("/broken.mp4", 500)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }

        let source = HttpMediaSource::new(Client::new(), Some("https://www.douyin.com/"));
        let fetch_code = |route: &'static str| {
            let source = source.clone();
            let url = format!("{}{route}", server.uri());
            async move { source.fetch(&url).await.unwrap_err().code() }
        };
        assert_eq!(fetch_code("/limited.mp4").await, 20003);
        assert_eq!(fetch_code("/gone.mp4").await, 20002);
        assert_eq!(fetch_code("/broken.mp4").await, 20001);

        let dir = TempDir::new().unwrap();
        let err = MediaDownloader::new(source, 2)
            .download_all(&[format!("{}/gone.mp4", server.uri())], dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MediaNotFound(_)));
    }
}
