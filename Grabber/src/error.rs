// src/error.rs

//! Unified error handling for the grabber.

use std::fmt;

use thiserror::Error;

/// Result type alias for grabber operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed or timed out
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Expected embedded state was missing or not valid JSON
    #[error("Parse error for {context}: {message}")]
    Parse { context: String, message: String },

    /// The page loaded but carried no content for the request
    #[error("Content not found: {0}")]
    NotFound(String),

    /// Media fetch or write failed
    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    /// Media URL answered 404 or 410
    #[error("Media not found: {0}")]
    MediaNotFound(String),

    /// Media host refused or throttled the download
    #[error("Download limited for {url} (HTTP {status})")]
    DownloadLimited { url: String, status: u16 },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// URL does not belong to a supported platform or has no post id
    #[error("Unsupported URL: {0}")]
    Unsupported(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a download error for a media URL.
    pub fn download(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Download {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Classify a failed media fetch by its HTTP status.
    pub fn from_media_status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        match status {
            404 | 410 => Self::MediaNotFound(url),
            403 | 429 => Self::DownloadLimited { url, status },
            _ => Self::Download {
                message: format!("HTTP {status}"),
                url,
            },
        }
    }

    /// Create an unsupported-URL error.
    pub fn unsupported(url: impl Into<String>) -> Self {
        Self::Unsupported(url.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Numeric error code reported alongside failed service responses.
    ///
    /// Extraction failures use the 10xxx range, download failures 20xxx.
    pub fn code(&self) -> u32 {
        match self {
            Self::NotFound(_) => 10002,
            Self::Download { .. } => 20001,
            Self::MediaNotFound(_) => 20002,
            Self::DownloadLimited { .. } => 20003,
            Self::Config(_) | Self::Validation(_) | Self::Toml(_) => 30001,
            _ => 10001,
        }
    }
}
