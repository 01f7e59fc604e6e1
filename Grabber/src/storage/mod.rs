//! Storage abstractions for grabbed posts.
//!
//! Each post gets a directory holding its media files and a `record.json`
//! describing them.
//!
//! ## Directory Structure
//!
//! ```text
//! downloads/
//! ├── xiaohongshu/
//! │   └── 64674a91000000001301762e/
//! │       ├── record.json
//! │       ├── 3f2a….png
//! │       └── 9b1c….png
//! └── douyin/
//!     └── 7475254041207950642/
//!         ├── record.json
//!         └── a41e….mp4
//! ```

pub mod local;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{ExtractionResult, Platform};

// Re-export for convenience
pub use local::LocalStorage;

/// Contents of `record.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// When the record was written
    pub saved_at: DateTime<Utc>,
    pub record: ExtractionResult,
    /// Media file names relative to the record directory
    pub files: Vec<String>,
}

impl StoredRecord {
    pub fn new(record: ExtractionResult, files: &[PathBuf]) -> Self {
        Self {
            saved_at: Utc::now(),
            record,
            files: files
                .iter()
                .filter_map(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Trait for record storage backends.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Directory that holds a post's media and metadata.
    fn record_dir(&self, platform: Platform, id: &str) -> PathBuf;

    /// Write `record.json` into `dir`, returning its path.
    async fn save_record(&self, dir: &Path, stored: &StoredRecord) -> Result<PathBuf>;

    /// Load a previously saved record, if any.
    async fn load_record(&self, platform: Platform, id: &str) -> Result<Option<StoredRecord>>;
}
