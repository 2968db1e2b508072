//! Metadata describing objects held by a node's store.

use chrono::{DateTime, Utc};

/// Content type assumed when a store reports none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Store-reported metadata for a single object.
///
/// Mirrors what an S3 `GetObject` response carries; the bytes travel
/// separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Content type recorded at upload time.
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Entity tag reported by the store.
    pub etag: Option<String>,

    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectInfo {
    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Result of a successful upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadInfo {
    pub size_bytes: i64,
    pub etag: Option<String>,
}
