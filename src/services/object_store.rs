//! The object-store contract the gateway needs from each node.
//!
//! Implemented by [`S3Store`](crate::services::s3_store::S3Store) for real
//! MinIO nodes. Only the four calls below are used: the gateway never lists,
//! deletes, or versions objects.

use crate::models::{
    node::StorageNode,
    object::{ObjectInfo, UploadInfo},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("could not connect to `{endpoint}`: {message}")]
    Connect { endpoint: String, message: String },
    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Bucket-scoped blob store exposed by a single node.
///
/// Implementations must be `Send + Sync`: one instance per node is shared by
/// every concurrent request routed to that node.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool>;

    /// Create a bucket. Returns [`StoreError::BucketAlreadyExists`] if it is
    /// already present.
    async fn create_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Read a whole object. Returns [`StoreError::ObjectNotFound`] if the key
    /// does not exist.
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<(Bytes, ObjectInfo)>;

    /// Write an object, replacing any existing one with the same key.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<UploadInfo>;
}

/// Opens an [`ObjectStore`] connection for a discovered node.
pub trait StoreConnector {
    fn connect(&self, node: &StorageNode) -> StoreResult<Arc<dyn ObjectStore>>;
}
