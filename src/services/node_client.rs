//! Per-node handle: a discovered [`StorageNode`] plus its store connection.

use crate::{
    models::{
        node::StorageNode,
        object::{ObjectInfo, UploadInfo},
    },
    services::object_store::{ObjectStore, StoreError, StoreResult},
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct NodeClient {
    node: StorageNode,
    store: Arc<dyn ObjectStore>,
}

impl NodeClient {
    pub fn new(node: StorageNode, store: Arc<dyn ObjectStore>) -> Self {
        Self { node, store }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn node(&self) -> &StorageNode {
        &self.node
    }

    /// Make sure the node's bucket exists, creating it if needed.
    ///
    /// A bucket created concurrently by someone else counts as success.
    pub async fn ensure_bucket(&self) -> StoreResult<()> {
        let bucket = self.node.bucket();
        if self.store.bucket_exists(bucket).await? {
            debug!(node = %self.node.id, "bucket already exists");
            return Ok(());
        }
        match self.store.create_bucket(bucket).await {
            Ok(()) => {
                info!(node = %self.node.id, "created bucket");
                Ok(())
            }
            Err(StoreError::BucketAlreadyExists(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub async fn bucket_exists(&self) -> StoreResult<bool> {
        self.store.bucket_exists(self.node.bucket()).await
    }

    pub async fn get(&self, id: &str) -> StoreResult<(Bytes, ObjectInfo)> {
        self.store.get_object(self.node.bucket(), id).await
    }

    /// Upload `data` under `id`, replacing any previous object.
    pub async fn put(&self, id: &str, data: Bytes, content_type: &str) -> StoreResult<UploadInfo> {
        self.store
            .put_object(self.node.bucket(), id, data, content_type)
            .await
    }
}
