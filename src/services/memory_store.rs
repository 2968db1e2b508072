//! In-memory [`ObjectStore`] used in place of a MinIO node in tests.

use crate::{
    models::{
        node::StorageNode,
        object::{ObjectInfo, UploadInfo},
    },
    services::object_store::{ObjectStore, StoreConnector, StoreError, StoreResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

type Buckets = BTreeMap<String, BTreeMap<String, (Bytes, ObjectInfo)>>;

#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<Buckets>,
    /// When set, every call fails with a backend error.
    fail_with: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets.lock().unwrap().keys().cloned().collect()
    }

    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<(Bytes, ObjectInfo)> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    fn check(&self, operation: &'static str) -> StoreResult<()> {
        match self.fail_with.lock().unwrap().as_ref() {
            Some(message) => Err(StoreError::backend(operation, message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool> {
        self.check("head bucket")?;
        Ok(self.buckets.lock().unwrap().contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.check("create bucket")?;
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(StoreError::BucketAlreadyExists(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<(Bytes, ObjectInfo)> {
        self.check("get object")?;
        let buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<UploadInfo> {
        self.check("put object")?;
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;

        let etag = format!("{:x}", md5::compute(&data));
        let info = ObjectInfo {
            content_type: Some(content_type.to_string()),
            size_bytes: data.len() as i64,
            etag: Some(etag.clone()),
            last_modified: Some(Utc::now()),
        };
        let size_bytes = info.size_bytes;
        objects.insert(key.to_string(), (data, info));

        Ok(UploadInfo {
            size_bytes,
            etag: Some(etag),
        })
    }
}

fn no_such_bucket(bucket: &str) -> StoreError {
    StoreError::backend("bucket lookup", format!("no such bucket {}", bucket))
}

/// Hands out one shared [`MemoryStore`] per node id, creating them on demand.
#[derive(Default)]
pub struct MemoryConnector {
    stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store backing `node_id`. Tests may grab it before setup to seed
    /// failures.
    pub fn store(&self, node_id: &str) -> Arc<MemoryStore> {
        self.stores
            .lock()
            .unwrap()
            .entry(node_id.to_string())
            .or_default()
            .clone()
    }
}

impl StoreConnector for MemoryConnector {
    fn connect(&self, node: &StorageNode) -> StoreResult<Arc<dyn ObjectStore>> {
        Ok(self.store(&node.id))
    }
}
