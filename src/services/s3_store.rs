//! S3 API client for a MinIO node.
//!
//! One [`S3Store`] per node, built from the endpoint and credentials found
//! during discovery. Path-style addressing is required since buckets are not
//! resolvable as virtual hosts inside the container network.

use crate::{
    models::{
        node::StorageNode,
        object::{ObjectInfo, UploadInfo},
    },
    services::object_store::{ObjectStore, StoreConnector, StoreError, StoreResult},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::{DisplayErrorContext, SdkError},
    primitives::ByteStream,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// MinIO ignores the region but the SDK requires one.
const REGION: &str = "us-east-1";
const CREDENTIALS_PROVIDER: &str = "container-environment";

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(node: &StorageNode) -> Self {
        let credentials = Credentials::new(
            node.credentials.access_key.clone(),
            node.credentials.secret_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(REGION))
            .endpoint_url(format!("http://{}", node.endpoint))
            .credentials_provider(credentials)
            .force_path_style(true)
            // single attempt per node call
            .retry_config(RetryConfig::disabled())
            .build();
        debug!(node = %node.id, endpoint = %node.endpoint, "created s3 client");
        Self {
            client: Client::from_conf(config),
        }
    }
}

/// Builds an [`S3Store`] for every discovered node.
#[derive(Clone, Copy, Debug, Default)]
pub struct S3Connector;

impl StoreConnector for S3Connector {
    fn connect(&self, node: &StorageNode) -> StoreResult<Arc<dyn ObjectStore>> {
        if node.endpoint.is_empty() {
            return Err(StoreError::Connect {
                endpoint: node.endpoint.clone(),
                message: "empty endpoint".into(),
            });
        }
        Ok(Arc::new(S3Store::new(node)))
    }
}

fn sdk_message<E, R>(err: &SdkError<E, R>) -> String
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    DisplayErrorContext(err).to_string()
}

fn to_chrono(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err)
                if err.as_service_error().is_some_and(|e| e.is_not_found())
                    || err
                        .raw_response()
                        .is_some_and(|resp| resp.status().as_u16() == 404) =>
            {
                Ok(false)
            }
            Err(err) => Err(StoreError::backend("head bucket", sdk_message(&err))),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err.as_service_error().is_some_and(|e| {
                    e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                }) =>
            {
                Err(StoreError::BucketAlreadyExists(bucket.to_string()))
            }
            Err(err) => Err(StoreError::backend("create bucket", sdk_message(&err))),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<(Bytes, ObjectInfo)> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Err(StoreError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
            Err(err) => return Err(StoreError::backend("get object", sdk_message(&err))),
        };

        let info = ObjectInfo {
            content_type: output.content_type().map(str::to_string),
            size_bytes: output.content_length().unwrap_or_default(),
            etag: output.e_tag().map(|e| e.trim_matches('"').to_string()),
            last_modified: output.last_modified().and_then(to_chrono),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|err| StoreError::backend("read object body", err.to_string()))?
            .into_bytes();

        Ok((data, info))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<UploadInfo> {
        let size_bytes = data.len() as i64;
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(size_bytes)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| StoreError::backend("put object", sdk_message(&err)))?;

        Ok(UploadInfo {
            size_bytes,
            etag: output.e_tag().map(|e| e.trim_matches('"').to_string()),
        })
    }
}
