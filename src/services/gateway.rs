//! Routing gateway: owns the ring and one [`NodeClient`] per node.
//!
//! A [`Gateway`] can only be obtained from [`Gateway::setup`], which runs
//! discovery, prepares every node's bucket and builds the ring. Once built it
//! is never mutated, so it is shared across request tasks as `Arc<Gateway>`
//! without locking.

use crate::{
    models::{
        node::StorageNode,
        object::{ObjectInfo, UploadInfo},
    },
    services::{
        content_type::detect_content_type,
        discovery::{ContainerRuntime, DiscoveryError, NODE_LABEL, NodeDirectory},
        node_client::NodeClient,
        object_store::{StoreConnector, StoreError},
        ring::{HashRing, RingError},
    },
};
use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Ring(#[from] RingError),
    #[error("object `{0}` not found")]
    ObjectNotFound(String),
    #[error("node `{node}`: {source}")]
    Node {
        node: String,
        #[source]
        source: StoreError,
    },
    #[error("ring resolved node `{0}` but no client is registered for it")]
    Routing(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

pub struct Gateway {
    ring: HashRing,
    clients: HashMap<String, NodeClient>,
}

impl Gateway {
    /// Discover nodes and register each one. Any failure aborts setup.
    pub async fn setup<R, C>(directory: &NodeDirectory<R>, connector: &C) -> GatewayResult<Self>
    where
        R: ContainerRuntime,
        C: StoreConnector + ?Sized,
    {
        let nodes = directory.discover_nodes().await?;
        let gateway = Self::from_nodes(nodes, connector).await?;
        info!(nodes = gateway.ring.len(), "gateway ready");
        Ok(gateway)
    }

    /// Register already discovered nodes: connect, ensure bucket, add to ring.
    pub async fn from_nodes<C>(nodes: Vec<StorageNode>, connector: &C) -> GatewayResult<Self>
    where
        C: StoreConnector + ?Sized,
    {
        if nodes.is_empty() {
            return Err(DiscoveryError::NoNodes(NODE_LABEL.to_string()).into());
        }

        let mut ring = HashRing::default();
        let mut clients = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let node_id = node.id.clone();
            let store = connector
                .connect(&node)
                .map_err(|source| node_error(&node_id, source))?;
            let client = NodeClient::new(node, store);
            client
                .ensure_bucket()
                .await
                .map_err(|source| node_error(&node_id, source))?;

            // ring and client map are kept in lock-step
            ring.add(&node_id);
            clients.insert(node_id, client);
        }

        Ok(Self { ring, clients })
    }

    /// Id of the node owning `id`.
    pub fn owner_of(&self, id: &str) -> GatewayResult<&str> {
        Ok(self.ring.lookup(id)?)
    }

    fn client_for(&self, id: &str) -> GatewayResult<&NodeClient> {
        let node_id = self.owner_of(id)?;
        self.clients
            .get(node_id)
            .ok_or_else(|| GatewayError::Routing(node_id.to_string()))
    }

    pub async fn get_object(&self, id: &str) -> GatewayResult<(Bytes, ObjectInfo)> {
        let client = self.client_for(id)?;
        debug!(id, node = client.id(), "routing get");
        let (data, info) = client.get(id).await.map_err(|err| match err {
            StoreError::ObjectNotFound { .. } => GatewayError::ObjectNotFound(id.to_string()),
            other => node_error(client.id(), other),
        })?;
        info!(
            id,
            node = client.id(),
            size = info.size_bytes,
            etag = info.etag.as_deref().unwrap_or_default(),
            "object was retrieved"
        );
        Ok((data, info))
    }

    /// Store `data` under `id` on its owning node.
    ///
    /// When `content_type` is `None` it is sniffed from the payload.
    pub async fn put_object(
        &self,
        id: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> GatewayResult<UploadInfo> {
        let client = self.client_for(id)?;
        let content_type = match content_type {
            Some(value) => value.to_string(),
            None => detect_content_type(&data),
        };
        debug!(id, node = client.id(), %content_type, "routing put");
        let upload = client
            .put(id, data, &content_type)
            .await
            .map_err(|err| node_error(client.id(), err))?;
        info!(
            id,
            node = client.id(),
            size = upload.size_bytes,
            etag = upload.etag.as_deref().unwrap_or_default(),
            "object was uploaded"
        );
        Ok(upload)
    }

    /// Registered node clients, sorted by node id.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeClient> {
        self.ring
            .node_ids()
            .filter_map(|node_id| self.clients.get(node_id))
    }

    pub fn node_count(&self) -> usize {
        self.clients.len()
    }
}

fn node_error(node: &str, source: StoreError) -> GatewayError {
    GatewayError::Node {
        node: node.to_string(),
        source,
    }
}
