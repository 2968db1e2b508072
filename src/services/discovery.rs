//! Node discovery against the container runtime.
//!
//! Storage nodes are MinIO containers carrying [`NODE_LABEL`], attached to
//! [`NETWORK_NAME`]. Their root credentials are read back out of each
//! container's environment.

use crate::models::node::{Credentials, StorageNode};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const NODE_LABEL: &str = "minio.storage.node=true";
pub const NETWORK_NAME: &str = "shard-gateway";
pub const ACCESS_KEY_VAR: &str = "MINIO_ROOT_USER";
pub const SECRET_KEY_VAR: &str = "MINIO_ROOT_PASSWORD";
pub const OBJECT_STORE_PORT: u16 = 9000;
/// Length of the container id prefix used as node id and bucket name.
pub const NODE_ID_LEN: usize = 12;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no nodes found with label `{0}`")]
    NoNodes(String),
    #[error("network `{name}` not found ({matches} matches)")]
    NetworkNotFound { name: String, matches: usize },
    #[error("container `{container}` has no address on network `{network}`")]
    MissingAddress { container: String, network: String },
    #[error("container `{container}` does not declare `{variable}`")]
    MissingCredential {
        container: String,
        variable: &'static str,
    },
    #[error("containers `{first}` and `{second}` share node id `{id}`")]
    DuplicateNodeId {
        id: String,
        first: String,
        second: String,
    },
    #[error("{context}: {source}")]
    Runtime {
        context: String,
        #[source]
        source: BoxError,
    },
}

/// What discovery needs to know about one running container.
#[derive(Clone, Debug, Default)]
pub struct ContainerRecord {
    /// Full container id.
    pub id: String,
    /// Raw `KEY=VALUE` environment entries.
    pub env: Vec<String>,
    /// Network name -> IP address on that network.
    pub networks: HashMap<String, String>,
}

#[derive(Clone, Debug, Default)]
pub struct NetworkRecord {
    pub id: String,
    pub name: String,
}

/// Read-only view of the container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Running containers matching a `key=value` label filter, fully inspected.
    async fn containers_with_label(&self, label: &str)
    -> Result<Vec<ContainerRecord>, DiscoveryError>;

    /// Networks matching a name filter.
    async fn networks_named(&self, name: &str) -> Result<Vec<NetworkRecord>, DiscoveryError>;
}

/// Enumerates storage nodes through a [`ContainerRuntime`].
pub struct NodeDirectory<R> {
    runtime: R,
}

impl<R: ContainerRuntime> NodeDirectory<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// Discover every storage node, sorted by node id.
    pub async fn discover_nodes(&self) -> Result<Vec<StorageNode>, DiscoveryError> {
        debug!(label = NODE_LABEL, "listing storage containers");
        let containers = self.runtime.containers_with_label(NODE_LABEL).await?;
        if containers.is_empty() {
            return Err(DiscoveryError::NoNodes(NODE_LABEL.to_string()));
        }

        debug!(network = NETWORK_NAME, "resolving network");
        let networks = self.runtime.networks_named(NETWORK_NAME).await?;
        let network = match networks.as_slice() {
            [network] => network,
            _ => {
                return Err(DiscoveryError::NetworkNotFound {
                    name: NETWORK_NAME.to_string(),
                    matches: networks.len(),
                });
            }
        };

        debug!(network = %network.name, id = %network.id, "resolved network");

        let mut nodes: BTreeMap<String, (String, StorageNode)> = BTreeMap::new();
        for container in &containers {
            let node = node_from_container(container, &network.name)?;
            if let Some((first, _)) = nodes.get(&node.id) {
                warn!(id = %node.id, first = %first, second = %container.id, "node id collision");
                return Err(DiscoveryError::DuplicateNodeId {
                    id: node.id,
                    first: first.clone(),
                    second: container.id.clone(),
                });
            }
            info!(node = %node.id, endpoint = %node.endpoint, "discovered storage node");
            nodes.insert(node.id.clone(), (container.id.clone(), node));
        }

        Ok(nodes.into_values().map(|(_, node)| node).collect())
    }
}

fn node_from_container(
    container: &ContainerRecord,
    network: &str,
) -> Result<StorageNode, DiscoveryError> {
    let address = container
        .networks
        .get(network)
        .filter(|ip| !ip.is_empty())
        .ok_or_else(|| DiscoveryError::MissingAddress {
            container: container.id.clone(),
            network: network.to_string(),
        })?;

    let variables = parse_environment(&container.env);
    let credential = |variable: &'static str| {
        variables
            .get(variable)
            .cloned()
            .ok_or_else(|| DiscoveryError::MissingCredential {
                container: container.id.clone(),
                variable,
            })
    };

    Ok(StorageNode {
        id: container.id.chars().take(NODE_ID_LEN).collect(),
        endpoint: format!("{}:{}", address, OBJECT_STORE_PORT),
        credentials: Credentials {
            access_key: credential(ACCESS_KEY_VAR)?,
            secret_key: credential(SECRET_KEY_VAR)?,
        },
    })
}

/// Parse `KEY=VALUE` entries, splitting on the first `=`.
///
/// Entries without `=` are skipped; later duplicates win.
pub fn parse_environment<S: AsRef<str>>(entries: &[S]) -> HashMap<String, String> {
    entries
        .iter()
        .filter_map(|entry| entry.as_ref().split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Canned runtime answers for discovery tests.
    #[derive(Clone, Default)]
    pub(crate) struct FakeRuntime {
        pub containers: Vec<ContainerRecord>,
        pub networks: Vec<NetworkRecord>,
    }

    impl FakeRuntime {
        /// A runtime with one correctly configured container per id.
        pub(crate) fn with_nodes(ids: &[&str]) -> Self {
            let containers = ids
                .iter()
                .enumerate()
                .map(|(i, id)| storage_container(id, &format!("172.28.0.{}", i + 2)))
                .collect();
            Self {
                containers,
                networks: vec![NetworkRecord {
                    id: "net-1".into(),
                    name: NETWORK_NAME.into(),
                }],
            }
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn containers_with_label(
            &self,
            _label: &str,
        ) -> Result<Vec<ContainerRecord>, DiscoveryError> {
            Ok(self.containers.clone())
        }

        async fn networks_named(&self, _name: &str) -> Result<Vec<NetworkRecord>, DiscoveryError> {
            Ok(self.networks.clone())
        }
    }

    pub(crate) fn storage_container(id: &str, ip: &str) -> ContainerRecord {
        ContainerRecord {
            id: id.to_string(),
            env: vec![
                "PATH=/usr/bin".into(),
                format!("{}=admin", ACCESS_KEY_VAR),
                format!("{}=pa=ss==word", SECRET_KEY_VAR),
            ],
            networks: HashMap::from([(NETWORK_NAME.to_string(), ip.to_string())]),
        }
    }

    #[test]
    fn parse_environment_splits_on_first_equals() {
        let vars = parse_environment(&["A=1", "B=x=y=z", "EMPTY=", "NOEQUALS", "A=2"]);
        assert_eq!(vars.get("A").map(String::as_str), Some("2"));
        assert_eq!(vars.get("B").map(String::as_str), Some("x=y=z"));
        assert_eq!(vars.get("EMPTY").map(String::as_str), Some(""));
        assert!(!vars.contains_key("NOEQUALS"));
    }

    #[tokio::test]
    async fn discovers_nodes_with_truncated_ids() {
        let runtime = FakeRuntime::with_nodes(&[
            "f00dfacecafe0000111122223333",
            "0badc0ffee00aaaabbbbccccdddd",
        ]);
        let nodes = NodeDirectory::new(runtime).discover_nodes().await.unwrap();

        assert_eq!(nodes.len(), 2);
        // sorted by id
        assert_eq!(nodes[0].id, "0badc0ffee00");
        assert_eq!(nodes[0].endpoint, "172.28.0.3:9000");
        assert_eq!(nodes[1].id, "f00dfacecafe");
        assert_eq!(nodes[1].endpoint, "172.28.0.2:9000");
        assert_eq!(nodes[1].credentials.access_key, "admin");
        assert_eq!(nodes[1].credentials.secret_key, "pa=ss==word");
    }

    #[tokio::test]
    async fn no_containers_is_an_error() {
        let runtime = FakeRuntime::with_nodes(&[]);
        let err = NodeDirectory::new(runtime).discover_nodes().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NoNodes(_)));
    }

    #[tokio::test]
    async fn network_must_resolve_uniquely() {
        let mut runtime = FakeRuntime::with_nodes(&["aaaaaaaaaaaaaaaa"]);
        runtime.networks.clear();
        let err = NodeDirectory::new(runtime.clone())
            .discover_nodes()
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NetworkNotFound { matches: 0, .. }));

        runtime.networks = vec![
            NetworkRecord {
                id: "n1".into(),
                name: NETWORK_NAME.into(),
            },
            NetworkRecord {
                id: "n2".into(),
                name: format!("{}_default", NETWORK_NAME),
            },
        ];
        let err = NodeDirectory::new(runtime).discover_nodes().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NetworkNotFound { matches: 2, .. }));
    }

    #[tokio::test]
    async fn container_off_network_is_rejected() {
        let mut runtime = FakeRuntime::with_nodes(&["aaaaaaaaaaaaaaaa"]);
        runtime.containers[0].networks = HashMap::from([("bridge".into(), "10.0.0.2".into())]);
        let err = NodeDirectory::new(runtime).discover_nodes().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingAddress { .. }));
    }

    #[tokio::test]
    async fn missing_secret_is_rejected() {
        let mut runtime = FakeRuntime::with_nodes(&["aaaaaaaaaaaaaaaa"]);
        runtime.containers[0]
            .env
            .retain(|entry| !entry.starts_with(SECRET_KEY_VAR));
        let err = NodeDirectory::new(runtime).discover_nodes().await.unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::MissingCredential {
                variable: SECRET_KEY_VAR,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn truncated_id_collision_is_rejected() {
        let runtime = FakeRuntime::with_nodes(&["abcdefabcdef1111", "abcdefabcdef2222"]);
        let err = NodeDirectory::new(runtime).discover_nodes().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::DuplicateNodeId { .. }));
    }
}
