//! Represents a discovered storage node, one independent object store.

use std::fmt;

/// Access key / secret pair for a node's object-store API.
///
/// Extracted from the node container's environment during discovery.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// A storage node owning a partition of the identifier space.
///
/// Built once during startup discovery and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageNode {
    /// Short stable identifier (truncated container id). Also the bucket name.
    pub id: String,

    /// `host:port` of the node's object-store API.
    pub endpoint: String,

    pub credentials: Credentials,
}

impl StorageNode {
    /// Name of the bucket holding this node's objects.
    pub fn bucket(&self) -> &str {
        &self.id
    }
}
