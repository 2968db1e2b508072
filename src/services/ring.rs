//! Consistent hashing ring mapping object ids onto storage nodes.
//!
//! Each node is placed on a `u64` circle at `VNODES_PER_NODE` positions
//! derived from `md5(node_id#index)`. A key is owned by the first position at
//! or after `md5(key)`, walking clockwise and wrapping around.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Virtual positions per node.
pub const VNODES_PER_NODE: u16 = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingError {
    #[error("empty ring: no nodes registered")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct HashRing {
    /// Ring position -> node id.
    vnodes: BTreeMap<u64, String>,
    nodes: BTreeSet<String>,
    vnodes_per_node: u16,
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(VNODES_PER_NODE)
    }
}

impl HashRing {
    pub fn new(vnodes_per_node: u16) -> Self {
        Self {
            vnodes: BTreeMap::new(),
            nodes: BTreeSet::new(),
            vnodes_per_node: vnodes_per_node.max(1),
        }
    }

    /// Register a node. Adding an id that is already present is a no-op.
    pub fn add(&mut self, node_id: &str) {
        if self.nodes.contains(node_id) {
            debug!(node_id, "node already on ring");
            return;
        }

        for i in 0..self.vnodes_per_node {
            let pos = vnode_position(node_id, i);
            // On a position collision the smaller id wins, so the final ring
            // does not depend on the order nodes were added in.
            match self.vnodes.get(&pos) {
                Some(existing) if existing.as_str() <= node_id => {}
                _ => {
                    self.vnodes.insert(pos, node_id.to_string());
                }
            }
        }

        self.nodes.insert(node_id.to_string());
        debug!(node_id, vnodes = self.vnodes_per_node, "added node to ring");
    }

    /// Resolve the node owning `key`.
    pub fn lookup(&self, key: &str) -> Result<&str, RingError> {
        if self.is_empty() {
            return Err(RingError::Empty);
        }
        let pos = key_position(key);
        self.vnodes
            .range(pos..)
            .chain(self.vnodes.range(..pos))
            .map(|(_, node_id)| node_id.as_str())
            .next()
            .ok_or(RingError::Empty)
    }

    /// Number of physical nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registered node ids in sorted order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }
}

fn vnode_position(node_id: &str, index: u16) -> u64 {
    position(format!("{}#{}", node_id, index).as_bytes())
}

fn key_position(key: &str) -> u64 {
    position(key.as_bytes())
}

/// First 8 bytes of the MD5 digest, little-endian.
fn position(input: &[u8]) -> u64 {
    let digest = md5::compute(input);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
