//! Discovery, hashing and per-node storage access behind the HTTP layer.

pub mod content_type;
pub mod discovery;
pub mod docker_runtime;
pub mod gateway;
#[cfg(test)]
pub mod memory_store;
pub mod node_client;
pub mod object_store;
pub mod ring;
pub mod s3_store;
