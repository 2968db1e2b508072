//! Core data models for the sharding gateway.
//!
//! These describe the discovered storage nodes and the metadata reported by
//! a node's object store. Object bytes themselves are never modelled here;
//! they only pass through the gateway.

pub mod node;
pub mod object;
