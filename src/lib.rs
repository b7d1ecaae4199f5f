//! Tiered Distributed File Store Library
//!
//! Files are split into chunks on the client and placed through two tiers of
//! load balancing before landing on a storage node. The binary (`main.rs`) runs
//! any of the three services or a client command on top of these modules.
//!
//! ## Architecture Modules
//! - **`node`**: the storage node. Keeps chunk bytes on local disk and reports
//!   its free capacity and chunk count.
//! - **`cluster`**: the cluster manager. Heartbeats its nodes and picks one per
//!   chunk by score (`free_mb - 50 * chunk_count`), breaking ties at random.
//! - **`balancer`**: the global balancer. Heartbeats cluster managers and routes
//!   each chunk to the cluster with the most free space.
//! - **`metadata`**: per-file placement documents, the only record of where
//!   chunks live.
//! - **`client`**: upload, download, delete, list and search against a local
//!   workspace.
//! - **`search`**: the lexical index queried by the client.
//!
//! Shared plumbing lives in `config`, `error`, `health` and `protocol`.

pub mod balancer;
pub mod client;
pub mod cluster;
pub mod config;
pub mod error;
pub mod health;
pub mod metadata;
pub mod node;
pub mod protocol;
pub mod search;

#[cfg(test)]
mod test_support;
