//! Service Configuration
//!
//! Each process reads its configuration exactly once at start-up (CLI flags with
//! environment fallbacks) and receives an immutable value at construction time.
//! Address lists arrive as JSON, the same shape the launch scripts export:
//! `NODES='["http://localhost:5001", ...]'` and
//! `CLUSTERS='{"cluster_1": "http://localhost:7001", ...}'`.

use crate::error::ConfigError;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Bound applied to every outbound call (probe, forward, fetch, delete).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const NODE_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
pub const CLUSTER_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// MB subtracted from a node's score for every chunk it already holds.
pub const CHUNK_PENALTY_MB: u64 = 50;
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_UPLOAD_PARALLELISM: usize = 8;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub capacity_mb: u64,
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub nodes: Vec<String>,
    pub heartbeat_interval: Duration,
    pub request_timeout: Duration,
    pub chunk_penalty: u64,
    /// Fixes the tie-break RNG; `None` seeds from entropy.
    pub selection_seed: Option<u64>,
}

impl ClusterConfig {
    pub fn new(nodes: Vec<String>) -> Self {
        Self {
            nodes,
            heartbeat_interval: NODE_HEARTBEAT_INTERVAL,
            request_timeout: DEFAULT_TIMEOUT,
            chunk_penalty: CHUNK_PENALTY_MB,
            selection_seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BalancerConfig {
    /// Cluster name -> cluster manager base URL.
    pub clusters: BTreeMap<String, String>,
    pub heartbeat_interval: Duration,
    pub request_timeout: Duration,
}

impl BalancerConfig {
    pub fn new(clusters: BTreeMap<String, String>) -> Self {
        Self {
            clusters,
            heartbeat_interval: CLUSTER_HEARTBEAT_INTERVAL,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client-side settings. Everything the client persists lives under `workspace`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub balancer_url: String,
    pub workspace: PathBuf,
    pub request_timeout: Duration,
    pub chunk_size: usize,
    pub upload_parallelism: usize,
}

impl ClientConfig {
    pub fn new(balancer_url: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            balancer_url: normalize_address(&balancer_url.into()),
            workspace: workspace.into(),
            request_timeout: DEFAULT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            upload_parallelism: DEFAULT_UPLOAD_PARALLELISM,
        }
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.workspace.join("metadata")
    }

    pub fn chunk_dir(&self) -> PathBuf {
        self.workspace.join("chunks")
    }

    pub fn download_dir(&self) -> PathBuf {
        self.workspace.join("downloaded_files")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.workspace.join("index")
    }
}

/// Parses the `NODES` JSON array of storage node base URLs.
pub fn parse_node_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let nodes: Vec<String> = serde_json::from_str(raw).map_err(|source| {
        ConfigError::Unparseable {
            name: "NODES",
            source,
        }
    })?;

    let nodes: Vec<String> = nodes.iter().map(|n| normalize_address(n)).collect();
    if nodes.is_empty() {
        return Err(ConfigError::Empty { name: "NODES" });
    }
    if let Some(bad) = nodes.iter().find(|n| !is_http_address(n)) {
        return Err(ConfigError::InvalidAddress {
            name: "NODES",
            address: bad.clone(),
        });
    }

    let mut unique = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !unique.contains(&node) {
            unique.push(node);
        }
    }
    Ok(unique)
}

/// Parses the `CLUSTERS` JSON object mapping cluster names to manager URLs.
pub fn parse_cluster_map(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let clusters: BTreeMap<String, String> =
        serde_json::from_str(raw).map_err(|source| ConfigError::Unparseable {
            name: "CLUSTERS",
            source,
        })?;

    if clusters.is_empty() {
        return Err(ConfigError::Empty { name: "CLUSTERS" });
    }

    let clusters: BTreeMap<String, String> = clusters
        .into_iter()
        .map(|(name, url)| (name, normalize_address(&url)))
        .collect();
    if let Some(bad) = clusters.values().find(|url| !is_http_address(url)) {
        return Err(ConfigError::InvalidAddress {
            name: "CLUSTERS",
            address: bad.clone(),
        });
    }
    Ok(clusters)
}

/// Node list for a cluster manager; a bad list degrades to an empty one.
pub fn node_list_or_degraded(raw: &str) -> Vec<String> {
    match parse_node_list(raw) {
        Ok(nodes) => {
            tracing::info!("Nodes configured: {:?}", nodes);
            nodes
        }
        Err(e) => {
            tracing::error!("{}; every upload will be refused", e);
            Vec::new()
        }
    }
}

/// Cluster map for the global balancer; a bad map degrades to an empty one.
pub fn cluster_map_or_degraded(raw: &str) -> BTreeMap<String, String> {
    match parse_cluster_map(raw) {
        Ok(clusters) => {
            tracing::info!("Clusters configured: {:?}", clusters.keys().collect::<Vec<_>>());
            clusters
        }
        Err(e) => {
            tracing::error!("{}; every upload will be refused", e);
            BTreeMap::new()
        }
    }
}

pub fn normalize_address(address: &str) -> String {
    address.trim().trim_end_matches('/').to_string()
}

fn is_http_address(address: &str) -> bool {
    let rest = address
        .strip_prefix("http://")
        .or_else(|| address.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty())
}
