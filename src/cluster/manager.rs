//! Cluster Manager Service
//!
//! Owns the view cache of one cluster's storage nodes and routes every incoming
//! chunk to exactly one of them.
//!
//! ## Responsibilities
//! - **Heartbeat**: a single background task re-probes every configured node on a
//!   fixed interval and replaces its cached view.
//! - **Selection**: scores alive nodes and draws from the top tie band.
//! - **Forwarding**: sends the chunk to the chosen node. A failed forward fails the
//!   request; it neither retries elsewhere nor marks the node down (only the
//!   heartbeat changes cached health).

use super::protocol::ClusterStatusResponse;
use super::selection::NodeSelector;
use super::types::{NodeView, Selection, StoredChunk};
use crate::config::ClusterConfig;
use crate::error::PlacementError;
use crate::health::probe_status;
use crate::node::protocol::{ENDPOINT_STORE, NodeStatusResponse};
use crate::protocol::{chunk_form, failure_reason};

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

pub struct ClusterManager {
    config: ClusterConfig,
    /// Node address -> last view. Written by the heartbeat, read by handlers.
    views: Arc<DashMap<String, NodeView>>,
    selector: NodeSelector,
    http_client: reqwest::Client,
}

impl ClusterManager {
    pub fn new(config: ClusterConfig) -> Arc<Self> {
        if config.nodes.is_empty() {
            tracing::warn!("No nodes configured; cluster manager starts degraded");
        }
        let selector = NodeSelector::new(config.chunk_penalty, config.selection_seed);

        Arc::new(Self {
            config,
            views: Arc::new(DashMap::new()),
            selector,
            http_client: reqwest::Client::new(),
        })
    }

    pub fn nodes(&self) -> &[String] {
        &self.config.nodes
    }

    /// Spawns the heartbeat task and returns immediately.
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "Starting node heartbeat every {:?} for {} nodes",
            self.config.heartbeat_interval,
            self.config.nodes.len()
        );

        let service = self.clone();
        tokio::spawn(async move {
            service.heartbeat_loop().await;
        });
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.heartbeat_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.refresh().await;
        }
    }

    /// Probes every configured node once, concurrently, and records the results.
    pub async fn refresh(&self) {
        let mut probes = JoinSet::new();
        for node in &self.config.nodes {
            let client = self.http_client.clone();
            let node = node.clone();
            let timeout = self.config.request_timeout;
            probes.spawn(async move {
                let result = probe_status::<NodeStatusResponse>(&client, &node, timeout).await;
                (node, result)
            });
        }

        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((node, result)) => {
                    self.record_probe(&node, result.map_err(|e| e.to_string()));
                }
                Err(e) => tracing::error!("Heartbeat probe task failed: {}", e),
            }
        }

        let alive = self.views.iter().filter(|e| e.value().is_alive()).count();
        tracing::debug!("Heartbeat tick done: {}/{} nodes alive", alive, self.config.nodes.len());
    }

    /// Applies one probe outcome to the cache and returns the new view.
    pub fn record_probe(&self, node: &str, outcome: Result<NodeStatusResponse, String>) -> NodeView {
        let previous = self.views.get(node).map(|v| *v);

        let view = match outcome {
            Ok(report) => {
                tracing::debug!("Heartbeat OK from {}", node);
                NodeView::alive(report)
            }
            Err(e) => {
                tracing::warn!("No heartbeat from {}: {}", node, e);
                NodeView::down(previous.as_ref())
            }
        };

        if let Some(previous) = previous
            && previous.status != view.status
        {
            tracing::info!("Node {} is now {:?}", node, view.status);
        }

        self.views.insert(node.to_string(), view);
        view
    }

    pub fn view(&self, node: &str) -> Option<NodeView> {
        self.views.get(node).map(|v| *v)
    }

    /// Views for all configured nodes. Nodes the heartbeat has not reached yet are
    /// probed on demand; an unreachable one is simply left out of this decision.
    pub async fn candidate_views(&self) -> Vec<(String, NodeView)> {
        let mut candidates = Vec::with_capacity(self.config.nodes.len());
        let mut probes = JoinSet::new();

        for node in &self.config.nodes {
            match self.view(node) {
                Some(view) => candidates.push((node.clone(), view)),
                None => {
                    let client = self.http_client.clone();
                    let node = node.clone();
                    let timeout = self.config.request_timeout;
                    probes.spawn(async move {
                        let result =
                            probe_status::<NodeStatusResponse>(&client, &node, timeout).await;
                        (node, result)
                    });
                }
            }
        }

        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((node, Ok(report))) => {
                    // Never clobber a view the heartbeat wrote meanwhile.
                    let view = *self
                        .views
                        .entry(node.clone())
                        .or_insert(NodeView::alive(report));
                    candidates.push((node, view));
                }
                Ok((node, Err(e))) => {
                    tracing::debug!("On-demand probe of {} failed: {}", node, e);
                }
                Err(e) => tracing::error!("On-demand probe task failed: {}", e),
            }
        }

        let order = |address: &String| self.config.nodes.iter().position(|n| n == address);
        candidates.sort_by_key(|(address, _)| order(address));
        candidates
    }

    pub async fn select_node(&self) -> Result<Selection, PlacementError> {
        let candidates = self.candidate_views().await;
        let reachable = candidates.iter().filter(|(_, v)| v.is_alive()).count();

        match self.selector.select(&candidates) {
            Some(selection) => {
                tracing::info!(
                    "[SELECTED NODE] {} -> score {} ({} in top band)",
                    selection.address,
                    selection.score,
                    selection.tied
                );
                Ok(selection)
            }
            None => {
                tracing::warn!("No available alive nodes");
                Err(PlacementError::Unavailable {
                    tier: "node",
                    configured: self.config.nodes.len(),
                    reachable,
                })
            }
        }
    }

    /// Selects a node and stores the chunk on it.
    pub async fn upload_chunk(
        &self,
        chunk_id: String,
        data: Vec<u8>,
    ) -> Result<StoredChunk, PlacementError> {
        let selection = self.select_node().await?;
        self.forward(&selection.address, &chunk_id, data).await?;

        Ok(StoredChunk {
            node: selection.address,
            chunk_id,
        })
    }

    async fn forward(&self, node: &str, chunk_id: &str, data: Vec<u8>) -> Result<(), PlacementError> {
        let response = self
            .http_client
            .post(format!("{}{}", node, ENDPOINT_STORE))
            .multipart(chunk_form(chunk_id, data))
            .timeout(self.config.request_timeout)
            .send()
            .await;

        let reason = match response {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("Forwarded {} to {}", chunk_id, node);
                return Ok(());
            }
            Ok(resp) => failure_reason(resp).await,
            Err(e) => e.to_string(),
        };

        tracing::error!("Upload of {} to node {} failed: {}", chunk_id, node, reason);
        Err(PlacementError::Forwarding {
            target: node.to_string(),
            chunk_id: chunk_id.to_string(),
            reason,
        })
    }

    /// Raw per-node view map.
    pub fn node_heartbeats(&self) -> BTreeMap<String, NodeView> {
        self.views
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Aggregate over the cache. Down nodes contribute 0 free MB but keep their
    /// last known chunk count.
    pub fn status(&self) -> ClusterStatusResponse {
        let node_heartbeats = self.node_heartbeats();

        ClusterStatusResponse {
            cluster_free_mb: node_heartbeats.values().map(|v| v.free_mb).sum(),
            cluster_chunk_count: node_heartbeats.values().map(|v| v.chunk_count).sum(),
            active_nodes: node_heartbeats.values().filter(|v| v.is_alive()).count(),
            node_heartbeats,
        }
    }
}
