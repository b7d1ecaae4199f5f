//! Global Balancer Service
//!
//! The top tier: one view per configured cluster manager, refreshed by a single
//! heartbeat task, and a router that sends every chunk to the alive cluster with
//! the most aggregate free space.
//!
//! Selection here is deliberately coarser than inside a cluster: no chunk
//! penalty and no randomised tie band. Among equal clusters the first one in
//! name order wins. Nodes inside the winning cluster are still picked by the
//! cluster manager's own scoring.

use super::protocol::{BalancerStatusResponse, ClusterHeartbeat};
use super::types::{ClusterView, PlacedChunk};
use crate::cluster::protocol::{ClusterStatusResponse, ClusterUploadResponse};
use crate::config::BalancerConfig;
use crate::error::PlacementError;
use crate::health::{HealthStatus, probe_status};
use crate::protocol::{ENDPOINT_UPLOAD_CHUNK, chunk_form, failure_reason};

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

/// The alive cluster with the largest free capacity; the first one wins ties.
pub fn select_cluster(views: &[(String, ClusterView)]) -> Option<(String, u64)> {
    let mut best: Option<(&String, u64)> = None;
    for (name, view) in views.iter().filter(|(_, v)| v.is_alive()) {
        match best {
            Some((_, free_mb)) if view.free_mb <= free_mb => {}
            _ => best = Some((name, view.free_mb)),
        }
    }
    best.map(|(name, free_mb)| (name.clone(), free_mb))
}

pub struct GlobalBalancer {
    config: BalancerConfig,
    /// Cluster name -> last view.
    views: Arc<DashMap<String, ClusterView>>,
    http_client: reqwest::Client,
}

impl GlobalBalancer {
    pub fn new(config: BalancerConfig) -> Arc<Self> {
        if config.clusters.is_empty() {
            tracing::warn!("No clusters configured; global balancer starts degraded");
        }

        Arc::new(Self {
            config,
            views: Arc::new(DashMap::new()),
            http_client: reqwest::Client::new(),
        })
    }

    pub fn clusters(&self) -> &BTreeMap<String, String> {
        &self.config.clusters
    }

    /// Spawns the heartbeat task and returns immediately.
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "Starting cluster heartbeat every {:?} for {} clusters",
            self.config.heartbeat_interval,
            self.config.clusters.len()
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

    /// Probes every cluster manager once, concurrently.
    pub async fn refresh(&self) {
        let mut probes = JoinSet::new();
        for (name, url) in &self.config.clusters {
            let client = self.http_client.clone();
            let name = name.clone();
            let url = url.clone();
            let timeout = self.config.request_timeout;
            probes.spawn(async move {
                let result = probe_status::<ClusterStatusResponse>(&client, &url, timeout).await;
                (name, result)
            });
        }

        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((name, result)) => {
                    let outcome = result
                        .map(|status| status.cluster_free_mb)
                        .map_err(|e| e.to_string());
                    self.record_probe(&name, outcome);
                }
                Err(e) => tracing::error!("Cluster probe task failed: {}", e),
            }
        }
    }

    /// Applies one probe outcome (the cluster's free MB) to the cache.
    pub fn record_probe(&self, cluster: &str, outcome: Result<u64, String>) -> ClusterView {
        let previous = self.views.get(cluster).map(|v| *v);

        let view = match outcome {
            Ok(free_mb) => {
                tracing::debug!("Heartbeat OK from {} ({} MB free)", cluster, free_mb);
                ClusterView::alive(free_mb)
            }
            Err(e) => {
                tracing::warn!("No heartbeat from {}: {}", cluster, e);
                ClusterView::down(previous.as_ref())
            }
        };

        if let Some(previous) = previous
            && previous.status != view.status
        {
            tracing::info!("Cluster {} is now {:?}", cluster, view.status);
        }

        self.views.insert(cluster.to_string(), view);
        view
    }

    pub fn view(&self, cluster: &str) -> Option<ClusterView> {
        self.views.get(cluster).map(|v| *v)
    }

    /// Cached views in configuration order. Only the heartbeat fills this cache.
    fn cached_views(&self) -> Vec<(String, ClusterView)> {
        self.config
            .clusters
            .keys()
            .filter_map(|name| self.view(name).map(|view| (name.clone(), view)))
            .collect()
    }

    pub fn select_cluster(&self) -> Result<(String, String), PlacementError> {
        let views = self.cached_views();
        let reachable = views.iter().filter(|(_, v)| v.is_alive()).count();

        let Some((name, free_mb)) = select_cluster(&views) else {
            tracing::warn!("No available clusters");
            return Err(PlacementError::Unavailable {
                tier: "cluster",
                configured: self.config.clusters.len(),
                reachable,
            });
        };

        let url = self.config.clusters.get(&name).cloned().ok_or_else(|| {
            PlacementError::Unavailable {
                tier: "cluster",
                configured: self.config.clusters.len(),
                reachable,
            }
        })?;

        tracing::info!("[SELECTED CLUSTER] {} -> {} MB free", name, free_mb);
        Ok((name, url))
    }

    /// Selects a cluster and hands the chunk to its manager.
    pub async fn upload_chunk(
        &self,
        chunk_id: String,
        data: Vec<u8>,
    ) -> Result<PlacedChunk, PlacementError> {
        let (cluster, url) = self.select_cluster()?;

        let response = self
            .http_client
            .post(format!("{}{}", url, ENDPOINT_UPLOAD_CHUNK))
            .multipart(chunk_form(&chunk_id, data))
            .timeout(self.config.request_timeout)
            .send()
            .await;

        let forwarding_error = |reason: String| {
            tracing::error!("Upload of {} to cluster {} failed: {}", chunk_id, cluster, reason);
            PlacementError::Forwarding {
                target: cluster.clone(),
                chunk_id: chunk_id.clone(),
                reason,
            }
        };

        let response = match response {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => return Err(forwarding_error(failure_reason(resp).await)),
            Err(e) => return Err(forwarding_error(e.to_string())),
        };

        let stored: ClusterUploadResponse = response
            .json()
            .await
            .map_err(|e| forwarding_error(format!("unreadable cluster reply: {}", e)))?;

        tracing::info!("Forwarded {} to {} (node {})", chunk_id, cluster, stored.node);
        Ok(PlacedChunk {
            cluster,
            node: stored.node,
            chunk_id,
        })
    }

    /// Per-cluster views including the manager URL.
    pub fn heartbeats(&self) -> BTreeMap<String, ClusterHeartbeat> {
        self.views
            .iter()
            .filter_map(|entry| {
                let url = self.config.clusters.get(entry.key())?.clone();
                let view = *entry.value();
                Some((
                    entry.key().clone(),
                    ClusterHeartbeat {
                        url,
                        status: view.status,
                        free_mb: view.free_mb,
                        last_seen: view.last_seen,
                    },
                ))
            })
            .collect()
    }

    pub fn status(&self) -> BalancerStatusResponse {
        let clusters = self.heartbeats();
        BalancerStatusResponse {
            total_free_mb: clusters.values().map(|c| c.free_mb).sum(),
            active_clusters: clusters
                .values()
                .filter(|c| c.status == HealthStatus::Alive)
                .count(),
            clusters,
        }
    }
}
