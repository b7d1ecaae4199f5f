//! Health probing shared by both balancing tiers.
//!
//! A probe is a bounded `GET {address}/status`. Its outcome only feeds the view
//! cache of the caller; a failed probe never raises further.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const ENDPOINT_STATUS: &str = "/status";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Alive,
    Down,
}

/// Fetches and decodes `{address}/status` within `timeout`.
pub async fn probe_status<T: DeserializeOwned>(
    client: &reqwest::Client,
    address: &str,
    timeout: Duration,
) -> Result<T> {
    let response = client
        .get(format!("{}{}", address, ENDPOINT_STATUS))
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;

    Ok(response.json::<T>().await?)
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
