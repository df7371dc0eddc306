//! Worker-side client for the registration and heartbeat protocol
//!
//! A worker registers once, then heartbeats on the interval the server hands
//! back. Heartbeat failures are logged and retried on the next tick; the loop
//! only ends when cancelled.

use crate::liveness::types::{HeartbeatAck, MetricsAck, RegisterRequest, Registration, WorkerReport};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Produces the usage report sent with each heartbeat
pub trait MetricsSource: Send + Sync {
    fn report(&self) -> WorkerReport;
}

impl<F> MetricsSource for F
where
    F: Fn() -> WorkerReport + Send + Sync,
{
    fn report(&self) -> WorkerReport {
        self()
    }
}

#[derive(Debug, Clone)]
pub struct WorkerClient {
    base_url: String,
    http: reqwest::Client,
    worker_id: Option<u32>,
    heartbeat_interval: Duration,
}

impl WorkerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            worker_id: None,
            heartbeat_interval: Duration::from_millis(crate::config::DEFAULT_HEARTBEAT_INTERVAL_MS),
        }
    }

    /// Id assigned at registration
    pub fn worker_id(&self) -> Option<u32> {
        self.worker_id
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub async fn register(&mut self, request: &RegisterRequest) -> Result<Registration> {
        let url = format!("{}/api/v1/workers/register", self.base_url);
        let registration: Registration = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Registration request failed: {}", e))?
            .error_for_status()
            .context("Registration rejected")?
            .json()
            .await
            .context("Failed to parse registration response")?;

        self.worker_id = Some(registration.worker_id);
        self.heartbeat_interval = Duration::from_millis(registration.heartbeat_interval_ms);
        tracing::info!(
            "🛰️ Registered as worker {} (heartbeat every {:?})",
            registration.worker_id,
            self.heartbeat_interval
        );
        Ok(registration)
    }

    /// Send one heartbeat and adopt the interval the server suggests
    pub async fn heartbeat(&mut self, report: &WorkerReport) -> Result<HeartbeatAck> {
        let worker_id = self.registered_id()?;
        let url = format!("{}/api/v1/workers/{}/heartbeat", self.base_url, worker_id);
        let ack: HeartbeatAck = self
            .http
            .post(&url)
            .json(report)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Heartbeat request failed: {}", e))?
            .error_for_status()
            .context("Heartbeat rejected")?
            .json()
            .await
            .context("Failed to parse heartbeat response")?;

        self.heartbeat_interval = Duration::from_millis(ack.next_heartbeat_interval_ms);
        tracing::debug!("💓 Heartbeat sent for worker {}", worker_id);
        Ok(ack)
    }

    pub async fn report_metrics(&self, report: &WorkerReport) -> Result<MetricsAck> {
        let worker_id = self.registered_id()?;
        let url = format!("{}/api/v1/workers/{}/metrics", self.base_url, worker_id);
        let ack = self
            .http
            .post(&url)
            .json(report)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Metrics request failed: {}", e))?
            .error_for_status()
            .context("Metrics rejected")?
            .json()
            .await
            .context("Failed to parse metrics response")?;
        Ok(ack)
    }

    /// Heartbeat loop. Blocks until cancelled.
    pub async fn run(&mut self, source: &dyn MetricsSource, cancel: CancellationToken) -> Result<()> {
        self.registered_id()?;

        loop {
            if let Err(e) = self.heartbeat(&source.report()).await {
                tracing::warn!("❌ Heartbeat failed: {:#}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.heartbeat_interval) => {}
                _ = cancel.cancelled() => {
                    tracing::info!("Worker heartbeat loop stopped");
                    return Ok(());
                }
            }
        }
    }

    fn registered_id(&self) -> Result<u32> {
        self.worker_id
            .ok_or_else(|| anyhow::anyhow!("Worker is not registered"))
    }
}
