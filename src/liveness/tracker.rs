//! Worker liveness tracker
//!
//! Process-wide registry of workers driven by the heartbeat protocol. Workers
//! register once, then heartbeat; the sweep flips silent workers offline. Every
//! transition is published on the [`Broadcaster`].
//!
//! State per worker: registered → online ⇄ offline → deleted. Only an explicit
//! delete removes an entry.

use crate::config::LivenessConfig;
use crate::error::{FlowForgeError, Result};
use crate::liveness::broadcast::{Broadcaster, NodeEvent, WorkerRef};
use crate::liveness::clock::Clock;
use crate::liveness::types::{
    HeartbeatAck, MetricsAck, RegisterRequest, Registration, Worker, WorkerReport,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct LivenessTracker {
    /// Keyed by worker id so the highest id is always the last key
    workers: RwLock<BTreeMap<u32, Worker>>,
    clock: Arc<dyn Clock>,
    events: Broadcaster,
    heartbeat_interval_ms: u64,
    heartbeat_timeout: chrono::Duration,
}

impl LivenessTracker {
    /// Create an empty tracker
    pub fn new(config: &LivenessConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_workers(config, clock, Vec::new())
    }

    /// Create a tracker pre-populated with `workers` (fixtures, demos)
    pub fn with_workers(config: &LivenessConfig, clock: Arc<dyn Clock>, workers: Vec<Worker>) -> Self {
        let heartbeat_timeout =
            chrono::Duration::from_std(config.heartbeat_timeout()).unwrap_or(chrono::Duration::MAX);
        Self {
            workers: RwLock::new(workers.into_iter().map(|w| (w.id, w)).collect()),
            clock,
            events: Broadcaster::new(config.broadcast_capacity),
            heartbeat_interval_ms: config.heartbeat_interval_ms,
            heartbeat_timeout,
        }
    }

    pub fn events(&self) -> &Broadcaster {
        &self.events
    }

    pub fn heartbeat_interval_ms(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    /// Register a worker and assign it the next id.
    ///
    /// Ids are `max(existing) + 1`, so deleting the highest-id worker frees its
    /// id for the next registration.
    pub async fn register(&self, request: RegisterRequest) -> Result<Registration> {
        let address = match request.address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => {
                tracing::warn!("Rejected registration without an address: {:?}", request);
                return Err(FlowForgeError::Validation("address is required".to_string()));
            }
        };

        let worker = {
            let mut workers = self.workers.write().await;
            let id = workers.keys().next_back().map_or(1, |max| max + 1);
            let worker = Worker::registered(id, request, address, self.clock.now());
            workers.insert(id, worker.clone());
            worker
        };

        tracing::info!("🛰️ Worker registered: {} (ID: {}) at {}", worker.name, worker.id, worker.address);
        let worker_id = worker.id;
        self.events.publish(NodeEvent::NodeUpdate(worker));

        Ok(Registration {
            worker_id,
            status: "registered".to_string(),
            heartbeat_interval_ms: self.heartbeat_interval_ms,
        })
    }

    /// Record a heartbeat: refresh the timestamp, force online, update usage,
    /// and replace the task list when the report carries one.
    pub async fn heartbeat(&self, worker_id: u32, report: WorkerReport) -> Result<HeartbeatAck> {
        let now = self.clock.now();
        let (worker, revived) = {
            let mut workers = self.workers.write().await;
            let worker = workers.get_mut(&worker_id).ok_or_else(|| {
                tracing::warn!("Heartbeat from unknown worker: {}", worker_id);
                FlowForgeError::NotFound(worker_id)
            })?;
            let revived = !worker.online;
            worker.online = true;
            worker.last_heartbeat = Some(now);
            if let Some(tasks) = &report.tasks {
                worker.tasks = tasks.clone();
            }
            worker.apply_usage(&report, now);
            (worker.clone(), revived)
        };

        tracing::debug!("Heartbeat received from {}", worker_id);
        if revived {
            tracing::info!("Worker {} is back online", worker_id);
            self.events.publish(NodeEvent::NodeOnline(worker));
        } else {
            self.events.publish(NodeEvent::NodeUpdate(worker));
        }

        Ok(HeartbeatAck {
            status: "ok".to_string(),
            next_heartbeat_interval_ms: self.heartbeat_interval_ms,
        })
    }

    /// Update usage figures only; liveness and tasks are left alone
    pub async fn report_metrics(&self, worker_id: u32, report: WorkerReport) -> Result<MetricsAck> {
        let now = self.clock.now();
        {
            let mut workers = self.workers.write().await;
            let worker = workers.get_mut(&worker_id).ok_or_else(|| {
                tracing::warn!("Metrics from unknown worker: {}", worker_id);
                FlowForgeError::NotFound(worker_id)
            })?;
            worker.apply_usage(&report, now);
        }

        tracing::debug!("Metrics updated for {}", worker_id);
        Ok(MetricsAck {
            status: "ok".to_string(),
        })
    }

    pub async fn set_online(&self, worker_id: u32) -> Result<Worker> {
        let worker = {
            let mut workers = self.workers.write().await;
            let worker = workers
                .get_mut(&worker_id)
                .ok_or(FlowForgeError::NotFound(worker_id))?;
            worker.online = true;
            worker.clone()
        };

        tracing::info!("Worker {} set online", worker_id);
        self.events.publish(NodeEvent::NodeOnline(worker.clone()));
        Ok(worker)
    }

    pub async fn set_offline(&self, worker_id: u32) -> Result<Worker> {
        let worker = {
            let mut workers = self.workers.write().await;
            let worker = workers
                .get_mut(&worker_id)
                .ok_or(FlowForgeError::NotFound(worker_id))?;
            worker.online = false;
            worker.clone()
        };

        tracing::info!("Worker {} set offline", worker_id);
        self.events.publish(NodeEvent::NodeOffline(WorkerRef { id: worker_id }));
        Ok(worker)
    }

    pub async fn delete(&self, worker_id: u32) -> Result<Worker> {
        let removed = self
            .workers
            .write()
            .await
            .remove(&worker_id)
            .ok_or(FlowForgeError::NotFound(worker_id))?;

        tracing::info!("🗑️ Worker {} deleted", worker_id);
        self.events.publish(NodeEvent::NodeDeleted(WorkerRef { id: worker_id }));
        Ok(removed)
    }

    /// All workers ordered by id
    pub async fn list(&self) -> Vec<Worker> {
        self.workers.read().await.values().cloned().collect()
    }

    /// Lookup that is expected to miss, e.g. for a deleted worker still reporting
    pub async fn get(&self, worker_id: u32) -> Option<Worker> {
        self.workers.read().await.get(&worker_id).cloned()
    }

    /// Mark online workers offline when their last heartbeat is older than the
    /// timeout, or when they never sent one. Returns the ids that timed out.
    pub async fn sweep(&self) -> Vec<u32> {
        let now = self.clock.now();
        let timed_out: Vec<Worker> = {
            let mut workers = self.workers.write().await;
            workers
                .values_mut()
                .filter(|worker| worker.online)
                .filter(|worker| match worker.last_heartbeat {
                    None => true,
                    Some(last) => now - last > self.heartbeat_timeout,
                })
                .map(|worker| {
                    worker.online = false;
                    worker.clone()
                })
                .collect()
        };

        timed_out
            .into_iter()
            .map(|worker| {
                tracing::warn!("⏰ Worker {} timed out", worker.id);
                let id = worker.id;
                self.events.publish(NodeEvent::NodeUpdate(worker));
                id
            })
            .collect()
    }
}
