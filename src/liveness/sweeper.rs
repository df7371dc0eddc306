//! Background task that periodically runs the liveness sweep

use crate::liveness::tracker::LivenessTracker;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct HeartbeatSweeper {
    tracker: Arc<LivenessTracker>,
    interval: Duration,
    cancel: CancellationToken,
}

impl HeartbeatSweeper {
    pub fn new(tracker: Arc<LivenessTracker>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            tracker,
            interval,
            cancel,
        }
    }

    /// Run the sweep loop. Blocks until cancelled.
    pub async fn run(&self) {
        tracing::info!("🧹 Heartbeat sweeper started (every {:?})", self.interval);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.cancel.cancelled() => {
                    tracing::info!("Heartbeat sweeper shutting down");
                    break;
                }
            }

            let timed_out = self.tracker.sweep().await;
            if !timed_out.is_empty() {
                tracing::info!("Sweep marked {} worker(s) offline: {:?}", timed_out.len(), timed_out);
            }
        }
    }

    /// Spawn the loop onto the runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
