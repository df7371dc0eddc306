//! Worker state-change events and their fan-out channel
//!
//! Delivery is best-effort: events are not queued for subscribers that join
//! later, and publishing with nobody listening is not an error.

use crate::liveness::types::Worker;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Wire format: `{"type": "node_update", "payload": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum NodeEvent {
    /// Registration, heartbeat, or sweep timeout; carries the full record
    NodeUpdate(Worker),
    /// Explicit online command or a heartbeat reviving an offline worker
    NodeOnline(Worker),
    NodeOffline(WorkerRef),
    NodeDeleted(WorkerRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRef {
    pub id: u32,
}

impl NodeEvent {
    pub fn worker_id(&self) -> u32 {
        match self {
            NodeEvent::NodeUpdate(worker) | NodeEvent::NodeOnline(worker) => worker.id,
            NodeEvent::NodeOffline(r) | NodeEvent::NodeDeleted(r) => r.id,
        }
    }
}

/// Event bus using a tokio broadcast channel.
/// All live subscribers receive all events.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<NodeEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: NodeEvent) {
        // Err only means nobody is subscribed
        let delivered = self.tx.send(event).unwrap_or(0);
        tracing::trace!("Broadcast node event to {} subscribers", delivered);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_format() {
        let event = NodeEvent::NodeOffline(WorkerRef { id: 4 });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "node_offline", "payload": {"id": 4}})
        );
        let back: NodeEvent =
            serde_json::from_value(json!({"type": "node_deleted", "payload": {"id": 9}})).unwrap();
        assert_eq!(back.worker_id(), 9);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = Broadcaster::new(4);
        bus.publish(NodeEvent::NodeDeleted(WorkerRef { id: 1 }));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_late_subscriber_gets_no_replay() {
        let bus = Broadcaster::new(4);
        let mut early = bus.subscribe();
        bus.publish(NodeEvent::NodeDeleted(WorkerRef { id: 1 }));
        let mut late = bus.subscribe();

        assert_eq!(early.try_recv().unwrap().worker_id(), 1);
        assert!(late.try_recv().is_err());
    }
}
