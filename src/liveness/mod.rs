//! Worker Liveness Layer
//!
//! Tracks the worker fleet through the heartbeat protocol:
//! - Worker records and protocol payloads
//! - The tracker (register, heartbeat, administrative transitions, sweep)
//! - State-change broadcast to subscribers
//! - Background sweeper and the worker-side client

pub mod types;

pub mod clock;

pub mod broadcast;

pub mod tracker;

// Periodic timeout sweep
pub mod sweeper;

// Worker agent side of the protocol
pub mod client;

pub use broadcast::{Broadcaster, NodeEvent, WorkerRef};
pub use client::{MetricsSource, WorkerClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use sweeper::HeartbeatSweeper;
pub use tracker::LivenessTracker;
pub use types::{
    HeartbeatAck, MetricsAck, RegisterRequest, Registration, Task, TaskStatus, Worker, WorkerReport,
    BYTES_PER_GB,
};
