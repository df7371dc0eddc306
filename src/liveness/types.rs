//! Worker records and the heartbeat protocol payloads
//!
//! Usage figures on a [`Worker`] are kept in gigabytes; reports from workers
//! carry raw byte counts and are converted on arrival.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bytes per gigabyte (2^30) used to convert reported memory and disk usage
pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

const DEFAULT_CPU_CORES: u32 = 4;
const DEFAULT_MEMORY_GB: f64 = 8.0;
const DEFAULT_DISK_GB: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

/// A task a worker reports it is running or has run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    /// Current usage in percent
    pub usage: f64,
    pub cores: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    /// Used memory in GB
    pub used: f64,
    /// Declared capacity in GB
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    /// Used disk in GB
    pub used: f64,
    /// Declared capacity in GB
    pub total: f64,
}

/// A fleet member as seen by the tracker and its subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: u32,
    pub name: String,
    pub online: bool,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disk: DiskInfo,
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Epoch milliseconds of the last heartbeat, `None` if it never sent one
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Last raw report received, stamped with its arrival time
    #[serde(default)]
    pub metrics: Option<Value>,
}

impl Worker {
    /// Build the record for a freshly registered worker
    pub(crate) fn registered(id: u32, request: RegisterRequest, address: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name.unwrap_or_else(|| format!("Worker-{id}")),
            online: true,
            address,
            port: request.port,
            cpu: CpuInfo {
                usage: 0.0,
                cores: request.cpu_cores.unwrap_or(DEFAULT_CPU_CORES),
            },
            memory: MemoryInfo {
                used: 0.0,
                total: request.memory_gb.unwrap_or(DEFAULT_MEMORY_GB),
            },
            disk: DiskInfo {
                used: 0.0,
                total: request.disk_gb.unwrap_or(DEFAULT_DISK_GB),
            },
            tasks: Vec::new(),
            last_heartbeat: Some(now),
            metrics: None,
        }
    }

    /// Update the usage snapshot from a report and keep the raw report.
    ///
    /// Absent sections leave the current figure alone. The disk figure comes
    /// from the first volume; an empty volume list reads as 0.
    pub(crate) fn apply_usage(&mut self, report: &WorkerReport, now: DateTime<Utc>) {
        if let Some(usage) = report.cpu.as_ref().and_then(|cpu| cpu.usage_percent) {
            self.cpu.usage = usage;
        }
        if let Some(used) = report.memory.as_ref().and_then(|memory| memory.used) {
            self.memory.used = used / BYTES_PER_GB;
        }
        if let Some(volumes) = &report.disk {
            self.disk.used = volumes
                .first()
                .and_then(|volume| volume.used)
                .map_or(0.0, |used| used / BYTES_PER_GB);
        }

        let mut raw = serde_json::to_value(report).unwrap_or_default();
        if let Value::Object(fields) = &mut raw {
            fields.insert("timestamp".to_string(), Value::String(now.to_rfc3339()));
        }
        self.metrics = Some(raw);
    }
}

/// Registration body sent by a worker on startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Network address of the worker; older agents send it as `ip`
    #[serde(default, alias = "ip", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_gb: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub worker_id: u32,
    pub status: String,
    pub heartbeat_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatAck {
    pub status: String,
    pub next_heartbeat_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsAck {
    pub status: String,
}

/// Usage report carried by heartbeats and metrics pushes.
///
/// Memory and disk figures are in bytes. Unknown fields are kept so the raw
/// report can be stored as sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<UsageReport>,
    /// One entry per volume; the first is taken as the worker's disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<Vec<UsageReport>>,
    /// Replaces the worker's task list when present, even when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_percent: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    /// Bytes in use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkerReport {
    /// Report with the three usage figures set and nothing else
    pub fn usage(cpu_percent: f64, memory_bytes: f64, disk_bytes: f64) -> Self {
        Self {
            cpu: Some(CpuReport {
                usage_percent: Some(cpu_percent),
                ..CpuReport::default()
            }),
            memory: Some(UsageReport {
                used: Some(memory_bytes),
                ..UsageReport::default()
            }),
            disk: Some(vec![UsageReport {
                used: Some(disk_bytes),
                ..UsageReport::default()
            }]),
            ..Self::default()
        }
    }
}
