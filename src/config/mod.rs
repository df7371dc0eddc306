//! Configuration management for the FlowForge service
//!
//! Handles server binding and the worker liveness timing parameters.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Heartbeat interval advertised to workers on registration and every heartbeat.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Worker liveness configuration
    pub liveness: LivenessConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Heartbeat protocol and sweep timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Interval workers are told to heartbeat at
    pub heartbeat_interval_ms: u64,
    /// Silence after which the sweep marks a worker offline.
    /// Must be strictly greater than `heartbeat_interval_ms` so one late beat
    /// does not flap the worker.
    pub heartbeat_timeout_ms: u64,
    /// Period of the background sweep
    pub sweep_interval_ms: u64,
    /// Events buffered per subscriber before it starts lagging
    pub broadcast_capacity: usize,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            heartbeat_timeout_ms: 45_000,
            sweep_interval_ms: 35_000,
            broadcast_capacity: 256,
        }
    }
}

impl LivenessConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Config {
    /// Reject timing combinations the liveness sweep cannot work with
    pub fn validate(&self) -> Result<()> {
        let liveness = &self.liveness;
        if liveness.heartbeat_timeout_ms <= liveness.heartbeat_interval_ms {
            bail!(
                "heartbeat timeout ({}ms) must be greater than the heartbeat interval ({}ms)",
                liveness.heartbeat_timeout_ms,
                liveness.heartbeat_interval_ms
            );
        }
        if liveness.sweep_interval_ms == 0 {
            bail!("sweep interval must be non-zero");
        }
        if liveness.broadcast_capacity == 0 {
            bail!("broadcast capacity must be non-zero");
        }
        Ok(())
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        let defaults = LivenessConfig::default();
        Self {
            server: ServerConfig {
                host: std::env::var("FLOWFORGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("FLOWFORGE_PORT", 3000),
            },
            liveness: LivenessConfig {
                heartbeat_interval_ms: env_or(
                    "FLOWFORGE_HEARTBEAT_INTERVAL_MS",
                    defaults.heartbeat_interval_ms,
                ),
                heartbeat_timeout_ms: env_or(
                    "FLOWFORGE_HEARTBEAT_TIMEOUT_MS",
                    defaults.heartbeat_timeout_ms,
                ),
                sweep_interval_ms: env_or("FLOWFORGE_SWEEP_INTERVAL_MS", defaults.sweep_interval_ms),
                broadcast_capacity: env_or(
                    "FLOWFORGE_BROADCAST_CAPACITY",
                    defaults.broadcast_capacity,
                ),
            },
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
