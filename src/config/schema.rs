//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tool.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::broadcast::RpcEndpoint;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Daemon JSON-RPC connection.
    pub rpc: RpcConfig,

    /// Status polling.
    pub poll: PollConfig,

    /// Per-command time budgets.
    pub timeouts: TimeoutConfig,

    /// HTTP serve mode.
    pub server: ServerConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Daemon RPC connection settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,

    /// RPC username (empty disables basic auth).
    pub user: String,

    /// RPC password.
    pub pass: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            pass: String::new(),
            timeout_secs: 30,
        }
    }
}

impl RpcConfig {
    /// Fill blank fields from `JUNO_RPC_URL`, `JUNO_RPC_USER` and `JUNO_RPC_PASS`.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (field, key) in [
            (&mut self.url, "JUNO_RPC_URL"),
            (&mut self.user, "JUNO_RPC_USER"),
            (&mut self.pass, "JUNO_RPC_PASS"),
        ] {
            if field.trim().is_empty() {
                if let Some(value) = lookup(key) {
                    *field = value;
                }
            }
        }
        self.url = self.url.trim().to_string();
    }

    pub fn endpoint(&self) -> RpcEndpoint {
        RpcEndpoint {
            url: self.url.clone(),
            user: self.user.clone(),
            pass: self.pass.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl std::fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Status polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    /// Interval between status polls in milliseconds.
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: 500 }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Time budgets for whole operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// CLI `submit` budget, including any confirmation wait, in seconds.
    pub submit_secs: u64,

    /// CLI `status` budget in seconds.
    pub status_secs: u64,

    /// HTTP confirmation wait budget per request in seconds.
    pub wait_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            submit_secs: 120,
            status_secs: 30,
            wait_secs: 120,
        }
    }
}

/// HTTP serve mode settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (host:port).
    pub listen: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long in-flight requests may drain after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            max_body_bytes: 20 << 20,
            request_timeout_secs: 150,
            shutdown_grace_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint in serve mode.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
