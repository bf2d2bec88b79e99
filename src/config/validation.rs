//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Check the RPC URL and listen address parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BroadcastConfig → Result<(), Vec<ValidationError>>
//! - Runs after every layer (file, env, flags) has been applied

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::BroadcastConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Checks needed by every command that talks to the daemon.
pub fn validate_rpc(config: &BroadcastConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let url = config.rpc.url.trim();
    if url.is_empty() {
        errors.push(ValidationError::new(
            "rpc.url",
            "rpc-url is required (or set JUNO_RPC_URL)",
        ));
    } else {
        match url.parse::<url::Url>() {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => errors.push(ValidationError::new(
                "rpc.url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("rpc.url", format!("invalid url: {}", e))),
        }
    }

    if config.rpc.timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.timeout_secs", "must be greater than 0"));
    }
    if config.timeouts.submit_secs == 0 {
        errors.push(ValidationError::new("timeouts.submit_secs", "must be greater than 0"));
    }
    if config.timeouts.status_secs == 0 {
        errors.push(ValidationError::new("timeouts.status_secs", "must be greater than 0"));
    }

    errors
}

/// Checks for serve mode, on top of [`validate_rpc`].
pub fn validate_server(config: &BroadcastConfig) -> Vec<ValidationError> {
    let mut errors = validate_rpc(config);
    let server = &config.server;

    let listen = server.listen.trim();
    if listen.is_empty() {
        errors.push(ValidationError::new("server.listen", "listen is required"));
    } else if listen.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.listen",
            format!("'{}' is not a host:port address", listen),
        ));
    }

    if server.max_body_bytes == 0 {
        errors.push(ValidationError::new("server.max_body_bytes", "must be greater than 0"));
    }
    if server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }
    if config.timeouts.wait_secs == 0 {
        errors.push(ValidationError::new("timeouts.wait_secs", "must be greater than 0"));
    } else if server.request_timeout_secs > 0
        && config.timeouts.wait_secs >= server.request_timeout_secs
    {
        // Otherwise the request timeout fires first and the caller never
        // sees the `timeout` envelope.
        errors.push(ValidationError::new(
            "timeouts.wait_secs",
            "must be less than server.request_timeout_secs",
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a host:port address", observability.metrics_address),
        ));
    }

    errors
}
