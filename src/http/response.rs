//! Response envelopes and error mapping.
//!
//! # Responsibilities
//! - Wrap every result in the versioned `{version, status, data | error}` envelope
//! - Map broadcast errors to stable codes and HTTP status codes
//!
//! # Design Decisions
//! - The CLI `--json` output and the HTTP API share one envelope shape
//! - Unknown txids are a `not_found` error here, even though the core treats
//!   them as a normal outcome

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::broadcast::{BroadcastError, TxId, TxStatus};

/// Envelope schema version.
pub const API_VERSION: &str = "v1";

/// Versioned response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Error payload of a failed envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            version: API_VERSION.to_string(),
            status: "ok".to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: &str, message: impl Into<String>) -> Self {
        Self {
            version: API_VERSION.to_string(),
            status: "err".to_string(),
            data: None,
            error: Some(ErrorBody {
                code: code.to_string(),
                message: message.into(),
            }),
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submitted {
    pub txid: TxId,
}

/// Status reached after waiting for a confirmation target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confirmed {
    #[serde(flatten)]
    pub status: TxStatus,
    pub required_confs: i64,
}

/// An error ready to be rendered as an HTTP response.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: status_for_code(code),
            code,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request", message)
    }

    pub fn not_found() -> Self {
        Self::new("not_found", "unknown txid")
    }
}

impl From<BroadcastError> for ApiError {
    fn from(err: BroadcastError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::<()>::err(self.code, self.message))).into_response()
    }
}

/// HTTP status for an envelope error code.
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "invalid_request" => StatusCode::BAD_REQUEST,
        "not_found" => StatusCode::NOT_FOUND,
        "node_rpc_error" => StatusCode::BAD_GATEWAY,
        "timeout" => StatusCode::GATEWAY_TIMEOUT,
        "cancelled" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
