//! RPC transport abstraction and the JSON-RPC-over-HTTP implementation.
//!
//! # Responsibilities
//! - Define the two capabilities the broadcaster needs from a daemon
//! - Speak bitcoind-style JSON-RPC 1.0 over HTTP with basic auth
//! - Turn daemon error objects into [`RpcError::Node`] so callers can
//!   recognize "not found" replies

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::broadcast::types::RpcError;

/// Procedure-call interface to the remote daemon.
///
/// Implementations must be safe for concurrent use; one transport is shared by
/// every caller of a broadcaster.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Generic JSON-RPC invocation.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError>;

    /// Submit an opaque raw transaction, returning the daemon's id for it.
    async fn send_raw_transaction(&self, tx_hex: &str) -> Result<String, RpcError>;
}

/// Connection settings for [`JsonRpcClient`].
#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    pub url: String,
    pub user: String,
    pub pass: String,
    pub timeout: Duration,
}

/// JSON-RPC client for junocashd and other bitcoind-family daemons.
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: url::Url,
    user: String,
    pass: String,
    next_id: AtomicU64,
}

/// JSON-RPC reply envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcClient {
    /// Create a client for the given endpoint.
    ///
    /// # Errors
    /// Returns [`RpcError::Transport`] when the URL is not http(s) or the HTTP
    /// client cannot be built.
    pub fn new(endpoint: RpcEndpoint) -> Result<Self, RpcError> {
        let url: url::Url = endpoint
            .url
            .trim()
            .parse()
            .map_err(|e| {
                RpcError::Transport(format!("invalid rpc url '{}': {}", endpoint.url, e))
            })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RpcError::Transport(format!(
                "unsupported rpc url scheme '{}'",
                url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url,
            user: endpoint.user,
            pass: endpoint.pass,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }

    fn decode_reply(status: reqwest::StatusCode, body: &str) -> Result<Value, RpcError> {
        // bitcoind-family daemons report RPC errors as HTTP 500/404 with a
        // JSON body, so the body is inspected before the status code.
        match serde_json::from_str::<JsonRpcResponse>(body) {
            Ok(JsonRpcResponse {
                error: Some(error), ..
            }) => Err(RpcError::Node {
                code: error.code,
                message: error.message,
            }),
            Ok(JsonRpcResponse { result, .. }) if status.is_success() => {
                result.ok_or_else(|| {
                    RpcError::Decode("rpc returned neither result nor error".to_string())
                })
            }
            _ if !status.is_success() => Err(RpcError::Http {
                status: status.as_u16(),
                body: body.trim().chars().take(512).collect(),
            }),
            Err(e) => Err(RpcError::Decode(e.to_string())),
            Ok(_) => Err(RpcError::Decode("rpc returned neither result nor error".to_string())),
        }
    }
}

#[async_trait]
impl RpcTransport for JsonRpcClient {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self.client.post(self.url.clone()).json(&payload);
        if !self.user.is_empty() {
            request = request.basic_auth(&self.user, Some(&self.pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Self::decode_reply(status, &body)
    }

    async fn send_raw_transaction(&self, tx_hex: &str) -> Result<String, RpcError> {
        let result = self.call("sendrawtransaction", vec![json!(tx_hex)]).await?;
        match result {
            Value::String(txid) => Ok(txid),
            other => Err(RpcError::Decode(format!(
                "sendrawtransaction returned non-string result: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials stay out of debug output.
        f.debug_struct("JsonRpcClient")
            .field("url", &self.url.as_str())
            .field("user", &self.user)
            .finish()
    }
}
