//! Transaction identifiers, status snapshots and error definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::broadcast::context::Cancelled;

/// Length of a transaction id in hex characters (32 bytes).
pub const TXID_HEX_LEN: usize = 64;

/// Canonical transaction id: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxId(String);

impl TxId {
    /// Normalize an id from an external source (trim, lowercase) and validate it.
    ///
    /// Returns `None` if the result is not exactly 32 bytes of hex.
    pub fn normalize(raw: &str) -> Option<Self> {
        let id = raw.trim().to_ascii_lowercase();
        if id.len() != TXID_HEX_LEN || hex::decode(&id).is_err() {
            return None;
        }
        Some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TxId {
    type Err = BroadcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
            .ok_or_else(|| BroadcastError::InvalidInput("txid must be 32-byte hex".to_string()))
    }
}

impl TryFrom<String> for TxId {
    type Error = BroadcastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TxId> for String {
    fn from(id: TxId) -> Self {
        id.0
    }
}

/// Snapshot of where a transaction currently sits.
///
/// `confirmations` is always 0 while `in_mempool` is set, and `blockhash` is
/// only present once the transaction has at least one confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub txid: TxId,
    pub in_mempool: bool,
    pub confirmations: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<String>,
}

impl TxStatus {
    /// Status of a transaction sitting in the mempool.
    pub fn pending(txid: TxId) -> Self {
        Self {
            txid,
            in_mempool: true,
            confirmations: 0,
            blockhash: None,
        }
    }

    /// Whether this status satisfies a confirmation target.
    ///
    /// A target of 0 means "observed anywhere", mempool included.
    pub fn reached(&self, min_confirmations: u64) -> bool {
        min_confirmations == 0 || self.confirmations >= min_confirmations
    }
}

/// Errors reported by an RPC transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// The daemon answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Node { code: i64, message: String },

    /// Non-success HTTP status without a JSON-RPC error body.
    #[error("rpc http status {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, IO or timeout failure talking to the daemon.
    #[error("rpc transport: {0}")]
    Transport(String),

    /// The reply could not be decoded.
    #[error("rpc decode: {0}")]
    Decode(String),
}

impl RpcError {
    /// Whether the daemon reported the transaction as unknown.
    ///
    /// Matches on the human-readable message since the daemon's error codes
    /// are not reliable across versions. Only daemon errors qualify.
    pub fn is_not_found(&self) -> bool {
        let RpcError::Node { message, .. } = self else {
            return false;
        };
        let msg = message.to_lowercase();
        msg.contains("no such mempool") || msg.contains("no such") || msg.contains("not found")
    }
}

/// Errors that can occur during broadcast operations.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The broadcaster was built without the pieces it needs.
    #[error("broadcast: {0}")]
    Config(String),

    /// Caller-supplied data is malformed.
    #[error("broadcast: {0}")]
    InvalidInput(String),

    /// The transport failed for a reason other than "not found".
    #[error("broadcast: {method}: {source}")]
    Remote {
        method: &'static str,
        #[source]
        source: RpcError,
    },

    /// The daemon returned a structurally invalid result.
    #[error("broadcast: {0}")]
    Protocol(String),

    /// The caller's context was cancelled or its deadline passed.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl BroadcastError {
    pub(crate) fn remote(method: &'static str, source: RpcError) -> Self {
        Self::Remote { method, source }
    }

    /// Stable machine-readable code used in CLI and HTTP error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            BroadcastError::Config(_) => "internal",
            BroadcastError::InvalidInput(_) => "invalid_request",
            BroadcastError::Remote { .. } | BroadcastError::Protocol(_) => "node_rpc_error",
            BroadcastError::Cancelled(Cancelled::DeadlineExceeded) => "timeout",
            BroadcastError::Cancelled(Cancelled::Cancelled) => "cancelled",
        }
    }
}

/// Result type for broadcast operations.
pub type BroadcastResult<T> = Result<T, BroadcastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txid_normalization() {
        let upper = format!("  {}\n", "AB".repeat(32));
        let id = TxId::normalize(&upper).unwrap();
        assert_eq!(id.as_str(), "ab".repeat(32));

        assert!(TxId::normalize(&"a".repeat(63)).is_none());
        assert!(TxId::normalize(&"a".repeat(65)).is_none());
        assert!(TxId::normalize(&"g".repeat(64)).is_none());
        assert!(TxId::normalize("").is_none());
    }

    #[test]
    fn test_txid_parse_error_is_invalid_input() {
        let err = "bad".parse::<TxId>().unwrap_err();
        assert!(matches!(err, BroadcastError::InvalidInput(_)));
    }

    #[test]
    fn test_not_found_matching() {
        let node = |message: &str| RpcError::Node {
            code: -5,
            message: message.to_string(),
        };
        assert!(node("No such mempool or blockchain transaction. Use gettransaction for wallet transactions.").is_not_found());
        assert!(node("No such mempool transaction").is_not_found());
        assert!(node("Transaction not found").is_not_found());
        assert!(!node("Work queue depth exceeded").is_not_found());

        // Only daemon-reported errors count.
        assert!(!RpcError::Transport("not found".to_string()).is_not_found());
        assert!(!RpcError::Http { status: 404, body: "not found".to_string() }.is_not_found());
    }

    #[test]
    fn test_status_serialization() {
        let st = TxStatus::pending(TxId::normalize(&"c".repeat(64)).unwrap());
        let json = serde_json::to_value(&st).unwrap();
        assert_eq!(json["txid"], "c".repeat(64));
        assert_eq!(json["in_mempool"], true);
        assert_eq!(json["confirmations"], 0);
        assert!(json.get("blockhash").is_none());
    }

    #[test]
    fn test_reached() {
        let mut st = TxStatus::pending(TxId::normalize(&"d".repeat(64)).unwrap());
        assert!(st.reached(0));
        assert!(!st.reached(1));
        st.in_mempool = false;
        st.confirmations = 2;
        assert!(st.reached(2));
        assert!(!st.reached(3));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BroadcastError::InvalidInput("x".into()).code(), "invalid_request");
        assert_eq!(BroadcastError::Protocol("x".into()).code(), "node_rpc_error");
        assert_eq!(
            BroadcastError::remote("getrawmempool", RpcError::Transport("refused".into())).code(),
            "node_rpc_error"
        );
        assert_eq!(BroadcastError::from(Cancelled::DeadlineExceeded).code(), "timeout");
        assert_eq!(BroadcastError::from(Cancelled::Cancelled).code(), "cancelled");
    }

    #[test]
    fn test_error_display() {
        let err = BroadcastError::remote(
            "getrawtransaction",
            RpcError::Node { code: -28, message: "Loading block index...".into() },
        );
        assert_eq!(
            err.to_string(),
            "broadcast: getrawtransaction: rpc error -28: Loading block index..."
        );
    }
}
