//! Transaction broadcast subsystem.
//!
//! # Data Flow
//! ```text
//! Caller (CLI / HTTP handler)
//!     → client.rs (validate, submit, resolve status, wait)
//!     → rpc.rs (RpcTransport: call / send_raw_transaction)
//!     → junocashd JSON-RPC
//! ```
//!
//! # Status Resolution
//! ```text
//! getrawtransaction(txid, 1)
//!     ok        → found (mempool when 0 confirmations and no block hash)
//!     not found → getrawmempool(false)
//!                     listed   → found, in mempool
//!                     unlisted → unknown (Ok(None))
//!     other     → error, no fallback
//! ```
//!
//! # Constraints
//! - Submissions are never retried
//! - Every call is bounded by the caller's `CallContext`
//! - Nothing in here logs; errors are returned to the caller

pub mod client;
pub mod context;
pub mod rpc;
pub mod types;

pub use client::{BroadcastService, Broadcaster, BroadcasterBuilder, DEFAULT_POLL_INTERVAL};
pub use context::{CallContext, CancelHandle, Cancelled};
pub use rpc::{JsonRpcClient, RpcEndpoint, RpcTransport};
pub use types::{BroadcastError, BroadcastResult, RpcError, TxId, TxStatus};
