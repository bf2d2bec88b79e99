//! Broadcast client for junocashd.

// Core
pub mod broadcast;

// Front ends
pub mod cli;
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use broadcast::{BroadcastService, Broadcaster, CallContext, JsonRpcClient, TxId, TxStatus};
pub use config::BroadcastConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
