//! juno-broadcast
//!
//! Submits signed raw transactions to a junocashd node over JSON-RPC and
//! reports where they are: mempool, confirmed, or unknown.
//!
//! # Architecture Overview
//!
//! ```text
//!   submit / status           serve
//!   ───────────────           ─────
//!        cli ─────────────────▶ http (axum)
//!         │                      │
//!         ▼                      ▼
//!   ┌───────────────────────────────────┐
//!   │ broadcast::Broadcaster            │
//!   │   submit / status / wait          │
//!   └─────────────────┬─────────────────┘
//!                     ▼
//!          broadcast::JsonRpcClient ───────▶ junocashd
//!
//!   config · lifecycle · observability (cross-cutting)
//! ```

use std::process::ExitCode;

use juno_broadcast::cli::{self, default_factory};

#[tokio::main]
async fn main() -> ExitCode {
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    let code =
        cli::run_with_args(std::env::args_os(), &default_factory, &mut stdout, &mut stderr).await;

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
