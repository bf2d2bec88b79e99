//! Shared utilities for integration testing: an in-process junocashd stand-in.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use juno_broadcast::broadcast::{Broadcaster, JsonRpcClient, RpcEndpoint};

pub const RPC_USER: &str = "rpc";
pub const RPC_PASS: &str = "secret";
/// `Basic` credentials for `rpc:secret`.
const AUTHORIZATION: &str = "Basic cnBjOnNlY3JldA==";

/// Id the daemon assigns to every accepted transaction.
pub const TXID: &str = "7f3c1d9e2b4a6f8e0d1c3b5a79e8f6d4c2b0a9e8d7c6b5a4f3e2d1c0b9a8f7e6";

#[derive(Default)]
struct Chain {
    mempool: Vec<String>,
    /// txid → (confirmations, blockhash)
    blocks: HashMap<String, (u64, String)>,
    /// Serve mempool transactions from `getrawtransaction`.
    tx_index: bool,
    reject_submit: Option<String>,
    calls: Vec<String>,
}

/// Handle to a running mock daemon.
#[derive(Clone)]
pub struct MockDaemon {
    pub addr: SocketAddr,
    chain: Arc<Mutex<Chain>>,
}

impl MockDaemon {
    /// Bind on an ephemeral port and serve JSON-RPC 1.0 in the background.
    pub async fn start() -> Self {
        let chain = Arc::new(Mutex::new(Chain::default()));
        let app = Router::new()
            .route("/", post(handle_rpc))
            .with_state(chain.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, chain }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn endpoint(&self) -> RpcEndpoint {
        RpcEndpoint {
            url: self.url(),
            user: RPC_USER.to_string(),
            pass: RPC_PASS.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Broadcaster wired to this daemon with a short poll interval.
    pub fn broadcaster(&self) -> Broadcaster {
        Broadcaster::builder()
            .transport(Arc::new(JsonRpcClient::new(self.endpoint()).unwrap()))
            .poll_interval(Duration::from_millis(20))
            .build()
            .unwrap()
    }

    pub fn set_tx_index(&self, enabled: bool) {
        self.chain.lock().unwrap().tx_index = enabled;
    }

    pub fn reject_submissions(&self, message: &str) {
        self.chain.lock().unwrap().reject_submit = Some(message.to_string());
    }

    pub fn add_to_mempool(&self, txid: &str) {
        self.chain.lock().unwrap().mempool.push(txid.to_string());
    }

    /// Mine `txid` into a block, leaving it with `confirmations`.
    pub fn confirm(&self, txid: &str, confirmations: u64, blockhash: &str) {
        let mut chain = self.chain.lock().unwrap();
        chain.mempool.retain(|t| t != txid);
        chain
            .blocks
            .insert(txid.to_string(), (confirmations, blockhash.to_string()));
    }

    /// Methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.chain.lock().unwrap().calls.clone()
    }
}

fn rpc_error(code: i64, message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "result": null, "error": { "code": code, "message": message }, "id": 1 })),
    )
}

fn rpc_result(result: Value) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "result": result, "error": null, "id": 1 })),
    )
}

async fn handle_rpc(
    State(chain): State<Arc<Mutex<Chain>>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == AUTHORIZATION)
        .unwrap_or(false);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(Value::Null));
    }

    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].as_array().cloned().unwrap_or_default();
    let mut chain = chain.lock().unwrap();
    chain.calls.push(method.clone());

    match method.as_str() {
        "sendrawtransaction" => {
            if let Some(message) = chain.reject_submit.clone() {
                return rpc_error(-26, &message);
            }
            if !chain.mempool.iter().any(|t| t == TXID) {
                chain.mempool.push(TXID.to_string());
            }
            rpc_result(json!(TXID))
        }
        "getrawtransaction" => {
            let txid = params.first().and_then(Value::as_str).unwrap_or_default();
            if let Some((confirmations, blockhash)) = chain.blocks.get(txid) {
                return rpc_result(json!({
                    "txid": txid,
                    "blockhash": blockhash,
                    "confirmations": confirmations,
                }));
            }
            if chain.tx_index && chain.mempool.iter().any(|t| t == txid) {
                return rpc_result(json!({ "txid": txid }));
            }
            rpc_error(
                -5,
                "No such mempool or blockchain transaction. Use gettransaction for wallet transactions.",
            )
        }
        "getrawmempool" => rpc_result(json!(chain.mempool)),
        _ => rpc_error(-32601, "Method not found"),
    }
}
