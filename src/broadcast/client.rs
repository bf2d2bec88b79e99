//! Submission client and status resolver.
//!
//! # Responsibilities
//! - Validate raw transaction hex and forward it to the daemon
//! - Resolve a txid to unknown / pending / confirmed, reconciling the
//!   direct lookup with the mempool listing
//! - Poll until a confirmation target is reached or the caller gives up

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::broadcast::context::CallContext;
use crate::broadcast::rpc::RpcTransport;
use crate::broadcast::types::{BroadcastError, BroadcastResult, RpcError, TxId, TxStatus};

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Operations callers (CLI, HTTP API) need from a broadcaster.
#[async_trait]
pub trait BroadcastService: Send + Sync {
    async fn submit(&self, ctx: &CallContext, raw_tx_hex: &str) -> BroadcastResult<TxId>;

    async fn status(&self, ctx: &CallContext, txid: &str) -> BroadcastResult<Option<TxStatus>>;

    async fn wait_for_confirmations(
        &self,
        ctx: &CallContext,
        txid: &str,
        min_confirmations: i64,
    ) -> BroadcastResult<TxStatus>;
}

/// Submits raw transactions and tracks their confirmation status.
///
/// Holds only read-only configuration, so one instance can be shared by any
/// number of concurrent callers.
#[derive(Clone)]
pub struct Broadcaster {
    rpc: Arc<dyn RpcTransport>,
    poll_interval: Duration,
}

/// Builder for [`Broadcaster`].
#[derive(Default)]
pub struct BroadcasterBuilder {
    rpc: Option<Arc<dyn RpcTransport>>,
    poll_interval: Option<Duration>,
}

impl BroadcasterBuilder {
    pub fn transport(mut self, rpc: Arc<dyn RpcTransport>) -> Self {
        self.rpc = Some(rpc);
        self
    }

    /// Override the poll interval. A zero duration is ignored.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.poll_interval = Some(interval);
        }
        self
    }

    pub fn build(self) -> BroadcastResult<Broadcaster> {
        let rpc = self
            .rpc
            .ok_or_else(|| BroadcastError::Config("rpc transport is required".to_string()))?;
        Ok(Broadcaster {
            rpc,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
        })
    }
}

/// Verbose `getrawtransaction` fields the resolver reads.
#[derive(Debug, Default, Deserialize)]
struct VerboseTx {
    #[serde(default)]
    blockhash: Option<String>,
    #[serde(default)]
    confirmations: i64,
}

/// Outcome of the direct lookup.
enum Lookup {
    Found(TxStatus),
    NotFound,
}

impl Broadcaster {
    pub fn builder() -> BroadcasterBuilder {
        BroadcasterBuilder::default()
    }

    /// Shorthand for a broadcaster with the default poll interval.
    pub fn new(rpc: Arc<dyn RpcTransport>) -> Self {
        Self {
            rpc,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Submit a signed raw transaction and return its canonical txid.
    ///
    /// The hex is forwarded trimmed but otherwise untouched. Failures are never
    /// retried here since a rebroadcast is the caller's decision.
    pub async fn submit(&self, ctx: &CallContext, raw_tx_hex: &str) -> BroadcastResult<TxId> {
        let raw = normalize_raw_hex(raw_tx_hex)?;

        let txid = ctx
            .run(self.rpc.send_raw_transaction(raw))
            .await?
            .map_err(|e| BroadcastError::remote("sendrawtransaction", e))?;

        TxId::normalize(&txid)
            .ok_or_else(|| BroadcastError::Protocol("node returned invalid txid".to_string()))
    }

    /// Resolve where a transaction currently is.
    ///
    /// Returns `Ok(None)` when neither the direct lookup nor the mempool
    /// listing knows the txid.
    pub async fn status(&self, ctx: &CallContext, txid: &str) -> BroadcastResult<Option<TxStatus>> {
        let txid: TxId = txid.parse()?;

        match self.lookup(ctx, &txid).await? {
            Lookup::Found(status) => Ok(Some(status)),
            // Daemons without a full tx index reject the direct lookup for
            // transactions they still hold in the mempool.
            Lookup::NotFound => self.mempool_lookup(ctx, txid).await,
        }
    }

    /// Poll [`Broadcaster::status`] until the transaction has at least
    /// `min_confirmations` confirmations.
    ///
    /// A target of 0 returns as soon as the transaction is observed, mempool
    /// included. Only "not yet observed" is retried; any error ends the wait.
    pub async fn wait_for_confirmations(
        &self,
        ctx: &CallContext,
        txid: &str,
        min_confirmations: i64,
    ) -> BroadcastResult<TxStatus> {
        let target = u64::try_from(min_confirmations).map_err(|_| {
            BroadcastError::InvalidInput("confirmations must be >= 0".to_string())
        })?;

        // Dropped on every return path.
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if let Some(status) = self.status(ctx, txid).await? {
                if status.reached(target) {
                    return Ok(status);
                }
            }

            tokio::select! {
                biased;
                reason = ctx.done() => return Err(reason.into()),
                _ = ticker.tick() => {}
            }
        }
    }

    async fn lookup(&self, ctx: &CallContext, txid: &TxId) -> BroadcastResult<Lookup> {
        let reply = ctx
            .run(self.rpc.call("getrawtransaction", vec![json!(txid.as_str()), json!(1)]))
            .await?;

        let value = match reply {
            Ok(value) => value,
            Err(e) if e.is_not_found() => return Ok(Lookup::NotFound),
            Err(e) => return Err(BroadcastError::remote("getrawtransaction", e)),
        };

        let verbose: VerboseTx = serde_json::from_value(value).map_err(|e| {
            BroadcastError::remote("getrawtransaction", RpcError::Decode(e.to_string()))
        })?;

        let blockhash = verbose
            .blockhash
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());
        // A conflicted transaction reports a negative count: it is neither
        // in the mempool nor confirmed.
        let in_mempool = verbose.confirmations == 0 && blockhash.is_none();
        let confirmations = u64::try_from(verbose.confirmations).unwrap_or(0);

        Ok(Lookup::Found(TxStatus {
            txid: txid.clone(),
            in_mempool,
            confirmations,
            blockhash: blockhash.filter(|_| confirmations > 0),
        }))
    }

    async fn mempool_lookup(
        &self,
        ctx: &CallContext,
        txid: TxId,
    ) -> BroadcastResult<Option<TxStatus>> {
        let value = ctx
            .run(self.rpc.call("getrawmempool", vec![json!(false)]))
            .await?
            .map_err(|e| BroadcastError::remote("getrawmempool", e))?;

        let mempool: Vec<String> = serde_json::from_value(value).map_err(|e| {
            BroadcastError::remote("getrawmempool", RpcError::Decode(e.to_string()))
        })?;

        let present = mempool
            .iter()
            .any(|id| id.trim().eq_ignore_ascii_case(txid.as_str()));

        Ok(present.then(|| TxStatus::pending(txid)))
    }
}

fn normalize_raw_hex(raw: &str) -> BroadcastResult<&str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(BroadcastError::InvalidInput("raw tx hex is required".to_string()));
    }
    if hex::decode(raw).is_err() {
        return Err(BroadcastError::InvalidInput("raw tx hex must be hex".to_string()));
    }
    Ok(raw)
}

#[async_trait]
impl BroadcastService for Broadcaster {
    async fn submit(&self, ctx: &CallContext, raw_tx_hex: &str) -> BroadcastResult<TxId> {
        Broadcaster::submit(self, ctx, raw_tx_hex).await
    }

    async fn status(&self, ctx: &CallContext, txid: &str) -> BroadcastResult<Option<TxStatus>> {
        Broadcaster::status(self, ctx, txid).await
    }

    async fn wait_for_confirmations(
        &self,
        ctx: &CallContext,
        txid: &str,
        min_confirmations: i64,
    ) -> BroadcastResult<TxStatus> {
        Broadcaster::wait_for_confirmations(self, ctx, txid, min_confirmations).await
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
