//! Command-line front end.
//!
//! # Commands
//! - `submit`: broadcast a raw transaction, optionally wait for confirmations
//! - `status`: report where a transaction currently is
//! - `serve`: run the HTTP API
//!
//! Every command resolves its configuration as defaults → `--config` file →
//! `JUNO_RPC_*` environment → flags, and builds its broadcaster through a
//! [`Factory`] so tests can substitute a double.

pub mod output;

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;

use crate::broadcast::{
    BroadcastError, BroadcastResult, BroadcastService, Broadcaster, CallContext, JsonRpcClient,
};
use crate::config::loader::{check, load_base};
use crate::config::validation::{validate_rpc, validate_server};
use crate::config::BroadcastConfig;
use crate::http::response::{Confirmed, Submitted};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};
use output::{write_err, write_line, write_ok, EXIT_FAILURE, EXIT_OK, EXIT_USAGE};

/// Builds the broadcaster a command talks to.
pub type Factory =
    dyn Fn(&BroadcastConfig) -> BroadcastResult<Arc<dyn BroadcastService>> + Send + Sync;

#[derive(Debug, Parser)]
#[command(name = "juno-broadcast", version)]
#[command(about = "Submit signed raw transactions to junocashd and report status.")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a signed raw transaction
    Submit(SubmitArgs),
    /// Show the status of a transaction
    Status(StatusArgs),
    /// Serve the HTTP API
    Serve(ServeArgs),
}

/// Daemon connection flags shared by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct RpcArgs {
    /// junocashd RPC URL (or JUNO_RPC_URL)
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// junocashd RPC username (or JUNO_RPC_USER)
    #[arg(long)]
    pub rpc_user: Option<String>,

    /// junocashd RPC password (or JUNO_RPC_PASS)
    #[arg(long)]
    pub rpc_pass: Option<String>,
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub rpc: RpcArgs,

    /// Signed raw transaction hex
    #[arg(long)]
    pub raw_tx_hex: Option<String>,

    /// File containing the signed raw transaction hex
    #[arg(long)]
    pub raw_tx_file: Option<PathBuf>,

    /// Wait for N confirmations (0 = don't wait)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub confirmations: i64,

    /// Poll interval (e.g. 500ms, 2s)
    #[arg(long)]
    pub poll: Option<String>,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub rpc: RpcArgs,

    /// Transaction id
    #[arg(long)]
    pub txid: Option<String>,

    /// Poll interval (accepted for symmetry with submit; unused)
    #[arg(long)]
    pub poll: Option<String>,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub rpc: RpcArgs,

    /// Listen address (host:port)
    #[arg(long)]
    pub listen: Option<String>,

    /// Poll interval (e.g. 500ms, 2s)
    #[arg(long)]
    pub poll: Option<String>,

    /// Maximum request body bytes
    #[arg(long)]
    pub max_body_bytes: Option<usize>,
}

/// Broadcaster backed by the JSON-RPC client.
pub fn default_factory(config: &BroadcastConfig) -> BroadcastResult<Arc<dyn BroadcastService>> {
    let rpc = JsonRpcClient::new(config.rpc.endpoint())
        .map_err(|e| BroadcastError::Config(e.to_string()))?;
    let broadcaster = Broadcaster::builder()
        .transport(Arc::new(rpc))
        .poll_interval(config.poll.interval())
        .build()?;
    Ok(Arc::new(broadcaster))
}

/// Parse `args` (program name first) and run the selected command.
///
/// Returns the process exit code.
pub async fn run_with_args<I, T>(
    args: I,
    factory: &Factory,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also arrive here, on stdout.
            let rendered = e.render().to_string();
            if e.use_stderr() {
                let _ = write!(stderr, "{}", rendered);
                return EXIT_USAGE;
            }
            let _ = write!(stdout, "{}", rendered);
            return EXIT_OK;
        }
    };
    run(cli, factory, stdout, stderr).await
}

/// Run a parsed command.
pub async fn run(
    cli: Cli,
    factory: &Factory,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> i32 {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Submit(args) => run_submit(config_path, args, factory, stdout, stderr).await,
        Command::Status(args) => run_status(config_path, args, factory, stdout, stderr).await,
        Command::Serve(args) => run_serve(config_path, args, factory, stderr).await,
    }
}

async fn run_submit(
    config_path: Option<&Path>,
    args: SubmitArgs,
    factory: &Factory,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> i32 {
    let json = args.json;
    let config = match resolve_config(config_path, &args.rpc, args.poll.as_deref(), false) {
        Ok(config) => config,
        Err(msg) => return write_err(stdout, stderr, json, "invalid_request", &msg),
    };

    let raw = match load_hex_input(args.raw_tx_hex.as_deref(), args.raw_tx_file.as_deref()) {
        Ok(raw) => raw,
        Err(msg) => return write_err(stdout, stderr, json, "invalid_request", &msg),
    };
    if args.confirmations < 0 {
        return write_err(stdout, stderr, json, "invalid_request", "confirmations must be >= 0");
    }

    let service = match factory(&config) {
        Ok(service) => service,
        Err(e) => return write_err(stdout, stderr, json, "internal", &e.to_string()),
    };

    let budget = Duration::from_secs(config.timeouts.submit_secs);
    let ctx = CallContext::background().with_timeout(budget);

    let txid = match service.submit(&ctx, &raw).await {
        Ok(txid) => txid,
        Err(e) => return write_err(stdout, stderr, json, e.code(), &e.to_string()),
    };
    tracing::debug!(txid = %txid, "Transaction submitted");

    if args.confirmations > 0 {
        return match service.wait_for_confirmations(&ctx, txid.as_str(), args.confirmations).await {
            Ok(status) => write_ok(
                stdout,
                json,
                &Confirmed {
                    status,
                    required_confs: args.confirmations,
                },
            ),
            Err(e) => write_err(stdout, stderr, json, e.code(), &e.to_string()),
        };
    }

    if json {
        write_ok(stdout, json, &Submitted { txid })
    } else {
        write_line(stdout, txid.as_str())
    }
}

async fn run_status(
    config_path: Option<&Path>,
    args: StatusArgs,
    factory: &Factory,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> i32 {
    let json = args.json;
    let config = match resolve_config(config_path, &args.rpc, args.poll.as_deref(), false) {
        Ok(config) => config,
        Err(msg) => return write_err(stdout, stderr, json, "invalid_request", &msg),
    };

    let txid = args.txid.as_deref().map(str::trim).unwrap_or_default();
    if txid.is_empty() {
        return write_err(stdout, stderr, json, "invalid_request", "txid is required");
    }

    let service = match factory(&config) {
        Ok(service) => service,
        Err(e) => return write_err(stdout, stderr, json, "internal", &e.to_string()),
    };

    let budget = Duration::from_secs(config.timeouts.status_secs);
    let ctx = CallContext::background().with_timeout(budget);

    match service.status(&ctx, txid).await {
        Ok(Some(status)) => write_ok(stdout, json, &status),
        Ok(None) => write_err(stdout, stderr, json, "not_found", "unknown txid"),
        Err(e) => write_err(stdout, stderr, json, e.code(), &e.to_string()),
    }
}

async fn run_serve(
    config_path: Option<&Path>,
    args: ServeArgs,
    factory: &Factory,
    stderr: &mut impl Write,
) -> i32 {
    let mut sink = std::io::sink();
    let mut config = match resolve_config(config_path, &args.rpc, args.poll.as_deref(), true) {
        Ok(config) => config,
        Err(msg) => return write_err(&mut sink, stderr, false, "invalid_request", &msg),
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen.trim().to_string();
    }
    if let Some(max_body_bytes) = args.max_body_bytes {
        config.server.max_body_bytes = max_body_bytes;
    }
    if let Err(e) = check(validate_server(&config)) {
        return write_err(&mut sink, stderr, false, "invalid_request", &e.to_string());
    }

    let service = match factory(&config) {
        Ok(service) => service,
        Err(e) => return write_err(&mut sink, stderr, false, "internal", &e.to_string()),
    };

    if config.observability.metrics_enabled {
        // Address already validated.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = match TcpListener::bind(&config.server.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            let msg = format!("bind {}: {}", config.server.listen, e);
            return write_err(&mut sink, stderr, false, "internal", &msg);
        }
    };

    tracing::info!(
        listen = %config.server.listen,
        rpc_url = %config.rpc.url,
        poll_interval_ms = config.poll.interval_ms,
        "Serving broadcast API"
    );

    let shutdown = Shutdown::new();
    let signal_listener = signals::spawn_signal_listener(shutdown.clone());
    let result = HttpServer::new(service, &config, shutdown).run(listener).await;
    signal_listener.abort();

    match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            let _ = writeln!(stderr, "{}", e);
            EXIT_FAILURE
        }
    }
}

/// Layer flags over file and environment, install logging, and validate what
/// every daemon-facing command needs. Server-only checks are left to `serve`.
fn resolve_config(
    path: Option<&Path>,
    rpc: &RpcArgs,
    poll: Option<&str>,
    serving: bool,
) -> Result<BroadcastConfig, String> {
    let mut config = load_base(path).map_err(|e| e.to_string())?;
    logging::init(&config.observability);

    for (flag, field) in [
        (&rpc.rpc_url, &mut config.rpc.url),
        (&rpc.rpc_user, &mut config.rpc.user),
        (&rpc.rpc_pass, &mut config.rpc.pass),
    ] {
        if let Some(value) = flag.as_deref().filter(|v| !v.trim().is_empty()) {
            *field = value.trim().to_string();
        }
    }

    if let Some(poll) = poll {
        let interval = parse_duration(poll).map_err(|_| "poll must be a duration".to_string())?;
        config.poll.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    }

    if !serving {
        check(validate_rpc(&config)).map_err(|e| e.to_string())?;
    }
    Ok(config)
}

/// Read the raw transaction from exactly one of `--raw-tx-hex` / `--raw-tx-file`.
fn load_hex_input(hex_value: Option<&str>, file: Option<&Path>) -> Result<String, String> {
    let hex_value = hex_value.map(str::trim).filter(|v| !v.is_empty());
    let file = file.filter(|p| !p.as_os_str().is_empty());

    match (hex_value, file) {
        (None, None) => Err("raw-tx-hex is required (or use --raw-tx-file)".to_string()),
        (Some(_), Some(_)) => {
            Err("input source conflict (use only one of --raw-tx-hex, --raw-tx-file)".to_string())
        }
        (Some(hex), None) => Ok(hex.to_string()),
        (None, Some(path)) => {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            std::fs::read_to_string(path)
                .map(|content| content.trim().to_string())
                .map_err(|e| format!("read {}: {}", name, e))
        }
    }
}

/// Parse durations like `500ms`, `2s` or `1m`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("missing unit in duration '{}'", input))?;
    let (value, unit) = input.split_at(split);
    let value: u64 = value
        .parse()
        .map_err(|_| format!("invalid duration '{}'", input))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        _ => Err(format!("unknown unit '{}' in duration '{}'", unit, input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{TxId, TxStatus};
    use async_trait::async_trait;

    /// Broadcaster double for command tests.
    #[derive(Default)]
    struct FakeService {
        status: Option<TxStatus>,
    }

    #[async_trait]
    impl BroadcastService for FakeService {
        async fn submit(&self, _ctx: &CallContext, raw_tx_hex: &str) -> BroadcastResult<TxId> {
            assert_eq!(raw_tx_hex, "00ff");
            Ok(TxId::normalize(&"a".repeat(64)).unwrap())
        }

        async fn status(&self, _ctx: &CallContext, _txid: &str) -> BroadcastResult<Option<TxStatus>> {
            Ok(self.status.clone())
        }

        async fn wait_for_confirmations(
            &self,
            _ctx: &CallContext,
            _txid: &str,
            min_confirmations: i64,
        ) -> BroadcastResult<TxStatus> {
            Ok(TxStatus {
                txid: TxId::normalize(&"a".repeat(64)).unwrap(),
                in_mempool: false,
                confirmations: min_confirmations as u64,
                blockhash: Some("b".repeat(64)),
            })
        }
    }

    fn fake(status: Option<TxStatus>) -> impl Fn(&BroadcastConfig) -> BroadcastResult<Arc<dyn BroadcastService>> {
        move |_| Ok(Arc::new(FakeService { status: status.clone() }) as Arc<dyn BroadcastService>)
    }

    async fn run_args(args: &[&str], factory: &Factory) -> (i32, String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let argv = std::iter::once("juno-broadcast").chain(args.iter().copied());
        let code = run_with_args(argv, factory, &mut out, &mut err).await;
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    const RPC: [&str; 2] = ["--rpc-url", "http://127.0.0.1:8232"];

    #[tokio::test]
    async fn test_submit_requires_raw_tx() {
        let never = |_: &BroadcastConfig| -> BroadcastResult<Arc<dyn BroadcastService>> {
            panic!("factory should not be called")
        };
        let (code, out, _) = run_args(&["submit", RPC[0], RPC[1], "--json"], &never).await;
        assert_ne!(code, 0);
        assert!(out.contains(r#""version":"v1""#), "{out}");
        assert!(out.contains(r#""status":"err""#), "{out}");
        assert!(out.contains(r#""code":"invalid_request""#), "{out}");
    }

    #[tokio::test]
    async fn test_submit_rejects_conflicting_sources() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let (code, _, err) = run_args(
            &["submit", RPC[0], RPC[1], "--raw-tx-hex", "00", "--raw-tx-file", &path],
            &fake(None),
        )
        .await;
        assert_eq!(code, 1);
        assert!(err.contains("input source conflict"));
    }

    #[tokio::test]
    async fn test_submit_plain_prints_txid() {
        let (code, out, _) =
            run_args(&["submit", RPC[0], RPC[1], "--raw-tx-hex", " 00ff "], &fake(None)).await;
        assert_eq!(code, 0);
        assert_eq!(out, format!("{}\n", "a".repeat(64)));
    }

    #[tokio::test]
    async fn test_submit_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "00ff").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let (code, out, _) = run_args(
            &["submit", RPC[0], RPC[1], "--raw-tx-file", &path, "--json"],
            &fake(None),
        )
        .await;
        assert_eq!(code, 0);
        let body: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(body["data"]["txid"], "a".repeat(64));
    }

    #[tokio::test]
    async fn test_submit_waits_for_confirmations() {
        let (code, out, _) = run_args(
            &["submit", RPC[0], RPC[1], "--raw-tx-hex", "00ff", "--confirmations", "2", "--json"],
            &fake(None),
        )
        .await;
        assert_eq!(code, 0);
        let body: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(body["data"]["confirmations"], 2);
        assert_eq!(body["data"]["required_confs"], 2);
        assert_eq!(body["data"]["blockhash"], "b".repeat(64));
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_poll() {
        let (code, out, _) = run_args(
            &["submit", RPC[0], RPC[1], "--raw-tx-hex", "00ff", "--poll", "soon", "--json"],
            &fake(None),
        )
        .await;
        assert_eq!(code, 1);
        assert!(out.contains("poll must be a duration"));
    }

    #[tokio::test]
    async fn test_submit_rejects_negative_confirmations() {
        let (code, out, _) = run_args(
            &["submit", RPC[0], RPC[1], "--raw-tx-hex", "00ff", "--confirmations", "-1", "--json"],
            &fake(None),
        )
        .await;
        assert_eq!(code, 1);
        assert!(out.contains("confirmations must be >= 0"));
    }

    #[tokio::test]
    async fn test_status_not_found() {
        let txid = "a".repeat(64);
        let (code, out, _) =
            run_args(&["status", RPC[0], RPC[1], "--txid", &txid, "--json"], &fake(None)).await;
        assert_ne!(code, 0);
        assert!(out.contains(r#""version":"v1""#));
        assert!(out.contains(r#""code":"not_found""#));
    }

    #[tokio::test]
    async fn test_status_found_plain() {
        let st = TxStatus::pending(TxId::normalize(&"c".repeat(64)).unwrap());
        let (code, out, _) = run_args(
            &["status", RPC[0], RPC[1], "--txid", &"c".repeat(64)],
            &fake(Some(st)),
        )
        .await;
        assert_eq!(code, 0);
        let body: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(body["in_mempool"], true);
        assert_eq!(body["confirmations"], 0);
    }

    #[tokio::test]
    async fn test_status_requires_txid() {
        let (code, _, err) = run_args(&["status", RPC[0], RPC[1]], &fake(None)).await;
        assert_eq!(code, 1);
        assert!(err.contains("txid is required"));
    }

    #[tokio::test]
    async fn test_unknown_command_is_usage_error() {
        let (code, _, err) = run_args(&["frobnicate"], &fake(None)).await;
        assert_eq!(code, 2);
        assert!(!err.is_empty());
    }

    #[tokio::test]
    async fn test_help_exits_zero() {
        let (code, out, _) = run_args(&["--help"], &fake(None)).await;
        assert_eq!(code, 0);
        assert!(out.contains("submit"));
        assert!(out.contains("serve"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("2s"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert!(parse_duration("500").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("5h").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
