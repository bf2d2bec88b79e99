//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, body limit, timeout)
//! - Serve until shutdown, then drain within the grace period

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::broadcast::BroadcastService;
use crate::config::{BroadcastConfig, ServerConfig};
use crate::http::handlers;
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::lifecycle::Shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn BroadcastService>,
    pub shutdown: Shutdown,
    /// Budget for one request's confirmation wait.
    pub wait_timeout: Duration,
}

/// HTTP front end of serve mode.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server around a shared broadcaster.
    pub fn new(
        service: Arc<dyn BroadcastService>,
        config: &BroadcastConfig,
        shutdown: Shutdown,
    ) -> Self {
        let state = AppState {
            service,
            shutdown: shutdown.clone(),
            wait_timeout: Duration::from_secs(config.timeouts.wait_secs),
        };

        let router = Self::build_router(&config.server, state);
        Self {
            router,
            config: config.server.clone(),
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            // The limit wraps the timeout: TimeoutLayer needs a `Default` inner body.
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)));

        Router::new()
            .route("/healthz", get(handlers::health))
            .route("/v1/tx/submit", post(handlers::submit))
            .route("/v1/tx/{txid}", get(handlers::status))
            .with_state(state)
            .layer(middleware)
    }

    /// The router, for driving the API without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// shutdown is triggered.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let graceful = self.shutdown.clone();
        let server = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { graceful.triggered().await });

        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        let shutdown = self.shutdown.clone();
        let drain_deadline = async move {
            shutdown.triggered().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = server.into_future() => result?,
            _ = drain_deadline => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Shutdown grace period elapsed, dropping in-flight requests"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
