//! API handlers.
//!
//! | Method | Path                            | Action                          |
//! |--------|---------------------------------|---------------------------------|
//! | GET    | `/healthz`                      | liveness                        |
//! | POST   | `/v1/tx/submit`                 | submit, optionally wait         |
//! | GET    | `/v1/tx/{txid}`                 | current status                  |
//! | GET    | `/v1/tx/{txid}?confirmations=N` | wait until N confirmations      |

use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::broadcast::CallContext;
use crate::http::response::{ApiError, Confirmed, Envelope, Submitted};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Body of `POST /v1/tx/submit`.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub raw_tx_hex: String,
    /// Confirmations to wait for after submitting; 0 returns right away.
    #[serde(default)]
    pub confirmations: i64,
}

/// Query of `GET /v1/tx/{txid}`.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub confirmations: Option<i64>,
}

pub async fn health() -> Json<Envelope<serde_json::Value>> {
    Json(Envelope::ok(serde_json::json!({ "status": "ok" })))
}

pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let result = submit_inner(&state, body).await;
    respond("submit", start, result)
}

async fn submit_inner(
    state: &AppState,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<serde_json::Value, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError {
        status: rejection.status(),
        code: "invalid_request",
        message: rejection.body_text(),
    })?;
    if request.confirmations < 0 {
        return Err(ApiError::invalid_request("confirmations must be >= 0"));
    }

    let ctx = state.request_context();
    let txid = state.service.submit(&ctx, &request.raw_tx_hex).await?;
    tracing::info!(txid = %txid, "Transaction submitted");

    if request.confirmations == 0 {
        return Ok(to_value(Submitted { txid }));
    }

    let status = state
        .service
        .wait_for_confirmations(&ctx, txid.as_str(), request.confirmations)
        .await?;
    tracing::info!(
        txid = %txid,
        confirmations = status.confirmations,
        required = request.confirmations,
        "Confirmation target reached"
    );
    Ok(to_value(Confirmed {
        status,
        required_confs: request.confirmations,
    }))
}

pub async fn status(
    State(state): State<AppState>,
    Path(txid): Path<String>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Response {
    let start = Instant::now();
    let result = match query {
        Ok(Query(query)) => status_inner(&state, &txid, query).await,
        Err(rejection) => Err(ApiError::invalid_request(rejection.body_text())),
    };
    respond("status", start, result)
}

async fn status_inner(
    state: &AppState,
    txid: &str,
    query: StatusQuery,
) -> Result<serde_json::Value, ApiError> {
    let ctx = state.request_context();

    match query.confirmations {
        Some(required) if required > 0 => {
            let status = state.service.wait_for_confirmations(&ctx, txid, required).await?;
            Ok(to_value(Confirmed {
                status,
                required_confs: required,
            }))
        }
        Some(required) if required < 0 => {
            Err(ApiError::invalid_request("confirmations must be >= 0"))
        }
        _ => match state.service.status(&ctx, txid).await? {
            Some(status) => Ok(to_value(status)),
            None => Err(ApiError::not_found()),
        },
    }
}

impl AppState {
    /// Context for one request: bounded by the wait budget and cancelled on
    /// process shutdown.
    fn request_context(&self) -> CallContext {
        self.shutdown.context().with_timeout(self.wait_timeout)
    }
}

fn to_value<T: Serialize>(data: T) -> serde_json::Value {
    serde_json::to_value(data).unwrap_or(serde_json::Value::Null)
}

fn respond(
    route: &'static str,
    start: Instant,
    result: Result<serde_json::Value, ApiError>,
) -> Response {
    match result {
        Ok(data) => {
            metrics::record_request(route, "ok", start);
            Json(Envelope::ok(data)).into_response()
        }
        Err(err) => {
            metrics::record_request(route, err.code, start);
            if err.status.is_server_error() {
                tracing::warn!(route, code = err.code, error = %err.message, "Request failed");
            } else {
                tracing::debug!(route, code = err.code, error = %err.message, "Request rejected");
            }
            err.into_response()
        }
    }
}
