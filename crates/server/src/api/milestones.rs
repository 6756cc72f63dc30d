//! Milestone RPC handlers.
//!
//! Thin HTTP shims over the gateway: parse the kind, forward the call,
//! map a dispatcher rejection to 503. All registry semantics live in the
//! core.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use milo_core::{
    DispatchError, MilestoneIntelligence, MilestoneKind, MilestoneUpdate, PipelineIntelligence,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for activating a milestone
#[derive(Debug, Default, Deserialize)]
pub struct ActivateBody {
    /// The worker's own pid. Omitted or zero keeps the pid recorded at
    /// spawn time.
    #[serde(default)]
    pub process_id: u32,
}

/// Request body for appending a log message
#[derive(Debug, Deserialize)]
pub struct LogBody {
    pub message: String,
}

/// Acknowledgement for calls without a richer result
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ApiErrorResponse>);

fn unknown_kind(kind: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ApiErrorResponse {
            error: format!("Unknown milestone kind: {}", kind),
        }),
    )
}

fn unavailable(e: DispatchError) -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn parse_kind(raw: &str) -> Result<MilestoneKind, ApiError> {
    raw.parse::<MilestoneKind>().map_err(|_| unknown_kind(raw))
}

// ============================================================================
// Handlers
// ============================================================================

/// Get aggregated pipeline intelligence
pub async fn get_intelligence(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PipelineIntelligence>, ApiError> {
    match state.gateway().get_intelligence().await {
        Ok(intelligence) => Ok(Json(intelligence)),
        Err(e) => Err(unavailable(e)),
    }
}

/// Activate a milestone (worker startup notification)
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    body: Option<Json<ActivateBody>>,
) -> Result<Json<MilestoneIntelligence>, ApiError> {
    let kind = parse_kind(&kind)?;
    let process_id = body.map(|b| b.process_id).unwrap_or(0);

    state
        .gateway()
        .activate(kind, process_id)
        .await
        .map(Json)
        .map_err(unavailable)
}

/// Publish a milestone's updated intelligence
pub async fn publish_intelligence(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(update): Json<MilestoneUpdate>,
) -> Result<Json<MilestoneIntelligence>, ApiError> {
    let kind = parse_kind(&kind)?;

    state
        .gateway()
        .publish_intelligence(kind, update)
        .await
        .map(Json)
        .map_err(unavailable)
}

/// Keepalive heartbeat for a running milestone
pub async fn keepalive(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<AckResponse>, ApiError> {
    let kind = parse_kind(&kind)?;

    state
        .gateway()
        .keepalive(kind)
        .await
        .map(|_| {
            Json(AckResponse {
                status: "ok".to_string(),
            })
        })
        .map_err(unavailable)
}

/// Append a worker log message to the run transcript
pub async fn append_log(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LogBody>,
) -> Result<Json<AckResponse>, ApiError> {
    state
        .gateway()
        .append_log(body.message)
        .await
        .map(|_| {
            Json(AckResponse {
                status: "ok".to_string(),
            })
        })
        .map_err(unavailable)
}
