use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::latency::LatencySummary;
use crate::api::{PipelineHealth, RunLatency};
use crate::config::PENDING_STATUS;
use crate::error::AppError;
use crate::render::format_timestamp;
use crate::state::ReportStore;
use crate::types::MergedRecord;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<ReportStore>,
    pub health: Arc<PipelineHealth>,
    pub latency: Arc<RunLatency>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_report))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .route("/symbol/:symbol", get(get_symbol))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SymbolResponse {
    pub updated_at: String,
    #[serde(flatten)]
    pub record: MergedRecord,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Latest report, or a plain status line before the first run finishes.
async fn get_report(State(state): State<ApiState>) -> Response {
    match state.store.document() {
        Some(doc) => Html(doc.to_string()).into_response(),
        None => ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], PENDING_STATUS).into_response(),
    }
}

async fn get_health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.health.report())
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySummary> {
    Json(state.latency.summary())
}

async fn get_symbol(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
) -> Result<Json<SymbolResponse>, AppError> {
    let snapshot = state
        .store
        .snapshot()
        .ok_or_else(|| AppError::NotFound("no market data yet".to_string()))?;
    let record = snapshot
        .find(symbol.trim())
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("symbol {}", symbol.trim().to_uppercase())))?;

    Ok(Json(SymbolResponse {
        updated_at: format_timestamp(snapshot.taken_at),
        record,
    }))
}
