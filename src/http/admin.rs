use super::app_error::AppError;
use super::state::HttpServerState;
use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReloadResponse {
    pub measurements: usize,
    pub metrics: usize,
    pub databases: Vec<String>,
}

/// Adapter metrics
///
/// Counters of received, ignored and sent samples, in the OpenMetrics text format.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Admin",
    responses(
        (status = 200, description = "Metrics", content_type = "application/openmetrics-text"),
    )
)]
pub async fn metrics(State(state): State<HttpServerState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.encode()?;
    Ok(([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body))
}

/// Reload the measurement mapping
///
/// Re-reads the mapping file and swaps in a new classification index.
/// The current index is kept if the file cannot be loaded.
#[utoipa::path(
    post,
    path = "/-/reload",
    tag = "Admin",
    responses(
        (status = 200, description = "Mapping reloaded", body = ReloadResponse),
        (status = 404, description = "Reload is not configured", body = AppError),
        (status = 500, description = "Internal Server Error", body = AppError),
    )
)]
pub async fn reload(State(state): State<HttpServerState>) -> Result<Json<ReloadResponse>, AppError> {
    let source = state
        .mapping
        .as_ref()
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Mapping reload is not configured")))?;

    let index = source.reload(&state.index)?;
    Ok(Json(ReloadResponse {
        measurements: index.measurement_count(),
        metrics: index.metric_count(),
        databases: index.database_names(),
    }))
}
