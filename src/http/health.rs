use super::state::HttpServerState;
use crate::storage::StorageError;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Alive {
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    NotReady,
}

/// Outcome of pinging InfluxDB.
#[derive(Debug, Serialize, ToSchema)]
pub struct InfluxDbReadiness {
    pub status: Readiness,
    /// `ok` or `error`
    pub influxdb: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InfluxDbReadiness {
    fn from_ping(ping: Result<(), StorageError>) -> Self {
        match ping {
            Ok(()) => Self {
                status: Readiness::Ready,
                influxdb: "ok".to_string(),
                error: None,
            },
            Err(err) => Self {
                status: Readiness::NotReady,
                influxdb: "error".to_string(),
                error: Some(err.to_string()),
            },
        }
    }
}

impl IntoResponse for InfluxDbReadiness {
    fn into_response(self) -> Response {
        let status = match self.status {
            Readiness::Ready => StatusCode::OK,
            Readiness::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(self)).into_response()
    }
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "The adapter answers", body = Alive)
    )
)]
pub async fn liveness() -> Json<Alive> {
    Json(Alive {
        status: "ok".to_string(),
    })
}

/// Readiness check, ready once InfluxDB answers a ping.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "InfluxDB is reachable", body = InfluxDbReadiness),
        (status = 503, description = "InfluxDB is unreachable", body = InfluxDbReadiness)
    )
)]
pub async fn readiness(State(state): State<HttpServerState>) -> InfluxDbReadiness {
    InfluxDbReadiness::from_ping(state.client.ping().await)
}
