use super::admin::{__path_metrics, __path_reload, metrics, reload};
use super::app_error::AppError;
use super::health::{__path_liveness, __path_readiness, liveness, readiness};
use super::prometheus::{
    __path_prometheus_remote_read, __path_prometheus_remote_write, prometheus_remote_read,
    prometheus_remote_write,
};
use super::state::HttpServerState;
use crate::config;
use anyhow::Result;
use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::header;
use axum::routing::get;
use axum::routing::post;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace;
use tower_http::{ServiceBuilderExt, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{Level, error, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "Adapter", description = "Remote storage adapter"),
        (name = "Prometheus", description = "Prometheus Remote Write and Remote Read API"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Admin", description = "Metrics and mapping reload"),
    ),
    paths(frontpage,
        prometheus_remote_write, prometheus_remote_read,
        liveness, readiness,
        metrics, reload),
)]
struct ApiDoc;

/// Builds the application router.
///
/// Shared by the server and the tests so that both see the same routes.
pub fn build_app_routes(state: HttpServerState, max_body_layer: DefaultBodyLimit) -> Router {
    Router::new()
        .route("/", get(frontpage))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        // Prometheus Remote Write/Read API
        .route(
            "/write",
            post(prometheus_remote_write).layer(max_body_layer.clone()),
        )
        .route(
            "/read",
            post(prometheus_remote_read).layer(max_body_layer),
        )
        // Probes
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        // Administration
        .route("/metrics", get(metrics))
        .route("/-/reload", post(reload))
        .with_state(state)
}

pub async fn run_http_server(state: HttpServerState, address: SocketAddr) -> Result<()> {
    let config = config::get()?;
    let max_body_layer = DefaultBodyLimit::max(config.parse_http_body_limit()?);
    let timeout_seconds = config.http_server_timeout_seconds;

    // List of headers that shouldn't be logged
    let sensitive_headers: Arc<[_]> = vec![header::AUTHORIZATION, header::COOKIE].into();

    let middleware = ServiceBuilder::new()
        .sensitive_request_headers(sensitive_headers.clone())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .sensitive_response_headers(sensitive_headers)
        .layer(TimeoutLayer::new(Duration::from_secs(timeout_seconds)))
        .compression()
        .into_inner();

    let app = build_app_routes(state, max_body_layer).layer(middleware);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Adapter",
    responses(
        (status = 200, description = "Adapter name", body = String)
    )
)]
async fn frontpage(State(state): State<HttpServerState>) -> Result<Json<String>, AppError> {
    let name: String = (*state.name).clone();
    Ok(Json(name))
}
