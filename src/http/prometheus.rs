use super::{app_error::AppError, state::HttpServerState};
use crate::parsing::prometheus::{
    into_samples, parse_remote_read_request, parse_remote_write_request, serialize_read_response,
};
use anyhow::Result;
use axum::{
    debug_handler,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tokio_util::bytes::Bytes;
use tracing::{debug, warn};

pub const REMOTE_WRITE_VERSION_HEADER: &str = "x-prometheus-remote-write-version";
pub const REMOTE_READ_VERSION_HEADER: &str = "x-prometheus-remote-read-version";
const SUPPORTED_VERSION: &str = "0.1.0";

/// Validates the headers Prometheus sends with remote storage requests:
/// - `content-encoding`: must be "snappy"
/// - `content-type`: must be "application/x-protobuf"
/// - the protocol version header: must be "0.1.0"
fn verify_headers(headers: &HeaderMap, version_header: &str) -> Result<(), AppError> {
    match headers.get(header::CONTENT_ENCODING) {
        Some(content_encoding) => match content_encoding.to_str() {
            Ok(value) if value.eq_ignore_ascii_case("snappy") => {}
            _ => {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Unsupported content-encoding, must be snappy"
                )));
            }
        },
        None => {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Missing content-encoding header"
            )));
        }
    }

    match headers.get(header::CONTENT_TYPE) {
        Some(content_type) => match content_type.to_str() {
            Ok(value) if value.eq_ignore_ascii_case("application/x-protobuf") => {}
            _ => {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Unsupported content-type, must be application/x-protobuf"
                )));
            }
        },
        None => {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Missing content-type header"
            )));
        }
    }

    match headers.get(version_header) {
        Some(version) => match version.to_str() {
            Ok(SUPPORTED_VERSION) => {}
            _ => {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Unsupported {}, must be {}",
                    version_header,
                    SUPPORTED_VERSION
                )));
            }
        },
        None => {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Missing {} header",
                version_header
            )));
        }
    }

    Ok(())
}

/// Prometheus Remote Write API.
///
/// Classifies the received samples into InfluxDB measurements and writes
/// them, one batch per destination database. Samples that cannot be mapped
/// are counted and dropped.
///
/// It follows the [Prometheus Remote Write specification](https://prometheus.io/docs/concepts/remote_write_spec/).
#[utoipa::path(
    post,
    path = "/write",
    tag = "Prometheus",
    request_body(
        content_type = "application/x-protobuf",
        description = "Snappy compressed WriteRequest. [Reference](https://prometheus.io/docs/concepts/remote_write_spec/)",
    ),
    params(
        ("content-encoding" = String, Header, format = "snappy", description = "Content encoding, must be snappy"),
        ("content-type" = String, Header, format = "application/x-protobuf", description = "Content type, must be application/x-protobuf"),
        ("x-prometheus-remote-write-version" = String, Header, format = "0.1.0", description = "Prometheus Remote Write version, must be 0.1.0"),
    ),
    responses(
        (status = 204, description = "No Content"),
        (status = 400, description = "Bad Request", body = AppError),
        (status = 500, description = "Internal Server Error", body = AppError),
    )
)]
#[debug_handler]
pub async fn prometheus_remote_write(
    State(state): State<HttpServerState>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<StatusCode, AppError> {
    debug!("Prometheus remote write: received {} bytes", bytes.len());
    verify_headers(&headers, REMOTE_WRITE_VERSION_HEADER)?;

    let write_request = parse_remote_write_request(&bytes).map_err(AppError::bad_request)?;

    // Prometheus regularly sends metadata-only requests.
    if write_request.timeseries.is_empty() {
        return Ok(StatusCode::NO_CONTENT);
    }

    let samples = into_samples(write_request);
    let summary = state
        .write_pipeline
        .write(&samples)
        .await
        .map_err(AppError::internal_server_error)?;

    if !summary.failed_databases.is_empty() {
        warn!(
            "Prometheus remote write: {} of {} samples sent, failed databases: {:?}",
            summary.sent, summary.received, summary.failed_databases
        );
    } else {
        debug!(
            "Prometheus remote write: {} received, {} ignored, {} sent",
            summary.received, summary.ignored, summary.sent
        );
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Prometheus Remote Read API.
///
/// Translates each query into InfluxQL, runs it on every database that may
/// hold the series and returns the merged series.
///
/// It follows the [Prometheus Remote Read specification](https://prometheus.io/docs/prometheus/latest/querying/remote_read_api/).
/// Only the `SAMPLES` response type is supported.
#[utoipa::path(
    post,
    path = "/read",
    tag = "Prometheus",
    request_body(
        content_type = "application/x-protobuf",
        description = "Snappy compressed ReadRequest. [Reference](https://prometheus.io/docs/prometheus/latest/querying/remote_read_api/)",
    ),
    params(
        ("content-encoding" = String, Header, format = "snappy", description = "Content encoding, must be snappy"),
        ("content-type" = String, Header, format = "application/x-protobuf", description = "Content type, must be application/x-protobuf"),
        ("x-prometheus-remote-read-version" = String, Header, format = "0.1.0", description = "Prometheus Remote Read version, must be 0.1.0"),
    ),
    responses(
        (status = 200, description = "Snappy compressed ReadResponse", content_type = "application/x-protobuf"),
        (status = 400, description = "Bad Request", body = AppError),
        (status = 500, description = "Internal Server Error", body = AppError),
    )
)]
#[debug_handler]
pub async fn prometheus_remote_read(
    State(state): State<HttpServerState>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<impl IntoResponse, AppError> {
    debug!("Prometheus remote read: received {} bytes", bytes.len());
    verify_headers(&headers, REMOTE_READ_VERSION_HEADER)?;

    let read_request = parse_remote_read_request(&bytes).map_err(AppError::bad_request)?;
    let read_response = state
        .read_pipeline
        .read(&read_request)
        .await
        .map_err(AppError::from_read_error)?;
    let body = serialize_read_response(&read_response)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-protobuf"),
            (header::CONTENT_ENCODING, "snappy"),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(version_header: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("snappy"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-protobuf"),
        );
        headers.insert(version_header, HeaderValue::from_static("0.1.0"));
        headers
    }

    #[test]
    fn test_verify_headers() {
        assert!(verify_headers(&headers(REMOTE_WRITE_VERSION_HEADER), REMOTE_WRITE_VERSION_HEADER).is_ok());
        assert!(verify_headers(&headers(REMOTE_READ_VERSION_HEADER), REMOTE_READ_VERSION_HEADER).is_ok());

        // Write headers on a read request.
        assert!(verify_headers(&headers(REMOTE_WRITE_VERSION_HEADER), REMOTE_READ_VERSION_HEADER).is_err());

        let mut upper = headers(REMOTE_WRITE_VERSION_HEADER);
        upper.insert(header::CONTENT_ENCODING, HeaderValue::from_static("SNAPPY"));
        assert!(verify_headers(&upper, REMOTE_WRITE_VERSION_HEADER).is_ok());

        let mut gzip = headers(REMOTE_WRITE_VERSION_HEADER);
        gzip.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        assert!(verify_headers(&gzip, REMOTE_WRITE_VERSION_HEADER).is_err());

        let mut json = headers(REMOTE_WRITE_VERSION_HEADER);
        json.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(verify_headers(&json, REMOTE_WRITE_VERSION_HEADER).is_err());

        let mut v2 = headers(REMOTE_WRITE_VERSION_HEADER);
        v2.insert(REMOTE_WRITE_VERSION_HEADER, HeaderValue::from_static("2.0.0"));
        assert!(verify_headers(&v2, REMOTE_WRITE_VERSION_HEADER).is_err());

        assert!(verify_headers(&HeaderMap::new(), REMOTE_WRITE_VERSION_HEADER).is_err());
    }
}
