use crate::pipeline::ReadError;
use crate::query::QueryError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

// Anyhow error handling with axum
// https://github.com/tokio-rs/axum/blob/d3112a40d55f123bc5e65f995e2068e245f12055/examples/anyhow-error-response/src/main.rs
#[derive(Debug, ToSchema)]
pub enum AppError {
    #[schema(example = "Internal Server Error", value_type = String)]
    InternalServerError(anyhow::Error),
    #[schema(example = "Bad Request", value_type = String)]
    BadRequest(anyhow::Error),
    #[schema(example = "Not Found", value_type = String)]
    NotFound(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InternalServerError(error) => {
                error!("Internal Server Error: {:#}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(error) => (StatusCode::BAD_REQUEST, format!("{:#}", error)),
            AppError::NotFound(error) => (StatusCode::NOT_FOUND, error.to_string()),
        };
        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

impl AppError {
    pub fn bad_request(err: impl Into<anyhow::Error>) -> Self {
        Self::BadRequest(err.into())
    }

    pub fn internal_server_error(err: impl Into<anyhow::Error>) -> Self {
        Self::InternalServerError(err.into())
    }

    pub fn not_found(err: impl Into<anyhow::Error>) -> Self {
        Self::NotFound(err.into())
    }

    /// Requests the adapter cannot answer are the client's fault; broken
    /// InfluxDB answers are ours.
    pub fn from_read_error(err: ReadError) -> Self {
        match err {
            ReadError::Query(QueryError::MalformedRow(_)) | ReadError::Storage(_) => {
                Self::internal_server_error(err)
            }
            ReadError::Query(_) | ReadError::UnsupportedResponseType => Self::bad_request(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_status_codes() {
        let response = AppError::bad_request(anyhow::anyhow!("nope")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::not_found(anyhow::anyhow!("gone")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response: Response = AppError::from(std::io::Error::other("disk")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_from_read_error() {
        let status = |err: ReadError| AppError::from_read_error(err).into_response().status();

        assert_eq!(
            status(ReadError::Query(QueryError::UnsupportedMatcher("Not-equal"))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ReadError::Query(QueryError::UnknownMatcherType(9))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ReadError::UnsupportedResponseType),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ReadError::Query(QueryError::MalformedRow("[1]".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(ReadError::Storage(StorageError::InfluxDb("boom".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
