use thiserror::Error;

/// Errors that invalidate a whole remote read query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("{0} matchers are not supported on the metric name")]
    UnsupportedMatcher(&'static str),

    #[error("Unknown matcher type {0}")]
    UnknownMatcherType(i32),

    #[error("Malformed result row: {0}")]
    MalformedRow(String),
}
