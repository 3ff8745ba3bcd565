use thiserror::Error;

/// Errors raised while talking to InfluxDB.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Connection, timeout or body transfer failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// InfluxDB answered with a non-success status
    #[error("InfluxDB returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// InfluxDB reported an error in the response body
    #[error("InfluxDB error: {0}")]
    InfluxDb(String),

    /// The response could not be decoded
    #[error("Invalid data format: {0}")]
    InvalidDataFormat(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic storage operation error with context
    #[error("Storage operation failed: {operation} - {details}")]
    OperationFailed { operation: String, details: String },
}

impl StorageError {
    pub fn operation_failed(operation: &str, details: impl Into<String>) -> Self {
        StorageError::OperationFailed {
            operation: operation.to_string(),
            details: details.into(),
        }
    }

    /// InfluxDB answers queries on a database that was never created with
    /// this error.
    pub fn is_database_not_found(&self) -> bool {
        matches!(self, StorageError::InfluxDb(message) if message.starts_with("database not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_database_not_found() {
        assert!(StorageError::InfluxDb("database not found: prometheus".to_string())
            .is_database_not_found());
        assert!(!StorageError::InfluxDb("measurement not found".to_string())
            .is_database_not_found());
        assert!(!StorageError::operation_failed("query", "database not found")
            .is_database_not_found());
    }
}
