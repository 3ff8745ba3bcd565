pub mod client;
pub mod line_protocol;
pub mod models;

use super::StorageError;
use crate::datamodel::Point;
use async_trait::async_trait;
use std::fmt::Debug;

pub use client::HttpInfluxDbClient;
pub use models::{ResultSet, RowGroup};

/// A query sent to one InfluxDB database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxQuery {
    pub command: String,
    pub database: String,
}

impl InfluxQuery {
    pub fn new(command: String, database: String) -> Self {
        Self { command, database }
    }
}

/// The InfluxDB operations the adapter relies on.
#[async_trait]
pub trait InfluxDbClient: Send + Sync + Debug {
    /// Writes one batch of points; the batch either succeeds or fails as a whole.
    async fn write(
        &self,
        database: &str,
        retention_policy: &str,
        points: &[Point],
    ) -> Result<(), StorageError>;

    async fn query(&self, query: &InfluxQuery) -> Result<Vec<ResultSet>, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;
}
