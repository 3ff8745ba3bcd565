use crate::datamodel::Point;
use crate::storage::influxdb::{InfluxDbClient, InfluxQuery, ResultSet};
use crate::storage::StorageError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// One batch received by [`RecordingInfluxDbClient::write`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub database: String,
    pub retention_policy: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Default)]
struct Recorder {
    writes: Vec<RecordedWrite>,
    queries: Vec<InfluxQuery>,
    query_results: BTreeMap<String, Vec<ResultSet>>,
    failing_databases: BTreeSet<String>,
    missing_databases: BTreeSet<String>,
    fail_queries: bool,
    unreachable: bool,
}

/// In-memory InfluxDB stand-in.
///
/// Records accepted writes and issued queries, answers queries with canned
/// result sets per database, and can be told to reject specific databases.
#[derive(Debug, Default)]
pub struct RecordingInfluxDbClient {
    recorder: Mutex<Recorder>,
}

impl RecordingInfluxDbClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_database(&self, database: &str) {
        self.recorder
            .lock()
            .unwrap()
            .failing_databases
            .insert(database.to_string());
    }

    /// Queries on `database` fail the way InfluxDB reports an unknown database.
    pub fn drop_database(&self, database: &str) {
        self.recorder
            .lock()
            .unwrap()
            .missing_databases
            .insert(database.to_string());
    }

    pub fn fail_queries(&self) {
        self.recorder.lock().unwrap().fail_queries = true;
    }

    /// Makes `ping` fail.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.recorder.lock().unwrap().unreachable = unreachable;
    }

    pub fn set_query_results(&self, database: &str, results: Vec<ResultSet>) {
        self.recorder
            .lock()
            .unwrap()
            .query_results
            .insert(database.to_string(), results);
    }

    /// Accepted writes, in arrival order.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.recorder.lock().unwrap().writes.clone()
    }

    pub fn points_for(&self, database: &str) -> Vec<Point> {
        self.recorder
            .lock()
            .unwrap()
            .writes
            .iter()
            .filter(|w| w.database == database)
            .flat_map(|w| w.points.iter().cloned())
            .collect()
    }

    pub fn queries(&self) -> Vec<InfluxQuery> {
        self.recorder.lock().unwrap().queries.clone()
    }
}

#[async_trait]
impl InfluxDbClient for RecordingInfluxDbClient {
    async fn write(
        &self,
        database: &str,
        retention_policy: &str,
        points: &[Point],
    ) -> Result<(), StorageError> {
        let mut recorder = self.recorder.lock().unwrap();
        if recorder.failing_databases.contains(database) {
            return Err(StorageError::UnexpectedStatus {
                status: 404,
                body: format!("{{\"error\":\"database not found: \\\"{}\\\"\"}}", database),
            });
        }
        recorder.writes.push(RecordedWrite {
            database: database.to_string(),
            retention_policy: retention_policy.to_string(),
            points: points.to_vec(),
        });
        Ok(())
    }

    async fn query(&self, query: &InfluxQuery) -> Result<Vec<ResultSet>, StorageError> {
        let mut recorder = self.recorder.lock().unwrap();
        recorder.queries.push(query.clone());
        if recorder.fail_queries {
            return Err(StorageError::InfluxDb("query failed".to_string()));
        }
        if recorder.missing_databases.contains(&query.database) {
            return Err(StorageError::InfluxDb(format!(
                "database not found: {}",
                query.database
            )));
        }
        Ok(recorder
            .query_results
            .get(&query.database)
            .cloned()
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        if self.recorder.lock().unwrap().unreachable {
            return Err(StorageError::operation_failed("ping", "unreachable"));
        }
        Ok(())
    }
}
