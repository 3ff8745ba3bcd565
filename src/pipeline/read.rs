use crate::datamodel::METRIC_NAME_LABEL;
use crate::mapping::{ClassificationIndex, IndexHandle};
use crate::metrics::AdapterMetrics;
use crate::parsing::prometheus::models::{
    self, Label, LabelMatcher, Query, QueryResult, ReadRequest, ReadResponse, label_matcher,
};
use crate::query::{QueryError, QueryTranslator, ResultMerger, TimeSeries};
use crate::storage::influxdb::ResultSet;
use crate::storage::{InfluxDbClient, InfluxQuery, StorageError};
use futures::future::try_join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("InfluxDB query failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Only the SAMPLES response type is supported")]
    UnsupportedResponseType,
}

/// Answers remote read requests: translates each query, runs it against
/// every database that may hold the series, then merges the results.
#[derive(Debug, Clone)]
pub struct ReadPipeline {
    index: Arc<IndexHandle>,
    client: Arc<dyn InfluxDbClient>,
    metrics: Arc<AdapterMetrics>,
    translator: QueryTranslator,
}

impl ReadPipeline {
    pub fn new(
        index: Arc<IndexHandle>,
        client: Arc<dyn InfluxDbClient>,
        metrics: Arc<AdapterMetrics>,
        retention_policy: String,
    ) -> Self {
        Self {
            index,
            client,
            metrics,
            translator: QueryTranslator::new(retention_policy),
        }
    }

    /// One result per query, in request order.
    pub async fn read(&self, request: &ReadRequest) -> Result<ReadResponse, ReadError> {
        if !request.accepts_samples() {
            return Err(ReadError::UnsupportedResponseType);
        }

        let mut results = Vec::with_capacity(request.queries.len());
        for query in &request.queries {
            let series = self.query(query).await?;
            results.push(QueryResult {
                timeseries: series.into_iter().map(to_proto).collect(),
            });
        }
        Ok(ReadResponse { results })
    }

    pub async fn query(&self, query: &Query) -> Result<Vec<TimeSeries>, ReadError> {
        self.metrics.read_queries.inc();

        let command = self.translator.translate(
            &query.matchers,
            query.start_timestamp_ms,
            query.end_timestamp_ms,
        )?;
        let databases = target_databases(&self.index.load(), &query.matchers);
        debug!("Remote read on {:?}: {}", databases, command);

        let influx_queries: Vec<InfluxQuery> = databases
            .into_iter()
            .map(|database| InfluxQuery::new(command.clone(), database))
            .collect();
        let responses = try_join_all(
            influx_queries
                .iter()
                .map(|influx_query| self.query_database(influx_query)),
        )
        .await?;

        let result_sets: Vec<_> = responses.into_iter().flatten().collect();
        let series = ResultMerger::merge(&result_sets)?;
        debug!("Remote read returned {} series", series.len());
        Ok(series)
    }

    async fn query_database(
        &self,
        influx_query: &InfluxQuery,
    ) -> Result<Vec<ResultSet>, StorageError> {
        match self.client.query(influx_query).await {
            Err(err) if err.is_database_not_found() => {
                debug!("Database {} does not exist yet", influx_query.database);
                Ok(Vec::new())
            }
            result => result,
        }
    }
}

/// A metric name equality matcher on a known measurement only needs that
/// measurement's database. Anything else may match series in every database
/// owning a measurement.
pub fn target_databases(index: &ClassificationIndex, matchers: &[LabelMatcher]) -> Vec<String> {
    let measurement = matchers
        .iter()
        .rfind(|m| m.name == METRIC_NAME_LABEL)
        .filter(|m| m.r#type == label_matcher::Type::Eq as i32)
        .and_then(|m| index.measurement(&m.value));

    match measurement {
        Some(spec) => vec![spec.database.clone()],
        None => index.database_names(),
    }
}

fn to_proto(series: TimeSeries) -> models::TimeSeries {
    models::TimeSeries {
        labels: series
            .labels
            .into_iter()
            .map(|(name, value)| Label { name, value })
            .collect(),
        samples: series
            .samples
            .into_iter()
            .map(|sample| models::Sample {
                value: sample.value,
                timestamp: sample.timestamp_ms,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MeasurementSpec;
    use crate::parsing::prometheus::models::read_request::ResponseType;
    use crate::storage::influxdb::{ResultSet, RowGroup};
    use crate::test_utils::RecordingInfluxDbClient;
    use label_matcher::Type;
    use serde_json::json;

    fn index() -> ClassificationIndex {
        ClassificationIndex::build(
            "prometheus",
            vec![
                MeasurementSpec {
                    name: "http".to_string(),
                    tags: ["host".to_string()].into(),
                    fields: ["latency".to_string()].into(),
                    database: "metrics".to_string(),
                    ..Default::default()
                },
                MeasurementSpec {
                    name: "node_load1".to_string(),
                    tags: ["host".to_string()].into(),
                    database: "nodes".to_string(),
                    ..Default::default()
                },
            ],
        )
    }

    fn result_set(name: &str, host: &str, rows: serde_json::Value) -> Vec<ResultSet> {
        vec![ResultSet {
            series: vec![RowGroup {
                name: name.to_string(),
                tags: [("host".to_string(), host.to_string())].into(),
                columns: vec!["time".to_string(), "value".to_string()],
                values: serde_json::from_value(rows).unwrap(),
            }],
            ..Default::default()
        }]
    }

    fn pipeline(client: Arc<RecordingInfluxDbClient>) -> ReadPipeline {
        ReadPipeline::new(
            Arc::new(IndexHandle::new(index())),
            client,
            Arc::new(AdapterMetrics::new()),
            "autogen".to_string(),
        )
    }

    fn query(matchers: Vec<LabelMatcher>) -> Query {
        Query {
            start_timestamp_ms: 0,
            end_timestamp_ms: 10_000,
            matchers,
            hints: None,
        }
    }

    #[test]
    fn test_target_databases() {
        let index = index();
        let eq = |value: &str| vec![LabelMatcher::new(Type::Eq, "__name__", value)];

        assert_eq!(target_databases(&index, &eq("node_load1")), vec!["nodes"]);
        assert_eq!(
            target_databases(&index, &eq("unknown")),
            vec!["metrics", "nodes"]
        );
        assert_eq!(
            target_databases(
                &index,
                &[LabelMatcher::new(Type::Re, "__name__", "node_load1")]
            ),
            vec!["metrics", "nodes"]
        );
        assert_eq!(
            target_databases(&index, &[LabelMatcher::new(Type::Eq, "host", "a")]),
            vec!["metrics", "nodes"]
        );
    }

    #[tokio::test]
    async fn test_query_single_database() {
        let client = Arc::new(RecordingInfluxDbClient::new());
        client.set_query_results("nodes", result_set("node_load1", "a", json!([[1000, 0.5]])));
        let pipeline = pipeline(client.clone());

        let series = pipeline
            .query(&query(vec![LabelMatcher::new(
                Type::Eq,
                "__name__",
                "node_load1",
            )]))
            .await
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].labels["__name__"], "node_load1");
        assert_eq!(series[0].samples[0].value, 0.5);

        let queries = client.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].database, "nodes");
        assert_eq!(
            queries[0].command,
            "SELECT value FROM \"autogen\".\"node_load1\" WHERE time >= 0ms AND time <= 10000ms GROUP BY *"
        );
    }

    #[tokio::test]
    async fn test_query_fans_out_and_merges() {
        let client = Arc::new(RecordingInfluxDbClient::new());
        client.set_query_results("metrics", result_set("up", "a", json!([[1, 1.0], [3, 1.0]])));
        client.set_query_results("nodes", result_set("up", "a", json!([[2, 0.0], [3, 0.0]])));
        let pipeline = pipeline(client.clone());

        let series = pipeline
            .query(&query(vec![LabelMatcher::new(Type::Re, "__name__", "u.")]))
            .await
            .unwrap();

        // The default database holds no measurement and is not queried.
        assert_eq!(client.queries().len(), 2);
        assert!(client.queries().iter().all(|q| q.database != "prometheus"));
        assert_eq!(series.len(), 1);
        let values: Vec<(i64, f64)> = series[0]
            .samples
            .iter()
            .map(|s| (s.timestamp_ms, s.value))
            .collect();
        // Sub-queries are merged in database order.
        assert_eq!(values, vec![(1, 1.0), (2, 0.0), (3, 1.0)]);
    }

    #[tokio::test]
    async fn test_read_returns_one_result_per_query() {
        let client = Arc::new(RecordingInfluxDbClient::new());
        client.set_query_results("nodes", result_set("node_load1", "a", json!([[1, 0.5]])));
        let pipeline = pipeline(client.clone());

        let request = ReadRequest {
            queries: vec![
                query(vec![LabelMatcher::new(Type::Eq, "__name__", "node_load1")]),
                query(vec![LabelMatcher::new(Type::Eq, "__name__", "http")]),
            ],
            accepted_response_types: vec![ResponseType::Samples as i32],
        };
        let response = pipeline.read(&request).await.unwrap();

        assert_eq!(response.results.len(), 2);
        let series = &response.results[0].timeseries[0];
        assert_eq!(
            series.labels,
            vec![Label::new("__name__", "node_load1"), Label::new("host", "a")]
        );
        assert_eq!(series.samples[0].timestamp, 1);
        assert!(response.results[1].timeseries.is_empty());
    }

    #[tokio::test]
    async fn test_read_errors() {
        let client = Arc::new(RecordingInfluxDbClient::new());
        let pipeline = pipeline(client.clone());

        let unsupported = ReadRequest {
            queries: vec![query(vec![LabelMatcher::new(Type::Neq, "__name__", "up")])],
            accepted_response_types: vec![],
        };
        assert!(matches!(
            pipeline.read(&unsupported).await,
            Err(ReadError::Query(QueryError::UnsupportedMatcher(_)))
        ));

        let streamed = ReadRequest {
            queries: vec![],
            accepted_response_types: vec![ResponseType::StreamedXorChunks as i32],
        };
        assert!(matches!(
            pipeline.read(&streamed).await,
            Err(ReadError::UnsupportedResponseType)
        ));

        client.fail_queries();
        assert!(matches!(
            pipeline.query(&query(vec![])).await,
            Err(ReadError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_database_is_an_empty_result() {
        let client = Arc::new(RecordingInfluxDbClient::new());
        client.set_query_results("metrics", result_set("http_latency", "a", json!([[1, 2.5]])));
        client.drop_database("nodes");
        let pipeline = pipeline(client.clone());

        let series = pipeline
            .query(&query(vec![LabelMatcher::new(Type::Re, "__name__", "http_.*")]))
            .await
            .unwrap();

        assert_eq!(client.queries().len(), 2);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].labels["__name__"], "http_latency");
    }

    #[tokio::test]
    async fn test_malformed_rows_fail_the_query() {
        let client = Arc::new(RecordingInfluxDbClient::new());
        client.set_query_results("nodes", result_set("node_load1", "a", json!([[1]])));
        let pipeline = pipeline(client);

        assert!(matches!(
            pipeline
                .query(&query(vec![LabelMatcher::new(
                    Type::Eq,
                    "__name__",
                    "node_load1"
                )]))
                .await,
            Err(ReadError::Query(QueryError::MalformedRow(_)))
        ));
    }
}
