use crate::datamodel::{DEFAULT_FIELD_NAME, FieldValue, Point, PointError, Sample};
use crate::mapping::{ClassificationIndex, IndexHandle, TagFieldSplitter};
use crate::metrics::AdapterMetrics;
use crate::storage::InfluxDbClient;
use futures::{StreamExt, stream};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug, PartialEq)]
pub enum WriteError {
    #[error("Invalid point: {0}")]
    InvalidPoint(#[from] PointError),
}

/// Why a sample did not become a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NonFinite,
    Unclassified,
    NoTags,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::NonFinite => write!(f, "value is not finite"),
            IgnoreReason::Unclassified => write!(f, "metric name is not mapped"),
            IgnoreReason::NoTags => write!(f, "no tags left after splitting labels"),
        }
    }
}

/// Points grouped by destination database, in sample order.
#[derive(Debug, Default, PartialEq)]
pub struct Batches {
    pub points: BTreeMap<String, Vec<Point>>,
    pub ignored: usize,
}

impl Batches {
    pub fn point_count(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }
}

/// Outcome of one [`WritePipeline::write`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub received: usize,
    pub ignored: usize,
    pub sent: usize,
    pub failed_databases: Vec<String>,
}

/// Classifies samples, turns them into points and writes one batch per
/// destination database.
#[derive(Debug, Clone)]
pub struct WritePipeline {
    index: Arc<IndexHandle>,
    client: Arc<dyn InfluxDbClient>,
    metrics: Arc<AdapterMetrics>,
    retention_policy: String,
    concurrency: usize,
}

impl WritePipeline {
    pub fn new(
        index: Arc<IndexHandle>,
        client: Arc<dyn InfluxDbClient>,
        metrics: Arc<AdapterMetrics>,
        retention_policy: String,
        concurrency: usize,
    ) -> Self {
        Self {
            index,
            client,
            metrics,
            retention_policy,
            concurrency: concurrency.max(1),
        }
    }

    /// Writes the samples.
    ///
    /// Only point construction errors fail the call. A database rejecting its
    /// batch is logged and counted, and the other databases are still written.
    pub async fn write(&self, samples: &[Sample]) -> Result<WriteSummary, WriteError> {
        self.metrics.received_samples.inc_by(samples.len() as u64);

        let index = self.index.load();
        let batches = build_batches(&index, samples)?;
        self.metrics.ignored_samples.inc_by(batches.ignored as u64);

        let mut summary = WriteSummary {
            received: samples.len(),
            ignored: batches.ignored,
            ..Default::default()
        };

        let client = &self.client;
        let retention_policy = self.retention_policy.as_str();
        let results: Vec<_> = stream::iter(batches.points)
            .map(|(database, points)| async move {
                let result = client.write(&database, retention_policy, &points).await;
                (database, points.len(), result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (database, count, result) in results {
            match result {
                Ok(()) => {
                    debug!("Wrote {} points to database {}", count, database);
                    self.metrics.sent_samples.inc_by(count as u64);
                    summary.sent += count;
                }
                Err(err) => {
                    error!(
                        "Failed to write {} points to database {}: {}",
                        count, database, err
                    );
                    self.metrics.record_failed_dispatch(&database);
                    summary.failed_databases.push(database);
                }
            }
        }
        summary.failed_databases.sort();

        Ok(summary)
    }
}

/// Turns samples into points grouped by database.
pub fn build_batches(index: &ClassificationIndex, samples: &[Sample]) -> Result<Batches, WriteError> {
    let splitter = TagFieldSplitter::new(index);
    let mut batches = Batches::default();

    for sample in samples {
        match build_point(index, &splitter, sample)? {
            Ok(point) => batches
                .points
                .entry(point.database.clone())
                .or_default()
                .push(point),
            Err(reason) => {
                debug!(
                    "Ignoring sample {:?} at {}: {}",
                    sample.metric_name(),
                    sample.timestamp_ms,
                    reason
                );
                batches.ignored += 1;
            }
        }
    }

    Ok(batches)
}

fn build_point(
    index: &ClassificationIndex,
    splitter: &TagFieldSplitter<'_>,
    sample: &Sample,
) -> Result<Result<Point, IgnoreReason>, PointError> {
    if !sample.value.is_finite() {
        return Ok(Err(IgnoreReason::NonFinite));
    }

    let Some(classification) = index.classify(sample.metric_name()) else {
        return Ok(Err(IgnoreReason::Unclassified));
    };

    let split = splitter.split(&sample.labels, classification.measurement_name());
    if split.tags.is_empty() {
        return Ok(Err(IgnoreReason::NoTags));
    }

    let field = if classification.field.is_empty() {
        DEFAULT_FIELD_NAME
    } else {
        classification.field
    };

    let mut fields: BTreeMap<String, FieldValue> = split
        .fields
        .into_iter()
        .map(|(name, value)| (name, FieldValue::String(value)))
        .collect();
    fields.insert(field.to_string(), FieldValue::Float(sample.value));

    Point::new(
        classification.database().to_string(),
        classification.measurement_name().to_string(),
        split.tags,
        fields,
        sample.timestamp_ms,
    )
    .map(Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::Labels;
    use crate::mapping::MeasurementSpec;
    use crate::test_utils::RecordingInfluxDbClient;

    fn index() -> ClassificationIndex {
        ClassificationIndex::build(
            "prometheus",
            vec![
                MeasurementSpec {
                    name: "http".to_string(),
                    tags: ["host".to_string()].into(),
                    fields: ["latency".to_string(), "errors".to_string()].into(),
                    database: "metrics".to_string(),
                    ..Default::default()
                },
                MeasurementSpec {
                    name: "up".to_string(),
                    tags: ["instance".to_string()].into(),
                    ..Default::default()
                },
            ],
        )
    }

    fn sample(metric: &str, labels: &[(&str, &str)], timestamp_ms: i64, value: f64) -> Sample {
        let mut all: Labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        all.insert("__name__".to_string(), metric.to_string());
        Sample::new(all, timestamp_ms, value)
    }

    fn pipeline(client: Arc<RecordingInfluxDbClient>) -> (WritePipeline, Arc<AdapterMetrics>) {
        let metrics = Arc::new(AdapterMetrics::new());
        let pipeline = WritePipeline::new(
            Arc::new(IndexHandle::new(index())),
            client,
            metrics.clone(),
            "autogen".to_string(),
            2,
        );
        (pipeline, metrics)
    }

    #[test]
    fn test_http_latency_point() {
        let batches = build_batches(
            &index(),
            &[sample(
                "http_latency",
                &[("host", "a"), ("region", "us")],
                1000,
                12.5,
            )],
        )
        .unwrap();

        assert_eq!(batches.ignored, 0);
        let points = &batches.points["metrics"];
        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.measurement, "http");
        assert_eq!(point.database, "metrics");
        assert_eq!(
            point.tags,
            BTreeMap::from([("host".to_string(), "a".to_string())])
        );
        assert_eq!(
            point.fields,
            BTreeMap::from([
                ("latency".to_string(), FieldValue::Float(12.5)),
                ("region".to_string(), FieldValue::String("us".to_string())),
            ])
        );
        assert_eq!(point.timestamp_ms, 1000);
    }

    #[test]
    fn test_implicit_field_is_value() {
        let batches =
            build_batches(&index(), &[sample("up", &[("instance", "x:9100")], 1, 1.0)]).unwrap();
        let point = &batches.points["prometheus"][0];
        assert_eq!(point.measurement, "up");
        assert_eq!(point.fields["value"], FieldValue::Float(1.0));
    }

    #[test]
    fn test_ignored_samples() {
        let batches = build_batches(
            &index(),
            &[
                sample("up", &[("instance", "a")], 1, f64::NAN),
                sample("up", &[("instance", "a")], 2, f64::INFINITY),
                sample("up", &[("instance", "a")], 3, f64::NEG_INFINITY),
                sample("unknown_metric", &[("instance", "a")], 4, 1.0),
                // Classified, but no configured tag present.
                sample("up", &[("job", "node")], 5, 1.0),
                // Tag present but empty.
                sample("up", &[("instance", "")], 6, 1.0),
                sample("up", &[("instance", "a")], 7, 1.0),
            ],
        )
        .unwrap();

        assert_eq!(batches.ignored, 6);
        assert_eq!(batches.point_count(), 1);
        assert_eq!(batches.points["prometheus"][0].timestamp_ms, 7);
    }

    #[test]
    fn test_points_keep_sample_order_per_database() {
        let batches = build_batches(
            &index(),
            &[
                sample("http_errors", &[("host", "a")], 3, 0.0),
                sample("up", &[("instance", "a")], 2, 1.0),
                sample("http_latency", &[("host", "a")], 1, 5.0),
                sample("http_errors", &[("host", "b")], 0, 2.0),
            ],
        )
        .unwrap();

        let timestamps: Vec<i64> = batches.points["metrics"]
            .iter()
            .map(|p| p.timestamp_ms)
            .collect();
        assert_eq!(timestamps, vec![3, 1, 0]);
        assert_eq!(batches.points.len(), 2);
    }

    #[test]
    fn test_empty_field_key_fails_the_call() {
        let result = build_batches(
            &index(),
            &[sample("up", &[("instance", "a"), ("", "oops")], 1, 1.0)],
        );
        assert!(matches!(
            result,
            Err(WriteError::InvalidPoint(PointError::EmptyFieldKey { .. }))
        ));
    }

    #[tokio::test]
    async fn test_write_dispatches_per_database() {
        let client = Arc::new(RecordingInfluxDbClient::new());
        let (pipeline, metrics) = pipeline(client.clone());

        let summary = pipeline
            .write(&[
                sample("http_latency", &[("host", "a")], 1, 5.0),
                sample("up", &[("instance", "a")], 1, 1.0),
                sample("up", &[("instance", "a")], 2, f64::NAN),
            ])
            .await
            .unwrap();

        assert_eq!(
            summary,
            WriteSummary {
                received: 3,
                ignored: 1,
                sent: 2,
                failed_databases: vec![],
            }
        );

        let writes = client.writes();
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().all(|w| w.retention_policy == "autogen"));
        assert_eq!(client.points_for("metrics").len(), 1);
        assert_eq!(client.points_for("prometheus").len(), 1);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("prometheus_influxdb_adapter_receive_samples_total 3"));
        assert!(encoded.contains("prometheus_influxdb_adapter_ignored_samples_total 1"));
        assert!(encoded.contains("prometheus_influxdb_adapter_send_samples_total 2"));
    }

    #[tokio::test]
    async fn test_failed_database_does_not_abort_others() {
        let client = Arc::new(RecordingInfluxDbClient::new());
        client.fail_database("metrics");
        let (pipeline, metrics) = pipeline(client.clone());

        let summary = pipeline
            .write(&[
                sample("http_latency", &[("host", "a")], 1, 5.0),
                sample("up", &[("instance", "a")], 1, 1.0),
            ])
            .await
            .unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.failed_databases, vec!["metrics".to_string()]);
        assert_eq!(client.points_for("prometheus").len(), 1);
        assert!(client.points_for("metrics").is_empty());

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains(
            "prometheus_influxdb_adapter_failed_dispatches_total{database=\"metrics\"} 1"
        ));
    }

    #[tokio::test]
    async fn test_nothing_to_write() {
        let client = Arc::new(RecordingInfluxDbClient::new());
        let (pipeline, _) = pipeline(client.clone());

        let summary = pipeline
            .write(&[sample("unknown", &[("host", "a")], 1, 1.0)])
            .await
            .unwrap();
        assert_eq!(summary.ignored, 1);
        assert!(client.writes().is_empty());
    }
}
