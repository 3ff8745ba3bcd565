use crate::datamodel::{Labels, METRIC_NAME_LABEL, Sample};
use crate::mapping::{ClassificationIndex, MeasurementSpec};
use crate::parsing::prometheus::common::compress_snappy;
use crate::parsing::prometheus::models::{
    Label, LabelMatcher, Query, ReadRequest, Sample as ProtoSample, TimeSeries, WriteRequest,
    label_matcher, read_request::ResponseType,
};
use prost::Message;

pub const DEFAULT_DATABASE: &str = "prometheus";

/// A mapping used across the tests:
/// - `http` in the `metrics` database, tagged by `host`, with the
///   `latency` and `errors` fields (`http_latency`, `http_errors`)
/// - `up` and `node_load1`, whitelisted in the default database, tagged by
///   `instance`
pub fn test_index() -> ClassificationIndex {
    ClassificationIndex::build(
        DEFAULT_DATABASE,
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
                database: DEFAULT_DATABASE.to_string(),
                ..Default::default()
            },
            MeasurementSpec {
                name: "node_load1".to_string(),
                tags: ["instance".to_string()].into(),
                database: DEFAULT_DATABASE.to_string(),
                ..Default::default()
            },
        ],
    )
}

/// The same mapping as [`test_index`], as a mapping file.
pub const TEST_MAPPING_YAML: &str = r#"
global:
  measurements_whitelist: [up, node_load1]
  tags_whitelist: [instance]
measurements:
  - name: http
    tags: [host]
    fields: [latency, errors]
    database: metrics
"#;

pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

pub fn sample(metric_name: &str, pairs: &[(&str, &str)], timestamp_ms: i64, value: f64) -> Sample {
    let mut labels = labels(pairs);
    labels.insert(METRIC_NAME_LABEL.to_string(), metric_name.to_string());
    Sample::new(labels, timestamp_ms, value)
}

pub fn time_series(metric_name: &str, pairs: &[(&str, &str)], samples: &[(i64, f64)]) -> TimeSeries {
    let mut labels = vec![Label::new(METRIC_NAME_LABEL, metric_name)];
    labels.extend(pairs.iter().map(|(name, value)| Label::new(*name, *value)));
    TimeSeries {
        labels,
        samples: samples
            .iter()
            .map(|(timestamp, value)| ProtoSample {
                value: *value,
                timestamp: *timestamp,
            })
            .collect(),
    }
}

/// Snappy compressed remote write body.
pub fn encode_write_request(timeseries: Vec<TimeSeries>) -> Vec<u8> {
    let request = WriteRequest { timeseries };
    compress_snappy(&request.encode_to_vec()).unwrap()
}

pub fn query(start_timestamp_ms: i64, end_timestamp_ms: i64, matchers: Vec<LabelMatcher>) -> Query {
    Query {
        start_timestamp_ms,
        end_timestamp_ms,
        matchers,
        hints: None,
    }
}

pub fn name_matcher(metric_name: &str) -> LabelMatcher {
    LabelMatcher::new(label_matcher::Type::Eq, METRIC_NAME_LABEL, metric_name)
}

/// Snappy compressed remote read body accepting `SAMPLES`.
pub fn encode_read_request(queries: Vec<Query>) -> Vec<u8> {
    let request = ReadRequest {
        queries,
        accepted_response_types: vec![ResponseType::Samples as i32],
    };
    compress_snappy(&request.encode_to_vec()).unwrap()
}
