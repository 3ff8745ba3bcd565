use super::METRIC_NAME_LABEL;
use std::collections::BTreeMap;

/// Label set of a Prometheus series, including the `__name__` label.
pub type Labels = BTreeMap<String, String>;

/// A single Prometheus sample as received through remote write.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Labels,
    pub timestamp_ms: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(labels: Labels, timestamp_ms: i64, value: f64) -> Self {
        Self {
            labels,
            timestamp_ms,
            value,
        }
    }

    /// The metric name, or an empty string when the series has no `__name__`.
    pub fn metric_name(&self) -> &str {
        self.labels
            .get(METRIC_NAME_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }
}
