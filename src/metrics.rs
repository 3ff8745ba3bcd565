//! Prometheus metrics exposed by the adapter on `/metrics`.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

const PREFIX: &str = "prometheus_influxdb_adapter";

/// Labels for per-database write failures.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DatabaseLabels {
    pub database: String,
}

/// Container for the adapter counters.
///
/// Counters are registered without the `_total` suffix, the text encoder
/// appends it.
#[derive(Debug)]
pub struct AdapterMetrics {
    registry: Registry,

    /// Samples received on the remote write endpoint.
    pub received_samples: Counter,

    /// Samples dropped: not finite, not classified or without tags.
    pub ignored_samples: Counter,

    /// Points acknowledged by InfluxDB.
    pub sent_samples: Counter,

    /// Failed batch dispatches, by destination database.
    pub failed_dispatches: Family<DatabaseLabels, Counter>,

    /// Queries handled on the remote read endpoint.
    pub read_queries: Counter,
}

impl Default for AdapterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix(PREFIX);

        let received_samples = Counter::default();
        registry.register(
            "receive_samples",
            "Total number of received samples",
            received_samples.clone(),
        );

        let ignored_samples = Counter::default();
        registry.register(
            "ignored_samples",
            "The total number of samples not sent to InfluxDB due to unsupported float values (Inf, -Inf, NaN), unknown metric names or missing tags",
            ignored_samples.clone(),
        );

        let sent_samples = Counter::default();
        registry.register(
            "send_samples",
            "Total number of processed samples sent to InfluxDB",
            sent_samples.clone(),
        );

        let failed_dispatches = Family::<DatabaseLabels, Counter>::default();
        registry.register(
            "failed_dispatches",
            "Total number of batch writes rejected by InfluxDB",
            failed_dispatches.clone(),
        );

        let read_queries = Counter::default();
        registry.register(
            "read_queries",
            "Total number of remote read queries",
            read_queries.clone(),
        );

        Self {
            registry,
            received_samples,
            ignored_samples,
            sent_samples,
            failed_dispatches,
            read_queries,
        }
    }

    pub fn record_failed_dispatch(&self, database: &str) {
        self.failed_dispatches
            .get_or_create(&DatabaseLabels {
                database: database.to_string(),
            })
            .inc();
    }

    /// Encodes all metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_register_prefixed_counters() {
        // given
        let metrics = AdapterMetrics::new();

        // when
        metrics.received_samples.inc_by(3);
        metrics.ignored_samples.inc();
        let encoded = metrics.encode().unwrap();

        // then
        assert!(encoded.contains("prometheus_influxdb_adapter_receive_samples_total 3"));
        assert!(encoded.contains("prometheus_influxdb_adapter_ignored_samples_total 1"));
        assert!(encoded.contains("prometheus_influxdb_adapter_send_samples_total 0"));
        assert!(encoded.contains("prometheus_influxdb_adapter_read_queries_total 0"));
    }

    #[test]
    fn should_count_failed_dispatches_per_database() {
        // given
        let metrics = AdapterMetrics::new();

        // when
        metrics.record_failed_dispatch("metrics");
        metrics.record_failed_dispatch("metrics");
        metrics.record_failed_dispatch("prometheus");
        let encoded = metrics.encode().unwrap();

        // then
        assert!(encoded
            .contains("prometheus_influxdb_adapter_failed_dispatches_total{database=\"metrics\"} 2"));
        assert!(encoded
            .contains("prometheus_influxdb_adapter_failed_dispatches_total{database=\"prometheus\"} 1"));
    }
}
