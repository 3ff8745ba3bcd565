use super::measurement::MeasurementSpec;
use crate::config::MappingConfig;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Where a metric name is stored: its measurement and the field suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MetricTarget {
    measurement: String,
    field: String,
}

/// Result of a successful classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub measurement: &'a MeasurementSpec,
    /// Empty when the metric maps to the measurement's implicit field.
    pub field: &'a str,
}

impl Classification<'_> {
    pub fn measurement_name(&self) -> &str {
        &self.measurement.name
    }

    pub fn database(&self) -> &str {
        &self.measurement.database
    }
}

/// The measurements and metric names routed to one database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseIndex {
    name: String,
    measurements: BTreeSet<String>,
    /// metric name -> measurement name
    metrics: BTreeMap<String, String>,
}

impl DatabaseIndex {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn measurements(&self) -> &BTreeSet<String> {
        &self.measurements
    }

    pub fn contains_metric(&self, metric_name: &str) -> bool {
        self.metrics.contains_key(metric_name)
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }
}

impl fmt::Display for DatabaseIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[name:{}, measurements:{:?}, metrics:{:?}]",
            self.name, self.measurements, self.metrics
        )
    }
}

/// Maps fully qualified metric names to the measurement and field owning them.
///
/// Lookups are exact: a metric is either `<measurement>` (for measurements
/// without field suffixes) or `<measurement>_<field>`. When two specs derive
/// the same metric name, the spec listed first keeps it.
#[derive(Debug, Clone, Default)]
pub struct ClassificationIndex {
    default_database: String,
    measurements: HashMap<String, MeasurementSpec>,
    metric_to_measurement: HashMap<String, MetricTarget>,
    databases: BTreeMap<String, DatabaseIndex>,
}

impl ClassificationIndex {
    pub fn build(default_database: &str, specs: impl IntoIterator<Item = MeasurementSpec>) -> Self {
        let mut index = Self {
            default_database: default_database.to_string(),
            ..Default::default()
        };

        for mut spec in specs {
            if spec.name.is_empty() {
                error!("Measurement name is empty, it is not indexed");
                continue;
            }
            if index.measurements.contains_key(&spec.name) {
                warn!(
                    "Measurement {} is already indexed, ignoring the later definition",
                    spec.name
                );
                continue;
            }
            if spec.database.is_empty() {
                spec.database = index.default_database.clone();
            }

            let database = index
                .databases
                .entry(spec.database.clone())
                .or_insert_with(|| DatabaseIndex::new(&spec.database));
            database.measurements.insert(spec.name.clone());

            for (metric, field) in spec.metric_names() {
                match index.metric_to_measurement.get(&metric) {
                    Some(owner) => {
                        debug!(
                            "Metric {} is already owned by measurement {}, not registering it for {}",
                            metric, owner.measurement, spec.name
                        );
                    }
                    None => {
                        database.metrics.insert(metric.clone(), spec.name.clone());
                        index.metric_to_measurement.insert(
                            metric,
                            MetricTarget {
                                measurement: spec.name.clone(),
                                field,
                            },
                        );
                    }
                }
            }

            index.measurements.insert(spec.name.clone(), spec);
        }

        info!(
            "Classification index built: {} measurements, {} metrics, {} databases",
            index.measurements.len(),
            index.metric_to_measurement.len(),
            index.databases.len()
        );
        debug!("Classification index: {}", index);

        index
    }

    pub fn from_mapping(mapping: &MappingConfig, default_database: &str) -> Self {
        Self::build(
            default_database,
            MeasurementSpec::from_mapping(mapping, default_database),
        )
    }

    /// Finds the measurement and field a metric belongs to.
    ///
    /// Returns `None` when no configured measurement claims the metric; such
    /// samples are dropped by the write path.
    pub fn classify(&self, metric_name: &str) -> Option<Classification<'_>> {
        let target = self.metric_to_measurement.get(metric_name)?;
        let measurement = self.measurements.get(&target.measurement)?;
        Some(Classification {
            measurement,
            field: &target.field,
        })
    }

    pub fn measurement(&self, name: &str) -> Option<&MeasurementSpec> {
        self.measurements.get(name)
    }

    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    pub fn databases(&self) -> impl Iterator<Item = &DatabaseIndex> {
        self.databases.values()
    }

    /// Databases owning at least one measurement, sorted.
    pub fn database_names(&self) -> Vec<String> {
        self.databases.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn measurement_count(&self) -> usize {
        self.measurements.len()
    }

    pub fn metric_count(&self) -> usize {
        self.metric_to_measurement.len()
    }
}

impl fmt::Display for ClassificationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, database) in self.databases.values().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", database)?;
        }
        write!(f, "]")
    }
}
