pub mod point;
pub mod sample;

pub use point::{FieldValue, Point, PointError};
pub use sample::{Labels, Sample};

/// Reserved Prometheus label carrying the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Name of the field a sample value is stored under when its measurement
/// has no explicit field suffixes.
pub const DEFAULT_FIELD_NAME: &str = "value";
