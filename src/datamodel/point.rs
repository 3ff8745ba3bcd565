use std::collections::BTreeMap;
use thiserror::Error;

/// Value of an InfluxDB field.
///
/// Label values that end up as fields are kept as strings; the sample value
/// itself is always a float.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    String(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum PointError {
    #[error("Point has an empty measurement name")]
    EmptyMeasurement,

    #[error("Point for measurement {measurement} has no fields")]
    NoFields { measurement: String },

    #[error("Point for measurement {measurement} has an empty tag key or value ({key:?})")]
    EmptyTag { measurement: String, key: String },

    #[error("Point for measurement {measurement} has an empty field key")]
    EmptyFieldKey { measurement: String },
}

/// An InfluxDB point, routed to a destination database.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub database: String,
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp_ms: i64,
}

impl Point {
    pub fn new(
        database: String,
        measurement: String,
        tags: BTreeMap<String, String>,
        fields: BTreeMap<String, FieldValue>,
        timestamp_ms: i64,
    ) -> Result<Self, PointError> {
        if measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }
        if fields.is_empty() {
            return Err(PointError::NoFields { measurement });
        }
        if let Some((key, _)) = tags.iter().find(|(k, v)| k.is_empty() || v.is_empty()) {
            let key = key.clone();
            return Err(PointError::EmptyTag { measurement, key });
        }
        if fields.keys().any(String::is_empty) {
            return Err(PointError::EmptyFieldKey { measurement });
        }

        Ok(Self {
            database,
            measurement,
            tags,
            fields,
            timestamp_ms,
        })
    }
}
