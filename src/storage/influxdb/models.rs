// Subset of the InfluxDB 1.x `/query` JSON response.
// https://docs.influxdata.com/influxdb/v1/tools/api/#query-http-endpoint

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<ResultSet>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The result of one statement.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResultSet {
    #[serde(default)]
    pub statement_id: u32,
    #[serde(default)]
    pub series: Vec<RowGroup>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Rows sharing one measurement and one tag combination.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RowGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}
