#![allow(dead_code)]

use anyhow::{Context, Result};
use prost::Message;
use remote_storage_adapter::parsing::prometheus::common::decompress_snappy;
use remote_storage_adapter::parsing::prometheus::models::ReadResponse;
use remote_storage_adapter::storage::influxdb::{ResultSet, RowGroup};
use serde_json::Value;
use std::path::PathBuf;

pub use remote_storage_adapter::test_utils::fixtures;
pub use remote_storage_adapter::test_utils::http::{TestApp, TestResponse};

/// Decodes a snappy compressed remote read response body.
pub fn decode_read_response(body: &[u8]) -> Result<ReadResponse> {
    let decompressed = decompress_snappy(body).context("Failed to decompress the response")?;
    ReadResponse::decode(decompressed.as_slice()).context("Failed to decode the response")
}

/// A result set with one row group of `[time, value]` rows.
pub fn result_set(measurement: &str, tags: &[(&str, &str)], rows: Value) -> ResultSet {
    ResultSet {
        series: vec![RowGroup {
            name: measurement.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            columns: vec!["time".to_string(), "value".to_string()],
            values: serde_json::from_value(rows).expect("rows must be an array of arrays"),
        }],
        ..Default::default()
    }
}

/// Writes `content` to a mapping file unique to the calling test.
pub fn mapping_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "remote_storage_adapter_it_{}_{}.yml",
        name,
        std::process::id()
    ));
    std::fs::write(&path, content).expect("failed to write the mapping file");
    path
}
