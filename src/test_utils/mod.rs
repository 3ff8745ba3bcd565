//! Test helpers shared by the unit tests and the integration tests.
//!
//! Enabled with the `test-utils` feature.

pub mod fixtures;
pub mod http;
pub mod influxdb;

pub use influxdb::{RecordedWrite, RecordingInfluxDbClient};
