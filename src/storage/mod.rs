pub mod error;
pub mod influxdb;

pub use error::StorageError;
pub use influxdb::{InfluxDbClient, InfluxQuery};
