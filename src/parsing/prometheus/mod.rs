//! Prometheus remote storage protocol: prost models and snappy framing.

pub mod common;
pub mod models;
pub mod remote_read;
pub mod remote_write;

pub use remote_read::{parse_remote_read_request, serialize_read_response};
pub use remote_write::{into_samples, parse_remote_write_request};
