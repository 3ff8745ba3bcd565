#![forbid(unsafe_code)]

pub mod config;
pub mod datamodel;
pub mod http;
pub mod mapping;
pub mod metrics;
pub mod parsing;
pub mod pipeline;
pub mod query;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
