//! Remote read: label matchers to InfluxQL, and InfluxDB rows back to series.

pub mod error;
pub mod merger;
pub mod translator;

pub use error::QueryError;
pub use merger::{ResultMerger, SeriesSample, TimeSeries};
pub use translator::QueryTranslator;
