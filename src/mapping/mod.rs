//! Classification of Prometheus metric names into InfluxDB measurements.
//!
//! The [`ClassificationIndex`] is built once per mapping load and is never
//! mutated afterwards. Reloads build a new index and publish it through an
//! [`IndexHandle`].

pub mod handle;
pub mod index;
pub mod measurement;
pub mod source;
pub mod splitter;

pub use handle::IndexHandle;
pub use index::{Classification, ClassificationIndex, DatabaseIndex};
pub use measurement::MeasurementSpec;
pub use source::MappingSource;
pub use splitter::{SplitLabels, TagFieldSplitter};
