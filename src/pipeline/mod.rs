//! Request-level orchestration on top of the mapping and query modules.

pub mod read;
pub mod write;

pub use read::{ReadError, ReadPipeline};
pub use write::{WriteError, WritePipeline, WriteSummary};
