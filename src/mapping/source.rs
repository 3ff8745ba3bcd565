use super::{ClassificationIndex, IndexHandle};
use crate::config::MappingConfig;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// The mapping file an index is built from, kept around for reloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSource {
    path: PathBuf,
    default_database: String,
}

impl MappingSource {
    pub fn new(path: impl Into<PathBuf>, default_database: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_database: default_database.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    pub fn build_index(&self) -> Result<ClassificationIndex> {
        let mapping = MappingConfig::load_file(&self.path)?;
        Ok(ClassificationIndex::from_mapping(
            &mapping,
            &self.default_database,
        ))
    }

    /// Rebuilds the index and publishes it. On error the current index stays
    /// in place.
    pub fn reload(&self, handle: &IndexHandle) -> Result<Arc<ClassificationIndex>> {
        let index = Arc::new(self.build_index()?);
        handle.store(index.clone());
        info!(
            "Reloaded mapping file {}: {} measurements, {} metrics",
            self.path.display(),
            index.measurement_count(),
            index.metric_count()
        );
        Ok(index)
    }
}
