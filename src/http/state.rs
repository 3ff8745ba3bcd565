use crate::mapping::{IndexHandle, MappingSource};
use crate::metrics::AdapterMetrics;
use crate::pipeline::{ReadPipeline, WritePipeline};
use crate::storage::InfluxDbClient;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct HttpServerState {
    pub name: Arc<String>,
    pub index: Arc<IndexHandle>,
    /// `None` disables `/-/reload`.
    pub mapping: Option<Arc<MappingSource>>,
    pub client: Arc<dyn InfluxDbClient>,
    pub metrics: Arc<AdapterMetrics>,
    pub write_pipeline: Arc<WritePipeline>,
    pub read_pipeline: Arc<ReadPipeline>,
}

impl HttpServerState {
    pub fn new(
        name: &str,
        index: Arc<IndexHandle>,
        client: Arc<dyn InfluxDbClient>,
        retention_policy: &str,
        write_concurrency: usize,
    ) -> Self {
        let metrics = Arc::new(AdapterMetrics::new());
        let write_pipeline = WritePipeline::new(
            index.clone(),
            client.clone(),
            metrics.clone(),
            retention_policy.to_string(),
            write_concurrency,
        );
        let read_pipeline = ReadPipeline::new(
            index.clone(),
            client.clone(),
            metrics.clone(),
            retention_policy.to_string(),
        );

        Self {
            name: Arc::new(name.to_string()),
            index,
            mapping: None,
            client,
            metrics,
            write_pipeline: Arc::new(write_pipeline),
            read_pipeline: Arc::new(read_pipeline),
        }
    }

    pub fn with_mapping_source(mut self, source: MappingSource) -> Self {
        self.mapping = Some(Arc::new(source));
        self
    }
}
