use anyhow::{Context, Result, bail};
use confique::Config;
use serde::Deserialize;
use std::path::Path;

/// The measurement mapping file.
///
/// ```yaml
/// global:
///   measurements_whitelist: [up]
///   tags_whitelist: [host, instance]
/// measurements:
///   - name: http
///     tags: [path]
///     fields: [latency, errors]
///     database: metrics
/// ```
#[derive(Debug, Config)]
pub struct MappingConfig {
    #[config(nested)]
    pub global: GlobalMappingConfig,

    pub measurements: Option<Vec<MeasurementConfig>>,
}

#[derive(Debug, Config)]
pub struct GlobalMappingConfig {
    /// Metric names stored as single-value measurements in the default database.
    #[config(default = [])]
    pub measurements_whitelist: Vec<String>,

    /// Labels stored as tags on every measurement.
    #[config(default = [])]
    pub tags_whitelist: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MeasurementConfig {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub ignore_other_label: bool,
    #[serde(default)]
    pub drop_labels: Vec<String>,
}

impl MappingConfig {
    /// Parses the given YAML (or TOML, from the extension) mapping file.
    ///
    /// Unlike the settings file, the mapping file is mandatory.
    pub fn load_file(path: impl AsRef<Path>) -> Result<MappingConfig> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("Mapping file {} does not exist", path.display());
        }

        MappingConfig::builder()
            .file(path)
            .load()
            .with_context(|| format!("Failed to parse mapping file {}", path.display()))
    }

    pub fn measurements(&self) -> &[MeasurementConfig] {
        self.measurements.as_deref().unwrap_or_default()
    }
}
