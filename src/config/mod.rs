use anyhow::{Context, Error};
use confique::Config;
use std::{
    net::IpAddr,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::Duration,
};
use url::Url;

pub mod measurements;

pub use measurements::{GlobalMappingConfig, MappingConfig, MeasurementConfig};

pub const DEFAULT_SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Config)]
pub struct AdapterConfig {
    #[config(env = "ADAPTER_PORT", default = 9201)]
    pub port: u16,
    #[config(env = "ADAPTER_ENDPOINT", default = "127.0.0.1")]
    pub endpoint: IpAddr,

    #[config(env = "ADAPTER_HTTP_BODY_LIMIT", default = "10mb")]
    pub http_body_limit: String,

    #[config(env = "ADAPTER_HTTP_SERVER_TIMEOUT_SECONDS", default = 30)]
    pub http_server_timeout_seconds: u64,

    #[config(env = "ADAPTER_INFLUXDB_URL", default = "http://localhost:8086")]
    pub influxdb_url: String,

    #[config(env = "ADAPTER_INFLUXDB_USERNAME")]
    pub influxdb_username: Option<String>,

    #[config(env = "ADAPTER_INFLUXDB_PASSWORD")]
    pub influxdb_password: Option<String>,

    #[config(env = "ADAPTER_INFLUXDB_TIMEOUT_SECONDS", default = 30)]
    pub influxdb_timeout_seconds: u64,

    /// Database used by measurements that don't configure their own.
    #[config(env = "ADAPTER_INFLUXDB_DATABASE", default = "prometheus")]
    pub database: String,

    /// Empty means the database default retention policy.
    #[config(env = "ADAPTER_INFLUXDB_RETENTION_POLICY", default = "")]
    pub retention_policy: String,

    #[config(env = "ADAPTER_MAPPING_FILE", default = "measurements.yml")]
    pub mapping_file: PathBuf,

    /// How many destination databases are written to concurrently.
    #[config(env = "ADAPTER_WRITE_CONCURRENCY", default = 4)]
    pub write_concurrency: usize,

    #[config(env = "ADAPTER_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,
}

impl AdapterConfig {
    pub fn load() -> Result<AdapterConfig, Error> {
        Self::load_from(DEFAULT_SETTINGS_FILE)
    }

    pub fn load_from(settings_file: impl AsRef<Path>) -> Result<AdapterConfig, Error> {
        let c = AdapterConfig::builder()
            .env()
            .file(settings_file.as_ref())
            .load()?;

        if c.write_concurrency == 0 {
            anyhow::bail!("write_concurrency must be at least 1");
        }

        Ok(c)
    }

    pub fn parse_http_body_limit(&self) -> Result<usize, Error> {
        let size = byte_unit::Byte::parse_str(self.http_body_limit.clone(), true)?.as_u64();
        if size > 128 * 1024 * 1024 * 1024 {
            anyhow::bail!("Body size is too big: > 128GB");
        }
        Ok(size as usize)
    }

    pub fn parse_influxdb_url(&self) -> Result<Url, Error> {
        Url::parse(&self.influxdb_url)
            .with_context(|| format!("Invalid InfluxDB URL: {}", self.influxdb_url))
    }

    pub fn influxdb_timeout(&self) -> Duration {
        Duration::from_secs(self.influxdb_timeout_seconds)
    }
}

static ADAPTER_CONFIG: OnceLock<Arc<AdapterConfig>> = OnceLock::new();

pub fn get() -> Result<Arc<AdapterConfig>, Error> {
    ADAPTER_CONFIG.get().cloned().ok_or_else(|| {
        Error::msg(
            "Configuration not loaded. Please call load_configuration() before using the configuration",
        )
    })
}

pub fn load_configuration() -> Result<(), Error> {
    load_configuration_from(DEFAULT_SETTINGS_FILE)
}

pub fn load_configuration_from(settings_file: impl AsRef<Path>) -> Result<(), Error> {
    // Check if the configuration has already been loaded
    if ADAPTER_CONFIG.get().is_some() {
        return Ok(());
    }

    let config = AdapterConfig::load_from(settings_file)?;
    ADAPTER_CONFIG.get_or_init(|| Arc::new(config));

    Ok(())
}
