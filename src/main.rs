#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use clap::Parser;
use remote_storage_adapter::config::{self, DEFAULT_SETTINGS_FILE, load_configuration_from};
use remote_storage_adapter::http::server::run_http_server;
use remote_storage_adapter::http::state::HttpServerState;
use remote_storage_adapter::mapping::{IndexHandle, MappingSource};
use remote_storage_adapter::storage::influxdb::HttpInfluxDbClient;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, event, info};

/// Prometheus remote storage adapter for InfluxDB.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Options {
    /// Settings file. Environment variables take precedence over it.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Measurement mapping file, overrides the `mapping_file` setting.
    #[arg(long)]
    mapping_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let options = Options::parse();

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install CryptoProvider: {:?}", e))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main(options))
}

async fn async_main(options: Options) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    load_configuration_from(&options.settings).context("Failed to load configuration")?;
    let config = config::get().context("Failed to get configuration")?;

    // Initialize Sentry if DSN is provided
    let _sentry = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let mapping_file = options
        .mapping_file
        .unwrap_or_else(|| config.mapping_file.clone());
    let source = MappingSource::new(mapping_file, config.database.clone());
    let index = source
        .build_index()
        .context("Failed to build the measurement index")?;
    if index.is_empty() {
        tracing::warn!(
            "No measurement is configured in {}, every sample will be ignored",
            source.path().display()
        );
    }
    let index = Arc::new(IndexHandle::new(index));

    let client = HttpInfluxDbClient::from_config(&config)?;
    info!("InfluxDB at {}", config.influxdb_url);

    let state = HttpServerState::new(
        "Prometheus InfluxDB Remote Storage Adapter",
        index,
        Arc::new(client),
        &config.retention_policy,
        config.write_concurrency,
    )
    .with_mapping_source(source);

    #[cfg(unix)]
    spawn_reload_on_sighup(&state)?;

    // Exit the program if a panic occurs
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));

    let address = SocketAddr::from((config.endpoint, config.port));
    match run_http_server(state, address).await {
        Ok(_) => {
            event!(Level::INFO, "HTTP server stopped gracefully");
            Ok(())
        }
        Err(err) => {
            event!(Level::ERROR, "HTTP server failed: {}", err);
            Err(err)
        }
    }
}

/// Reloads the mapping file on every SIGHUP.
#[cfg(unix)]
fn spawn_reload_on_sighup(state: &HttpServerState) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let Some(source) = state.mapping.clone() else {
        return Ok(());
    };
    let index = state.index.clone();
    let mut hangup =
        signal(SignalKind::hangup()).context("Failed to install the SIGHUP handler")?;

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("Received SIGHUP, reloading {}", source.path().display());
            if let Err(err) = source.reload(&index) {
                event!(Level::ERROR, "Mapping reload failed, keeping the current one: {:#}", err);
            }
        }
    });

    Ok(())
}
