//! blobgate - Azure Blob Storage upload and link gateway

use anyhow::Context;
use blobgate::{config::Config, create_router, AppState, Backend};
use blobgate_auth::StorageCredentials;
use blobgate_storage::{AzureBlobStorage, BlobStorage, EphemeralStorage};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "blobgate")]
#[command(about = "Upload files to Azure Blob Storage and issue read-only links", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "BLOBGATE_PORT")]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "BLOBGATE_HOST")]
    host: Option<String>,

    /// Storage backend
    #[arg(long, value_enum, env = "BLOBGATE_STORAGE")]
    storage: Option<Backend>,

    /// Container uploads are written to
    #[arg(long, env = "BLOBGATE_CONTAINER")]
    container: Option<String>,

    /// Storage account connection string
    #[arg(long, env = "AZURE_WEBVIEW_STORAGE_CONNECTION_STRING", hide_env_values = true)]
    connection_string: Option<String>,

    /// Configuration file (defaults to ./blobgate.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "BLOBGATE_LOG_LEVEL")]
    log_level: String,
}

impl Args {
    /// Apply command line and environment overrides on top of the loaded file
    fn apply(self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(backend) = self.storage {
            config.storage.backend = backend;
        }
        if let Some(container) = self.container {
            config.storage.container = container;
        }
        if let Some(conn_str) = self.connection_string {
            config.storage.connection_string = Some(conn_str);
        }
    }
}

fn build_storage(config: &Config) -> anyhow::Result<Arc<dyn BlobStorage>> {
    let storage = &config.storage;
    match storage.backend {
        Backend::Azure => {
            let conn_str = storage
                .connection_string
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .context("AZURE_WEBVIEW_STORAGE_CONNECTION_STRING is not set")?;
            let credentials = StorageCredentials::from_connection_string(conn_str)
                .context("Invalid storage connection string")?;
            info!(
                account = %credentials.account_name(),
                endpoint = %credentials.blob_endpoint(),
                "Using Azure Blob Storage"
            );
            Ok(Arc::new(AzureBlobStorage::new(credentials, storage.azure_config())?))
        }
        Backend::Ephemeral => {
            info!("Using in-memory storage; uploads are lost on exit");
            Ok(Arc::new(EphemeralStorage::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("blobgate={},tower_http=debug", args.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    info!("Starting blobgate...");
    info!("  Storage: {}", config.storage.backend);
    info!("  Container: {}", config.storage.container);

    let storage = build_storage(&config)?;
    let state = AppState::new(storage, config.storage.container.clone())
        .with_body_limit(config.server.body_limit);

    // Create router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
