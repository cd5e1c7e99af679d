//! Configuration management

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use blobgate_storage::AzureBlobConfig;

use crate::router::{DEFAULT_BODY_LIMIT, DEFAULT_CONTAINER};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit: default_body_limit(),
        }
    }
}

/// Which storage backend to run against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Azure,
    Ephemeral,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Azure => "azure",
            Self::Ephemeral => "ephemeral",
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_container")]
    pub container: String,

    #[serde(default)]
    pub connection_string: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_single_put_limit")]
    pub single_put_limit: usize,

    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            container: default_container(),
            connection_string: None,
            timeout_secs: default_timeout_secs(),
            single_put_limit: default_single_put_limit(),
            block_size: default_block_size(),
        }
    }
}

impl StorageConfig {
    pub fn azure_config(&self) -> AzureBlobConfig {
        AzureBlobConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            single_put_limit: self.single_put_limit,
            block_size: self.block_size,
        }
    }
}

fn default_port() -> u16 {
    5000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_single_put_limit() -> usize {
    AzureBlobConfig::default().single_put_limit
}

fn default_block_size() -> usize {
    AzureBlobConfig::default().block_size
}

impl Config {
    /// Load configuration from an optional file and `BLOBGATE__*` environment variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = ::config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(::config::File::from(path)),
            None => builder.add_source(::config::File::with_name("blobgate").required(false)),
        };

        let config = builder
            .add_source(::config::Environment::with_prefix("BLOBGATE").separator("__"))
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }
}
