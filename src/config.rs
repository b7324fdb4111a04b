//! Database connection settings.
//!
//! The loader reads its connection parameters from a small YAML settings
//! file (`config.yaml` by default) rather than the environment, so one
//! export job can be pointed at different databases by swapping files.

use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unrecognized sslmode `{0}`")]
    SslMode(String),
}

/// Connection parameters for the destination database.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbParams {
    pub db_name: String,
    pub host: String,
    pub user: String,
    pub password: String,
    pub sslmode: String,
}

impl DbParams {
    /// Load settings from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let ssl_mode = self
            .sslmode
            .parse::<PgSslMode>()
            .map_err(|_| ConfigError::SslMode(self.sslmode.clone()))?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .database(&self.db_name)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(ssl_mode))
    }

    /// Open a connection pool against the configured database.
    ///
    /// Establishes one connection eagerly, so an unreachable or
    /// misconfigured database fails here at startup instead of mid-load.
    pub async fn connect(&self, max_connections: u32) -> Result<PgPool, crate::error::EtlError> {
        let options = self.connect_options()?;

        log::info!(
            "connecting to database {} on {}",
            self.db_name,
            self.host
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(pool)
    }
}
