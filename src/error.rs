use crate::config::ConfigError;
use crate::load::LoadError;
use thiserror::Error;

/// Top-level failure for one loader invocation.
///
/// Setup failures (settings file, input file, connection, migrations) occur
/// before any record is processed. `Load` is the one mid-run fatal case: a
/// write statement failed, the run was aborted and no summary is printed.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open input file: {0}")]
    Input(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("load aborted: {0}")]
    Load(#[from] LoadError),
    #[error("pipeline task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}
