//! Schema provisioning.
//!
//! The destination tables are created through SQLx migrations embedded at
//! compile time. Provisioning runs once at startup, before the load phase,
//! and is idempotent.

use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations.
///
/// Migrations that have already been applied are skipped; SQLx tracks the
/// applied set and verifies checksums, so schema drift aborts startup here
/// rather than surfacing as write errors mid-load.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    log::info!("checking database migration state");

    MIGRATOR.run(pool).await?;

    log::info!("database migrations up to date");
    Ok(())
}
