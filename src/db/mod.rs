//! Postgres connection and schema setup.
//!
//! Startup calls [`connect`] once. Without `DATABASE_URL` there is no pool
//! and the binary falls back to the in-memory session store and user
//! directory.

use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;

use crate::config::Settings;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database connection failed: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migrate(#[from] MigrateError),
}

/// Open the pool described by `settings` and bring the schema up to date.
///
/// # Errors
///
/// Returns [`DbError`] if the database is unreachable or a migration fails.
pub async fn connect(settings: &Settings) -> Result<Option<PgPool>, DbError> {
    let Some(database_url) = settings.database_url.as_deref() else {
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(database_url)
        .await?;
    sqlx::migrate!("src/db/migrations").run(&pool).await?;
    tracing::info!(max_connections = settings.db_max_connections, "database ready");

    Ok(Some(pool))
}
