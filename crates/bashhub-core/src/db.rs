//! Shared database types and utilities.
//!
//! Provides `DatabaseError`, the timestamp helpers used for stored rows,
//! and pool creation for both storage engines: an embedded `SQLite` file
//! and a remote Postgres server.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Postgres, Sqlite};
use tracing::info;

/// Connection limit for the embedded engine. A single connection serialises
/// readers and writers so the file never sees write contention.
pub const SQLITE_MAX_CONNECTIONS: u32 = 1;

/// Connection limit for the remote engine.
pub const POSTGRES_MAX_CONNECTIONS: u32 = 50;

/// Database errors shared across the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("no rows in result set".to_string()),
            other => Self::Query(other.to_string()),
        }
    }
}

fn sqlite_options() -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5))
        .with_regexp()
}

/// Open (or create) the embedded `SQLite` pool at the given file path.
///
/// Creates the parent directory if it does not exist, enables WAL journal
/// mode and registers the `regexp` scalar function so `REGEXP` predicates
/// work. The pool holds a single connection.
pub async fn open_sqlite_pool(path: &Path) -> Result<Pool<Sqlite>, DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
    }

    let options = sqlite_options().filename(path).create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(SQLITE_MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

    info!(path = %path.display(), "Embedded database opened");

    Ok(pool)
}

/// Open an in-memory `SQLite` pool (for testing).
///
/// The pool never recycles its only connection, otherwise the database
/// would vanish with it.
pub async fn open_sqlite_pool_in_memory() -> Result<Pool<Sqlite>, DatabaseError> {
    let options = sqlite_options().in_memory(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(SQLITE_MAX_CONNECTIONS)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

    Ok(pool)
}

/// Open a Postgres pool for the given `postgres://` URI.
pub async fn open_postgres_pool(uri: &str) -> Result<Pool<Postgres>, DatabaseError> {
    let pool = PgPoolOptions::new()
        .max_connections(POSTGRES_MAX_CONNECTIONS)
        .connect(uri)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

    info!("Remote database opened");

    Ok(pool)
}

/// Returns the current time as a Unix timestamp (seconds since epoch).
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Returns the current time in milliseconds since epoch, the unit shell
/// clients use for command timestamps.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
