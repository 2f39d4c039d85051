//! Storage handle over the embedded or remote engine.

use bashhub_core::db::{open_postgres_pool, open_sqlite_pool, open_sqlite_pool_in_memory};
use bashhub_core::{DatabaseError, DatabaseTarget};
use sqlx::{Pool, Postgres, Sqlite};
use tracing::info;

use super::search::Dialect;

/// Run the same statement against whichever engine backs the database.
///
/// Each arm is type-checked separately, so the body only has to be valid
/// for both `Pool<Sqlite>` and `Pool<Postgres>`; both arms must still
/// evaluate to the same type.
macro_rules! with_pool {
    ($db:expr, $pool:ident => $body:expr) => {
        match $db.backend() {
            $crate::storage::db::Backend::Sqlite($pool) => $body,
            $crate::storage::db::Backend::Postgres($pool) => $body,
        }
    };
}

pub(crate) use with_pool;

#[derive(Clone)]
pub(crate) enum Backend {
    Sqlite(Pool<Sqlite>),
    Postgres(Pool<Postgres>),
}

/// Command history database.
///
/// Cheap to clone; all clones share the underlying pool.
#[derive(Clone)]
pub struct HistoryDatabase {
    backend: Backend,
}

impl HistoryDatabase {
    /// Open the engine selected by `uri` and run the schema migration.
    ///
    /// `postgres://` URIs open a remote pool of up to 50 connections;
    /// anything else is a path to an embedded file opened in WAL mode with
    /// a single connection.
    pub async fn open(uri: &str) -> Result<Self, DatabaseError> {
        let target =
            DatabaseTarget::parse(uri).map_err(|e| DatabaseError::Connection(e.to_string()))?;
        info!(remote = target.is_remote(), "Opening database");
        let backend = match target {
            DatabaseTarget::Embedded(path) => Backend::Sqlite(open_sqlite_pool(&path).await?),
            DatabaseTarget::Remote(uri) => Backend::Postgres(open_postgres_pool(&uri).await?),
        };

        let db = Self { backend };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory embedded database (for testing).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Self {
            backend: Backend::Sqlite(open_sqlite_pool_in_memory().await?),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Apply the engine's pending migrations from `migrations/<engine>`.
    ///
    /// The initial migration only creates what is absent, so databases
    /// written by earlier bashhub servers are adopted as they are.
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        match &self.backend {
            Backend::Sqlite(pool) => sqlx::migrate!("./migrations/sqlite").run(pool).await,
            Backend::Postgres(pool) => sqlx::migrate!("./migrations/postgres").run(pool).await,
        }
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!(dialect = ?self.dialect(), "Database migrations complete");
        Ok(())
    }

    /// `true` for the embedded engine, which serialises all access through
    /// one connection.
    pub const fn single_writer(&self) -> bool {
        matches!(self.backend, Backend::Sqlite(_))
    }

    /// SQL dialect spoken by the backing engine.
    pub const fn dialect(&self) -> Dialect {
        if self.single_writer() {
            Dialect::Sqlite
        } else {
            Dialect::Postgres
        }
    }

    pub(crate) const fn backend(&self) -> &Backend {
        &self.backend
    }
}
