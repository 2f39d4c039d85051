//! User, system, and config queries.

use bashhub_core::DatabaseError;
use bashhub_core::db::unix_timestamp;

use super::db::{HistoryDatabase, with_pool};
use super::models::{System, User};

/// Parameters for registering a system.
pub struct NewSystem<'a> {
    pub user_id: i64,
    pub mac: &'a str,
    pub name: Option<&'a str>,
    pub hostname: Option<&'a str>,
    pub client_version: Option<&'a str>,
}

impl HistoryDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a user. Returns `false` when the username is already taken.
    ///
    /// `password_hash` must already be hashed.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        registration_code: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let rows = with_pool!(self, pool => sqlx::query(
            "INSERT INTO users (username, email, password, registration_code) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (username) DO NOTHING",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(registration_code)
        .execute(pool)
        .await?
        .rows_affected());

        Ok(rows > 0)
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<User, DatabaseError> {
        with_pool!(self, pool => sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, registration_code FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(pool)
        .await?)
        .ok_or_else(|| DatabaseError::NotFound(format!("User with username {username}")))
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let row: (i64,) = with_pool!(self, pool => sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(pool)
        .await?);

        Ok(row.0 > 0)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        let row: (i64,) = with_pool!(self, pool => sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(pool)
        .await?);

        Ok(row.0 > 0)
    }

    // =========================================================================
    // System queries
    // =========================================================================

    /// Register a system with fresh created/updated timestamps.
    ///
    /// No uniqueness check is made on `(user_id, mac)`; clients that
    /// re-register an existing host should call [`Self::update_system`].
    pub async fn create_system(&self, params: &NewSystem<'_>) -> Result<u64, DatabaseError> {
        let now = unix_timestamp();

        let rows = with_pool!(self, pool => sqlx::query(
            "INSERT INTO systems (user_id, mac, name, hostname, client_version, created, updated) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(params.user_id)
        .bind(params.mac)
        .bind(params.name)
        .bind(params.hostname)
        .bind(params.client_version)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?
        .rows_affected());

        Ok(rows)
    }

    /// Set the hostname and bump `updated` for the user's system `mac`.
    pub async fn update_system(
        &self,
        user_id: i64,
        mac: &str,
        hostname: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        let now = unix_timestamp();

        let rows = with_pool!(self, pool => sqlx::query(
            "UPDATE systems SET hostname = $1, updated = $2 WHERE user_id = $3 AND mac = $4",
        )
        .bind(hostname)
        .bind(now)
        .bind(user_id)
        .bind(mac)
        .execute(pool)
        .await?
        .rows_affected());

        Ok(rows)
    }

    /// Get the user's system registered under `mac`.
    pub async fn get_system(&self, user_id: i64, mac: &str) -> Result<System, DatabaseError> {
        with_pool!(self, pool => sqlx::query_as::<_, System>(
            "SELECT id, created, updated, mac, hostname, name, client_version, user_id \
             FROM systems WHERE user_id = $1 AND mac = $2 ORDER BY id LIMIT 1",
        )
        .bind(user_id)
        .bind(mac)
        .fetch_optional(pool)
        .await?)
        .ok_or_else(|| DatabaseError::NotFound(format!("System {mac}")))
    }

    /// Name of the system `username` registered under `mac`, if any.
    pub async fn system_name_for(
        &self,
        username: &str,
        mac: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let row: Option<(Option<String>,)> = with_pool!(self, pool => sqlx::query_as(
            "SELECT name FROM systems \
             WHERE user_id IN (SELECT id FROM users WHERE username = $1) AND mac = $2 \
             ORDER BY id LIMIT 1",
        )
        .bind(username)
        .bind(mac)
        .fetch_optional(pool)
        .await?);

        Ok(row.and_then(|(name,)| name))
    }

    // =========================================================================
    // Config queries
    // =========================================================================

    /// Return the token signing secret, storing `candidate` first if no
    /// secret exists yet.
    ///
    /// The insert is a conflict-free no-op once row 1 exists, so concurrent
    /// first callers all read back whichever candidate won.
    pub async fn signing_secret(&self, candidate: &str) -> Result<String, DatabaseError> {
        let now = unix_timestamp();

        with_pool!(self, pool => sqlx::query(
            "INSERT INTO configs (id, secret, created) VALUES (1, $1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(candidate)
        .bind(now)
        .execute(pool)
        .await
        .map(|_| ()))?;

        let row: (String,) = with_pool!(self, pool => sqlx::query_as(
            "SELECT secret FROM configs WHERE id = 1",
        )
        .fetch_one(pool)
        .await?);

        Ok(row.0)
    }
}
