//! Command history queries.

use bashhub_core::DatabaseError;

use super::db::{HistoryDatabase, with_pool};
use super::models::{CommandRecord, SearchHit};
use super::search::{self, Bind, SearchParams};

/// Parameters for storing a command uploaded by a shell client.
pub struct NewCommand<'a> {
    pub user_id: i64,
    pub uuid: &'a str,
    pub command: &'a str,
    pub path: &'a str,
    pub exit_status: i64,
    pub created: i64,
    pub system_name: &'a str,
    pub process_id: Option<i64>,
    pub process_start_time: Option<i64>,
}

/// Parameters for importing a command exported from another instance.
///
/// The owner is resolved by username at insert time.
pub struct ImportCommand<'a> {
    pub username: &'a str,
    pub uuid: &'a str,
    pub command: &'a str,
    pub path: &'a str,
    pub exit_status: i64,
    pub created: i64,
    pub system_name: &'a str,
    pub session_id: Option<&'a str>,
}

impl HistoryDatabase {
    /// Store a command. A repeated uuid is ignored and reports 0 rows.
    pub async fn insert_command(&self, params: &NewCommand<'_>) -> Result<u64, DatabaseError> {
        let rows = with_pool!(self, pool => sqlx::query(
            "INSERT INTO commands \
             (user_id, uuid, command, path, exit_status, created, system_name, process_id, process_start_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT (uuid) DO NOTHING",
        )
        .bind(params.user_id)
        .bind(params.uuid)
        .bind(params.command)
        .bind(params.path)
        .bind(params.exit_status)
        .bind(params.created)
        .bind(params.system_name)
        .bind(params.process_id)
        .bind(params.process_start_time)
        .execute(pool)
        .await?
        .rows_affected());

        Ok(rows)
    }

    /// Fetch one of the user's commands by uuid.
    pub async fn get_command(
        &self,
        user_id: i64,
        uuid: &str,
    ) -> Result<CommandRecord, DatabaseError> {
        with_pool!(self, pool => sqlx::query_as::<_, CommandRecord>(
            "SELECT command, path, created, uuid, exit_status, system_name, process_id \
             FROM commands WHERE user_id = $1 AND uuid = $2",
        )
        .bind(user_id)
        .bind(uuid)
        .fetch_optional(pool)
        .await?)
        .ok_or_else(|| DatabaseError::NotFound("no rows in result set".into()))
    }

    /// Delete one of the user's commands. Returns the number of rows removed.
    pub async fn delete_command(&self, user_id: i64, uuid: &str) -> Result<u64, DatabaseError> {
        let rows = with_pool!(self, pool => sqlx::query(
            "DELETE FROM commands WHERE user_id = $1 AND uuid = $2",
        )
        .bind(user_id)
        .bind(uuid)
        .execute(pool)
        .await?
        .rows_affected());

        Ok(rows)
    }

    /// Run a command search rendered for this engine's dialect.
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<SearchHit>, DatabaseError> {
        let query = search::build(params, self.dialect());

        let rows: Vec<(String, String, i64)> = with_pool!(self, pool => {
            let mut statement = sqlx::query_as::<_, (String, String, i64)>(&query.sql);
            for bind in &query.binds {
                statement = match bind {
                    Bind::Int(value) => statement.bind(*value),
                    Bind::Text(value) => statement.bind(value.as_str()),
                };
            }
            statement.fetch_all(pool).await?
        });

        Ok(rows.into_iter().map(SearchHit::from).collect())
    }

    /// Insert an imported command. Unknown usernames and repeated uuids
    /// both report 0 rows.
    pub async fn import_command(&self, params: &ImportCommand<'_>) -> Result<u64, DatabaseError> {
        let rows = with_pool!(self, pool => sqlx::query(
            "INSERT INTO commands \
             (user_id, uuid, command, path, exit_status, created, system_name, session_id) \
             SELECT id, $1, $2, $3, $4, $5, $6, $7 FROM users WHERE username = $8 \
             ON CONFLICT (uuid) DO NOTHING",
        )
        .bind(params.uuid)
        .bind(params.command)
        .bind(params.path)
        .bind(params.exit_status)
        .bind(params.created)
        .bind(params.system_name)
        .bind(params.session_id)
        .bind(params.username)
        .execute(pool)
        .await?
        .rows_affected());

        Ok(rows)
    }
}
