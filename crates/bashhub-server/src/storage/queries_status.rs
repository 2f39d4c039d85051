//! Session status aggregates.

use bashhub_core::DatabaseError;

use super::db::{HistoryDatabase, with_pool};
use super::models::StatusCounts;
use super::search::Dialect;

const SQLITE_STATUS: &str = "SELECT \
    (SELECT COUNT(*) FROM commands WHERE user_id = $1), \
    (SELECT COUNT(DISTINCT process_id) FROM commands WHERE user_id = $2), \
    (SELECT COUNT(*) FROM systems WHERE user_id = $3), \
    (SELECT COUNT(*) FROM commands WHERE user_id = $4 \
        AND date(created / 1000, 'unixepoch', 'localtime') = date('now', 'localtime')), \
    (SELECT COUNT(*) FROM commands WHERE process_id = $5)";

const POSTGRES_STATUS: &str = "SELECT \
    (SELECT COUNT(*) FROM commands WHERE user_id = $1), \
    (SELECT COUNT(DISTINCT process_id) FROM commands WHERE user_id = $2), \
    (SELECT COUNT(*) FROM systems WHERE user_id = $3), \
    (SELECT COUNT(*) FROM commands WHERE user_id = $4 \
        AND to_timestamp(created / 1000)::date = current_date), \
    (SELECT COUNT(*) FROM commands WHERE process_id = $5)";

impl HistoryDatabase {
    /// The five counts behind the client status view.
    ///
    /// "Today" is the server's local calendar day. The session count is
    /// keyed on `process_id` alone and spans every user, so
    /// `session_total_commands` may exceed `total_commands` when another
    /// user's history carries the same pid.
    pub async fn status(
        &self,
        user_id: i64,
        process_id: i64,
    ) -> Result<StatusCounts, DatabaseError> {
        let sql = match self.dialect() {
            Dialect::Sqlite => SQLITE_STATUS,
            Dialect::Postgres => POSTGRES_STATUS,
        };

        let row: (i64, i64, i64, i64, i64) = with_pool!(self, pool => sqlx::query_as(sql)
            .bind(user_id)
            .bind(user_id)
            .bind(user_id)
            .bind(user_id)
            .bind(process_id)
            .fetch_one(pool)
            .await?);

        Ok(StatusCounts {
            total_commands: row.0,
            total_sessions: row.1,
            total_systems: row.2,
            total_commands_today: row.3,
            session_total_commands: row.4,
        })
    }
}
