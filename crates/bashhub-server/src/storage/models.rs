//! Data models for bashhub storage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Password hash, never the plaintext.
    pub password: String,
    pub registration_code: Option<String>,
}

/// A host registered by a user. Serialises to the shape the shell client
/// reads back from `GET /api/v1/system`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct System {
    pub id: i64,
    #[serde(rename = "Created")]
    pub created: i64,
    #[serde(rename = "Updated")]
    pub updated: i64,
    pub mac: String,
    pub hostname: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "clientVersion")]
    pub client_version: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: i64,
}

/// A stored command as returned by a uuid lookup.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CommandRecord {
    pub command: String,
    pub path: String,
    pub created: i64,
    pub uuid: String,
    pub exit_status: i64,
    pub system_name: String,
    pub process_id: Option<i64>,
}

/// One search result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub command: String,
    pub uuid: String,
    pub created: i64,
}

impl From<(String, String, i64)> for SearchHit {
    fn from((command, uuid, created): (String, String, i64)) -> Self {
        Self {
            command,
            uuid,
            created,
        }
    }
}

/// Aggregate counts behind the client status view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub total_commands: i64,
    pub total_sessions: i64,
    pub total_systems: i64,
    pub total_commands_today: i64,
    pub session_total_commands: i64,
}
