//! Settings resolution for bashhub-server.
//!
//! The binary takes its settings from CLI flags with environment fallbacks;
//! this module holds the pieces that need more than a default value: the
//! listen address normalisation, the default database location, and the
//! choice of storage engine from a database URI.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Listen address used when neither `--addr` nor `BH_SERVER_URL` is given.
pub const DEFAULT_LISTEN_URL: &str = "http://0.0.0.0:8080";

/// Directory name under the user config dir.
pub const APP_DIR_NAME: &str = "bashhub-server";

/// File name of the embedded database inside [`APP_DIR_NAME`].
pub const DEFAULT_DB_FILE: &str = "data.db";

/// Storage engine selected by a database URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Embedded single-file engine at the given path.
    Embedded(PathBuf),
    /// Remote client/server engine reachable at the given URI.
    Remote(String),
}

impl DatabaseTarget {
    /// `postgres://` and `postgresql://` URIs select the remote engine;
    /// anything else is treated as a path to the embedded database file.
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(Error::Config("database location is empty".to_string()));
        }
        if uri.starts_with("postgres://") || uri.starts_with("postgresql://") {
            return Ok(Self::Remote(uri.to_string()));
        }
        let path = uri
            .strip_prefix("sqlite://")
            .or_else(|| uri.strip_prefix("sqlite:"))
            .unwrap_or(uri);
        Ok(Self::Embedded(PathBuf::from(path)))
    }

    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Strip the URL scheme from a listen address so it can be bound directly.
///
/// `http://0.0.0.0:8080/` becomes `0.0.0.0:8080`.
pub fn listen_addr(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

/// The application directory inside the user's config dir, created on demand.
pub fn app_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| Error::Config("cannot determine user config directory".to_string()))?;
    let dir = base.join(APP_DIR_NAME);
    ensure_dir(&dir)?;
    Ok(dir)
}

/// Default location of the embedded database file.
pub fn default_database_path() -> Result<PathBuf> {
    Ok(app_dir()?.join(DEFAULT_DB_FILE))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}
