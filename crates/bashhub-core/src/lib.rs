//! bashhub core library
//!
//! Shared functionality for the bashhub server:
//! - Database errors, pool creation and timestamp helpers
//! - Settings resolution (listen address, database location)
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::DatabaseTarget;
pub use db::DatabaseError;
pub use error::{Error, Result};
