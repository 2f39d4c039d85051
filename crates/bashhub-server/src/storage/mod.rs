//! Command history storage.
//!
//! Provides persistence for users, systems, commands and the token signing
//! secret over either the embedded or the remote engine.

mod db;
mod models;
mod queries;
mod queries_commands;
mod queries_status;
pub mod search;


pub use bashhub_core::DatabaseError;
pub use db::HistoryDatabase;
pub use models::*;
pub use queries::NewSystem;
pub use queries_commands::{ImportCommand, NewCommand};
pub use search::{Dialect, SearchParams};
