//! Self-hosted bashhub server.
//!
//! Stores shell command history uploaded by bashhub clients and serves
//! search, lookup, deletion and session status over HTTP.

pub mod auth;
pub mod server;
pub mod storage;
