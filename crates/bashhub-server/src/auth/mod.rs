//! Authentication for the history server.
//!
//! Provides bearer token management, password hashing and the signing
//! secret bootstrap.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::Claims;
pub use jwt::JwtManager;

/// A fresh 128-bit signing secret, hex encoded.
pub fn generate_secret() -> String {
    rand::random::<[u8; 16]>()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
