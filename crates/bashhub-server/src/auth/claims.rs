//! JWT claims carried by shell client tokens.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Claims embedded in access tokens.
///
/// Field names match what existing shell clients decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Name of the system the token was issued for, empty when the
    /// client had not registered one at login.
    #[serde(rename = "systemName", default)]
    pub system_name: String,
    #[serde(deserialize_with = "coerce_user_id")]
    pub user_id: u64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    /// Original issue time (unix timestamp).
    pub orig_iat: i64,
}

/// Accept `user_id` as any JSON number. Tokens minted by other encoders
/// carry it as a float.
fn coerce_user_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct UserIdVisitor;

    impl Visitor<'_> for UserIdVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integral user id")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("negative user id {v}")))
        }

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
                Ok(v as u64)
            } else {
                Err(E::custom(format!("invalid user id {v}")))
            }
        }
    }

    deserializer.deserialize_any(UserIdVisitor)
}
