//! Request body extraction.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;

/// A JSON body that must be an object before it is decoded into `T`.
///
/// Derived `Deserialize` impls also accept a sequence and fill fields by
/// position, so `["a","b","c"]` would otherwise decode into a struct.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonObject<T>(pub T);

impl<T, S> FromRequest<S> for JsonObject<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await?;
        if !value.is_object() {
            return Err(ApiError::BadRequest(format!(
                "expected a JSON object, found {}",
                kind(&value)
            )));
        }
        serde_json::from_value(value)
            .map(Self)
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
