//! Strict JSON body extraction for Web API requests.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::web::error::ApiError;

/// Largest accepted request body, in bytes.
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// A JSON extractor with field-aware error messages.
///
/// The body must hold exactly one JSON value, must not exceed
/// [`MAX_BODY_BYTES`], and must not name fields the target type does not
/// know. No `Content-Type` header is required.
///
/// # Example
///
/// ```ignore
/// async fn login(JsonBody(req): JsonBody<LoginRequest>) -> Result<Json<Value>, ApiError> {
///     // ...
/// }
/// ```
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::bad_request(format!(
                    "request body must not be larger than {MAX_BODY_BYTES} bytes"
                ))
            } else {
                ApiError::bad_request(rejection.body_text())
            }
        })?;

        parse_json(&body).map(JsonBody).map_err(ApiError::bad_request)
    }
}

/// Decode `body` into `T`, describing any failure in client-facing terms.
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, String> {
    let mut stream = serde_json::Deserializer::from_slice(body).into_iter::<Value>();

    let value = match stream.next() {
        None => return Err("request body must not be empty".to_string()),
        Some(Err(e)) if e.is_eof() => {
            return Err("request body contains badly-formed JSON".to_string())
        }
        Some(Err(e)) => {
            return Err(format!(
                "request body contains badly-formed JSON (at character {})",
                offset(body, e.line(), e.column())
            ))
        }
        Some(Ok(value)) => value,
    };

    if stream.next().is_some() {
        return Err("request body must only contain a single JSON value".to_string());
    }

    T::deserialize(&value).map_err(|e| describe_data_error::<T>(&value, &e))
}

fn describe_data_error<T: DeserializeOwned>(value: &Value, err: &serde_json::Error) -> String {
    let message = err.to_string();
    if let Some(field) = message
        .strip_prefix("unknown field `")
        .and_then(|rest| rest.split('`').next())
    {
        return format!("request body contains unknown field \"{field}\"");
    }

    // Isolate the offending field by decoding each one on its own.
    if let Value::Object(fields) = value {
        for (name, field_value) in fields {
            let single = Value::Object(Map::from_iter([(name.clone(), field_value.clone())]));
            if T::deserialize(&single).is_err() {
                return format!("request body contains an invalid value for the \"{name}\" field");
            }
        }
    }

    "request body contains incorrect JSON type".to_string()
}

/// Character offset of a 1-based `line`/`column` position in `body`.
fn offset(body: &[u8], line: usize, column: usize) -> usize {
    let preceding: usize = body
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    preceding + column
}
