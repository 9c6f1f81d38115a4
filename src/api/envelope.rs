//! Response envelope `{ success, code, message, data }`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Code used when a failed envelope carries none.
pub const UNSPECIFIED_CODE: i64 = 0;

#[derive(Debug, Deserialize)]
struct Envelope {
  success: bool,
  #[serde(default)]
  code: Option<i64>,
  #[serde(default)]
  message: Option<String>,
  #[serde(default)]
  data: Option<Value>,
}

/// Unwrap `data` from an envelope. `success = false` becomes a service
/// failure; an envelope without `data` yields `null`.
pub fn unwrap_data(raw: Value) -> ApiResult<Value> {
  let envelope: Envelope = serde_json::from_value(raw).map_err(ApiError::malformed)?;

  if !envelope.success {
    return Err(ApiError::service(
      envelope.code.unwrap_or(UNSPECIFIED_CODE),
      envelope
        .message
        .unwrap_or_else(|| "Request failed".to_string()),
    ));
  }

  Ok(envelope.data.unwrap_or(Value::Null))
}

/// Decode an unwrapped payload.
pub fn decode<T: DeserializeOwned>(data: Value) -> ApiResult<T> {
  serde_json::from_value(data).map_err(ApiError::malformed)
}
