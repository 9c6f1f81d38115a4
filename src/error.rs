//! Error taxonomy for the data layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code carried by a `Service` failure when the backend answered with
/// something that is not a valid envelope or payload.
pub const MALFORMED_RESPONSE: i64 = -1;

/// Failure of a single request, stored on the cache entry it belongs to.
///
/// Errors are `Clone` because one in-flight request is shared by every caller
/// that asked for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ApiError {
  /// The request never reached the backend or no response came back.
  #[error("network failure: {message}")]
  Network { message: String },

  /// The backend answered with `success = false`, or with a malformed body.
  #[error("service failure ({code}): {message}")]
  Service { code: i64, message: String },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
  pub fn network(message: impl Into<String>) -> Self {
    ApiError::Network {
      message: message.into(),
    }
  }

  pub fn service(code: i64, message: impl Into<String>) -> Self {
    ApiError::Service {
      code,
      message: message.into(),
    }
  }

  /// A response (or cached value) that could not be decoded.
  pub fn malformed(detail: impl std::fmt::Display) -> Self {
    ApiError::Service {
      code: MALFORMED_RESPONSE,
      message: format!("Malformed response: {}", detail),
    }
  }

  /// Backend code, if the failure came from the backend.
  pub fn code(&self) -> Option<i64> {
    match self {
      ApiError::Network { .. } => None,
      ApiError::Service { code, .. } => Some(*code),
    }
  }

  /// Human readable message without the category prefix.
  pub fn message(&self) -> &str {
    match self {
      ApiError::Network { message } | ApiError::Service { message, .. } => message,
    }
  }

  pub fn is_malformed(&self) -> bool {
    self.code() == Some(MALFORMED_RESPONSE)
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      return ApiError::malformed(err);
    }
    match err.status() {
      Some(status) => ApiError::service(i64::from(status.as_u16()), err.to_string()),
      None => ApiError::network(err.to_string()),
    }
  }
}
