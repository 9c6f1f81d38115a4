//! Public view of a cache entry.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
  /// Created but never fetched (or reset)
  #[default]
  Idle,
  /// At least one request for this entry is in flight
  Pending,
  /// Last applied request succeeded
  Fulfilled,
  /// Last applied request failed
  Rejected,
}

/// Snapshot of one cache entry, handed to subscribers.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
  pub status: Status,
  /// Last good data. Kept when a later request is rejected.
  pub data: Option<Value>,
  pub error: Option<ApiError>,
  pub fetched_at: Option<DateTime<Utc>>,
  pub subscribers: usize,
  /// Invalidated since the last successful fetch.
  pub stale: bool,
  /// Full request arguments of the last applied fetch.
  pub last_args: Option<Value>,
}

impl CacheEntry {
  pub fn is_idle(&self) -> bool {
    self.status == Status::Idle
  }

  pub fn is_pending(&self) -> bool {
    self.status == Status::Pending
  }

  pub fn is_fulfilled(&self) -> bool {
    self.status == Status::Fulfilled
  }

  pub fn is_rejected(&self) -> bool {
    self.status == Status::Rejected
  }

  /// Decode the cached data.
  pub fn decode<T: DeserializeOwned>(&self) -> ApiResult<Option<T>> {
    self
      .data
      .clone()
      .map(serde_json::from_value)
      .transpose()
      .map_err(ApiError::malformed)
  }

  /// Older than `max_age`, measured from the last successful fetch.
  pub fn is_older_than(&self, max_age: Duration) -> bool {
    match self.fetched_at {
      Some(at) => match chrono::Duration::from_std(max_age) {
        Ok(max_age) => Utc::now() - at > max_age,
        Err(_) => false,
      },
      None => true,
    }
  }
}

/// Per-entry settings supplied by the endpoint that owns the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOptions {
  /// How long an unsubscribed entry is retained before eviction
  pub keep_unused_for: Duration,
  /// Whether in-flight requests count towards the global activity flag
  pub blocking: bool,
}

impl Default for EntryOptions {
  fn default() -> Self {
    Self {
      keep_unused_for: Duration::from_secs(60),
      blocking: true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_default_entry_is_idle() {
    let entry = CacheEntry::default();
    assert!(entry.is_idle());
    assert_eq!(entry.decode::<u32>().unwrap(), None);
  }

  #[test]
  fn test_decode_mismatch_is_malformed() {
    let entry = CacheEntry {
      data: Some(json!({"not": "a number"})),
      ..CacheEntry::default()
    };
    let err = entry.decode::<u32>().unwrap_err();
    assert!(err.is_malformed());
  }

  #[test]
  fn test_age() {
    let fresh = CacheEntry {
      fetched_at: Some(Utc::now()),
      ..CacheEntry::default()
    };
    assert!(!fresh.is_older_than(Duration::from_secs(60)));

    let old = CacheEntry {
      fetched_at: Some(Utc::now() - chrono::Duration::minutes(10)),
      ..CacheEntry::default()
    };
    assert!(old.is_older_than(Duration::from_secs(60)));
    assert!(CacheEntry::default().is_older_than(Duration::from_secs(60)));
  }
}
