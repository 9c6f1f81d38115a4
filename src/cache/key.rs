//! Deterministic cache keys.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identity of one cache entry: endpoint name plus canonical arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
  endpoint: &'static str,
  args: String,
  digest: String,
}

impl CacheKey {
  /// Build a key from any serializable argument value.
  pub fn new<A: Serialize + ?Sized>(endpoint: &'static str, args: &A) -> serde_json::Result<Self> {
    let value = serde_json::to_value(args)?;
    Ok(Self::from_value(endpoint, &value))
  }

  /// Build a key from already-serialized arguments.
  pub fn from_value(endpoint: &'static str, args: &Value) -> Self {
    let args = canonical_string(args);

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update(b":");
    hasher.update(args.as_bytes());
    let digest = hex::encode(hasher.finalize());

    Self {
      endpoint,
      args,
      digest,
    }
  }

  pub fn endpoint(&self) -> &'static str {
    self.endpoint
  }

  /// Canonical JSON of the arguments.
  pub fn args(&self) -> &str {
    &self.args
  }

  /// Full SHA-256 hex digest.
  pub fn digest(&self) -> &str {
    &self.digest
  }

  /// First 12 hex chars of the digest, for log lines.
  pub fn short(&self) -> &str {
    &self.digest[..12]
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({})", self.endpoint, self.args)
  }
}

/// Normalize a JSON value: object keys sorted recursively, `null` members
/// dropped so that an absent optional argument and `None` map to one key.
pub fn canonicalize(value: &Value) -> Value {
  match value {
    Value::Object(map) => {
      let mut keys: Vec<&String> = map.keys().collect();
      keys.sort();

      let mut out = Map::new();
      for key in keys {
        let member = &map[key.as_str()];
        if member.is_null() {
          continue;
        }
        out.insert(key.clone(), canonicalize(member));
      }
      Value::Object(out)
    }
    Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
    other => other.clone(),
  }
}

/// Canonical JSON text of a value.
pub fn canonical_string(value: &Value) -> String {
  canonicalize(value).to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_field_order_does_not_matter() {
    let a = CacheKey::from_value("searchUsers", &json!({"keyword": "ann", "size": 20}));
    let b = CacheKey::from_value("searchUsers", &json!({"size": 20, "keyword": "ann"}));
    assert_eq!(a, b);
    assert_eq!(a.digest(), b.digest());
  }

  #[test]
  fn test_null_fields_are_ignored() {
    let a = CacheKey::from_value("searchUsers", &json!({"keyword": null, "size": 20}));
    let b = CacheKey::from_value("searchUsers", &json!({"size": 20}));
    assert_eq!(a, b);
  }

  #[test]
  fn test_nested_objects_are_sorted() {
    let value = json!({"b": {"z": 1, "a": [ {"y": 2, "x": null} ]}, "a": 0});
    assert_eq!(canonical_string(&value), r#"{"a":0,"b":{"a":[{"y":2}],"z":1}}"#);
  }

  #[test]
  fn test_endpoint_is_part_of_identity() {
    let args = json!({"movieId": "m1"});
    let a = CacheKey::from_value("listMovieComments", &args);
    let b = CacheKey::from_value("getMovie", &args);
    assert_ne!(a, b);
    assert_ne!(a.digest(), b.digest());
  }

  #[test]
  fn test_display_and_short_digest() {
    #[derive(Serialize)]
    struct Args {
      id: u32,
      keyword: Option<String>,
    }

    let key = CacheKey::new("getReview", &Args { id: 7, keyword: None }).unwrap();
    assert_eq!(key.to_string(), r#"getReview({"id":7})"#);
    assert_eq!(key.short().len(), 12);
    assert_eq!(key.digest().len(), 64);
  }
}
