//! Domain models returned by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::cache::Identified;
use crate::state::Role;

/// Ids arrive as strings from some services and numbers from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Text(String),
    Int(i64),
  }

  Ok(match Raw::deserialize(deserializer)? {
    Raw::Text(s) => s,
    Raw::Int(n) => n.to_string(),
  })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  #[serde(deserialize_with = "string_or_number")]
  pub movie_id: String,
  #[serde(default)]
  pub username: String,
  pub content: String,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl Identified for Comment {
  type Id = String;

  fn identity(&self) -> String {
    self.id.clone()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  #[serde(default)]
  pub movie_title: String,
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub rating: Option<u8>,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub is_hidden: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl Identified for Review {
  type Id = String;

  fn identity(&self) -> String {
    self.id.clone()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
  #[default]
  Active,
  Blocked,
}

impl UserStatus {
  pub fn toggled(self) -> Self {
    match self {
      UserStatus::Active => UserStatus::Blocked,
      UserStatus::Blocked => UserStatus::Active,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      UserStatus::Active => "ACTIVE",
      UserStatus::Blocked => "BLOCKED",
    }
  }
}

impl fmt::Display for UserStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  pub username: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub role: Role,
  #[serde(default)]
  pub status: UserStatus,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl Identified for UserSummary {
  type Id = String;

  fn identity(&self) -> String {
    self.id.clone()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  pub username: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub full_name: Option<String>,
  #[serde(default)]
  pub avatar_url: Option<String>,
  #[serde(default)]
  pub role: Role,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_numeric_ids_become_strings() {
    let comment: Comment = serde_json::from_value(json!({
      "id": 17,
      "movieId": "m1",
      "username": "ada",
      "content": "Great pacing",
      "createdAt": "2024-03-01T10:00:00Z"
    }))
    .unwrap();
    assert_eq!(comment.id, "17");
    assert_eq!(comment.identity(), "17");
    assert!(comment.created_at.is_some());
  }

  #[test]
  fn test_cached_form_round_trips() {
    let user: UserSummary = serde_json::from_value(json!({
      "id": "u1",
      "username": "bo",
      "role": "ADMIN",
      "status": "BLOCKED"
    }))
    .unwrap();
    assert_eq!(user.status.toggled(), UserStatus::Active);

    // The cache stores the serialized form; it must decode again
    let cached = serde_json::to_value(&user).unwrap();
    let back: UserSummary = serde_json::from_value(cached).unwrap();
    assert_eq!(back, user);
  }
}
