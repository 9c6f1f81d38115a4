//! Tag graph linking cache entries to invalidation labels.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::key::CacheKey;

/// Invalidation label. A tag without `id` names a whole list ("Reviews"),
/// a tag with `id` names one member of it (`{Comments, "m1"}`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
  pub kind: String,
  pub id: Option<String>,
}

impl Tag {
  /// List-level tag.
  pub fn list(kind: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      id: None,
    }
  }

  /// Entry-level tag.
  pub fn item(kind: impl Into<String>, id: impl ToString) -> Self {
    Self {
      kind: kind.into(),
      id: Some(id.to_string()),
    }
  }

  /// Whether invalidating `self` reaches an entry that provided `provided`.
  ///
  /// A tag without id matches every tag of its kind; a tag with id only
  /// matches the exact `{kind, id}` pair.
  pub fn matches(&self, provided: &Tag) -> bool {
    if self.kind != provided.kind {
      return false;
    }
    match &self.id {
      None => true,
      Some(id) => provided.id.as_ref() == Some(id),
    }
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.id {
      Some(id) => write!(f, "{}:{}", self.kind, id),
      None => f.write_str(&self.kind),
    }
  }
}

/// Many-to-many association between cache keys and the tags they provide.
#[derive(Debug, Default)]
pub struct TagGraph {
  /// kind -> id -> keys
  by_kind: HashMap<String, HashMap<Option<String>, HashSet<CacheKey>>>,
  /// key -> provided tags, so a re-provide can drop stale links
  by_key: HashMap<CacheKey, Vec<Tag>>,
}

impl TagGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record the tags a fulfilled result provides, replacing earlier ones.
  pub fn provide(&mut self, key: &CacheKey, tags: &[Tag]) {
    self.remove(key);
    if tags.is_empty() {
      return;
    }

    let mut unique: Vec<Tag> = Vec::with_capacity(tags.len());
    for tag in tags {
      if !unique.contains(tag) {
        unique.push(tag.clone());
      }
    }

    for tag in &unique {
      self
        .by_kind
        .entry(tag.kind.clone())
        .or_default()
        .entry(tag.id.clone())
        .or_default()
        .insert(key.clone());
    }
    self.by_key.insert(key.clone(), unique);
  }

  /// Forget every tag of an entry (on eviction or reset).
  pub fn remove(&mut self, key: &CacheKey) {
    let Some(tags) = self.by_key.remove(key) else {
      return;
    };

    for tag in tags {
      if let Some(ids) = self.by_kind.get_mut(&tag.kind) {
        if let Some(keys) = ids.get_mut(&tag.id) {
          keys.remove(key);
          if keys.is_empty() {
            ids.remove(&tag.id);
          }
        }
        if ids.is_empty() {
          self.by_kind.remove(&tag.kind);
        }
      }
    }
  }

  /// Keys reached by invalidating any of `tags`.
  pub fn matching(&self, tags: &[Tag]) -> HashSet<CacheKey> {
    let mut keys = HashSet::new();
    for tag in tags {
      let Some(ids) = self.by_kind.get(&tag.kind) else {
        continue;
      };
      match &tag.id {
        None => {
          for set in ids.values() {
            keys.extend(set.iter().cloned());
          }
        }
        Some(_) => {
          if let Some(set) = ids.get(&tag.id) {
            keys.extend(set.iter().cloned());
          }
        }
      }
    }
    keys
  }

  /// Tags currently provided by `key`.
  pub fn tags_of(&self, key: &CacheKey) -> &[Tag] {
    self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn clear(&mut self) {
    self.by_kind.clear();
    self.by_key.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn key(movie: &str) -> CacheKey {
    CacheKey::from_value("listMovieComments", &json!({ "movieId": movie }))
  }

  #[test]
  fn test_item_tag_matches_exact_pair_only() {
    let invalidation = Tag::item("Comments", 42);
    assert!(invalidation.matches(&Tag::item("Comments", "42")));
    assert!(!invalidation.matches(&Tag::item("Comments", 7)));
    assert!(!invalidation.matches(&Tag::list("Comments")));
    assert!(!invalidation.matches(&Tag::item("Reviews", 42)));
  }

  #[test]
  fn test_list_tag_matches_whole_kind() {
    let invalidation = Tag::list("Comments");
    assert!(invalidation.matches(&Tag::item("Comments", 42)));
    assert!(invalidation.matches(&Tag::list("Comments")));
    assert!(!invalidation.matches(&Tag::list("Reviews")));
  }

  #[test]
  fn test_invalidation_scope() {
    let mut graph = TagGraph::new();
    graph.provide(&key("42"), &[Tag::item("Comments", 42)]);
    graph.provide(&key("7"), &[Tag::item("Comments", 7)]);

    let hit = graph.matching(&[Tag::item("Comments", 42)]);
    assert_eq!(hit.len(), 1);
    assert!(hit.contains(&key("42")));

    let all = graph.matching(&[Tag::list("Comments")]);
    assert_eq!(all.len(), 2);
  }

  #[test]
  fn test_reprovide_replaces_links() {
    let mut graph = TagGraph::new();
    let k = key("1");
    graph.provide(&k, &[Tag::list("Reviews"), Tag::item("Reviews", 1)]);
    graph.provide(&k, &[Tag::list("Reviews"), Tag::item("Reviews", 2)]);

    assert!(graph.matching(&[Tag::item("Reviews", 1)]).is_empty());
    assert_eq!(graph.matching(&[Tag::item("Reviews", 2)]).len(), 1);
    assert_eq!(graph.tags_of(&k).len(), 2);
  }

  #[test]
  fn test_remove_cleans_up() {
    let mut graph = TagGraph::new();
    let k = key("1");
    graph.provide(&k, &[Tag::list("UserProfile"), Tag::list("UserProfile")]);
    assert_eq!(graph.tags_of(&k).len(), 1);

    graph.remove(&k);
    assert!(graph.matching(&[Tag::list("UserProfile")]).is_empty());
    assert!(graph.by_kind.is_empty());
  }

  #[test]
  fn test_display() {
    assert_eq!(Tag::item("Comments", "m1").to_string(), "Comments:m1");
    assert_eq!(Tag::list("Reviews").to_string(), "Reviews");
  }
}
