//! Page types and the merge policy for accumulated page results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::hash::Hash;

/// Items that carry a stable identity used for de-duplication.
pub trait Identified {
  type Id: Eq + Hash + Clone;

  fn identity(&self) -> Self::Id;
}

/// Client-side page request. `page` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
  pub page: u32,
  pub size: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sort: Option<String>,
}

impl PageRequest {
  pub fn first(size: u32) -> Self {
    Self {
      page: 1,
      size,
      sort: None,
    }
  }

  pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
    self.sort = Some(sort.into());
    self
  }

  pub fn next(&self) -> Self {
    Self {
      page: self.page + 1,
      ..self.clone()
    }
  }

  pub fn previous(&self) -> Self {
    Self {
      page: self.page.saturating_sub(1).max(1),
      ..self.clone()
    }
  }

  pub fn is_first(&self) -> bool {
    self.page <= 1
  }

  /// Query parameters as the backend expects them (0-based page).
  pub fn to_query(&self) -> Vec<(String, String)> {
    let mut query = vec![
      ("page".to_string(), self.page.saturating_sub(1).to_string()),
      ("size".to_string(), self.size.to_string()),
    ];
    if let Some(sort) = &self.sort {
      query.push(("sort".to_string(), sort.clone()));
    }
    query
  }
}

/// Paginated response body as sent by the backend (0-based `number`).
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
  #[serde(default = "Vec::new")]
  pub content: Vec<T>,
  #[serde(default)]
  pub total_pages: u32,
  #[serde(default)]
  pub total_elements: u64,
  #[serde(default)]
  pub size: u32,
  #[serde(default)]
  pub number: u32,
  #[serde(default)]
  pub first: bool,
  #[serde(default)]
  pub last: bool,
  #[serde(default)]
  pub empty: bool,
}

/// Client-side page result, possibly accumulated over several pages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub content: Vec<T>,
  /// 1-based number of the last page merged in.
  pub page_number: u32,
  pub total_pages: u32,
  pub total_elements: u64,
  pub is_first: bool,
  pub is_last: bool,
}

impl<T> Default for Paginated<T> {
  fn default() -> Self {
    Self {
      content: Vec::new(),
      page_number: 1,
      total_pages: 0,
      total_elements: 0,
      is_first: true,
      is_last: true,
    }
  }
}

impl<T> From<PageResponse<T>> for Paginated<T> {
  fn from(page: PageResponse<T>) -> Self {
    Self {
      content: page.content,
      page_number: page.number + 1,
      total_pages: page.total_pages,
      total_elements: page.total_elements,
      is_first: page.first,
      is_last: page.last,
    }
  }
}

impl<T> Paginated<T> {
  pub fn len(&self) -> usize {
    self.content.len()
  }

  pub fn is_empty(&self) -> bool {
    self.content.is_empty()
  }

  pub fn has_more(&self) -> bool {
    !self.is_last
  }
}

/// Merge a freshly fetched page into the cached result.
///
/// Page 1 (or no cached result) replaces everything. Any later page appends
/// the items not already present, keeping server order, and takes the page
/// counters from the incoming response.
pub fn merge<T: Identified>(
  existing: Option<Paginated<T>>,
  incoming: Paginated<T>,
  requested_page: u32,
) -> Paginated<T> {
  let mut incoming = incoming;
  let items = std::mem::take(&mut incoming.content);

  let Some(mut merged) = existing.filter(|_| requested_page > 1) else {
    let mut seen = HashSet::new();
    append_unique(&mut incoming.content, items, &mut seen);
    return incoming;
  };

  let mut seen: HashSet<T::Id> = merged.content.iter().map(Identified::identity).collect();
  append_unique(&mut merged.content, items, &mut seen);

  merged.page_number = incoming.page_number;
  merged.is_last = incoming.is_last;
  merged.total_elements = incoming.total_elements;
  merged.total_pages = incoming.total_pages;
  merged
}

fn append_unique<T: Identified>(into: &mut Vec<T>, items: Vec<T>, seen: &mut HashSet<T::Id>) {
  for item in items {
    if seen.insert(item.identity()) {
      into.push(item);
    }
  }
}

/// Cache arguments for an accumulating list: the request arguments without
/// their `page` member, so every page lands in one entry.
pub fn args_without_page(mut args: Value) -> Value {
  if let Some(object) = args.as_object_mut() {
    if let Some(Value::Object(page)) = object.get_mut("page") {
      page.remove("page");
    } else {
      object.remove("page");
    }
  }
  args
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[derive(Clone, Debug, PartialEq)]
  struct Item(&'static str);

  impl Identified for Item {
    type Id = &'static str;

    fn identity(&self) -> Self::Id {
      self.0
    }
  }

  fn page(items: &[&'static str], number: u32, is_last: bool) -> Paginated<Item> {
    Paginated {
      content: items.iter().copied().map(Item).collect(),
      page_number: number,
      total_pages: 3,
      total_elements: 6,
      is_first: number == 1,
      is_last,
    }
  }

  fn ids(page: &Paginated<Item>) -> Vec<&'static str> {
    page.content.iter().map(|i| i.0).collect()
  }

  #[test]
  fn test_first_page_replaces() {
    let cached = page(&["a", "b", "c"], 1, false);
    let merged = merge(Some(cached), page(&["a", "b", "d"], 1, false), 1);
    assert_eq!(ids(&merged), vec!["a", "b", "d"]);
  }

  #[test]
  fn test_append_skips_known_items() {
    let cached = page(&["a", "b"], 1, false);
    let merged = merge(Some(cached), page(&["b", "c"], 2, true), 2);
    assert_eq!(ids(&merged), vec!["a", "b", "c"]);
    assert_eq!(merged.page_number, 2);
    assert!(merged.is_last);
    assert!(merged.is_first);
  }

  #[test]
  fn test_same_page_twice_is_idempotent() {
    let cached = page(&["a", "b"], 1, false);
    let once = merge(Some(cached), page(&["c", "d"], 2, false), 2);
    let twice = merge(Some(once.clone()), page(&["c", "d"], 2, false), 2);
    assert_eq!(once, twice);
  }

  #[test]
  fn test_counters_follow_server() {
    let cached = page(&["a"], 1, false);
    let mut incoming = page(&["b"], 2, false);
    incoming.total_elements = 11;
    incoming.total_pages = 6;
    let merged = merge(Some(cached), incoming, 2);
    assert_eq!(merged.total_elements, 11);
    assert_eq!(merged.total_pages, 6);
  }

  #[test]
  fn test_later_page_without_cache_is_taken_as_is() {
    let merged = merge(None, page(&["x", "x", "y"], 3, true), 3);
    assert_eq!(ids(&merged), vec!["x", "y"]);
    assert_eq!(merged.page_number, 3);
  }

  #[test]
  fn test_page_response_is_one_based_on_client() {
    let raw = json!({
      "content": ["a"],
      "totalPages": 4,
      "totalElements": 61,
      "size": 20,
      "number": 0,
      "first": true,
      "last": false,
      "empty": false
    });
    let response: PageResponse<String> = serde_json::from_value(raw).unwrap();
    let page: Paginated<String> = response.into();
    assert_eq!(page.page_number, 1);
    assert_eq!(page.total_elements, 61);
    assert!(page.has_more());
  }

  #[test]
  fn test_page_request_query_is_zero_based() {
    let request = PageRequest::first(20).with_sort("createdAt,desc").next();
    assert_eq!(
      request.to_query(),
      vec![
        ("page".to_string(), "1".to_string()),
        ("size".to_string(), "20".to_string()),
        ("sort".to_string(), "createdAt,desc".to_string()),
      ]
    );
    assert_eq!(request.previous().previous().page, 1);
  }

  #[test]
  fn test_args_without_page() {
    let nested = json!({"movieId": "m1", "page": {"page": 2, "size": 20}});
    assert_eq!(
      args_without_page(nested),
      json!({"movieId": "m1", "page": {"size": 20}})
    );

    let flat = json!({"movieId": "m1", "page": 2});
    assert_eq!(args_without_page(flat), json!({"movieId": "m1"}));
  }
}
