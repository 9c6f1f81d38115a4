//! In-memory backend for view tests.

use super::super::view::ViewContext;
use async_trait::async_trait;
use marquee::api::{ApiRequest, Transport};
use marquee::cache::{ResourceStore, StoreConfig};
use marquee::state::ErrorSurface;
use marquee::{Api, ApiResult};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
struct Tables {
  comments: Vec<Value>,
  reviews: Vec<Value>,
  users: Vec<Value>,
  next_id: u64,
}

#[derive(Clone, Default)]
pub struct StubBackend {
  tables: Arc<Mutex<Tables>>,
  calls: Arc<AtomicUsize>,
}

impl StubBackend {
  pub fn comments(count: usize) -> Self {
    let backend = Self::default();
    {
      let mut tables = backend.tables.lock().unwrap();
      tables.comments = (0..count)
        .map(|n| json!({"id": n, "movieId": "m1", "username": format!("user{}", n), "content": format!("comment {}", n)}))
        .collect();
      tables.next_id = count as u64;
    }
    backend
  }

  pub fn reviews(count: usize) -> Self {
    let backend = Self::default();
    backend.tables.lock().unwrap().reviews = (0..count)
      .map(|n| json!({"id": format!("r{}", n), "movieTitle": "Heat", "username": "ada", "rating": 4, "content": format!("review {}", n), "isHidden": false}))
      .collect();
    backend
  }

  pub fn users(names: &[&str]) -> Self {
    let backend = Self::default();
    backend.tables.lock().unwrap().users = names
      .iter()
      .enumerate()
      .map(|(n, name)| json!({"id": format!("u{}", n), "username": name, "role": "USER", "status": "ACTIVE"}))
      .collect();
    backend
  }

  /// Number of requests served so far
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn respond(&self, request: &ApiRequest) -> Value {
    let mut tables = self.tables.lock().unwrap();
    let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
    match (request.method.as_str(), segments.as_slice()) {
      ("GET", ["comments", "movie", movie]) => {
        let rows: Vec<Value> = tables
          .comments
          .iter()
          .filter(|c| c["movieId"] == *movie)
          .cloned()
          .collect();
        page(request, rows)
      }
      ("POST", ["comments"]) => {
        let body = request.body.clone().unwrap_or_default();
        let id = tables.next_id;
        tables.next_id += 1;
        let created = json!({"id": id, "movieId": body["movieId"], "username": "me", "content": body["content"]});
        tables.comments.insert(0, created.clone());
        created
      }
      ("DELETE", ["comments", id]) => {
        tables.comments.retain(|c| c["id"].to_string() != *id);
        Value::Null
      }
      ("GET", ["admin", "reviews", "search"]) => {
        let keyword = param(request, "keyword").unwrap_or_default();
        let rows = tables
          .reviews
          .iter()
          .filter(|r| r["content"].as_str().unwrap_or_default().contains(keyword))
          .cloned()
          .collect();
        page(request, rows)
      }
      ("PATCH", ["admin", "reviews", id, "visibility"]) => {
        let review = tables.reviews.iter_mut().find(|r| r["id"] == *id).unwrap();
        review["isHidden"] = json!(!review["isHidden"].as_bool().unwrap_or(false));
        review.clone()
      }
      ("GET", ["admin", "users", "search"]) => {
        let keyword = param(request, "keyword").unwrap_or_default();
        let status = param(request, "status");
        let rows = tables
          .users
          .iter()
          .filter(|u| u["username"].as_str().unwrap_or_default().contains(keyword))
          .filter(|u| status.map_or(true, |s| u["status"] == s))
          .cloned()
          .collect();
        page(request, rows)
      }
      ("PATCH", ["admin", "users", id, "status"]) => {
        let status = request.body.as_ref().unwrap()["status"].clone();
        let user = tables.users.iter_mut().find(|u| u["id"] == *id).unwrap();
        user["status"] = status;
        user.clone()
      }
      ("GET", ["users", "profile"]) => {
        json!({"id": 1, "username": "ada", "email": "ada@example.com", "fullName": "Ada Lovelace", "role": "ADMIN"})
      }
      other => panic!("unexpected request {:?}", other),
    }
  }
}

fn param<'a>(request: &'a ApiRequest, name: &str) -> Option<&'a str> {
  request
    .query
    .iter()
    .find(|(key, _)| key == name)
    .map(|(_, value)| value.as_str())
}

fn page(request: &ApiRequest, rows: Vec<Value>) -> Value {
  let number: usize = param(request, "page").unwrap_or("0").parse().unwrap();
  let size: usize = param(request, "size").unwrap_or("20").parse().unwrap();
  let total_pages = rows.len().div_ceil(size);
  let content: Vec<Value> = rows.iter().skip(number * size).take(size).cloned().collect();
  json!({
    "content": content,
    "totalPages": total_pages,
    "totalElements": rows.len(),
    "size": size,
    "number": number,
    "first": number == 0,
    "last": number + 1 >= total_pages,
    "empty": content.is_empty(),
  })
}

#[async_trait]
impl Transport for StubBackend {
  async fn execute(&self, request: ApiRequest) -> ApiResult<Value> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(2)).await;
    let data = self.respond(&request);
    Ok(json!({"success": true, "code": 200, "message": "OK", "data": data}))
  }
}

pub fn context(backend: &StubBackend, page_size: u32) -> (ViewContext, mpsc::UnboundedReceiver<String>) {
  let api = Api::new(
    Arc::new(backend.clone()),
    ResourceStore::new("api", StoreConfig::default()),
  );
  ViewContext::new(api, ErrorSurface::new(), page_size)
}

/// Give background requests time to land, ticking the view as the event
/// loop would.
pub async fn settle(mut tick: impl FnMut()) {
  for _ in 0..20 {
    tokio::time::sleep(Duration::from_millis(5)).await;
    tick();
  }
}
