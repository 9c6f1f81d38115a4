//! Scripted transport for tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::endpoint::ApiRequest;
use super::transport::Transport;
use crate::error::ApiResult;

type Handler = Box<dyn Fn(&ApiRequest) -> ApiResult<Value> + Send + Sync>;

pub struct FakeTransport {
  handler: Handler,
  delay_ms: AtomicU64,
  calls: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
  pub fn new(handler: impl Fn(&ApiRequest) -> ApiResult<Value> + Send + Sync + 'static) -> Self {
    Self {
      handler: Box::new(handler),
      delay_ms: AtomicU64::new(0),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Delay every response by `delay`.
  pub fn with_delay(self, delay: Duration) -> Self {
    self.set_delay(delay);
    self
  }

  pub fn set_delay(&self, delay: Duration) {
    self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
  }

  pub fn calls(&self) -> Vec<ApiRequest> {
    self.calls.lock().unwrap().clone()
  }

  /// Number of calls whose path starts with `prefix`.
  pub fn calls_to(&self, prefix: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|request| request.path().starts_with(prefix))
      .count()
  }
}

#[async_trait]
impl Transport for FakeTransport {
  async fn execute(&self, request: ApiRequest) -> ApiResult<Value> {
    self.calls.lock().unwrap().push(request.clone());
    let delay = self.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    (self.handler)(&request)
  }
}

/// Successful envelope around `data`.
pub fn ok(data: Value) -> ApiResult<Value> {
  Ok(json!({ "success": true, "code": 200, "message": "OK", "data": data }))
}

/// Failed envelope.
pub fn fail(code: i64, message: &str) -> ApiResult<Value> {
  Ok(json!({ "success": false, "code": code, "message": message }))
}

/// Value of a query parameter.
pub fn param<'a>(request: &'a ApiRequest, name: &str) -> Option<&'a str> {
  request
    .query
    .iter()
    .find(|(key, _)| key == name)
    .map(|(_, value)| value.as_str())
}

/// Backend page body (0-based `number`).
pub fn page_body(content: Vec<Value>, number: u32, total_pages: u32, total_elements: u64) -> Value {
  json!({
    "content": content,
    "totalPages": total_pages,
    "totalElements": total_elements,
    "size": content.len(),
    "number": number,
    "first": number == 0,
    "last": number + 1 >= total_pages,
    "empty": content.is_empty(),
  })
}
