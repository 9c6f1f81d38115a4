//! Declarations of backend endpoints.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::cache::{PageRequest, Tag};
use crate::error::{ApiError, ApiResult};

/// One HTTP call, relative to the backend base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  /// Raw path segments; the transport percent-encodes them
  pub segments: Vec<String>,
  pub query: Vec<(String, String)>,
  pub body: Option<Value>,
}

impl ApiRequest {
  pub fn new<I, S>(method: Method, segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: ToString,
  {
    Self {
      method,
      segments: segments.into_iter().map(|s| s.to_string()).collect(),
      query: Vec::new(),
      body: None,
    }
  }

  pub fn get<I: IntoIterator<Item = S>, S: ToString>(segments: I) -> Self {
    Self::new(Method::GET, segments)
  }

  pub fn post<I: IntoIterator<Item = S>, S: ToString>(segments: I) -> Self {
    Self::new(Method::POST, segments)
  }

  pub fn put<I: IntoIterator<Item = S>, S: ToString>(segments: I) -> Self {
    Self::new(Method::PUT, segments)
  }

  pub fn patch<I: IntoIterator<Item = S>, S: ToString>(segments: I) -> Self {
    Self::new(Method::PATCH, segments)
  }

  pub fn delete<I: IntoIterator<Item = S>, S: ToString>(segments: I) -> Self {
    Self::new(Method::DELETE, segments)
  }

  pub fn query(mut self, name: &str, value: impl ToString) -> Self {
    self.query.push((name.to_string(), value.to_string()));
    self
  }

  /// Add a query parameter unless it is absent or blank.
  pub fn query_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
    match value.map(|v| v.to_string()) {
      Some(v) if !v.trim().is_empty() => self.query(name, v),
      _ => self,
    }
  }

  pub fn page(mut self, page: &PageRequest) -> Self {
    self.query.extend(page.to_query());
    self
  }

  pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> ApiResult<Self> {
    let body = serde_json::to_value(body).map_err(ApiError::malformed)?;
    self.body = Some(body);
    Ok(self)
  }

  /// Path relative to the base URL, for logs.
  pub fn path(&self) -> String {
    format!("/{}", self.segments.join("/"))
  }
}

impl fmt::Display for ApiRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.method, self.path())
  }
}

/// A read endpoint whose results live in the resource store.
///
/// Implementors are unit structs; every hook is an associated function so a
/// declaration carries no state.
pub trait QueryEndpoint: Send + Sync + 'static {
  /// Endpoint name, the first half of every cache key.
  const NAME: &'static str;
  /// Whether in-flight requests raise the global loading flag.
  const BLOCKING: bool = true;
  /// Per-endpoint retention; the store default applies when `None`.
  const KEEP_UNUSED_FOR: Option<Duration> = None;

  type Args: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
  /// Payload inside the response envelope.
  type Response: DeserializeOwned + Send + 'static;
  /// What the cache stores and consumers read.
  type Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest>;

  fn transform(response: Self::Response) -> Self::Output;

  /// Tags provided by a fulfilled (merged) result.
  fn provides_tags(args: &Self::Args, output: &Self::Output) -> Vec<Tag>;

  /// Arguments that identify the cache entry. Defaults to all of them.
  fn cache_args(args: &Self::Args) -> serde_json::Result<Value> {
    serde_json::to_value(args)
  }

  /// Combine the cached output with a freshly fetched one. Defaults to
  /// replacing it.
  fn merge(existing: Option<Self::Output>, incoming: Self::Output, args: &Self::Args) -> Self::Output {
    let _ = (existing, args);
    incoming
  }

  /// Whether a fulfilled entry must be refetched for `args`, given the
  /// arguments of the last applied fetch.
  fn force_refetch(args: &Self::Args, previous: Option<&Self::Args>) -> bool {
    let _ = (args, previous);
    false
  }

  /// Arguments used when an invalidated entry is refetched.
  fn refetch_args(args: Self::Args) -> Self::Args {
    args
  }
}

/// A write endpoint. Its invalidation tags are declared explicitly; an
/// endpoint that invalidates nothing returns an empty list.
pub trait MutationEndpoint: Send + Sync + 'static {
  const NAME: &'static str;
  const BLOCKING: bool = true;

  type Args: Serialize + Send + Sync + 'static;
  type Output: DeserializeOwned + Send + 'static;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest>;

  fn invalidates_tags(args: &Self::Args, output: &Self::Output) -> Vec<Tag>;
}
