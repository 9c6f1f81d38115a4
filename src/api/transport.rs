//! Network seam between the data layer and the backend.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use super::endpoint::ApiRequest;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Executes a request and returns the raw response envelope.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn execute(&self, request: ApiRequest) -> ApiResult<Value>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
  client: reqwest::Client,
  base: Url,
  token: Option<String>,
}

impl HttpTransport {
  pub fn new(base: Url, token: Option<String>, timeout: Duration) -> ApiResult<Self> {
    if base.cannot_be_a_base() {
      return Err(ApiError::network(format!("{} cannot be used as a base URL", base)));
    }

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base,
      token,
    })
  }

  pub fn from_config(config: &Config) -> ApiResult<Self> {
    Self::new(
      config.backend.url.clone(),
      Config::get_api_token(),
      config.request_timeout(),
    )
  }

  /// Absolute URL of a request. Segments are percent-encoded.
  pub fn url_for(&self, request: &ApiRequest) -> ApiResult<Url> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::network(format!("{} cannot be used as a base URL", self.base)))?
      .pop_if_empty()
      .extend(&request.segments);
    Ok(url)
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn execute(&self, request: ApiRequest) -> ApiResult<Value> {
    let url = self.url_for(&request)?;
    trace!(method = %request.method, url = %url, "sending request");

    let mut builder = self.client.request(request.method.clone(), url);
    if !request.query.is_empty() {
      builder = builder.query(&request.query);
    }
    if let Some(token) = &self.token {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| ApiError::network(e.to_string()))?;
    let status = response.status();
    let bytes = response
      .bytes()
      .await
      .map_err(|e| ApiError::network(e.to_string()))?;
    debug!(request = %request, status = status.as_u16(), bytes = bytes.len(), "response received");

    if bytes.is_empty() && status.is_success() {
      return Ok(json!({ "success": true, "code": status.as_u16() }));
    }

    match serde_json::from_slice::<Value>(&bytes) {
      Ok(body) => Ok(body),
      Err(e) if status.is_success() => Err(ApiError::malformed(e)),
      Err(_) => Err(ApiError::service(
        i64::from(status.as_u16()),
        status
          .canonical_reason()
          .unwrap_or("Request failed")
          .to_string(),
      )),
    }
  }
}
