//! Playback progress heartbeat.

use serde::Serialize;
use serde_json::Value;

use super::endpoint::{ApiRequest, MutationEndpoint};
use crate::cache::Tag;
use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgress {
  pub movie_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub episode_id: Option<String>,
  pub position_secs: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_secs: Option<u64>,
}

/// Sent periodically during playback. Never raises the loading indicator.
pub struct SaveWatchProgress;

impl MutationEndpoint for SaveWatchProgress {
  const NAME: &'static str = "saveWatchProgress";
  const BLOCKING: bool = false;

  type Args = WatchProgress;
  type Output = Value;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest> {
    ApiRequest::post(["watch-history", "progress"]).json(args)
  }

  fn invalidates_tags(_args: &Self::Args, _output: &Self::Output) -> Vec<Tag> {
    // Progress is not shown by any cached list
    Vec::new()
  }
}
