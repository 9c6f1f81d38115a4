use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cache::StoreConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub activity: ActivityConfig,
  /// Items per page for lists and tables
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Movie whose comments open on startup
  pub default_movie: Option<String>,
  /// Custom title for header (defaults to the backend host if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  pub url: Url,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds an entry without subscribers is kept before eviction
  #[serde(default = "default_keep_unused_for_secs")]
  pub keep_unused_for_secs: u64,
  /// Fulfilled entries older than this are refetched on next query
  pub stale_after_secs: Option<u64>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      keep_unused_for_secs: default_keep_unused_for_secs(),
      stale_after_secs: None,
    }
  }
}

impl CacheConfig {
  pub fn store_config(&self) -> StoreConfig {
    StoreConfig {
      keep_unused_for: Duration::from_secs(self.keep_unused_for_secs),
      stale_after: self.stale_after_secs.map(Duration::from_secs),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityConfig {
  /// Endpoint names that never raise the loading indicator
  #[serde(default)]
  pub exclude: BTreeSet<String>,
}

fn default_page_size() -> u32 {
  20
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_keep_unused_for_secs() -> u64 {
  60
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./marquee.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/marquee/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/marquee/config.yaml\n\
         See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("marquee.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("marquee").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.page_size == 0 {
      return Err(eyre!("page_size must be at least 1"));
    }
    Ok(config)
  }

  /// Bearer token for the backend, from MARQUEE_API_TOKEN.
  ///
  /// Requests go out anonymously when it is not set.
  pub fn get_api_token() -> Option<String> {
    std::env::var("MARQUEE_API_TOKEN")
      .ok()
      .filter(|token| !token.trim().is_empty())
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.backend.timeout_secs)
  }

  /// Header title: configured title or the backend host.
  pub fn display_title(&self) -> String {
    self
      .title
      .clone()
      .or_else(|| self.backend.url.host_str().map(str::to_string))
      .unwrap_or_else(|| "marquee".to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("backend:\n  url: https://api.example.com/api/v1/\n").unwrap();
    assert_eq!(config.page_size, 20);
    assert_eq!(config.backend.timeout_secs, 30);
    assert_eq!(config.cache.keep_unused_for_secs, 60);
    assert!(config.activity.exclude.is_empty());
    assert_eq!(config.display_title(), "api.example.com");

    let store = config.cache.store_config();
    assert_eq!(store.keep_unused_for, Duration::from_secs(60));
    assert_eq!(store.stale_after, None);
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
backend:
  url: http://localhost:8080/api/
  timeout_secs: 5
cache:
  keep_unused_for_secs: 0
  stale_after_secs: 300
activity:
  exclude:
    - saveWatchProgress
    - searchUsers
page_size: 50
default_movie: m1
title: Back office
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.request_timeout(), Duration::from_secs(5));
    assert_eq!(config.cache.store_config().keep_unused_for, Duration::ZERO);
    assert_eq!(
      config.cache.store_config().stale_after,
      Some(Duration::from_secs(300))
    );
    assert!(config.activity.exclude.contains("searchUsers"));
    assert_eq!(config.page_size, 50);
    assert_eq!(config.default_movie.as_deref(), Some("m1"));
    assert_eq!(config.display_title(), "Back office");
  }

  #[test]
  fn test_invalid_config_is_rejected() {
    assert!(Config::parse("backend:\n  url: not a url\n").is_err());
    assert!(Config::parse("backend:\n  url: http://x/\npage_size: 0\n").is_err());
  }
}
