//! Single shared error modal state.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::ApiError;

pub const DEFAULT_TITLE: &str = "Notice";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
  pub is_open: bool,
  pub title: String,
  pub message: String,
  pub code: Option<i64>,
}

impl Default for ErrorState {
  fn default() -> Self {
    Self {
      is_open: false,
      title: DEFAULT_TITLE.to_string(),
      message: String::new(),
      code: None,
    }
  }
}

/// At most one error is visible; a later `show` overwrites the earlier one.
#[derive(Clone)]
pub struct ErrorSurface {
  state: Arc<watch::Sender<ErrorState>>,
}

impl Default for ErrorSurface {
  fn default() -> Self {
    Self::new()
  }
}

impl ErrorSurface {
  pub fn new() -> Self {
    let (state, _) = watch::channel(ErrorState::default());
    Self {
      state: Arc::new(state),
    }
  }

  pub fn show(&self, message: impl Into<String>, code: Option<i64>, title: Option<&str>) {
    let next = ErrorState {
      is_open: true,
      title: title.unwrap_or(DEFAULT_TITLE).to_string(),
      message: message.into(),
      code,
    };
    info!(title = %next.title, code = ?next.code, message = %next.message, "error surfaced");
    self.state.send_replace(next);
  }

  /// Surface a failed request.
  pub fn show_error(&self, err: &ApiError) {
    let title = match err {
      ApiError::Network { .. } => "Connection problem",
      ApiError::Service { .. } => DEFAULT_TITLE,
    };
    self.show(err.message(), err.code(), Some(title));
  }

  pub fn hide(&self) {
    debug!("error surface dismissed");
    self.state.send_if_modified(|state| {
      if *state == ErrorState::default() {
        return false;
      }
      *state = ErrorState::default();
      true
    });
  }

  pub fn current(&self) -> ErrorState {
    self.state.borrow().clone()
  }

  pub fn is_open(&self) -> bool {
    self.state.borrow().is_open
  }

  pub fn watch(&self) -> watch::Receiver<ErrorState> {
    self.state.subscribe()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_second_show_overwrites_first() {
    let surface = ErrorSurface::new();
    surface.show("msg1", Some(400), Some("Validation"));
    surface.show("msg2", None, None);

    let state = surface.current();
    assert!(state.is_open);
    assert_eq!(state.message, "msg2");
    assert_eq!(state.code, None);
    assert_eq!(state.title, DEFAULT_TITLE);
  }

  #[test]
  fn test_hide_restores_defaults() {
    let surface = ErrorSurface::new();
    surface.show("gone", Some(404), Some("Missing"));
    surface.hide();
    assert_eq!(surface.current(), ErrorState::default());
    assert!(!surface.is_open());
  }

  #[test]
  fn test_show_error_carries_code() {
    let surface = ErrorSurface::new();
    surface.show_error(&ApiError::service(409, "already reviewed"));
    let state = surface.current();
    assert_eq!(state.code, Some(409));
    assert_eq!(state.message, "already reviewed");

    surface.show_error(&ApiError::network("connection refused"));
    assert_eq!(surface.current().title, "Connection problem");
  }

  #[test]
  fn test_watchers_see_updates() {
    let surface = ErrorSurface::new();
    let mut rx = surface.watch();
    surface.hide();
    assert!(!rx.has_changed().unwrap());

    surface.show("boom", None, None);
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().message, "boom");
  }
}
