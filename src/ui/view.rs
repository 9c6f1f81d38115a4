use crossterm::event::KeyEvent;
use marquee::api::MutationEndpoint;
use marquee::state::ErrorSurface;
use marquee::Api;
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Handles shared by every view
#[derive(Clone)]
pub struct ViewContext {
  pub api: Api,
  pub errors: ErrorSurface,
  pub page_size: u32,
  notices: mpsc::UnboundedSender<String>,
}

impl ViewContext {
  pub fn new(
    api: Api,
    errors: ErrorSurface,
    page_size: u32,
  ) -> (Self, mpsc::UnboundedReceiver<String>) {
    let (notices, rx) = mpsc::unbounded_channel();
    let ctx = Self {
      api,
      errors,
      page_size,
      notices,
    };
    (ctx, rx)
  }

  /// Run a mutation in the background. Success posts `done` to the footer;
  /// failure opens the error modal.
  pub fn mutate<M: MutationEndpoint>(&self, args: M::Args, done: impl Into<String>) {
    let api = self.api.clone();
    let errors = self.errors.clone();
    let notices = self.notices.clone();
    let done = done.into();
    tokio::spawn(async move {
      match api.mutate::<M>(args).await {
        Ok(_) => {
          debug!(mutation = M::NAME, "mutation finished");
          let _ = notices.send(done);
        }
        Err(err) => {
          warn!(mutation = M::NAME, error = %err, "mutation failed");
          errors.show_error(&err);
        }
      }
    });
  }
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, compose) and return actions
/// for the App to execute: App → View → Components.
///
/// Views that load data hold `Query<E>` handles and poll them in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect);

  fn breadcrumb_label(&self) -> String;

  /// What the view is scoped to, shown in the header
  fn scope(&self) -> Option<String> {
    None
  }

  /// True while a prompt inside the view owns the keyboard
  fn is_capturing_input(&self) -> bool {
    false
  }

  /// Called on each tick to allow views to poll async queries
  fn tick(&mut self) {}

  /// Keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
