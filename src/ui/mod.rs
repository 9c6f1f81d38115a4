pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header, HeaderContext};

/// Keep a selection inside `0..len`, selecting the first row when there
/// is something to select.
pub fn clamp_selection(selected: Option<usize>, len: usize) -> Option<usize> {
  match (selected, len) {
    (_, 0) => None,
    (None, _) => Some(0),
    (Some(i), len) => Some(i.min(len - 1)),
  }
}

pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  state.select(clamp_selection(state.selected(), len));
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Current view
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let scope = app.current_view().and_then(|view| view.scope());
  let shortcuts = app
    .current_view()
    .map(|view| view.shortcuts())
    .unwrap_or_default();
  let header = HeaderContext {
    title: app.title(),
    scope: scope.as_deref(),
    loading: app.is_loading(),
    frame_count: app.frame_count(),
  };
  draw_header(frame, chunks[0], &header, &shortcuts);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  draw_footer(frame, chunks[2], &app.breadcrumb(), app.status());

  let full = frame.area();
  app.command_input().render_overlay(frame, chunks[1]);
  app.error_modal().render(frame, full);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_clamp_selection() {
    assert_eq!(clamp_selection(None, 0), None);
    assert_eq!(clamp_selection(Some(4), 0), None);
    assert_eq!(clamp_selection(None, 3), Some(0));
    assert_eq!(clamp_selection(Some(7), 3), Some(2));
    assert_eq!(clamp_selection(Some(1), 3), Some(1));
  }
}
