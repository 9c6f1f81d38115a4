use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use marquee::state::{ErrorState, ErrorSurface};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

/// Centered dialog over the global error surface. While it is open every
/// key goes to it; Enter or Esc dismisses.
pub struct ErrorModal {
  surface: ErrorSurface,
}

impl ErrorModal {
  pub fn new(surface: ErrorSurface) -> Self {
    Self { surface }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<()> {
    if !self.surface.is_open() {
      return KeyResult::NotHandled;
    }
    match key.code {
      KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => {
        self.surface.hide();
        KeyResult::Event(())
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let state = self.surface.current();
    if !state.is_open {
      return;
    }

    let modal = centered(area, 60, 9);
    frame.render_widget(Clear, modal);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_type(BorderType::Rounded)
      .border_style(Style::default().fg(Color::Red))
      .title(format!(" {} ", state.title))
      .title_alignment(Alignment::Center);

    frame.render_widget(
      Paragraph::new(body(&state))
        .block(block)
        .wrap(Wrap { trim: true }),
      modal,
    );
  }
}

fn body(state: &ErrorState) -> Vec<Line<'static>> {
  let mut lines = vec![Line::raw(state.message.clone()), Line::raw("")];
  if let Some(code) = state.code {
    lines.push(Line::styled(
      format!("code {}", code),
      Style::default().fg(Color::DarkGray),
    ));
  }
  lines.push(Line::styled(
    "<enter> dismiss",
    Style::default().fg(Color::Cyan),
  ));
  lines
}

/// Rect of at most `width` x `height` centered in `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_closed_modal_passes_keys() {
    let mut modal = ErrorModal::new(ErrorSurface::new());
    assert_eq!(modal.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }

  #[test]
  fn test_open_modal_captures_and_dismisses() {
    let surface = ErrorSurface::new();
    surface.show("Comment too long", Some(400), None);
    let mut modal = ErrorModal::new(surface.clone());

    assert_eq!(modal.handle_key(key(KeyCode::Char('j'))), KeyResult::Handled);
    assert!(surface.is_open());
    assert_eq!(modal.handle_key(key(KeyCode::Esc)), KeyResult::Event(()));
    assert!(!surface.is_open());
  }

  #[test]
  fn test_centered_fits_small_area() {
    let rect = centered(Rect::new(0, 0, 40, 5), 60, 9);
    assert_eq!(rect, Rect::new(0, 0, 40, 5));
    let rect = centered(Rect::new(0, 0, 100, 30), 60, 10);
    assert_eq!(rect, Rect::new(20, 10, 60, 10));
  }
}
