use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by a prompt that its view needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  /// Enter pressed with the trimmed text
  Submitted(String),
  Cancelled,
}

/// One-line overlay opened by a trigger key, used for search and for
/// composing short texts.
#[derive(Debug, Clone)]
pub struct Prompt {
  trigger: char,
  title: &'static str,
  input: TextInput,
  active: bool,
}

impl Prompt {
  pub fn new(trigger: char, title: &'static str) -> Self {
    Self {
      trigger,
      title,
      input: TextInput::new(),
      active: false,
    }
  }

  /// `/`-triggered search prompt
  pub fn search() -> Self {
    Self::new('/', " Search ")
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open the prompt pre-filled with `value`
  pub fn activate_with(&mut self, value: &str) {
    self.active = true;
    self.input = TextInput::with_value(value);
  }

  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PromptEvent> {
    if !self.active {
      let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
      if key.code == KeyCode::Char(self.trigger) && !ctrl {
        self.activate_with("");
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(text) => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(PromptEvent::Submitted(text.trim().to_string()))
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(PromptEvent::Cancelled)
      }
      // Swallow everything while open so view shortcuts don't fire
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 70 / 100).clamp(30, 80).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3.min(area.height));
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(self.title);
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);
    if inner.height == 0 {
      return;
    }

    let (before, after) = self.input.split_at_cursor();
    let line = Line::from(vec![
      Span::styled(self.trigger.to_string(), Style::default().fg(Color::Yellow)),
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
  }
}
