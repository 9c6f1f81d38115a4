use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Read-only view of one row: labelled fields above a wrapped body
pub struct DetailView {
  label: String,
  fields: Vec<(&'static str, String)>,
  body: String,
  scroll: u16,
}

impl DetailView {
  pub fn new(label: impl Into<String>, body: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      fields: Vec::new(),
      body: body.into(),
      scroll: 0,
    }
  }

  pub fn field(mut self, name: &'static str, value: impl Into<String>) -> Self {
    self.fields.push((name, value.into()));
    self
  }
}

impl View for DetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = self
      .fields
      .iter()
      .map(|(name, value)| {
        Line::from(vec![
          Span::styled(format!("{:<10}", name), Style::default().fg(Color::DarkGray)),
          Span::styled(value.clone(), Style::default().fg(Color::White)),
        ])
      })
      .collect();
    lines.push(Line::raw(""));
    lines.extend(self.body.lines().map(|l| Line::raw(l.to_string())));

    let block = Block::default()
      .title(format!(" {} ", self.label))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let paragraph = Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.label.clone()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "scroll").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
