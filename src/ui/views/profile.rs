use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use marquee::api::users::GetUserProfile;
use marquee::{Query, QueryState};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// The signed-in user's profile
pub struct ProfileView {
  query: Query<GetUserProfile>,
}

impl ProfileView {
  pub fn new(ctx: ViewContext) -> Self {
    let mut query = Query::new(ctx.api, ());
    query.fetch();
    Self { query }
  }
}

impl View for ProfileView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Profile ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let lines = match (self.query.data(), self.query.state()) {
      (Some(profile), _) => {
        let row = |name: &'static str, value: String| {
          Line::from(vec![
            Span::styled(format!("{:<10}", name), Style::default().fg(Color::DarkGray)),
            Span::raw(value),
          ])
        };
        vec![
          row("username", profile.username.clone()),
          row("name", profile.full_name.clone().unwrap_or_default()),
          row("email", profile.email.clone()),
          row("role", format!("{:?}", profile.role)),
        ]
      }
      (None, QueryState::Error(e)) => vec![Line::styled(
        format!("Failed to load profile: {}", e),
        Style::default().fg(Color::Red),
      )],
      (None, _) => vec![Line::styled("loading...", Style::default().fg(Color::DarkGray))],
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn breadcrumb_label(&self) -> String {
    "Profile".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
