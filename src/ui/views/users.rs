use super::list_title;
use crate::ui::clamp_selection;
use crate::ui::components::{KeyResult, Prompt, PromptEvent};
use crate::ui::renderfns::{format_time, status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use marquee::api::types::{UserStatus, UserSummary};
use marquee::api::users::{SearchUsers, StatusChange, UpdateUserStatus, UserSearchArgs};
use marquee::cache::PageRequest;
use marquee::Query;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

pub struct UsersView {
  ctx: ViewContext,
  query: Query<SearchUsers>,
  table_state: TableState,
  search: Prompt,
}

impl UsersView {
  pub fn new(ctx: ViewContext, keyword: Option<String>) -> Self {
    let args = UserSearchArgs {
      keyword,
      status: None,
      page: PageRequest::first(ctx.page_size),
    };
    let mut query = Query::new(ctx.api.clone(), args);
    query.fetch();

    Self {
      ctx,
      query,
      table_state: TableState::default(),
      search: Prompt::search(),
    }
  }

  fn users(&self) -> &[UserSummary] {
    self.query.data().map(|page| page.content.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&UserSummary> {
    self.table_state.selected().and_then(|i| self.users().get(i))
  }

  /// Re-run the search from its first page with `change` applied
  fn search_with(&mut self, change: impl FnOnce(&mut UserSearchArgs)) {
    let mut args = self.query.args().clone();
    change(&mut args);
    args.page = PageRequest::first(self.ctx.page_size);
    self.table_state.select(Some(0));
    self.query.set_args(args);
  }

  fn go_to(&mut self, page: PageRequest) {
    let mut args = self.query.args().clone();
    args.page = page;
    self.table_state.select(Some(0));
    self.query.set_args(args);
  }

  fn toggle_selected(&mut self) {
    let Some(user) = self.selected() else {
      return;
    };
    let status = user.status.toggled();
    let done = format!("{} is now {}", user.username, status);
    let change = StatusChange {
      id: user.id.clone(),
      status,
    };
    self.ctx.mutate::<UpdateUserStatus>(change, done);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.users().len();
    self.table_state.select(clamp_selection(self.table_state.selected(), len));

    let args = self.query.args();
    let mut label = format!("Users page {}", args.page.page);
    if let Some(status) = args.status {
      label.push_str(&format!(" [{}]", status));
    }
    let total = self.query.data().map(|p| p.total_elements).unwrap_or(0);
    let block = Block::default()
      .title(list_title(&label, &self.query.state(), len, total))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load users. Press 'r' to retry."
      } else {
        "No users match."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let rows: Vec<Row> = self
      .users()
      .iter()
      .map(|user| {
        Row::new(vec![
          Cell::from(truncate(&user.username, 20)).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(&user.email, 32)),
          Cell::from(format!("{:?}", user.role)),
          Cell::from(user.status.as_str()).style(Style::default().fg(status_color(user.status))),
          Cell::from(format_time(user.created_at)).style(Style::default().fg(Color::DarkGray)),
        ])
      })
      .collect();

    let widths = [
      Constraint::Length(20),
      Constraint::Length(32),
      Constraint::Length(6),
      Constraint::Length(8),
      Constraint::Min(16),
    ];
    let header = Row::new(vec!["User", "Email", "Role", "Status", "Joined"])
      .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));
    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

/// None -> ACTIVE -> BLOCKED -> None
fn next_filter(status: Option<UserStatus>) -> Option<UserStatus> {
  match status {
    None => Some(UserStatus::Active),
    Some(UserStatus::Active) => Some(UserStatus::Blocked),
    Some(UserStatus::Blocked) => None,
  }
}

impl View for UsersView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(keyword)) => {
        self.search_with(|args| args.keyword = (!keyword.is_empty()).then_some(keyword));
        return ViewAction::None;
      }
      KeyResult::Event(PromptEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('f') => self.search_with(|args| args.status = next_filter(args.status)),
      KeyCode::Char('n') | KeyCode::Right => {
        if self.query.data().is_some_and(|page| page.has_more()) {
          let next = self.query.args().page.next();
          self.go_to(next);
        }
      }
      KeyCode::Char('p') | KeyCode::Left => {
        if !self.query.args().page.is_first() {
          let previous = self.query.args().page.previous();
          self.go_to(previous);
        }
      }
      KeyCode::Char('s') => self.toggle_selected(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.query.args().keyword {
      Some(keyword) => format!("Users [{}]", keyword),
      None => "Users".to_string(),
    }
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      let len = self.users().len();
      self.table_state.select(clamp_selection(self.table_state.selected(), len));
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("f", "status filter").with_priority(30),
      ShortcutInfo::new("s", "block/unblock").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
