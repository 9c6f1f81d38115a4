use super::{list_title, DetailView};
use crate::ui::components::{KeyResult, Prompt, PromptEvent};
use crate::ui::clamp_selection;
use crate::ui::renderfns::{format_time, stars, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use marquee::api::reviews::{ReviewRef, ReviewSearchArgs, SearchReviews, ToggleReviewVisibility};
use marquee::api::types::Review;
use marquee::cache::PageRequest;
use marquee::Query;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

/// Paged review moderation table. Each page is its own cache entry.
pub struct ReviewsView {
  ctx: ViewContext,
  query: Query<SearchReviews>,
  table_state: TableState,
  search: Prompt,
}

impl ReviewsView {
  pub fn new(ctx: ViewContext, keyword: Option<String>) -> Self {
    let args = ReviewSearchArgs {
      keyword,
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

  fn reviews(&self) -> &[Review] {
    self.query.data().map(|page| page.content.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&Review> {
    self.table_state.selected().and_then(|i| self.reviews().get(i))
  }

  fn go_to(&mut self, page: PageRequest) {
    let args = ReviewSearchArgs {
      page,
      ..self.query.args().clone()
    };
    self.table_state.select(Some(0));
    self.query.set_args(args);
  }

  fn toggle_selected(&mut self) {
    let Some(review) = self.selected() else {
      return;
    };
    let done = if review.is_hidden {
      "Review restored"
    } else {
      "Review hidden"
    };
    let target = ReviewRef {
      id: review.id.clone(),
    };
    self.ctx.mutate::<ToggleReviewVisibility>(target, done);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.reviews().len();
    self.table_state.select(clamp_selection(self.table_state.selected(), len));

    let page = self.query.args().page.page;
    let pages = self.query.data().map(|p| p.total_pages).unwrap_or(0);
    let label = format!("Reviews page {}/{}", page, pages.max(1));
    let total = self.query.data().map(|p| p.total_elements).unwrap_or(0);
    let block = Block::default()
      .title(list_title(&label, &self.query.state(), len, total))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load reviews. Press 'r' to retry."
      } else {
        "No reviews match."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let rows: Vec<Row> = self
      .reviews()
      .iter()
      .map(|review| {
        let visibility = if review.is_hidden {
          Cell::from("hidden").style(Style::default().fg(Color::Red))
        } else {
          Cell::from("visible").style(Style::default().fg(Color::Green))
        };
        Row::new(vec![
          Cell::from(truncate(&review.movie_title, 24)).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(&review.username, 14)),
          Cell::from(stars(review.rating)).style(Style::default().fg(Color::Yellow)),
          visibility,
          Cell::from(format_time(review.created_at)).style(Style::default().fg(Color::DarkGray)),
          Cell::from(truncate(&review.content, 60)),
        ])
      })
      .collect();

    let widths = [
      Constraint::Length(24),
      Constraint::Length(14),
      Constraint::Length(5),
      Constraint::Length(8),
      Constraint::Length(16),
      Constraint::Min(10),
    ];
    let header = Row::new(vec!["Movie", "Author", "Stars", "Status", "Posted", "Review"])
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

impl View for ReviewsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(keyword)) => {
        let args = ReviewSearchArgs {
          keyword: (!keyword.is_empty()).then_some(keyword),
          page: PageRequest::first(self.ctx.page_size),
        };
        self.table_state.select(Some(0));
        self.query.set_args(args);
        return ViewAction::None;
      }
      KeyResult::Event(PromptEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
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
      KeyCode::Char('v') => self.toggle_selected(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Enter => {
        if let Some(review) = self.selected() {
          let detail = DetailView::new(format!("Review {}", review.id), review.content.clone())
            .field("movie", review.movie_title.clone())
            .field("author", review.username.clone())
            .field("rating", stars(review.rating))
            .field("hidden", review.is_hidden.to_string());
          return ViewAction::Push(Box::new(detail));
        }
      }
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
      Some(keyword) => format!("Reviews [{}]", keyword),
      None => "Reviews".to_string(),
    }
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      let len = self.reviews().len();
      self.table_state.select(clamp_selection(self.table_state.selected(), len));
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("v", "hide/show").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
