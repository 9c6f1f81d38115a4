use super::{list_title, DetailView};
use crate::ui::components::{KeyResult, Prompt, PromptEvent};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_time, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use marquee::api::comments::{
  CommentRef, CreateComment, DeleteComment, ListMovieComments, MovieCommentsArgs, NewComment,
};
use marquee::api::types::Comment;
use marquee::Query;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Infinite list of one movie's comments. Moving past the last row loads
/// the next page into the same list.
pub struct CommentsView {
  ctx: ViewContext,
  movie_id: String,
  query: Query<ListMovieComments>,
  list_state: ListState,
  compose: Prompt,
  pending_delete: Option<Comment>,
}

impl CommentsView {
  pub fn new(ctx: ViewContext, movie_id: String) -> Self {
    let args = MovieCommentsArgs::first_page(movie_id.clone(), ctx.page_size);
    let mut query = Query::new(ctx.api.clone(), args);
    query.fetch();

    Self {
      ctx,
      movie_id,
      query,
      list_state: ListState::default(),
      compose: Prompt::new('c', " New comment "),
      pending_delete: None,
    }
  }

  fn comments(&self) -> &[Comment] {
    self.query.data().map(|page| page.content.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&Comment> {
    self.list_state.selected().and_then(|i| self.comments().get(i))
  }

  /// Request the page after the last one merged in. Returns false when
  /// there is nothing more or a request is already running.
  fn load_more(&mut self) -> bool {
    let Some(loaded) = self.query.data() else {
      return false;
    };
    if !loaded.has_more() || self.query.is_loading() {
      return false;
    }
    let mut args = self.query.args().clone();
    args.page.page = loaded.page_number + 1;
    self.query.set_args(args);
    true
  }

  fn select_next(&mut self) {
    let len = self.comments().len();
    match self.list_state.selected() {
      Some(i) if i + 1 >= len => {
        self.load_more();
      }
      _ => self.list_state.select_next(),
    }
  }

  fn handle_compose(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.compose.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(content)) => {
        if !content.is_empty() {
          let comment = NewComment {
            movie_id: self.movie_id.clone(),
            content,
          };
          self.ctx.mutate::<CreateComment>(comment, "Comment posted");
        }
        Some(ViewAction::None)
      }
      KeyResult::Event(PromptEvent::Cancelled) | KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.comments().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match &self.pending_delete {
      Some(comment) => format!(" Delete comment by {}? (y/n) ", comment.username),
      None => {
        let total = self.query.data().map(|page| page.total_elements).unwrap_or(0);
        list_title(&self.breadcrumb_label(), &self.query.state(), len, total)
      }
    };
    let border = if self.pending_delete.is_some() {
      Color::Red
    } else {
      Color::Blue
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load comments. Press 'r' to retry."
      } else {
        "No comments yet. Press 'c' to write one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let width = area.width.saturating_sub(40) as usize;
    let mut items: Vec<ListItem> = self
      .comments()
      .iter()
      .map(|comment| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<16}", truncate(&comment.username, 16)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<16}", format_time(comment.created_at)),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(" "),
          Span::raw(truncate(&comment.content, width.max(10))),
        ]))
      })
      .collect();

    if self.query.data().is_some_and(|page| page.has_more()) {
      let hint = if self.query.is_loading() {
        "  loading more..."
      } else {
        "  more below (j at the end, or n)"
      };
      items.push(ListItem::new(Span::styled(
        hint,
        Style::default().fg(Color::DarkGray),
      )));
    }

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for CommentsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(action) = self.handle_compose(key) {
      return action;
    }

    if let Some(comment) = self.pending_delete.take() {
      if key.code == KeyCode::Char('y') {
        let target = CommentRef {
          id: comment.id,
          movie_id: self.movie_id.clone(),
        };
        self.ctx.mutate::<DeleteComment>(target, "Comment deleted");
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => {
        let len = self.comments().len();
        self.list_state.select(len.checked_sub(1));
      }
      KeyCode::Char('n') => {
        self.load_more();
      }
      KeyCode::Char('r') => {
        self.list_state.select_first();
        self.query.refetch();
      }
      KeyCode::Char('d') => self.pending_delete = self.selected().cloned(),
      KeyCode::Enter => {
        if let Some(comment) = self.selected() {
          let detail = DetailView::new(format!("Comment {}", comment.id), comment.content.clone())
            .field("author", comment.username.clone())
            .field("posted", format_time(comment.created_at));
          return ViewAction::Push(Box::new(detail));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.compose.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Comments [{}]", self.movie_id)
  }

  fn scope(&self) -> Option<String> {
    Some(format!("movie {}", self.movie_id))
  }

  fn is_capturing_input(&self) -> bool {
    self.compose.is_active() || self.pending_delete.is_some()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      let len = self.comments().len();
      ensure_valid_selection(&mut self.list_state, len);
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("c", "comment").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ui::views::testing::{context, settle, StubBackend};
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[tokio::test]
  async fn test_scrolling_past_the_end_loads_the_next_page() {
    let backend = StubBackend::comments(5);
    let (ctx, _notices) = context(&backend, 2);
    let mut view = CommentsView::new(ctx, "m1".to_string());
    settle(|| view.tick()).await;
    assert_eq!(view.comments().len(), 2);

    view.handle_key(key(KeyCode::Char('j')));
    view.handle_key(key(KeyCode::Char('j')));
    settle(|| view.tick()).await;
    assert_eq!(view.comments().len(), 4);
    assert_eq!(view.query.data().map(|page| page.page_number), Some(2));

    view.handle_key(key(KeyCode::Char('G')));
    view.handle_key(key(KeyCode::Char('j')));
    settle(|| view.tick()).await;
    assert_eq!(view.comments().len(), 5);
    assert!(!view.load_more());
    assert_eq!(backend.calls(), 3);
  }

  #[tokio::test]
  async fn test_posting_a_comment_restarts_from_the_first_page() {
    let backend = StubBackend::comments(5);
    let (ctx, mut notices) = context(&backend, 2);
    let mut view = CommentsView::new(ctx, "m1".to_string());
    settle(|| view.tick()).await;
    view.handle_key(key(KeyCode::Char('n')));
    settle(|| view.tick()).await;
    assert_eq!(view.comments().len(), 4);

    view.handle_key(key(KeyCode::Char('c')));
    for c in "so good".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    assert_eq!(notices.recv().await.as_deref(), Some("Comment posted"));
    settle(|| view.tick()).await;

    assert_eq!(view.comments().len(), 2);
    assert_eq!(view.comments()[0].content, "so good");
    assert_eq!(view.query.data().map(|page| page.total_elements), Some(6));
  }

  #[tokio::test]
  async fn test_delete_needs_confirmation() {
    let backend = StubBackend::comments(3);
    let (ctx, _notices) = context(&backend, 10);
    let mut view = CommentsView::new(ctx, "m1".to_string());
    settle(|| view.tick()).await;

    view.handle_key(key(KeyCode::Char('d')));
    assert!(view.pending_delete.is_some());
    view.handle_key(key(KeyCode::Char('n')));
    assert!(view.pending_delete.is_none());
    settle(|| view.tick()).await;
    assert_eq!(backend.calls(), 1);
  }
}
