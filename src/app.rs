use crate::commands::Invocation;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, ErrorModal, KeyResult};
use crate::ui::view::{View, ViewAction, ViewContext};
use crate::ui::views::{CommentsView, ProfileView, ReviewsView, UsersView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use marquee::api::HttpTransport;
use marquee::state::Observer;
use marquee::{Api, ApplicationState, Config};
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  config: Config,
  state: ApplicationState,
  ctx: ViewContext,
  notices: mpsc::UnboundedReceiver<String>,
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,
  command: CommandInput,
  error_modal: ErrorModal,
  title: String,
  status: Option<String>,
  frame_count: u64,
  _error_log: Observer,
  should_quit: bool,
}

impl App {
  /// Must be called inside the tokio runtime.
  pub fn new(config: Config) -> Result<Self> {
    let state = ApplicationState::init(&config);
    let transport = HttpTransport::from_config(&config)?;
    let api = Api::new(Arc::new(transport), state.store().clone());
    let (ctx, notices) = ViewContext::new(api, state.errors().clone(), config.page_size);

    let error_log = state.observe(
      |snapshot| snapshot.error.clone(),
      |error| {
        if error.is_open {
          warn!(title = %error.title, code = ?error.code, "{}", error.message);
        }
      },
    );

    let root: Box<dyn View> = match &config.default_movie {
      Some(movie) => Box::new(CommentsView::new(ctx.clone(), movie.clone())),
      None => Box::new(ReviewsView::new(ctx.clone(), None)),
    };

    Ok(Self {
      title: config.display_title(),
      error_modal: ErrorModal::new(state.errors().clone()),
      config,
      state,
      ctx,
      notices,
      view_stack: vec![root],
      command: CommandInput::new(),
      status: None,
      frame_count: 0,
      _error_log: error_log,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }
    Ok(())
  }

  fn tick(&mut self) {
    self.frame_count = self.frame_count.wrapping_add(1);
    for view in &mut self.view_stack {
      view.tick();
    }
    while let Ok(notice) = self.notices.try_recv() {
      self.status = Some(notice);
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if !matches!(self.error_modal.handle_key(key), KeyResult::NotHandled) {
      return;
    }

    // Views with an open prompt get every key
    let capturing = self
      .current_view()
      .is_some_and(|view| view.is_capturing_input());
    if !capturing {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(invocation)) => {
          self.execute(invocation);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.view_stack.push(next),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        }
      }
    }
  }

  fn execute(&mut self, invocation: Invocation) {
    info!(command = %invocation.name, argument = ?invocation.argument, "command");
    let ctx = self.ctx.clone();
    let root: Box<dyn View> = match invocation.name.as_str() {
      "comments" => {
        let Some(movie) = invocation.argument.or_else(|| self.config.default_movie.clone()) else {
          self
            .state
            .errors()
            .show("Usage: :comments <movie id>", None, Some("Missing movie"));
          return;
        };
        Box::new(CommentsView::new(ctx, movie))
      }
      "reviews" => Box::new(ReviewsView::new(ctx, invocation.argument)),
      "users" => Box::new(UsersView::new(ctx, invocation.argument)),
      "profile" => Box::new(ProfileView::new(ctx)),
      "quit" => {
        self.should_quit = true;
        return;
      }
      other => {
        self
          .state
          .errors()
          .show(format!("Unknown command: {}", other), None, None);
        return;
      }
    };
    self.view_stack.clear();
    self.view_stack.push(root);
    self.status = None;
  }

  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|view| view.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn is_loading(&self) -> bool {
    self.state.activity().is_any_loading()
  }

  pub fn frame_count(&self) -> u64 {
    self.frame_count
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn error_modal(&self) -> &ErrorModal {
    &self.error_modal
  }
}
