use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Terminal events consumed by the main loop
#[derive(Debug)]
pub enum Event {
  Key(KeyEvent),
  /// Periodic tick for query polling and redraws
  Tick,
  Resize,
}

/// Reads terminal input on a blocking thread and interleaves ticks
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || loop {
      let next = match event::poll(tick_rate) {
        Ok(true) => match event::read() {
          // Windows reports key releases too
          Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
          Ok(CrosstermEvent::Resize(_, _)) => Event::Resize,
          Ok(_) => continue,
          Err(_) => break,
        },
        Ok(false) => Event::Tick,
        Err(_) => break,
      };
      if tx.send(next).is_err() {
        break;
      }
    });

    Self { rx }
  }

  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
