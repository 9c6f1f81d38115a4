mod command_input;
mod error_modal;
mod input;
mod prompt;

pub use command_input::{CommandEvent, CommandInput};
pub use error_modal::ErrorModal;
pub use prompt::{Prompt, PromptEvent};

/// What a component did with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed without anything for the parent to do
  Handled,
  /// Consumed, and the parent should act on this event
  Event(T),
  /// Not consumed; try the next handler
  NotHandled,
}
