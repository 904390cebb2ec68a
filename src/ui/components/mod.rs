mod confirm;
mod form;
mod input;
mod picker;
mod search_input;

pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use form::{Form, FormEvent, FormField};
pub use input::{InputResult, TextInput};
pub use picker::{Picker, PickerEvent};
pub use search_input::{SearchEvent, SearchInput};

/// Generic result type for component key handling.
///
/// This enum standardizes how components communicate key handling results
/// to their parent views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, no event for parent to handle
  Handled,
  /// Key was consumed, here's an event for parent to process
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
