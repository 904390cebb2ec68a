use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the status bar
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self { key, label }
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Replace the current view (e.g. login -> dashboard)
  Replace(Box<dyn View>),
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, forms, pickers) and return
/// actions for the App to execute. This creates a clean delegation chain:
/// App → View → Components
///
/// Views that load data asynchronously hold Query/Mutation handles and poll
/// them in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Whether the view currently captures raw text input (search overlay,
  /// form field). While true the App keeps its global keys to itself.
  fn wants_input(&self) -> bool {
    false
  }

  /// Called on each tick to let views poll async queries and mutations.
  /// A completed mutation may navigate (e.g. a form popping itself after a
  /// successful create).
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Keyboard shortcuts to display in the status bar
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command"),
      ShortcutInfo::new("/", "search"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
