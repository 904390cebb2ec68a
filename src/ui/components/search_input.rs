use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Search term changed (emitted on each keystroke so list views filter
  /// live; empty string on cancel)
  Changed(String),
  /// Search submitted (overlay closed, filter persists)
  Submitted,
}

/// Search overlay with live filtering
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// The current search term (kept after the overlay closes)
  pub fn term(&self) -> String {
    self.input.value()
  }

  /// Handle a key event. Call regardless of active state - it handles the
  /// '/' activation too.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.active = true;
        self.input.clear();
        return KeyResult::Event(SearchEvent::Changed(String::new()));
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      InputResult::Consumed => KeyResult::Event(SearchEvent::Changed(self.input.value())),
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Search ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_each_keystroke_emits_changed() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));
    assert!(search.is_active());

    let result = search.handle_key(key(KeyCode::Char('c')));
    assert_eq!(result, KeyResult::Event(SearchEvent::Changed("c".into())));
    let result = search.handle_key(key(KeyCode::Char('a')));
    assert_eq!(result, KeyResult::Event(SearchEvent::Changed("ca".into())));
  }

  #[test]
  fn test_submit_keeps_term() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));
    search.handle_key(key(KeyCode::Char('x')));
    let result = search.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event(SearchEvent::Submitted));
    assert!(!search.is_active());
    assert_eq!(search.term(), "x");
  }

  #[test]
  fn test_cancel_clears_term() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));
    search.handle_key(key(KeyCode::Char('x')));
    let result = search.handle_key(key(KeyCode::Esc));
    assert_eq!(result, KeyResult::Event(SearchEvent::Changed(String::new())));
    assert_eq!(search.term(), "");
  }
}
