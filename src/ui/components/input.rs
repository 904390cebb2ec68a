use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of handling a key event in an input component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
  /// Key was handled, continue input mode
  Consumed,
  /// Enter pressed, here's the submitted value
  Submitted(String),
  /// Escape pressed, input cancelled
  Cancelled,
  /// Key not handled, pass to next handler
  NotHandled,
}

/// Reusable single-line text input.
///
/// The buffer is kept as chars so cursor movement and deletion stay correct
/// for non-ASCII input (customer names, descriptions).
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  chars: Vec<char>,
  cursor: usize,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  /// An input pre-filled with an existing value (edit forms), cursor at the
  /// end.
  pub fn with_value(value: &str) -> Self {
    let chars: Vec<char> = value.chars().collect();
    let cursor = chars.len();
    Self { chars, cursor }
  }

  /// Get the current input value
  pub fn value(&self) -> String {
    self.chars.iter().collect()
  }

  pub fn is_empty(&self) -> bool {
    self.chars.is_empty()
  }

  /// Replace the buffer (e.g. auto-filled slug)
  pub fn set_value(&mut self, value: &str) {
    self.chars = value.chars().collect();
    self.cursor = self.chars.len();
  }

  /// Clear the input
  pub fn clear(&mut self) {
    self.chars.clear();
    self.cursor = 0;
  }

  /// Handle a key event, returning the result
  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    match key.code {
      KeyCode::Esc => InputResult::Cancelled,
      KeyCode::Enter => InputResult::Submitted(self.value()),
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          self.chars.remove(self.cursor);
        }
        InputResult::Consumed
      }
      KeyCode::Delete => {
        if self.cursor < self.chars.len() {
          self.chars.remove(self.cursor);
        }
        InputResult::Consumed
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        InputResult::Consumed
      }
      KeyCode::Right => {
        if self.cursor < self.chars.len() {
          self.cursor += 1;
        }
        InputResult::Consumed
      }
      KeyCode::Home => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::End => {
        self.cursor = self.chars.len();
        InputResult::Consumed
      }
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        // Clear line before cursor
        self.chars.drain(..self.cursor);
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        // Delete word before cursor
        let mut start = self.cursor;
        while start > 0 && self.chars[start - 1] == ' ' {
          start -= 1;
        }
        while start > 0 && self.chars[start - 1] != ' ' {
          start -= 1;
        }
        self.chars.drain(start..self.cursor);
        self.cursor = start;
        InputResult::Consumed
      }
      KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
        InputResult::Consumed
      }
      _ => InputResult::NotHandled,
    }
  }

  /// Get cursor position for rendering
  pub fn cursor_position(&self) -> usize {
    self.cursor
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl_key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::CONTROL)
  }

  fn type_str(input: &mut TextInput, s: &str) {
    for c in s.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_basic_input() {
    let mut input = TextInput::new();
    assert!(input.is_empty());
    type_str(&mut input, "hi");
    assert_eq!(input.value(), "hi");
  }

  #[test]
  fn test_submit() {
    let mut input = TextInput::new();
    type_str(&mut input, "test");
    let result = input.handle_key(key(KeyCode::Enter));
    assert_eq!(result, InputResult::Submitted("test".to_string()));
  }

  #[test]
  fn test_cancel() {
    let mut input = TextInput::new();
    type_str(&mut input, "x");
    let result = input.handle_key(key(KeyCode::Esc));
    assert_eq!(result, InputResult::Cancelled);
  }

  #[test]
  fn test_with_value_edits_at_end() {
    let mut input = TextInput::with_value("latte");
    type_str(&mut input, "!");
    assert_eq!(input.value(), "latte!");
  }

  #[test]
  fn test_cursor_movement_and_insert() {
    let mut input = TextInput::new();
    type_str(&mut input, "ac");
    input.handle_key(key(KeyCode::Left));
    type_str(&mut input, "b");
    assert_eq!(input.value(), "abc");
  }

  #[test]
  fn test_non_ascii_editing() {
    let mut input = TextInput::with_value("кофе");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "коф");
  }

  #[test]
  fn test_ctrl_w_deletes_word() {
    let mut input = TextInput::with_value("flat white");
    input.handle_key(ctrl_key(KeyCode::Char('w')));
    assert_eq!(input.value(), "flat ");
  }

  #[test]
  fn test_ctrl_u_clears_before_cursor() {
    let mut input = TextInput::with_value("hello world");
    for _ in 0..5 {
      input.handle_key(key(KeyCode::Left));
    }
    input.handle_key(ctrl_key(KeyCode::Char('u')));
    assert_eq!(input.value(), "world");
  }
}
