use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::api::types::FieldErrors;

/// Events emitted by a form that the parent view handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
  /// Enter on the last field; the view validates and submits
  Submitted,
  /// Esc anywhere in the form
  Cancelled,
}

/// One labeled text field.
pub struct FormField {
  pub name: &'static str,
  pub label: &'static str,
  pub input: TextInput,
  secret: bool,
}

impl FormField {
  pub fn new(name: &'static str, label: &'static str) -> Self {
    Self {
      name,
      label,
      input: TextInput::new(),
      secret: false,
    }
  }

  pub fn with_value(name: &'static str, label: &'static str, value: &str) -> Self {
    Self {
      name,
      label,
      input: TextInput::with_value(value),
      secret: false,
    }
  }

  /// Render the value as asterisks (passwords).
  pub fn secret(mut self) -> Self {
    self.secret = true;
    self
  }
}

/// A vertical stack of labeled inputs with field-level validation errors.
///
/// The form is deliberately dumb about types: every field edits text, and
/// the owning view converts field values into its typed Create/Update
/// command and runs the command's validator before submitting. Validation
/// errors land back here via `set_errors` and render under their fields.
pub struct Form {
  fields: Vec<FormField>,
  focus: usize,
  errors: FieldErrors,
}

impl Form {
  pub fn new(fields: Vec<FormField>) -> Self {
    Self {
      fields,
      focus: 0,
      errors: FieldErrors::new(),
    }
  }

  pub fn value(&self, name: &str) -> String {
    self
      .fields
      .iter()
      .find(|f| f.name == name)
      .map(|f| f.input.value())
      .unwrap_or_default()
  }

  pub fn set_value(&mut self, name: &str, value: &str) {
    if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
      field.input.set_value(value);
    }
  }

  pub fn set_errors(&mut self, errors: FieldErrors) {
    self.errors = errors;
  }

  pub fn clear_errors(&mut self) {
    self.errors.clear();
  }

  pub fn has_errors(&self) -> bool {
    !self.errors.is_empty()
  }

  /// Lines needed to render all fields with their error rows.
  pub fn height(&self) -> u16 {
    let error_rows = self
      .fields
      .iter()
      .filter(|f| self.errors.contains_key(f.name))
      .count();
    (self.fields.len() + error_rows) as u16
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % self.fields.len().max(1);
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        let len = self.fields.len().max(1);
        self.focus = (self.focus + len - 1) % len;
        KeyResult::Handled
      }
      KeyCode::Enter => {
        if self.focus + 1 < self.fields.len() {
          self.focus += 1;
          KeyResult::Handled
        } else {
          KeyResult::Event(FormEvent::Submitted)
        }
      }
      KeyCode::Esc => KeyResult::Event(FormEvent::Cancelled),
      _ => {
        let Some(field) = self.fields.get_mut(self.focus) else {
          return KeyResult::NotHandled;
        };
        match field.input.handle_key(key) {
          InputResult::Consumed => KeyResult::Handled,
          // Submitted/Cancelled are intercepted above; anything else was
          // a key the input didn't care about.
          _ => KeyResult::NotHandled,
        }
      }
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let label_width = self
      .fields
      .iter()
      .map(|f| f.label.len())
      .max()
      .unwrap_or(0);

    let mut lines = Vec::new();
    for (i, field) in self.fields.iter().enumerate() {
      let focused = i == self.focus;
      let value = if field.secret {
        "*".repeat(field.input.value().chars().count())
      } else {
        field.input.value()
      };

      let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::White)
      };

      let mut spans = vec![
        Span::styled(format!("{:>width$}: ", field.label, width = label_width), label_style),
        Span::raw(value),
      ];
      if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      lines.push(Line::from(spans));

      if let Some(error) = self.errors.get(field.name) {
        lines.push(Line::from(Span::styled(
          format!("{:>width$}  {}", "", error, width = label_width),
          Style::default().fg(Color::Red),
        )));
      }
    }

    frame.render_widget(Paragraph::new(lines), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn sample_form() -> Form {
    Form::new(vec![
      FormField::new("name", "Name"),
      FormField::new("slug", "Slug"),
    ])
  }

  #[test]
  fn test_typing_goes_to_focused_field() {
    let mut form = sample_form();
    form.handle_key(key(KeyCode::Char('t')));
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Char('s')));
    assert_eq!(form.value("name"), "t");
    assert_eq!(form.value("slug"), "s");
  }

  #[test]
  fn test_enter_advances_then_submits() {
    let mut form = sample_form();
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submitted)
    );
  }

  #[test]
  fn test_escape_cancels() {
    let mut form = sample_form();
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancelled)
    );
  }

  #[test]
  fn test_errors_add_rows() {
    let mut form = sample_form();
    assert_eq!(form.height(), 2);
    let mut errors = FieldErrors::new();
    errors.insert("name", "Name is required".into());
    form.set_errors(errors);
    assert_eq!(form.height(), 3);
    assert!(form.has_errors());
  }
}
