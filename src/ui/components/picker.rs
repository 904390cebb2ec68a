use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by the picker that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent<T> {
  Selected(T),
  Cancelled,
}

/// Centered overlay for choosing one of a small set of labeled values:
/// order-status filters, user roles, and the like.
#[derive(Debug, Clone, Default)]
pub struct Picker<T> {
  active: bool,
  title: String,
  options: Vec<(String, T)>,
  selected: usize,
}

impl<T: Clone> Picker<T> {
  pub fn new() -> Self {
    Self {
      active: false,
      title: String::new(),
      options: Vec::new(),
      selected: 0,
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker with the given options, preselecting `selected`.
  pub fn show(&mut self, title: impl Into<String>, options: Vec<(String, T)>, selected: usize) {
    self.active = true;
    self.title = title.into();
    self.selected = selected.min(options.len().saturating_sub(1));
    self.options = options;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.options.clear();
    self.selected = 0;
  }

  /// Handle a key event
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent<T>> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let event = match self.options.get(self.selected) {
          Some((_, value)) => PickerEvent::Selected(value.clone()),
          None => PickerEvent::Cancelled,
        };
        self.hide();
        KeyResult::Event(event)
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.options.is_empty() {
          self.selected = (self.selected + 1) % self.options.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.options.is_empty() {
          self.selected = if self.selected == 0 {
            self.options.len() - 1
          } else {
            self.selected - 1
          };
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active || self.options.is_empty() {
      return;
    }

    let max_label = self
      .options
      .iter()
      .map(|(label, _)| label.len())
      .max()
      .unwrap_or(10)
      .max(self.title.len());
    let width = (max_label as u16 + 6).min(area.width.saturating_sub(4)).max(20);
    let height = (self.options.len() as u16 + 2)
      .min(area.height.saturating_sub(4))
      .max(3);

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let items: Vec<ListItem> = self
      .options
      .iter()
      .map(|(label, _)| {
        ListItem::new(Line::from(Span::styled(
          label.clone(),
          Style::default().fg(Color::Cyan),
        )))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, inner, &mut state);
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
  fn test_select_cycles_and_returns_value() {
    let mut picker: Picker<u32> = Picker::new();
    picker.show(
      "Pick",
      vec![("one".into(), 1), ("two".into(), 2), ("three".into(), 3)],
      0,
    );

    picker.handle_key(key(KeyCode::Char('j')));
    picker.handle_key(key(KeyCode::Char('j')));
    let result = picker.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event(PickerEvent::Selected(3)));
    assert!(!picker.is_active());
  }

  #[test]
  fn test_cancel() {
    let mut picker: Picker<u32> = Picker::new();
    picker.show("Pick", vec![("one".into(), 1)], 0);
    let result = picker.handle_key(key(KeyCode::Esc));
    assert_eq!(result, KeyResult::Event(PickerEvent::Cancelled));
  }

  #[test]
  fn test_inactive_picker_ignores_keys() {
    let mut picker: Picker<u32> = Picker::new();
    assert_eq!(picker.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }
}
