use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the confirmation dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmEvent {
  Confirmed,
  Cancelled,
}

/// Yes/no overlay guarding destructive actions (deletes, cancellations).
#[derive(Debug, Clone, Default)]
pub struct ConfirmDialog {
  active: bool,
  message: String,
}

impl ConfirmDialog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn show(&mut self, message: impl Into<String>) {
    self.active = true;
    self.message = message.into();
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.message.clear();
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ConfirmEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Char('y') | KeyCode::Enter => {
        self.hide();
        KeyResult::Event(ConfirmEvent::Confirmed)
      }
      KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(ConfirmEvent::Cancelled)
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (self.message.len() as u16 + 6)
      .min(area.width.saturating_sub(4))
      .max(30);
    let height = 4;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Confirm ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let text = vec![
      Line::from(self.message.clone()),
      Line::from(Span::styled(
        "y: confirm  n: cancel",
        Style::default().fg(Color::DarkGray),
      )),
    ];
    frame.render_widget(Paragraph::new(text), inner);
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
  fn test_confirm_and_cancel() {
    let mut dialog = ConfirmDialog::new();
    dialog.show("Delete category \"Tea\"?");
    assert_eq!(
      dialog.handle_key(key(KeyCode::Char('y'))),
      KeyResult::Event(ConfirmEvent::Confirmed)
    );
    assert!(!dialog.is_active());

    dialog.show("Delete?");
    assert_eq!(
      dialog.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(ConfirmEvent::Cancelled)
    );
  }
}
