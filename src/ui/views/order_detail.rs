use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::api::types::Order;
use crate::app::Ctx;
use crate::queries;
use crate::store::{Mutation, MutationState, Query};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult};
use crate::ui::renderfns::{money, status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Single order detail.
pub struct OrderDetailView {
  number: String,
  query: Query<Order>,
  cancel: Mutation<u64, Order>,
  confirm: ConfirmDialog,
  id: u64,
  notice: Option<String>,
}

impl OrderDetailView {
  pub fn new(ctx: Ctx, id: u64, number: String) -> Self {
    let query = queries::order(&ctx.store, &ctx.api, id);
    let cancel = queries::cancel_order(&ctx.store, &ctx.api);
    Self {
      number,
      query,
      cancel,
      confirm: ConfirmDialog::new(),
      id,
      notice: None,
    }
  }
}

impl View for OrderDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.notice = None;
        self.cancel.mutate(self.id);
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => return ViewAction::None,
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('x') => {
        let open = self.query.data().map(|o| o.status.is_open()).unwrap_or(false);
        if open {
          self.confirm.show(format!("Cancel order {}?", self.number));
        } else {
          self.notice = Some("Order is already closed".into());
        }
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    if self.cancel.poll() {
      match self.cancel.state() {
        MutationState::Success(_) => self.notice = Some("Order cancelled".into()),
        MutationState::Error(err) => self.notice = Some(format!("Cancel failed: {}", err)),
        _ => {}
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = match (self.query.is_loading(), self.query.error()) {
      (true, _) => format!(" Order {} (loading...) ", self.number),
      (_, Some(err)) => format!(
        " Order {} (error: {}) ",
        self.number,
        truncate(&err.to_string(), 40)
      ),
      _ => format!(" Order {} ", self.number),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(order) = self.query.data() else {
      frame.render_widget(block, area);
      return;
    };

    let mut lines = vec![
      Line::from(vec![
        Span::styled("Status:   ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          order.status.label(),
          Style::default().fg(status_color(order.status)),
        ),
      ]),
      Line::from(vec![
        Span::styled("Total:    ", Style::default().fg(Color::DarkGray)),
        Span::raw(money(order.total_amount)),
      ]),
      Line::from(vec![
        Span::styled("Created:  ", Style::default().fg(Color::DarkGray)),
        Span::raw(order.created_at.format("%Y-%m-%d %H:%M").to_string()),
      ]),
      Line::from(vec![
        Span::styled("Updated:  ", Style::default().fg(Color::DarkGray)),
        Span::raw(order.updated_at.format("%Y-%m-%d %H:%M").to_string()),
      ]),
    ];

    if let Some(notice) = &self.notice {
      lines.push(Line::from(""));
      lines.push(Line::from(Span::styled(
        notice.clone(),
        Style::default().fg(Color::Yellow),
      )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Order {}", self.number)
  }

  fn wants_input(&self) -> bool {
    self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("x", "cancel order"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
