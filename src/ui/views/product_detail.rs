use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::api::types::Product;
use crate::app::Ctx;
use crate::queries;
use crate::store::{Mutation, MutationState, Query};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult};
use crate::ui::renderfns::{active_label, date, money, stock_label, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProductFormView;

/// Single product detail.
pub struct ProductDetailView {
  ctx: Ctx,
  id: u64,
  name: String,
  query: Query<Product>,
  delete: Mutation<u64, ()>,
  confirm: ConfirmDialog,
  notice: Option<String>,
}

impl ProductDetailView {
  pub fn new(ctx: Ctx, id: u64, name: String) -> Self {
    let query = queries::product(&ctx.store, &ctx.api, id);
    let delete = queries::delete_product(&ctx.store, &ctx.api);
    Self {
      ctx,
      id,
      name,
      query,
      delete,
      confirm: ConfirmDialog::new(),
      notice: None,
    }
  }
}

impl View for ProductDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.notice = None;
        self.delete.mutate(self.id);
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => return ViewAction::None,
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('e') => {
        if let Some(product) = self.query.data().cloned() {
          return ViewAction::Push(Box::new(ProductFormView::edit(self.ctx.clone(), product)));
        }
      }
      KeyCode::Char('d') => {
        self.confirm.show(format!("Delete product \"{}\"?", self.name));
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    if self.delete.poll() {
      match self.delete.state() {
        // The product is gone; back to the list.
        MutationState::Success(_) => return ViewAction::Pop,
        MutationState::Error(err) => {
          self.notice = Some(format!("Delete failed: {}", err));
        }
        _ => {}
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = match (self.query.is_loading(), self.query.error()) {
      (true, _) => format!(" {} (loading...) ", self.name),
      (_, Some(err)) => format!(" {} (error: {}) ", self.name, truncate(&err.to_string(), 40)),
      _ => format!(" {} ", self.name),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(product) = self.query.data() else {
      frame.render_widget(block, area);
      return;
    };

    let threshold = self.ctx.config.ui.low_stock_threshold;
    let (stock_tag, stock_color) = stock_label(product.stock, threshold);

    let mut lines = vec![
      Line::from(vec![
        Span::styled("SKU:        ", Style::default().fg(Color::DarkGray)),
        Span::raw(product.sku.clone()),
      ]),
      Line::from(vec![
        Span::styled("Price:      ", Style::default().fg(Color::DarkGray)),
        Span::raw(money(product.price)),
      ]),
      Line::from(vec![
        Span::styled("Stock:      ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          format!("{} ({})", product.stock, stock_tag),
          Style::default().fg(stock_color),
        ),
      ]),
      Line::from(vec![
        Span::styled("Volume:     ", Style::default().fg(Color::DarkGray)),
        Span::raw(
          product
            .volume_ml
            .map(|v| format!("{} ml", v))
            .unwrap_or_else(|| "—".to_string()),
        ),
      ]),
      Line::from(vec![
        Span::styled("Category:   ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("#{}", product.category_id)),
      ]),
      Line::from(vec![
        Span::styled("Status:     ", Style::default().fg(Color::DarkGray)),
        Span::raw(active_label(product.is_active).to_string()),
        Span::styled(
          if product.is_promoted { "  promoted" } else { "" },
          Style::default().fg(Color::Magenta),
        ),
      ]),
      Line::from(vec![
        Span::styled("Updated:    ", Style::default().fg(Color::DarkGray)),
        Span::raw(date(product.updated_at)),
      ]),
      Line::from(""),
      Line::from(product.description.clone()),
    ];

    if let Some(notice) = &self.notice {
      lines.push(Line::from(""));
      lines.push(Line::from(Span::styled(
        notice.clone(),
        Style::default().fg(Color::Red),
      )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.name.clone()
  }

  fn wants_input(&self) -> bool {
    self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("e", "edit"),
      ShortcutInfo::new("d", "delete"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
