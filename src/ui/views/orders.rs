use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::api::types::{Order, OrderStatus, Paginated};
use crate::app::Ctx;
use crate::listing::{derive, Filters, StatusFilter};
use crate::queries;
use crate::store::{Mutation, MutationState, Query};
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, KeyResult, Picker, PickerEvent, SearchEvent, SearchInput,
};
use crate::ui::renderfns::{date, money, status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::OrderDetailView;
use crate::ui::ensure_valid_selection;

/// Order list with a server-side status filter.
///
/// Changing the filter changes the resource key, so the old subscription is
/// torn down and a fresh query takes its place; the cache keeps both
/// variants keyed separately.
pub struct OrdersView {
  ctx: Ctx,
  status: Option<OrderStatus>,
  query: Query<Paginated<Order>>,
  search: SearchInput,
  filters: Filters,
  list_state: ListState,
  picker: Picker<Option<OrderStatus>>,
  cancel: Mutation<u64, Order>,
  confirm: ConfirmDialog,
  pending_cancel: Option<u64>,
  notice: Option<(String, bool)>,
}

impl OrdersView {
  pub fn new(ctx: Ctx) -> Self {
    let query = queries::orders(&ctx.store, &ctx.api, 1, ctx.config.ui.page_size, None);
    let cancel = queries::cancel_order(&ctx.store, &ctx.api);
    Self {
      ctx,
      status: None,
      query,
      search: SearchInput::new(),
      filters: Filters::default(),
      list_state: ListState::default(),
      picker: Picker::new(),
      cancel,
      confirm: ConfirmDialog::new(),
      pending_cancel: None,
      notice: None,
    }
  }

  fn set_status(&mut self, status: Option<OrderStatus>) {
    if self.status == status {
      return;
    }
    self.status = status;
    // New parameters are a new key: drop the old subscription, start fresh.
    self.query = queries::orders(
      &self.ctx.store,
      &self.ctx.api,
      1,
      self.ctx.config.ui.page_size,
      status,
    );
    self.filters.status = match status {
      Some(s) => StatusFilter::Only(s.as_str().to_string()),
      None => StatusFilter::All,
    };
    self.list_state = ListState::default();
  }

  fn open_picker(&mut self) {
    let mut options: Vec<(String, Option<OrderStatus>)> = vec![("All".to_string(), None)];
    options.extend(
      OrderStatus::ALL
        .iter()
        .map(|s| (s.label().to_string(), Some(*s))),
    );
    let current = match self.status {
      None => 0,
      Some(s) => 1 + OrderStatus::ALL.iter().position(|x| *x == s).unwrap_or(0),
    };
    self.picker.show("Filter by status", options, current);
  }

  fn visible(&self) -> Vec<&Order> {
    let items = self
      .query
      .data()
      .map(|page| page.data.as_slice())
      .unwrap_or(&[]);
    derive(items, &self.filters, None)
  }

  fn selected(&self) -> Option<&Order> {
    let rows = self.visible();
    self.list_state.selected().and_then(|i| rows.get(i).copied())
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let line = match self.query.data() {
      Some(page) => {
        let count = |s: OrderStatus| page.data.iter().filter(|o| o.status == s).count();
        let preparing = count(OrderStatus::Confirmed) + count(OrderStatus::Preparing);
        Line::from(vec![
          Span::raw(format!(" {} orders", page.data.len())),
          Span::styled(
            format!("  {} pending", count(OrderStatus::Pending)),
            Style::default().fg(Color::Yellow),
          ),
          Span::styled(format!("  {} preparing", preparing), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("  {} ready", count(OrderStatus::Ready)),
            Style::default().fg(Color::Green),
          ),
          Span::styled(
            format!("  {} completed", count(OrderStatus::Completed)),
            Style::default().fg(Color::DarkGray),
          ),
        ])
      }
      None => Line::from(Span::styled(" loading...", Style::default().fg(Color::DarkGray))),
    };
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rows_len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, rows_len);

    let filter_tag = match self.status {
      Some(s) => format!(" [{}]", s.label()),
      None => String::new(),
    };
    let mut title = match (self.query.is_loading(), self.query.error()) {
      (true, _) => format!(" Orders{} (loading...) ", filter_tag),
      (_, Some(err)) => format!(
        " Orders{} (error: {}) ",
        filter_tag,
        truncate(&err.to_string(), 40)
      ),
      _ => format!(" Orders{} ({}) ", filter_tag, rows_len),
    };
    if !self.filters.search.is_empty() {
      title.push_str(&format!("/{} ", self.filters.search));
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows_len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load orders. Press 'r' to retry."
      } else {
        "No orders found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .visible()
      .iter()
      .map(|order| {
        let number = order
          .order_number
          .clone()
          .unwrap_or_else(|| format!("#{}", order.id));
        let line = Line::from(vec![
          Span::styled(format!("{:<14}", number), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("{:<11}", order.status.label()),
            Style::default().fg(status_color(order.status)),
          ),
          Span::raw(format!("{:>12}  ", money(order.total_amount))),
          Span::styled(date(order.created_at), Style::default().fg(Color::DarkGray)),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_notice(&self, frame: &mut Frame, area: Rect) {
    let Some((message, is_error)) = &self.notice else {
      return;
    };
    let style = if *is_error {
      Style::default().fg(Color::Red)
    } else {
      Style::default().fg(Color::Green)
    };
    frame.render_widget(
      Paragraph::new(Line::from(Span::styled(format!(" {}", message), style))),
      area,
    );
  }
}

impl View for OrdersView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(term)) => {
        self.filters.search = term;
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(status)) => {
        self.set_status(status);
        return ViewAction::None;
      }
      KeyResult::Event(PickerEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        if let Some(id) = self.pending_cancel.take() {
          self.notice = None;
          self.cancel.mutate(id);
        }
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending_cancel = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('f') | KeyCode::Char('s') => self.open_picker(),
      KeyCode::Enter => {
        if let Some(order) = self.selected() {
          let number = order
            .order_number
            .clone()
            .unwrap_or_else(|| format!("#{}", order.id));
          return ViewAction::Push(Box::new(OrderDetailView::new(
            self.ctx.clone(),
            order.id,
            number,
          )));
        }
      }
      KeyCode::Char('x') => {
        let target = self.selected().map(|order| {
          let number = order
            .order_number
            .clone()
            .unwrap_or_else(|| format!("#{}", order.id));
          (order.id, number, order.status.is_open())
        });
        if let Some((id, number, open)) = target {
          if open {
            self.pending_cancel = Some(id);
            self.confirm.show(format!("Cancel order {}?", number));
          } else {
            self.notice = Some(("Order is already closed".into(), true));
          }
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    if self.cancel.poll() {
      match self.cancel.state() {
        MutationState::Success(_) => self.notice = Some(("Order cancelled".into(), false)),
        MutationState::Error(err) => {
          self.notice = Some((format!("Cancel failed: {}", err), true));
        }
        _ => {}
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
      ])
      .split(area);

    self.render_summary(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
    self.render_notice(frame, chunks[2]);
    self.search.render_overlay(frame, chunks[1]);
    self.picker.render_overlay(frame, chunks[1]);
    self.confirm.render_overlay(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    match self.status {
      Some(status) => format!("Orders [{}]", status.label()),
      None => "Orders".to_string(),
    }
  }

  fn wants_input(&self) -> bool {
    self.search.is_active() || self.picker.is_active() || self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("/", "search"),
      ShortcutInfo::new("f", "filter"),
      ShortcutInfo::new("Enter", "detail"),
      ShortcutInfo::new("x", "cancel order"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
