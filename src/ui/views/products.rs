use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::api::types::{Paginated, Product};
use crate::app::Ctx;
use crate::listing::{derive, Filters};
use crate::queries;
use crate::store::{Mutation, MutationState, Query};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult, SearchEvent, SearchInput};
use crate::ui::renderfns::{money, stock_label, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{ProductDetailView, ProductFormView};
use crate::ui::ensure_valid_selection;

/// Product catalog list with stock badges and a summary line.
pub struct ProductsView {
  ctx: Ctx,
  query: Query<Paginated<Product>>,
  search: SearchInput,
  filters: Filters,
  list_state: ListState,
  delete: Mutation<u64, ()>,
  confirm: ConfirmDialog,
  pending_delete: Option<u64>,
  notice: Option<(String, bool)>,
}

impl ProductsView {
  pub fn new(ctx: Ctx) -> Self {
    let query = queries::products(&ctx.store, &ctx.api, 1, ctx.config.ui.page_size);
    let delete = queries::delete_product(&ctx.store, &ctx.api);
    Self {
      ctx,
      query,
      search: SearchInput::new(),
      filters: Filters::default(),
      list_state: ListState::default(),
      delete,
      confirm: ConfirmDialog::new(),
      pending_delete: None,
      notice: None,
    }
  }

  fn visible(&self) -> Vec<&Product> {
    let items = self
      .query
      .data()
      .map(|page| page.data.as_slice())
      .unwrap_or(&[]);
    derive(items, &self.filters, None)
  }

  fn selected(&self) -> Option<&Product> {
    let rows = self.visible();
    self.list_state.selected().and_then(|i| rows.get(i).copied())
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let line = match self.query.data() {
      Some(page) => {
        let threshold = self.ctx.config.ui.low_stock_threshold;
        let active = page.data.iter().filter(|p| p.is_active).count();
        let promoted = page.data.iter().filter(|p| p.is_promoted).count();
        let low = page.data.iter().filter(|p| p.stock < threshold).count();
        Line::from(vec![
          Span::raw(format!(" {} products", page.data.len())),
          Span::styled(format!("  {} active", active), Style::default().fg(Color::Green)),
          Span::styled(
            format!("  {} promoted", promoted),
            Style::default().fg(Color::Magenta),
          ),
          Span::styled(format!("  {} low stock", low), Style::default().fg(Color::Yellow)),
        ])
      }
      None => Line::from(Span::styled(" loading...", Style::default().fg(Color::DarkGray))),
    };
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rows_len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, rows_len);

    let mut title = match (self.query.is_loading(), self.query.error()) {
      (true, _) => " Products (loading...) ".to_string(),
      (_, Some(err)) => format!(" Products (error: {}) ", truncate(&err.to_string(), 40)),
      _ => format!(" Products ({}) ", rows_len),
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
        "Failed to load products. Press 'r' to retry."
      } else if self.filters.search.is_empty() {
        "No products yet. Press 'c' to create one."
      } else {
        "No products match the search."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let threshold = self.ctx.config.ui.low_stock_threshold;
    let items: Vec<ListItem> = self
      .visible()
      .iter()
      .map(|product| {
        let (stock_tag, stock_color) = stock_label(product.stock, threshold);
        let mut spans = vec![
          Span::styled(
            format!("{:<24}", truncate(&product.name, 24)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<16}", truncate(&product.sku, 16)),
            Style::default().fg(Color::White),
          ),
          Span::raw(format!("{:>12}  ", money(product.price))),
          Span::styled(
            format!("{:>4} {:<4}", product.stock, stock_tag),
            Style::default().fg(stock_color),
          ),
        ];
        if product.is_promoted {
          spans.push(Span::styled(" promo", Style::default().fg(Color::Magenta)));
        }
        if !product.is_active {
          spans.push(Span::styled(" inactive", Style::default().fg(Color::DarkGray)));
        }
        ListItem::new(Line::from(spans))
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

impl View for ProductsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(term)) => {
        self.filters.search = term;
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        if let Some(id) = self.pending_delete.take() {
          self.notice = None;
          self.delete.mutate(id);
        }
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending_delete = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Enter => {
        if let Some(product) = self.selected() {
          return ViewAction::Push(Box::new(ProductDetailView::new(
            self.ctx.clone(),
            product.id,
            product.name.clone(),
          )));
        }
      }
      KeyCode::Char('c') => {
        return ViewAction::Push(Box::new(ProductFormView::create(self.ctx.clone())));
      }
      KeyCode::Char('e') => {
        if let Some(product) = self.selected().cloned() {
          return ViewAction::Push(Box::new(ProductFormView::edit(self.ctx.clone(), product)));
        }
      }
      KeyCode::Char('d') => {
        if let Some((id, name)) = self.selected().map(|p| (p.id, p.name.clone())) {
          self.pending_delete = Some(id);
          self.confirm.show(format!("Delete product \"{}\"?", name));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    if self.delete.poll() {
      match self.delete.state() {
        MutationState::Success(_) => self.notice = Some(("Product deleted".into(), false)),
        MutationState::Error(err) => {
          self.notice = Some((format!("Delete failed: {}", err), true));
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
    self.confirm.render_overlay(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Products".to_string()
  }

  fn wants_input(&self) -> bool {
    self.search.is_active() || self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("/", "search"),
      ShortcutInfo::new("Enter", "detail"),
      ShortcutInfo::new("c", "create"),
      ShortcutInfo::new("e", "edit"),
      ShortcutInfo::new("d", "delete"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
