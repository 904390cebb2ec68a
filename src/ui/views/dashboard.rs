use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use crate::api::types::{Category, Order, OrderStatus, Paginated, Product, User};
use crate::app::Ctx;
use crate::queries;
use crate::store::Query;
use crate::ui::renderfns::{money, status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Shop overview: stat tiles plus the most recent orders.
pub struct DashboardView {
  ctx: Ctx,
  me: Query<User>,
  users: Query<Paginated<User>>,
  products: Query<Paginated<Product>>,
  categories: Query<Paginated<Category>>,
  orders: Query<Paginated<Order>>,
}

impl DashboardView {
  pub fn new(ctx: Ctx) -> Self {
    let limit = ctx.config.ui.page_size;
    Self {
      me: queries::current_user(&ctx.store, &ctx.auth),
      users: queries::users(&ctx.store, &ctx.api, 1, limit),
      products: queries::products(&ctx.store, &ctx.api, 1, limit),
      categories: queries::categories(&ctx.store, &ctx.api, 1, limit),
      orders: queries::orders(&ctx.store, &ctx.api, 1, limit, None),
      ctx,
    }
  }

  fn render_header(&self, frame: &mut Frame, area: Rect) {
    let who = match self.me.data() {
      Some(user) => format!("{} ({})", user.username, user.role.label()),
      None => "...".to_string(),
    };
    let line = Line::from(vec![
      Span::styled(
        format!(" {}", self.ctx.config.server.url),
        Style::default().fg(Color::DarkGray),
      ),
      Span::raw("  "),
      Span::styled(
        format!("signed in as {}", who),
        Style::default().fg(Color::White),
      ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_tile(frame: &mut Frame, area: Rect, title: &str, value: String, subtitle: String) {
    let block = Block::default()
      .title(format!(" {} ", title))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
      Line::from(Span::styled(value, Style::default().bold())),
      Line::from(Span::styled(subtitle, Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn render_tiles(&self, frame: &mut Frame, area: Rect) {
    let columns = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([
        Constraint::Percentage(25),
        Constraint::Percentage(25),
        Constraint::Percentage(25),
        Constraint::Percentage(25),
      ])
      .split(area);

    match self.users.data() {
      Some(page) => {
        let active = page.data.iter().filter(|u| u.is_active).count();
        Self::render_tile(
          frame,
          columns[0],
          "Users",
          page.data.len().to_string(),
          format!("{} active", active),
        );
      }
      None => Self::render_tile(frame, columns[0], "Users", "...".into(), "loading".into()),
    }

    match self.products.data() {
      Some(page) => {
        let threshold = self.ctx.config.ui.low_stock_threshold;
        let active = page.data.iter().filter(|p| p.is_active).count();
        let low = page.data.iter().filter(|p| p.stock < threshold).count();
        Self::render_tile(
          frame,
          columns[1],
          "Products",
          page.data.len().to_string(),
          format!("{} active, {} low stock", active, low),
        );
      }
      None => Self::render_tile(frame, columns[1], "Products", "...".into(), "loading".into()),
    }

    match self.categories.data() {
      Some(page) => {
        let active = page.data.iter().filter(|c| c.is_active).count();
        Self::render_tile(
          frame,
          columns[2],
          "Categories",
          page.data.len().to_string(),
          format!("{} active", active),
        );
      }
      None => Self::render_tile(frame, columns[2], "Categories", "...".into(), "loading".into()),
    }

    match self.orders.data() {
      Some(page) => {
        let pending = page
          .data
          .iter()
          .filter(|o| o.status == OrderStatus::Pending)
          .count();
        let in_progress = page
          .data
          .iter()
          .filter(|o| {
            matches!(o.status, OrderStatus::Confirmed | OrderStatus::Preparing)
          })
          .count();
        Self::render_tile(
          frame,
          columns[3],
          "Orders",
          page.data.len().to_string(),
          format!("{} pending, {} preparing", pending, in_progress),
        );
      }
      None => Self::render_tile(frame, columns[3], "Orders", "...".into(), "loading".into()),
    }
  }

  fn render_recent_orders(&self, frame: &mut Frame, area: Rect) {
    let title = if self.orders.is_loading() {
      " Recent orders (loading...) ".to_string()
    } else if let Some(err) = self.orders.error() {
      format!(" Recent orders (error: {}) ", truncate(&err.to_string(), 40))
    } else {
      " Recent orders ".to_string()
    };

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(page) = self.orders.data() else {
      frame.render_widget(block, area);
      return;
    };

    let items: Vec<ListItem> = page
      .data
      .iter()
      .take(8)
      .map(|order| {
        let number = order
          .order_number
          .clone()
          .unwrap_or_else(|| format!("#{}", order.id));
        let line = Line::from(vec![
          Span::styled(format!("{:<12}", number), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("{:<10}", order.status.label()),
            Style::default().fg(status_color(order.status)),
          ),
          Span::raw(format!("{:>12}", money(order.total_amount))),
        ]);
        ListItem::new(line)
      })
      .collect();

    frame.render_widget(List::new(items).block(block), area);
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.me.refetch();
        self.users.refetch();
        self.products.refetch();
        self.categories.refetch();
        self.orders.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    self.me.poll();
    self.users.poll();
    self.products.poll();
    self.categories.poll();
    self.orders.poll();
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1),
        Constraint::Length(4),
        Constraint::Min(1),
      ])
      .split(area);

    self.render_header(frame, chunks[0]);
    self.render_tiles(frame, chunks[1]);
    self.render_recent_orders(frame, chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    "Dashboard".to_string()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "quit"),
    ]
  }
}
