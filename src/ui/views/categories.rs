use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::api::types::{Category, Paginated};
use crate::app::Ctx;
use crate::listing::{derive, Filters};
use crate::queries;
use crate::store::{Mutation, MutationState, Query};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult, SearchEvent, SearchInput};
use crate::ui::renderfns::{active_label, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::CategoryFormView;
use crate::ui::ensure_valid_selection;

/// Category list, sorted by display order.
pub struct CategoriesView {
  ctx: Ctx,
  query: Query<Paginated<Category>>,
  search: SearchInput,
  filters: Filters,
  list_state: ListState,
  delete: Mutation<u64, ()>,
  confirm: ConfirmDialog,
  pending_delete: Option<u64>,
  notice: Option<(String, bool)>,
}

impl CategoriesView {
  pub fn new(ctx: Ctx) -> Self {
    let query = queries::categories(&ctx.store, &ctx.api, 1, ctx.config.ui.page_size);
    let delete = queries::delete_category(&ctx.store, &ctx.api);
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

  fn visible(&self) -> Vec<&Category> {
    let items = self
      .query
      .data()
      .map(|page| page.data.as_slice())
      .unwrap_or(&[]);
    derive(items, &self.filters, Some(|c: &Category| c.display_order))
  }

  fn selected(&self) -> Option<&Category> {
    let rows = self.visible();
    self.list_state.selected().and_then(|i| rows.get(i).copied())
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rows_len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, rows_len);

    let mut title = match (self.query.is_loading(), self.query.error()) {
      (true, _) => " Categories (loading...) ".to_string(),
      (_, Some(err)) => format!(" Categories (error: {}) ", truncate(&err.to_string(), 40)),
      _ => format!(" Categories ({}) ", rows_len),
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
        "Failed to load categories. Press 'r' to retry."
      } else if self.filters.search.is_empty() {
        "No categories yet. Press 'c' to create one."
      } else {
        "No categories match the search."
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
      .map(|category| {
        let description = category.description.as_deref().unwrap_or("");
        let line = Line::from(vec![
          Span::styled(
            format!("{:>3} ", category.display_order),
            Style::default().fg(Color::DarkGray),
          ),
          Span::styled(
            format!("{:<20}", truncate(&category.name, 20)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<20}", truncate(&category.slug, 20)),
            Style::default().fg(Color::White),
          ),
          Span::styled(
            format!("{:<9}", active_label(category.is_active)),
            if category.is_active {
              Style::default().fg(Color::Green)
            } else {
              Style::default().fg(Color::DarkGray)
            },
          ),
          Span::raw(truncate(description, 40)),
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
    let line = Line::from(Span::styled(format!(" {}", message), style));
    frame.render_widget(Paragraph::new(line), area);
  }
}

impl View for CategoriesView {
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
      KeyCode::Char('c') => {
        return ViewAction::Push(Box::new(CategoryFormView::create(self.ctx.clone())));
      }
      KeyCode::Char('e') => {
        if let Some(category) = self.selected().cloned() {
          return ViewAction::Push(Box::new(CategoryFormView::edit(self.ctx.clone(), category)));
        }
      }
      KeyCode::Char('d') => {
        if let Some((id, name)) = self.selected().map(|c| (c.id, c.name.clone())) {
          self.pending_delete = Some(id);
          self.confirm.show(format!("Delete category \"{}\"?", name));
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
        MutationState::Success(_) => {
          self.notice = Some(("Category deleted".into(), false));
        }
        // A 409 here means the category still has products; the cached
        // list is untouched and we stay right where we are.
        MutationState::Error(err) => {
          let message = if err.status() == Some(409) {
            "Cannot delete: category still has products".to_string()
          } else {
            format!("Delete failed: {}", err)
          };
          self.notice = Some((message, true));
        }
        _ => {}
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);

    self.render_list(frame, chunks[0]);
    self.render_notice(frame, chunks[1]);
    self.search.render_overlay(frame, chunks[0]);
    self.confirm.render_overlay(frame, chunks[0]);
  }

  fn breadcrumb_label(&self) -> String {
    "Categories".to_string()
  }

  fn wants_input(&self) -> bool {
    self.search.is_active() || self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("/", "search"),
      ShortcutInfo::new("c", "create"),
      ShortcutInfo::new("e", "edit"),
      ShortcutInfo::new("d", "delete"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
