use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::api::types::{Paginated, User, UserRole};
use crate::app::Ctx;
use crate::listing::{derive, Filters};
use crate::queries;
use crate::store::{Mutation, MutationState, Query};
use crate::ui::components::{KeyResult, Picker, PickerEvent, SearchEvent, SearchInput};
use crate::ui::renderfns::{active_label, role_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::ensure_valid_selection;

/// User account list: activate/deactivate and role changes.
pub struct UsersView {
  query: Query<Paginated<User>>,
  search: SearchInput,
  filters: Filters,
  list_state: ListState,
  toggle: Mutation<u64, User>,
  change_role: Mutation<(u64, UserRole), User>,
  role_picker: Picker<UserRole>,
  role_target: Option<u64>,
  notice: Option<(String, bool)>,
}

impl UsersView {
  pub fn new(ctx: Ctx) -> Self {
    let query = queries::users(&ctx.store, &ctx.api, 1, ctx.config.ui.page_size);
    let toggle = queries::toggle_user_status(&ctx.store, &ctx.api);
    let change_role = queries::change_user_role(&ctx.store, &ctx.api);
    Self {
      query,
      search: SearchInput::new(),
      filters: Filters::default(),
      list_state: ListState::default(),
      toggle,
      change_role,
      role_picker: Picker::new(),
      role_target: None,
      notice: None,
    }
  }

  fn visible(&self) -> Vec<&User> {
    let items = self
      .query
      .data()
      .map(|page| page.data.as_slice())
      .unwrap_or(&[]);
    derive(items, &self.filters, None)
  }

  fn selected(&self) -> Option<&User> {
    let rows = self.visible();
    self.list_state.selected().and_then(|i| rows.get(i).copied())
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rows_len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, rows_len);

    let mut title = match (self.query.is_loading(), self.query.error()) {
      (true, _) => " Users (loading...) ".to_string(),
      (_, Some(err)) => format!(" Users (error: {}) ", truncate(&err.to_string(), 40)),
      _ => format!(" Users ({}) ", rows_len),
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
        "Failed to load users. Press 'r' to retry."
      } else {
        "No users match the search."
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
      .map(|user| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<18}", truncate(&user.username, 18)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!("{:<28}", truncate(&user.email, 28))),
          Span::styled(
            format!("{:<10}", user.role.label()),
            Style::default().fg(role_color(user.role)),
          ),
          Span::styled(
            active_label(user.is_active),
            if user.is_active {
              Style::default().fg(Color::Green)
            } else {
              Style::default().fg(Color::DarkGray)
            },
          ),
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

impl View for UsersView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(term)) => {
        self.filters.search = term;
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.role_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(role)) => {
        if let Some(id) = self.role_target.take() {
          self.notice = None;
          self.change_role.mutate((id, role));
        }
        return ViewAction::None;
      }
      KeyResult::Event(PickerEvent::Cancelled) => {
        self.role_target = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('t') => {
        if let Some(id) = self.selected().map(|u| u.id) {
          self.notice = None;
          self.toggle.mutate(id);
        }
      }
      KeyCode::Char('R') => {
        let target = self
          .selected()
          .map(|user| (user.id, user.username.clone(), user.role));
        if let Some((id, username, role)) = target {
          let current = UserRole::ALL.iter().position(|r| *r == role).unwrap_or(0);
          self.role_target = Some(id);
          let options: Vec<(String, UserRole)> = UserRole::ALL
            .iter()
            .map(|r| (r.label().to_string(), *r))
            .collect();
          self
            .role_picker
            .show(format!("Role for {}", username), options, current);
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    if self.toggle.poll() {
      match self.toggle.state() {
        MutationState::Success(user) => {
          self.notice = Some((
            format!("{} is now {}", user.username, active_label(user.is_active)),
            false,
          ));
        }
        MutationState::Error(err) => {
          self.notice = Some((format!("Toggle failed: {}", err), true));
        }
        _ => {}
      }
    }
    if self.change_role.poll() {
      match self.change_role.state() {
        MutationState::Success(user) => {
          self.notice = Some((
            format!("{} is now {}", user.username, user.role.label()),
            false,
          ));
        }
        MutationState::Error(err) => {
          self.notice = Some((format!("Role change failed: {}", err), true));
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
    self.role_picker.render_overlay(frame, chunks[0]);
  }

  fn breadcrumb_label(&self) -> String {
    "Users".to_string()
  }

  fn wants_input(&self) -> bool {
    self.search.is_active() || self.role_picker.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("/", "search"),
      ShortcutInfo::new("t", "toggle active"),
      ShortcutInfo::new("R", "change role"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
