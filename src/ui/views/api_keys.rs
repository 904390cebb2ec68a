use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use crate::api::types::{ApiKey, CreateApiKey, Paginated};
use crate::app::Ctx;
use crate::listing::{derive, Filters};
use crate::queries;
use crate::store::{Mutation, MutationState, Query};
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, InputResult, KeyResult, SearchEvent, SearchInput, TextInput,
};
use crate::ui::renderfns::{active_label, date, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::ensure_valid_selection;

/// What the confirm dialog is currently guarding.
#[derive(Debug, Clone, Copy)]
enum PendingAction {
  Revoke(u64),
  Delete(u64),
}

/// API key list. Creation shows the full secret exactly once; afterwards
/// the server only ever returns the redacted prefix.
pub struct ApiKeysView {
  query: Query<Paginated<ApiKey>>,
  search: SearchInput,
  filters: Filters,
  list_state: ListState,
  create: Mutation<CreateApiKey, ApiKey>,
  revoke: Mutation<u64, ApiKey>,
  delete: Mutation<u64, ()>,
  confirm: ConfirmDialog,
  pending: Option<PendingAction>,
  name_input: Option<TextInput>,
  created_secret: Option<ApiKey>,
  notice: Option<(String, bool)>,
}

impl ApiKeysView {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      query: queries::api_keys(&ctx.store, &ctx.api),
      search: SearchInput::new(),
      filters: Filters::default(),
      list_state: ListState::default(),
      create: queries::create_api_key(&ctx.store, &ctx.api),
      revoke: queries::revoke_api_key(&ctx.store, &ctx.api),
      delete: queries::delete_api_key(&ctx.store, &ctx.api),
      confirm: ConfirmDialog::new(),
      pending: None,
      name_input: None,
      created_secret: None,
      notice: None,
    }
  }

  fn visible(&self) -> Vec<&ApiKey> {
    let items = self
      .query
      .data()
      .map(|page| page.data.as_slice())
      .unwrap_or(&[]);
    derive(items, &self.filters, None)
  }

  fn selected(&self) -> Option<&ApiKey> {
    let rows = self.visible();
    self.list_state.selected().and_then(|i| rows.get(i).copied())
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rows_len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, rows_len);

    let mut title = match (self.query.is_loading(), self.query.error()) {
      (true, _) => " API keys (loading...) ".to_string(),
      (_, Some(err)) => format!(" API keys (error: {}) ", truncate(&err.to_string(), 40)),
      _ => format!(" API keys ({}) ", rows_len),
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
        "Failed to load API keys. Press 'r' to retry."
      } else {
        "No API keys. Press 'c' to create one."
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
      .map(|api_key| {
        let last_used = api_key
          .last_used_at
          .map(date)
          .unwrap_or_else(|| "never".to_string());
        let line = Line::from(vec![
          Span::styled(
            format!("{:<20}", truncate(&api_key.name, 20)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<20}", truncate(&api_key.key, 20)),
            Style::default().fg(Color::White),
          ),
          Span::styled(
            format!("{:<9}", active_label(api_key.is_active)),
            if api_key.is_active {
              Style::default().fg(Color::Green)
            } else {
              Style::default().fg(Color::DarkGray)
            },
          ),
          Span::styled(
            format!("used {}", last_used),
            Style::default().fg(Color::DarkGray),
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

  fn render_name_input(&self, frame: &mut Frame, area: Rect) {
    let Some(input) = &self.name_input else {
      return;
    };
    let width = (area.width * 50 / 100).clamp(30, 50);
    let overlay = Rect::new(area.x + 1, area.y + 1, width, 3);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" New API key name ");
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let line = Line::from(vec![
      Span::raw(input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
  }

  /// Full-secret overlay, shown exactly once after creation.
  fn render_created_secret(&self, frame: &mut Frame, area: Rect) {
    let Some(created) = &self.created_secret else {
      return;
    };
    let width = (created.key.len() as u16 + 6)
      .min(area.width.saturating_sub(4))
      .max(40);
    let height = 5;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Green))
      .title(format!(" Key created: {} ", created.name));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let lines = vec![
      Line::from(Span::styled(
        created.key.clone(),
        Style::default().fg(Color::Yellow).bold(),
      )),
      Line::from(Span::styled(
        "Copy it now — it will not be shown again. Press any key.",
        Style::default().fg(Color::DarkGray),
      )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
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

impl View for ApiKeysView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // The created-secret overlay swallows the next key press.
    if self.created_secret.is_some() {
      self.created_secret = None;
      self.create.reset();
      return ViewAction::None;
    }

    if let Some(input) = &mut self.name_input {
      match input.handle_key(key) {
        InputResult::Submitted(name) => {
          self.name_input = None;
          let command = CreateApiKey { name };
          if command.validate().is_empty() {
            self.notice = None;
            self.create.mutate(command);
          } else {
            self.notice = Some(("Key name is required".into(), true));
          }
        }
        InputResult::Cancelled => self.name_input = None,
        _ => {}
      }
      return ViewAction::None;
    }

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
        match self.pending.take() {
          Some(PendingAction::Revoke(id)) => {
            self.notice = None;
            self.revoke.mutate(id);
          }
          Some(PendingAction::Delete(id)) => {
            self.notice = None;
            self.delete.mutate(id);
          }
          None => {}
        }
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('c') => self.name_input = Some(TextInput::new()),
      KeyCode::Char('x') => {
        if let Some((id, name)) = self.selected().map(|k| (k.id, k.name.clone())) {
          self.pending = Some(PendingAction::Revoke(id));
          self.confirm.show(format!("Revoke API key \"{}\"?", name));
        }
      }
      KeyCode::Char('d') => {
        if let Some((id, name)) = self.selected().map(|k| (k.id, k.name.clone())) {
          self.pending = Some(PendingAction::Delete(id));
          self.confirm.show(format!("Delete API key \"{}\"?", name));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    if self.create.poll() {
      match self.create.state() {
        MutationState::Success(created) => {
          self.created_secret = Some(created.clone());
        }
        MutationState::Error(err) => {
          self.notice = Some((format!("Create failed: {}", err), true));
        }
        _ => {}
      }
    }
    if self.revoke.poll() {
      match self.revoke.state() {
        MutationState::Success(revoked) => {
          self.notice = Some((format!("Key \"{}\" revoked", revoked.name), false));
        }
        MutationState::Error(err) => {
          self.notice = Some((format!("Revoke failed: {}", err), true));
        }
        _ => {}
      }
    }
    if self.delete.poll() {
      match self.delete.state() {
        MutationState::Success(_) => self.notice = Some(("Key deleted".into(), false)),
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
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);

    self.render_list(frame, chunks[0]);
    self.render_notice(frame, chunks[1]);
    self.search.render_overlay(frame, chunks[0]);
    self.render_name_input(frame, chunks[0]);
    self.confirm.render_overlay(frame, chunks[0]);
    self.render_created_secret(frame, chunks[0]);
  }

  fn breadcrumb_label(&self) -> String {
    "API keys".to_string()
  }

  fn wants_input(&self) -> bool {
    self.search.is_active()
      || self.confirm.is_active()
      || self.name_input.is_some()
      || self.created_secret.is_some()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("/", "search"),
      ShortcutInfo::new("c", "create"),
      ShortcutInfo::new("x", "revoke"),
      ShortcutInfo::new("d", "delete"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
