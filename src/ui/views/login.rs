use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::api::types::User;
use crate::app::Ctx;
use crate::store::{Mutation, MutationState};
use crate::ui::components::{Form, FormEvent, FormField, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::DashboardView;

/// Username/password form shown when no session token is configured.
pub struct LoginView {
  ctx: Ctx,
  form: Form,
  login: Mutation<(String, String), User>,
  error: Option<String>,
}

impl LoginView {
  pub fn new(ctx: Ctx) -> Self {
    let auth = ctx.auth.clone();
    let login = Mutation::new(&ctx.store, &[], move |(username, password)| {
      let auth = auth.clone();
      async move { auth.login(username, password).await }
    });

    Self {
      ctx,
      form: Form::new(vec![
        FormField::new("username", "Username"),
        FormField::new("password", "Password").secret(),
      ]),
      login,
      error: None,
    }
  }

  fn submit(&mut self) {
    let username = self.form.value("username");
    let password = self.form.value("password");
    if username.trim().is_empty() || password.is_empty() {
      self.error = Some("Username and password are required".into());
      return;
    }
    self.error = None;
    self.login.mutate((username, password));
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.login.is_running() {
      return ViewAction::None;
    }
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => self.submit(),
      KeyResult::Event(FormEvent::Cancelled) => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    if self.login.poll() {
      match self.login.state() {
        MutationState::Success(_) => {
          return ViewAction::Replace(Box::new(DashboardView::new(self.ctx.clone())));
        }
        MutationState::Error(err) => {
          self.error = Some(if err.status() == Some(401) {
            "Invalid username or password".to_string()
          } else {
            err.to_string()
          });
        }
        _ => {}
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = (area.width * 50 / 100).clamp(40, 60);
    let height = 8;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let box_area = Rect::new(x, y, width, height.min(area.height));

    let block = Block::default()
      .title(" barista — sign in ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(box_area);
    frame.render_widget(block, box_area);

    if inner.height < 3 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(self.form.height()),
        Constraint::Length(1),
        Constraint::Min(0),
      ])
      .split(inner);

    self.form.render(frame, chunks[0]);

    let status = if self.login.is_running() {
      Line::from(Span::styled(
        "Signing in...",
        Style::default().fg(Color::Yellow),
      ))
    } else if let Some(error) = &self.error {
      Line::from(Span::styled(
        error.clone(),
        Style::default().fg(Color::Red),
      ))
    } else {
      Line::from(Span::styled(
        format!("Server: {}", self.ctx.config.server.url),
        Style::default().fg(Color::DarkGray),
      ))
    };
    frame.render_widget(Paragraph::new(status), chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Login".to_string()
  }

  fn wants_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Enter", "next/submit"),
      ShortcutInfo::new("Esc", "quit"),
    ]
  }
}
