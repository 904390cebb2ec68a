use crate::api::ApiClient;
use crate::auth::AuthService;
use crate::commands::{self, Command};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::store::{CacheStore, SystemClock};
use crate::ui;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{
  ApiKeysView, CategoriesView, DashboardView, LoginView, OrdersView, ProductsView, UsersView,
};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

/// Everything a view needs to talk to the backend: the shared cache store,
/// the API client and the auth service. Cheap to clone.
#[derive(Clone)]
pub struct Ctx {
  pub store: CacheStore,
  pub api: ApiClient,
  pub auth: AuthService,
  pub config: Config,
}

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
}

/// Main application state
pub struct App {
  ctx: Ctx,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let store = CacheStore::new(
      Arc::new(SystemClock),
      config.stale_after(),
      config.expire_after(),
    );
    let api = ApiClient::new(&config)?;
    let auth = AuthService::new(api.clone(), store.clone());
    let ctx = Ctx {
      store,
      api,
      auth,
      config,
    };

    // With a token in the environment we go straight to the dashboard;
    // otherwise the session starts at the login form.
    let root: Box<dyn View> = if ctx.api.has_token() {
      Box::new(DashboardView::new(ctx.clone()))
    } else {
      Box::new(LoginView::new(ctx.clone()))
    };

    Ok(Self {
      ctx,
      view_stack: vec![root],
      mode: Mode::Normal,
      command_input: String::new(),
      selected_suggestion: 0,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize => {} // Redraw happens on the next loop iteration
      Event::Tick => {
        self.ctx.store.sweep();
        let action = match self.view_stack.last_mut() {
          Some(view) => view.tick(),
          None => ViewAction::None,
        };
        self.apply_action(action);
      }
    }
  }

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.mode {
      Mode::Command => self.handle_command_mode_key(key),
      Mode::Normal => {
        let capturing = self
          .view_stack
          .last()
          .map(|v| v.wants_input())
          .unwrap_or(false);

        if !capturing && key.code == KeyCode::Char(':') {
          self.mode = Mode::Command;
          self.command_input.clear();
          self.selected_suggestion = 0;
          return;
        }

        let action = match self.view_stack.last_mut() {
          Some(view) => view.handle_key(key),
          None => ViewAction::None,
        };
        self.apply_action(action);
      }
    }
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Replace(view) => {
        if let Some(top) = self.view_stack.last_mut() {
          *top = view;
        }
      }
    }
  }

  fn handle_command_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0;
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0;
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    let suggestions = commands::get_suggestions(&self.command_input);
    let cmd = if !suggestions.is_empty() && self.selected_suggestion < suggestions.len() {
      suggestions[self.selected_suggestion].name.to_string()
    } else {
      self.command_input.trim().to_lowercase()
    };

    // Navigation commands only work with a session; before login the root
    // stays on the login form.
    let has_session = self.ctx.api.has_token();
    let root: Option<Box<dyn View>> = match cmd.as_str() {
      "dashboard" if has_session => Some(Box::new(DashboardView::new(self.ctx.clone()))),
      "products" if has_session => Some(Box::new(ProductsView::new(self.ctx.clone()))),
      "categories" if has_session => Some(Box::new(CategoriesView::new(self.ctx.clone()))),
      "orders" if has_session => Some(Box::new(OrdersView::new(self.ctx.clone()))),
      "users" if has_session => Some(Box::new(UsersView::new(self.ctx.clone()))),
      "keys" if has_session => Some(Box::new(ApiKeysView::new(self.ctx.clone()))),
      "quit" => {
        self.should_quit = true;
        None
      }
      _ => None,
    };

    if let Some(view) = root {
      self.view_stack.clear();
      self.view_stack.push(view);
    }
    self.command_input.clear();
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self.view_stack.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}
