use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::api::types::{slugify, Category, CreateCategory, FieldErrors, UpdateCategory};
use crate::app::Ctx;
use crate::queries;
use crate::store::Mutation;
use crate::ui::components::{Form, FormEvent, FormField, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

enum FormAction {
  Create(Mutation<CreateCategory, Category>),
  Update(Mutation<UpdateCategory, Category>),
}

/// Create/edit form for one category.
///
/// Field values are converted into the typed create command and validated
/// before anything touches the network; a failed submit leaves the form
/// exactly as the user typed it.
pub struct CategoryFormView {
  form: Form,
  action: FormAction,
  editing: Option<String>,
  error: Option<String>,
}

impl CategoryFormView {
  pub fn create(ctx: Ctx) -> Self {
    Self {
      form: Form::new(vec![
        FormField::new("name", "Name"),
        FormField::new("slug", "Slug"),
        FormField::new("description", "Description"),
        FormField::with_value("display_order", "Display order", "0"),
      ]),
      action: FormAction::Create(queries::create_category(&ctx.store, &ctx.api)),
      editing: None,
      error: None,
    }
  }

  pub fn edit(ctx: Ctx, category: Category) -> Self {
    Self {
      form: Form::new(vec![
        FormField::with_value("name", "Name", &category.name),
        FormField::with_value("slug", "Slug", &category.slug),
        FormField::with_value(
          "description",
          "Description",
          category.description.as_deref().unwrap_or(""),
        ),
        FormField::with_value(
          "display_order",
          "Display order",
          &category.display_order.to_string(),
        ),
      ]),
      action: FormAction::Update(queries::update_category(&ctx.store, &ctx.api, category.id)),
      editing: Some(category.name),
      error: None,
    }
  }

  fn is_running(&self) -> bool {
    match &self.action {
      FormAction::Create(m) => m.is_running(),
      FormAction::Update(m) => m.is_running(),
    }
  }

  /// Build the typed command from the form, auto-filling the slug from the
  /// name when it was left empty.
  fn command(&mut self) -> Result<CreateCategory, FieldErrors> {
    let name = self.form.value("name");
    let mut slug = self.form.value("slug");
    if slug.trim().is_empty() && !name.trim().is_empty() {
      slug = slugify(&name);
      self.form.set_value("slug", &slug);
    }

    let mut errors = FieldErrors::new();
    let display_order = match self.form.value("display_order").trim().parse::<i64>() {
      Ok(n) => n,
      Err(_) => {
        errors.insert("display_order", "Must be a whole number".into());
        0
      }
    };

    let description = self.form.value("description");
    let command = CreateCategory {
      name,
      slug,
      description: if description.trim().is_empty() {
        None
      } else {
        Some(description)
      },
      display_order,
      is_active: true,
    };

    errors.extend(command.validate());
    if errors.is_empty() {
      Ok(command)
    } else {
      Err(errors)
    }
  }

  fn submit(&mut self) {
    match self.command() {
      Ok(command) => {
        self.form.clear_errors();
        self.error = None;
        match &mut self.action {
          FormAction::Create(mutation) => mutation.mutate(command),
          FormAction::Update(mutation) => mutation.mutate(UpdateCategory {
            name: Some(command.name),
            slug: Some(command.slug),
            description: command.description,
            display_order: Some(command.display_order),
            is_active: None,
          }),
        }
      }
      Err(errors) => self.form.set_errors(errors),
    }
  }
}

impl View for CategoryFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.is_running() {
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
    let (changed, error) = match &mut self.action {
      FormAction::Create(m) => (m.poll(), m.error().map(|e| e.to_string())),
      FormAction::Update(m) => (m.poll(), m.error().map(|e| e.to_string())),
    };
    if changed {
      let succeeded = match &self.action {
        FormAction::Create(m) => m.is_success(),
        FormAction::Update(m) => m.is_success(),
      };
      if succeeded {
        // The collection was invalidated on success; the list behind us
        // is already refetching.
        return ViewAction::Pop;
      }
      self.error = error.map(|e| format!("Save failed: {}", e));
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = match &self.editing {
      Some(name) => format!(" Edit category — {} ", name),
      None => " New category ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 2 {
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

    let status = if self.is_running() {
      Line::from(Span::styled("Saving...", Style::default().fg(Color::Yellow)))
    } else if let Some(error) = &self.error {
      Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red)))
    } else {
      Line::from(Span::styled(
        "Enter: next field / submit on last  Esc: cancel",
        Style::default().fg(Color::DarkGray),
      ))
    };
    frame.render_widget(Paragraph::new(status), chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.editing {
      Some(name) => format!("Edit {}", name),
      None => "New category".to_string(),
    }
  }

  fn wants_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Enter", "next/submit"),
      ShortcutInfo::new("Esc", "cancel"),
    ]
  }
}
