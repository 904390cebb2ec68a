use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::api::types::{CreateProduct, FieldErrors, Product, UpdateProduct};
use crate::app::Ctx;
use crate::queries;
use crate::store::Mutation;
use crate::ui::components::{Form, FormEvent, FormField, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

enum FormAction {
  Create(Mutation<CreateProduct, Product>),
  Update(Mutation<UpdateProduct, Product>),
}

/// Create/edit form for one product.
pub struct ProductFormView {
  form: Form,
  action: FormAction,
  editing: Option<String>,
  error: Option<String>,
}

impl ProductFormView {
  pub fn create(ctx: Ctx) -> Self {
    Self {
      form: Form::new(vec![
        FormField::new("name", "Name"),
        FormField::new("sku", "SKU"),
        FormField::new("description", "Description"),
        FormField::new("price", "Price"),
        FormField::with_value("stock", "Stock", "0"),
        FormField::new("volume_ml", "Volume (ml)"),
        FormField::new("category_id", "Category id"),
      ]),
      action: FormAction::Create(queries::create_product(&ctx.store, &ctx.api)),
      editing: None,
      error: None,
    }
  }

  pub fn edit(ctx: Ctx, product: Product) -> Self {
    let volume = product
      .volume_ml
      .map(|v| v.to_string())
      .unwrap_or_default();
    Self {
      form: Form::new(vec![
        FormField::with_value("name", "Name", &product.name),
        FormField::with_value("sku", "SKU", &product.sku),
        FormField::with_value("description", "Description", &product.description),
        FormField::with_value("price", "Price", &format!("{}", product.price)),
        FormField::with_value("stock", "Stock", &product.stock.to_string()),
        FormField::with_value("volume_ml", "Volume (ml)", &volume),
        FormField::with_value("category_id", "Category id", &product.category_id.to_string()),
      ]),
      action: FormAction::Update(queries::update_product(&ctx.store, &ctx.api, product.id)),
      editing: Some(product.name),
      error: None,
    }
  }

  fn is_running(&self) -> bool {
    match &self.action {
      FormAction::Create(m) => m.is_running(),
      FormAction::Update(m) => m.is_running(),
    }
  }

  fn command(&mut self) -> Result<CreateProduct, FieldErrors> {
    let mut errors = FieldErrors::new();

    let price = match self.form.value("price").trim().parse::<f64>() {
      Ok(p) => p,
      Err(_) => {
        errors.insert("price", "Must be a number".into());
        0.0
      }
    };
    let stock = match self.form.value("stock").trim().parse::<i64>() {
      Ok(s) => s,
      Err(_) => {
        errors.insert("stock", "Must be a whole number".into());
        0
      }
    };
    let volume_raw = self.form.value("volume_ml");
    let volume_ml = if volume_raw.trim().is_empty() {
      None
    } else {
      match volume_raw.trim().parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
          errors.insert("volume_ml", "Must be a whole number".into());
          None
        }
      }
    };
    let category_id = match self.form.value("category_id").trim().parse::<u64>() {
      Ok(id) => id,
      Err(_) => {
        errors.insert("category_id", "Must be a category id".into());
        0
      }
    };

    let command = CreateProduct {
      name: self.form.value("name"),
      description: self.form.value("description"),
      sku: self.form.value("sku"),
      price,
      stock,
      volume_ml,
      category_id,
      is_promoted: false,
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
          FormAction::Update(mutation) => mutation.mutate(UpdateProduct {
            name: Some(command.name),
            description: Some(command.description),
            sku: Some(command.sku),
            price: Some(command.price),
            stock: Some(command.stock),
            volume_ml: command.volume_ml,
            category_id: Some(command.category_id),
            is_active: None,
            is_promoted: None,
          }),
        }
      }
      Err(errors) => self.form.set_errors(errors),
    }
  }
}

impl View for ProductFormView {
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
        return ViewAction::Pop;
      }
      self.error = error.map(|e| format!("Save failed: {}", e));
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = match &self.editing {
      Some(name) => format!(" Edit product — {} ", name),
      None => " New product ".to_string(),
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
      None => "New product".to_string(),
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
