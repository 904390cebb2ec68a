pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use crate::app::{App, Mode};

/// Keep a list selection inside the bounds of the (possibly re-filtered)
/// row set.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    _ => {}
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[0]);
  }

  draw_status_bar(frame, chunks[1], app);

  if matches!(app.mode(), Mode::Command) {
    draw_command_overlay(frame, chunks[0], app);
  }
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let mut spans = vec![Span::raw(" ")];

  let breadcrumb = app.view_breadcrumb();
  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }
    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  spans.push(Span::raw("  "));
  if let Some(view) = app.current_view() {
    let hints: Vec<String> = view
      .shortcuts()
      .iter()
      .map(|s| format!("{}:{}", s.key, s.label))
      .collect();
    spans.push(Span::styled(
      hints.join("  "),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Command palette anchored above the status bar, k9s style:
/// the typed input plus scored autocomplete suggestions.
fn draw_command_overlay(frame: &mut Frame, area: Rect, app: &App) {
  let suggestions = app.autocomplete_suggestions();
  let rows = (suggestions.len() as u16).clamp(1, 8);
  let height = rows + 3; // input line + borders
  let width = (area.width * 50 / 100).clamp(30, 60);

  let y = area.y + area.height.saturating_sub(height);
  let overlay = Rect::new(area.x + 1, y, width, height);

  frame.render_widget(Clear, overlay);

  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Yellow))
    .title(" Command ");
  let inner = block.inner(overlay);
  frame.render_widget(block, overlay);

  if inner.height == 0 {
    return;
  }

  let input_line = Line::from(vec![
    Span::styled(":", Style::default().fg(Color::Yellow)),
    Span::raw(app.command_input().to_string()),
    Span::styled("_", Style::default().fg(Color::Yellow)),
  ]);
  let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
  frame.render_widget(Paragraph::new(input_line), input_area);

  if inner.height <= 1 {
    return;
  }

  let items: Vec<ListItem> = suggestions
    .iter()
    .map(|cmd| {
      ListItem::new(Line::from(vec![
        Span::styled(format!("{:<12}", cmd.name), Style::default().fg(Color::Cyan)),
        Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
      ]))
    })
    .collect();

  let list =
    List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
  let list_area = Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1);
  let mut state = ListState::default();
  if !suggestions.is_empty() {
    state.select(Some(app.selected_suggestion().min(suggestions.len() - 1)));
  }
  frame.render_stateful_widget(list, list_area, &mut state);
}
