//! Small formatting helpers shared by the views.

use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

use crate::api::types::{OrderStatus, UserRole};

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
  }
}

pub fn money(amount: f64) -> String {
  format!("{:.2} ₽", amount)
}

pub fn date(ts: DateTime<Utc>) -> String {
  ts.format("%Y-%m-%d").to_string()
}

pub fn active_label(is_active: bool) -> &'static str {
  if is_active {
    "active"
  } else {
    "inactive"
  }
}

pub fn status_color(status: OrderStatus) -> Color {
  match status {
    OrderStatus::Pending => Color::Yellow,
    OrderStatus::Confirmed | OrderStatus::Preparing => Color::Cyan,
    OrderStatus::Ready => Color::Green,
    OrderStatus::Completed => Color::DarkGray,
    OrderStatus::Cancelled => Color::Red,
  }
}

pub fn role_color(role: UserRole) -> Color {
  match role {
    UserRole::Admin => Color::Red,
    UserRole::Manager => Color::Yellow,
    UserRole::Employee => Color::Cyan,
    UserRole::Customer => Color::White,
  }
}

/// Stock badge for product rows. The low threshold comes from config; the
/// other bands match what the storefront admin showed.
pub fn stock_label(stock: i64, low_threshold: i64) -> (&'static str, Color) {
  if stock == 0 {
    ("out", Color::Red)
  } else if stock < low_threshold {
    ("low", Color::Yellow)
  } else if stock < 50 {
    ("mid", Color::Cyan)
  } else {
    ("ok", Color::Green)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("latte", 10), "latte");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_stock_label_bands() {
    assert_eq!(stock_label(0, 10).0, "out");
    assert_eq!(stock_label(3, 10).0, "low");
    assert_eq!(stock_label(20, 10).0, "mid");
    assert_eq!(stock_label(80, 10).0, "ok");
  }

  #[test]
  fn test_stock_label_threshold_is_configurable() {
    assert_eq!(stock_label(15, 20).0, "low");
    assert_eq!(stock_label(15, 10).0, "mid");
  }
}
