//! Domain types for the coffee-shop backend API.
//!
//! Entities are serde round-trippable because the cache store holds them as
//! type-erased JSON. Create/Update payloads are separate types: create
//! commands carry required fields, update commands are all-optional patches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Collections
// ============================================================================

/// Paginated collection envelope returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub data: Vec<T>,
  #[serde(default)]
  pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageMeta {
  #[serde(default)]
  pub page: u32,
  #[serde(default)]
  pub limit: u32,
  #[serde(default)]
  pub total: u64,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
  Admin,
  Manager,
  Employee,
  Customer,
}

impl UserRole {
  pub const ALL: &'static [UserRole] = &[
    UserRole::Admin,
    UserRole::Manager,
    UserRole::Employee,
    UserRole::Customer,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      UserRole::Admin => "Admin",
      UserRole::Manager => "Manager",
      UserRole::Employee => "Employee",
      UserRole::Customer => "Customer",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id: u64,
  pub username: String,
  pub email: String,
  pub role: UserRole,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub id: u64,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub display_order: i64,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateCategory {
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub display_order: i64,
  pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCategory {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_order: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
}

// ============================================================================
// Products
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
  pub id: u64,
  pub name: String,
  pub description: String,
  pub sku: String,
  pub price: f64,
  pub stock: i64,
  pub volume_ml: Option<i64>,
  pub category_id: u64,
  pub is_active: bool,
  pub is_promoted: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateProduct {
  pub name: String,
  pub description: String,
  pub sku: String,
  pub price: f64,
  pub stock: i64,
  pub volume_ml: Option<i64>,
  pub category_id: u64,
  pub is_promoted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProduct {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sku: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stock: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub volume_ml: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_promoted: Option<bool>,
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Preparing,
  Ready,
  Completed,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: &'static [OrderStatus] = &[
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
  ];

  /// Wire value, e.g. "PENDING".
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Confirmed => "CONFIRMED",
      OrderStatus::Preparing => "PREPARING",
      OrderStatus::Ready => "READY",
      OrderStatus::Completed => "COMPLETED",
      OrderStatus::Cancelled => "CANCELLED",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "Pending",
      OrderStatus::Confirmed => "Confirmed",
      OrderStatus::Preparing => "Preparing",
      OrderStatus::Ready => "Ready",
      OrderStatus::Completed => "Completed",
      OrderStatus::Cancelled => "Cancelled",
    }
  }

  /// Whether the order can still be cancelled.
  pub fn is_open(&self) -> bool {
    !matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
  pub id: u64,
  pub order_number: Option<String>,
  pub status: OrderStatus,
  pub total_amount: f64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ============================================================================
// API keys
// ============================================================================

/// An API key. List endpoints return a redacted `key` prefix; the full
/// secret appears exactly once, in the creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
  pub id: u64,
  pub name: String,
  pub key: String,
  pub is_active: bool,
  pub last_used_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateApiKey {
  pub name: String,
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
  pub token: String,
  pub user: User,
}

// ============================================================================
// Validation
// ============================================================================

/// Field name → human-readable problem. Empty map means the command is
/// ready to submit; forms block submission while this is non-empty.
pub type FieldErrors = BTreeMap<&'static str, String>;

impl CreateCategory {
  pub fn validate(&self) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if self.name.trim().is_empty() {
      errors.insert("name", "Name is required".into());
    }
    if self.slug.trim().is_empty() {
      errors.insert("slug", "Slug is required".into());
    } else if !is_valid_slug(&self.slug) {
      errors.insert(
        "slug",
        "Slug may only contain lowercase letters, digits and dashes".into(),
      );
    }
    if self.display_order < 0 {
      errors.insert("display_order", "Display order cannot be negative".into());
    }
    errors
  }
}

impl CreateProduct {
  pub fn validate(&self) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if self.name.trim().is_empty() {
      errors.insert("name", "Name is required".into());
    }
    if self.description.trim().is_empty() {
      errors.insert("description", "Description is required".into());
    }
    if self.sku.trim().is_empty() {
      errors.insert("sku", "SKU is required".into());
    }
    if self.price <= 0.0 {
      errors.insert("price", "Price must be greater than 0".into());
    }
    if self.stock < 0 {
      errors.insert("stock", "Stock cannot be negative".into());
    }
    if self.category_id == 0 {
      errors.insert("category_id", "Category is required".into());
    }
    if let Some(volume) = self.volume_ml {
      if volume <= 0 {
        errors.insert("volume_ml", "Volume must be greater than 0".into());
      }
    }
    errors
  }
}

impl CreateApiKey {
  pub fn validate(&self) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if self.name.trim().is_empty() {
      errors.insert("name", "Name is required".into());
    }
    errors
  }
}

fn is_valid_slug(slug: &str) -> bool {
  !slug.is_empty()
    && slug
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Derive a URL slug from a display name, e.g. "Iced Drinks" -> "iced-drinks".
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  let mut prev_dash = true;
  for c in name.chars() {
    if c.is_ascii_alphanumeric() {
      slug.push(c.to_ascii_lowercase());
      prev_dash = false;
    } else if !prev_dash {
      slug.push('-');
      prev_dash = true;
    }
  }
  while slug.ends_with('-') {
    slug.pop();
  }
  slug
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_slugify() {
    assert_eq!(slugify("Iced Drinks"), "iced-drinks");
    assert_eq!(slugify("  Tea & Coffee  "), "tea-coffee");
    assert_eq!(slugify("Espresso"), "espresso");
  }

  #[test]
  fn test_create_category_requires_name_and_slug() {
    let cmd = CreateCategory::default();
    let errors = cmd.validate();
    assert!(errors.contains_key("name"));
    assert!(errors.contains_key("slug"));
  }

  #[test]
  fn test_create_category_rejects_bad_slug() {
    let cmd = CreateCategory {
      name: "Tea".into(),
      slug: "Tea Time".into(),
      ..Default::default()
    };
    let errors = cmd.validate();
    assert!(errors.contains_key("slug"));
  }

  #[test]
  fn test_create_category_valid() {
    let cmd = CreateCategory {
      name: "Tea".into(),
      slug: "tea".into(),
      description: None,
      display_order: 2,
      is_active: true,
    };
    assert!(cmd.validate().is_empty());
  }

  #[test]
  fn test_create_product_validation() {
    let cmd = CreateProduct {
      name: "Cappuccino".into(),
      description: "Classic".into(),
      sku: "COF-CAP-001".into(),
      price: 0.0,
      stock: -1,
      volume_ml: Some(0),
      category_id: 0,
      is_promoted: false,
    };
    let errors = cmd.validate();
    assert!(errors.contains_key("price"));
    assert!(errors.contains_key("stock"));
    assert!(errors.contains_key("volume_ml"));
    assert!(errors.contains_key("category_id"));
    assert!(!errors.contains_key("name"));
  }

  #[test]
  fn test_order_status_wire_roundtrip() {
    let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
    assert_eq!(json, "\"PREPARING\"");
    let back: OrderStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(back, OrderStatus::Preparing);
  }

  #[test]
  fn test_update_product_skips_unset_fields() {
    let patch = UpdateProduct {
      price: Some(250.0),
      ..Default::default()
    };
    let json = serde_json::to_value(&patch).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 1);
    assert_eq!(json["price"], 250.0);
  }
}
