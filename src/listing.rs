//! Pure list-view derivation shared by every entity screen.
//!
//! Each screen renders `derive(collection, filters, sort)` over whatever the
//! cache currently holds: a case-insensitive search across the entity's
//! configured text fields, an optional exact status filter, and an optional
//! stable ascending sort. The input collection is never mutated and the
//! same inputs always produce the same rows.

use crate::api::types::{ApiKey, Category, Order, Product, User};

/// How one entity type participates in list derivation.
pub trait Listable {
  /// Text fields matched by the search box. An item matches if any field
  /// contains the search term, case-insensitively.
  fn haystack(&self) -> Vec<String>;

  /// Status tag for exact-match filtering, where the entity has one.
  fn status_tag(&self) -> Option<&str> {
    None
  }
}

/// Status filter state: everything, or exactly one status value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
  #[default]
  All,
  Only(String),
}

/// Local UI state a list view applies to its fetched collection.
#[derive(Debug, Clone, Default)]
pub struct Filters {
  pub search: String,
  pub status: StatusFilter,
}

impl Filters {
  pub fn search(term: impl Into<String>) -> Self {
    Self {
      search: term.into(),
      status: StatusFilter::All,
    }
  }
}

/// Sort key: a numeric or date-derived value, ascending.
pub type SortKey<T> = fn(&T) -> i64;

/// Derive the rows to render from a fetched collection.
pub fn derive<'a, T: Listable>(
  items: &'a [T],
  filters: &Filters,
  sort: Option<SortKey<T>>,
) -> Vec<&'a T> {
  let needle = filters.search.trim().to_lowercase();

  let mut rows: Vec<&T> = items
    .iter()
    .filter(|item| {
      if !needle.is_empty() {
        let matched = item
          .haystack()
          .iter()
          .any(|field| field.to_lowercase().contains(&needle));
        if !matched {
          return false;
        }
      }
      match &filters.status {
        StatusFilter::All => true,
        StatusFilter::Only(status) => item.status_tag() == Some(status.as_str()),
      }
    })
    .collect();

  if let Some(key) = sort {
    // sort_by_key is stable: ties keep the collection's original order.
    rows.sort_by_key(|item| key(item));
  }

  rows
}

// ============================================================================
// Per-entity search fields
// ============================================================================

impl Listable for Category {
  fn haystack(&self) -> Vec<String> {
    vec![
      self.name.clone(),
      self.slug.clone(),
      self.description.clone().unwrap_or_default(),
    ]
  }
}

impl Listable for Product {
  fn haystack(&self) -> Vec<String> {
    vec![self.name.clone(), self.sku.clone()]
  }
}

impl Listable for User {
  fn haystack(&self) -> Vec<String> {
    vec![self.username.clone(), self.email.clone()]
  }
}

impl Listable for Order {
  fn haystack(&self) -> Vec<String> {
    vec![
      self.order_number.clone().unwrap_or_default(),
      self.id.to_string(),
    ]
  }

  fn status_tag(&self) -> Option<&str> {
    Some(self.status.as_str())
  }
}

impl Listable for ApiKey {
  fn haystack(&self) -> Vec<String> {
    vec![self.name.clone(), self.key.clone()]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::OrderStatus;
  use chrono::{TimeZone, Utc};

  fn ts() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
  }

  fn category(name: &str, slug: &str, display_order: i64) -> Category {
    Category {
      id: display_order as u64,
      name: name.into(),
      slug: slug.into(),
      description: None,
      display_order,
      is_active: true,
      created_at: ts(),
      updated_at: ts(),
    }
  }

  fn product(name: &str, sku: &str) -> Product {
    Product {
      id: 1,
      name: name.into(),
      description: String::new(),
      sku: sku.into(),
      price: 100.0,
      stock: 5,
      volume_ml: None,
      category_id: 1,
      is_active: true,
      is_promoted: false,
      created_at: ts(),
      updated_at: ts(),
    }
  }

  fn order(id: u64, status: OrderStatus) -> Order {
    Order {
      id,
      order_number: Some(format!("ORD-{:04}", id)),
      status,
      total_amount: 350.0,
      created_at: ts(),
      updated_at: ts(),
    }
  }

  #[test]
  fn test_empty_input_yields_empty_output() {
    let products: Vec<Product> = Vec::new();
    let rows = derive(&products, &Filters::search("x"), None);
    assert!(rows.is_empty());
  }

  #[test]
  fn test_empty_filter_is_identity_in_original_order() {
    let products = vec![product("Latte", "COF-LAT-002"), product("Mocha", "COF-MOC-003")];
    let rows = derive(&products, &Filters::default(), None);
    let names: Vec<&str> = rows.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Latte", "Mocha"]);
  }

  #[test]
  fn test_categories_sort_by_display_order() {
    let categories = vec![category("Tea", "tea", 2), category("Coffee", "coffee", 1)];
    let rows = derive(
      &categories,
      &Filters::default(),
      Some(|c: &Category| c.display_order),
    );
    let names: Vec<&str> = rows.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Coffee", "Tea"]);
  }

  #[test]
  fn test_sort_is_stable_on_ties() {
    let categories = vec![
      category("First", "first", 1),
      category("Second", "second", 1),
      category("Third", "third", 0),
    ];
    let rows = derive(
      &categories,
      &Filters::default(),
      Some(|c: &Category| c.display_order),
    );
    let names: Vec<&str> = rows.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Third", "First", "Second"]);
  }

  #[test]
  fn test_order_status_filter() {
    let orders = vec![
      order(1, OrderStatus::Pending),
      order(2, OrderStatus::Completed),
      order(3, OrderStatus::Cancelled),
    ];

    let filters = Filters {
      search: String::new(),
      status: StatusFilter::Only("PENDING".into()),
    };
    let rows = derive(&orders, &filters, None);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 1);

    let all = derive(&orders, &Filters::default(), None);
    assert_eq!(all.len(), 3);
  }

  #[test]
  fn test_removing_status_filter_restores_search_set() {
    let orders = vec![
      order(11, OrderStatus::Pending),
      order(12, OrderStatus::Completed),
      order(25, OrderStatus::Pending),
    ];

    // Search narrows to the two orders whose number contains "1".
    let searched = derive(&orders, &Filters::search("ord-001"), None);
    assert_eq!(searched.len(), 2);

    let narrowed = derive(
      &orders,
      &Filters {
        search: "ord-001".into(),
        status: StatusFilter::Only("COMPLETED".into()),
      },
      None,
    );
    assert_eq!(narrowed.len(), 1);

    // Back to "all": exactly the search-filtered set again.
    let restored = derive(&orders, &Filters::search("ord-001"), None);
    let ids: Vec<u64> = restored.iter().map(|o| o.id).collect();
    let original_ids: Vec<u64> = searched.iter().map(|o| o.id).collect();
    assert_eq!(ids, original_ids);
  }

  #[test]
  fn test_search_is_case_insensitive_and_scoped_to_fields() {
    let products = vec![
      product("Cappuccino", "COF-CAP-001"),
      product("Latte", "COF-LAT-002"),
    ];
    let rows = derive(&products, &Filters::search("cap"), None);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Cappuccino");

    // SKU is searchable too.
    let rows = derive(&products, &Filters::search("lat-002"), None);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Latte");
  }

  #[test]
  fn test_search_matches_any_configured_field() {
    let categories = vec![category("Hot Drinks", "hot-drinks", 1)];
    assert_eq!(derive(&categories, &Filters::search("HOT"), None).len(), 1);
    assert_eq!(derive(&categories, &Filters::search("drinks"), None).len(), 1);
    assert_eq!(derive(&categories, &Filters::search("cold"), None).len(), 0);
  }

  #[test]
  fn test_same_inputs_same_output() {
    let orders = vec![order(1, OrderStatus::Ready), order(2, OrderStatus::Pending)];
    let filters = Filters::search("ord");
    let a: Vec<u64> = derive(&orders, &filters, None).iter().map(|o| o.id).collect();
    let b: Vec<u64> = derive(&orders, &filters, None).iter().map(|o| o.id).collect();
    assert_eq!(a, b);
  }
}
