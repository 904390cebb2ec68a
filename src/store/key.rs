//! Resource keys: the canonical identity of one fetchable REST resource.

use std::collections::BTreeMap;
use std::fmt;

use crate::api::error::ApiError;

/// HTTP verb of a keyed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
  Get,
  Post,
  Patch,
  Delete,
}

impl Verb {
  pub fn as_str(&self) -> &'static str {
    match self {
      Verb::Get => "GET",
      Verb::Post => "POST",
      Verb::Patch => "PATCH",
      Verb::Delete => "DELETE",
    }
  }
}

/// Identity of a fetchable resource: verb + path template + parameters.
///
/// Equality is structural. Path and query parameters live in BTreeMaps, so
/// two keys built with the same parameters in a different order compare (and
/// hash) equal. Keys index the cache store directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
  verb: Verb,
  template: &'static str,
  path_params: BTreeMap<&'static str, String>,
  query_params: BTreeMap<&'static str, String>,
}

impl ResourceKey {
  pub fn new(verb: Verb, template: &'static str) -> Self {
    Self {
      verb,
      template,
      path_params: BTreeMap::new(),
      query_params: BTreeMap::new(),
    }
  }

  pub fn get(template: &'static str) -> Self {
    Self::new(Verb::Get, template)
  }

  pub fn post(template: &'static str) -> Self {
    Self::new(Verb::Post, template)
  }

  pub fn patch(template: &'static str) -> Self {
    Self::new(Verb::Patch, template)
  }

  pub fn delete(template: &'static str) -> Self {
    Self::new(Verb::Delete, template)
  }

  /// Bind a `{name}` path parameter.
  pub fn path(mut self, name: &'static str, value: impl ToString) -> Self {
    self.path_params.insert(name, value.to_string());
    self
  }

  /// Bind a query parameter.
  pub fn query(mut self, name: &'static str, value: impl ToString) -> Self {
    self.query_params.insert(name, value.to_string());
    self
  }

  pub fn verb(&self) -> Verb {
    self.verb
  }

  pub fn template(&self) -> &'static str {
    self.template
  }

  /// Substitute path parameters into the template.
  ///
  /// Fails with `InvalidPath` if the template references a parameter that
  /// was never bound.
  pub fn resolved_path(&self) -> Result<String, ApiError> {
    let mut path = String::with_capacity(self.template.len());
    let mut rest = self.template;

    while let Some(open) = rest.find('{') {
      path.push_str(&rest[..open]);
      let after = &rest[open + 1..];
      let close = after.find('}').ok_or_else(|| ApiError::InvalidPath {
        template: self.template,
        name: after.to_string(),
      })?;
      let name = &after[..close];
      let value = self
        .path_params
        .get(name)
        .ok_or_else(|| ApiError::InvalidPath {
          template: self.template,
          name: name.to_string(),
        })?;
      path.push_str(value);
      rest = &after[close + 1..];
    }
    path.push_str(rest);

    Ok(path)
  }

  /// Canonical query string: keys sorted, percent-encoded. Empty string if
  /// there are no query parameters.
  pub fn canonical_query(&self) -> String {
    if self.query_params.is_empty() {
      return String::new();
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in &self.query_params {
      serializer.append_pair(name, value);
    }
    serializer.finish()
  }

  /// Whether this key falls under the given verb + path-template prefix.
  /// Invalidation rules are declared at this granularity: all pages and
  /// parameter variants of a collection share a template.
  pub fn matches(&self, verb: Verb, template: &str) -> bool {
    self.verb == verb && self.template.starts_with(template)
  }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ", self.verb.as_str())?;
    match self.resolved_path() {
      Ok(path) => write!(f, "{}", path)?,
      Err(_) => write!(f, "{}", self.template)?,
    }
    let query = self.canonical_query();
    if !query.is_empty() {
      write!(f, "?{}", query)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_query_param_order_is_irrelevant() {
    let a = ResourceKey::get("/api/v1/products")
      .query("page", 1)
      .query("limit", 50);
    let b = ResourceKey::get("/api/v1/products")
      .query("limit", 50)
      .query("page", 1);
    assert_eq!(a, b);

    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut ha = DefaultHasher::new();
    let mut hb = DefaultHasher::new();
    a.hash(&mut ha);
    b.hash(&mut hb);
    assert_eq!(ha.finish(), hb.finish());
  }

  #[test]
  fn test_different_params_are_different_keys() {
    let page1 = ResourceKey::get("/api/v1/products").query("page", 1);
    let page2 = ResourceKey::get("/api/v1/products").query("page", 2);
    assert_ne!(page1, page2);
  }

  #[test]
  fn test_resolved_path_substitutes() {
    let key = ResourceKey::get("/api/v1/products/{id}").path("id", 42);
    assert_eq!(key.resolved_path().unwrap(), "/api/v1/products/42");
  }

  #[test]
  fn test_missing_path_param_is_an_error() {
    let key = ResourceKey::get("/api/v1/products/{id}");
    match key.resolved_path() {
      Err(ApiError::InvalidPath { name, .. }) => assert_eq!(name, "id"),
      other => panic!("expected InvalidPath, got {:?}", other),
    }
  }

  #[test]
  fn test_canonical_query_is_sorted() {
    let key = ResourceKey::get("/api/v1/orders")
      .query("status", "PENDING")
      .query("limit", 50)
      .query("page", 1);
    assert_eq!(key.canonical_query(), "limit=50&page=1&status=PENDING");
  }

  #[test]
  fn test_prefix_matching() {
    let key = ResourceKey::get("/api/v1/products/{id}").path("id", 7);
    assert!(key.matches(Verb::Get, "/api/v1/products"));
    assert!(!key.matches(Verb::Delete, "/api/v1/products"));
    assert!(!key.matches(Verb::Get, "/api/v1/orders"));
  }
}
