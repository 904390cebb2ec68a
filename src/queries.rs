//! Typed query and mutation constructors, one per backend operation.
//!
//! This is the application's counterpart of the original generated API
//! hooks: each query binds a resource key to the client call that loads it,
//! and each mutation declares up front which cached collections it dirties.

use crate::api::client::{self, paths, ApiClient};
use crate::api::types::{
  ApiKey, Category, CreateApiKey, CreateCategory, CreateProduct, Order, OrderStatus, Paginated,
  Product, UpdateCategory, UpdateProduct, User, UserRole,
};
use crate::auth::AuthService;
use crate::store::{CacheStore, InvalidationRule, Mutation, Query, ResourceKey, Verb};

// Writes to an entity dirty every cached GET under its path: list pages,
// parameter variants and details alike.
const CATEGORY_DATA: InvalidationRule = &[(Verb::Get, paths::CATEGORIES)];
const PRODUCT_DATA: InvalidationRule = &[(Verb::Get, paths::PRODUCTS)];
const ORDER_DATA: InvalidationRule = &[(Verb::Get, paths::ORDERS)];
const USER_DATA: InvalidationRule = &[(Verb::Get, paths::USERS)];
const API_KEY_DATA: InvalidationRule = &[(Verb::Get, paths::API_KEYS)];

// ============================================================================
// Categories
// ============================================================================

pub fn categories(
  store: &CacheStore,
  api: &ApiClient,
  page: u32,
  limit: u32,
) -> Query<Paginated<Category>> {
  let api = api.clone();
  Query::new(store, client::categories_key(page, limit), move || {
    let api = api.clone();
    async move { api.list_categories(page, limit).await }
  })
}

pub fn category(store: &CacheStore, api: &ApiClient, id: u64) -> Query<Category> {
  let api = api.clone();
  Query::new(store, client::category_key(id), move || {
    let api = api.clone();
    async move { api.get_category(id).await }
  })
}

pub fn create_category(store: &CacheStore, api: &ApiClient) -> Mutation<CreateCategory, Category> {
  let api = api.clone();
  Mutation::new(store, CATEGORY_DATA, move |create: CreateCategory| {
    let api = api.clone();
    async move { api.create_category(&create).await }
  })
}

pub fn update_category(
  store: &CacheStore,
  api: &ApiClient,
  id: u64,
) -> Mutation<UpdateCategory, Category> {
  let api = api.clone();
  Mutation::new(store, CATEGORY_DATA, move |patch: UpdateCategory| {
    let api = api.clone();
    async move { api.update_category(id, &patch).await }
  })
}

/// Delete-by-id; the input is the row's id so one handle serves the whole
/// list view.
pub fn delete_category(store: &CacheStore, api: &ApiClient) -> Mutation<u64, ()> {
  let api = api.clone();
  Mutation::new(store, CATEGORY_DATA, move |id: u64| {
    let api = api.clone();
    async move { api.delete_category(id).await }
  })
}

// ============================================================================
// Products
// ============================================================================

pub fn products(
  store: &CacheStore,
  api: &ApiClient,
  page: u32,
  limit: u32,
) -> Query<Paginated<Product>> {
  let api = api.clone();
  Query::new(store, client::products_key(page, limit), move || {
    let api = api.clone();
    async move { api.list_products(page, limit).await }
  })
}

pub fn product(store: &CacheStore, api: &ApiClient, id: u64) -> Query<Product> {
  let api = api.clone();
  Query::new(store, client::product_key(id), move || {
    let api = api.clone();
    async move { api.get_product(id).await }
  })
}

pub fn create_product(store: &CacheStore, api: &ApiClient) -> Mutation<CreateProduct, Product> {
  let api = api.clone();
  Mutation::new(store, PRODUCT_DATA, move |create: CreateProduct| {
    let api = api.clone();
    async move { api.create_product(&create).await }
  })
}

pub fn update_product(
  store: &CacheStore,
  api: &ApiClient,
  id: u64,
) -> Mutation<UpdateProduct, Product> {
  let api = api.clone();
  Mutation::new(store, PRODUCT_DATA, move |patch: UpdateProduct| {
    let api = api.clone();
    async move { api.update_product(id, &patch).await }
  })
}

pub fn delete_product(store: &CacheStore, api: &ApiClient) -> Mutation<u64, ()> {
  let api = api.clone();
  Mutation::new(store, PRODUCT_DATA, move |id: u64| {
    let api = api.clone();
    async move { api.delete_product(id).await }
  })
}

// ============================================================================
// Orders
// ============================================================================

pub fn orders(
  store: &CacheStore,
  api: &ApiClient,
  page: u32,
  limit: u32,
  status: Option<OrderStatus>,
) -> Query<Paginated<Order>> {
  let api = api.clone();
  Query::new(store, client::orders_key(page, limit, status), move || {
    let api = api.clone();
    async move { api.list_orders(page, limit, status).await }
  })
}

pub fn order(store: &CacheStore, api: &ApiClient, id: u64) -> Query<Order> {
  let api = api.clone();
  Query::new(store, client::order_key(id), move || {
    let api = api.clone();
    async move { api.get_order(id).await }
  })
}

pub fn cancel_order(store: &CacheStore, api: &ApiClient) -> Mutation<u64, Order> {
  let api = api.clone();
  Mutation::new(store, ORDER_DATA, move |id: u64| {
    let api = api.clone();
    async move { api.cancel_order(id).await }
  })
}

// ============================================================================
// Users
// ============================================================================

pub fn users(
  store: &CacheStore,
  api: &ApiClient,
  page: u32,
  limit: u32,
) -> Query<Paginated<User>> {
  let api = api.clone();
  Query::new(store, client::users_key(page, limit), move || {
    let api = api.clone();
    async move { api.list_users(page, limit).await }
  })
}

/// The authenticated user. Goes through the auth service so its cached
/// identity stays in sync; a fresh login seeds this key directly.
pub fn current_user(store: &CacheStore, auth: &AuthService) -> Query<User> {
  let auth = auth.clone();
  Query::new(store, ResourceKey::get(paths::ME), move || {
    let auth = auth.clone();
    async move { auth.current_user().await }
  })
}

pub fn toggle_user_status(store: &CacheStore, api: &ApiClient) -> Mutation<u64, User> {
  let api = api.clone();
  Mutation::new(store, USER_DATA, move |id: u64| {
    let api = api.clone();
    async move { api.toggle_user_status(id).await }
  })
}

pub fn change_user_role(store: &CacheStore, api: &ApiClient) -> Mutation<(u64, UserRole), User> {
  let api = api.clone();
  Mutation::new(store, USER_DATA, move |(id, role): (u64, UserRole)| {
    let api = api.clone();
    async move { api.change_user_role(id, role).await }
  })
}

// ============================================================================
// API keys
// ============================================================================

pub fn api_keys(store: &CacheStore, api: &ApiClient) -> Query<Paginated<ApiKey>> {
  let api = api.clone();
  Query::new(store, client::api_keys_key(), move || {
    let api = api.clone();
    async move { api.list_api_keys().await }
  })
}

pub fn create_api_key(store: &CacheStore, api: &ApiClient) -> Mutation<CreateApiKey, ApiKey> {
  let api = api.clone();
  Mutation::new(store, API_KEY_DATA, move |create: CreateApiKey| {
    let api = api.clone();
    async move { api.create_api_key(&create).await }
  })
}

pub fn revoke_api_key(store: &CacheStore, api: &ApiClient) -> Mutation<u64, ApiKey> {
  let api = api.clone();
  Mutation::new(store, API_KEY_DATA, move |id: u64| {
    let api = api.clone();
    async move { api.revoke_api_key(id).await }
  })
}

pub fn delete_api_key(store: &CacheStore, api: &ApiClient) -> Mutation<u64, ()> {
  let api = api.clone();
  Mutation::new(store, API_KEY_DATA, move |id: u64| {
    let api = api.clone();
    async move { api.delete_api_key(id).await }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_invalidation_rules_cover_list_and_detail_keys() {
    let (verb, prefix) = PRODUCT_DATA[0];
    assert!(client::products_key(1, 50).matches(verb, prefix));
    assert!(client::products_key(2, 50).matches(verb, prefix));
    assert!(client::product_key(5).matches(verb, prefix));
  }

  #[test]
  fn test_order_rules_do_not_touch_other_entities() {
    let (verb, prefix) = ORDER_DATA[0];
    assert!(client::orders_key(1, 50, None).matches(verb, prefix));
    assert!(!client::products_key(1, 50).matches(verb, prefix));
    assert!(!client::users_key(1, 10).matches(verb, prefix));
  }

  #[test]
  fn test_status_is_part_of_the_orders_key() {
    let all = client::orders_key(1, 50, None);
    let pending = client::orders_key(1, 50, Some(OrderStatus::Pending));
    assert_ne!(all, pending);
  }
}
