//! Typed client for the coffee-shop backend REST API.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

use crate::api::error::ApiError;
use crate::api::types::{
  ApiKey, Category, CreateApiKey, CreateCategory, CreateProduct, LoginRequest, LoginResponse,
  Order, OrderStatus, Paginated, Product, UpdateCategory, UpdateProduct, User, UserRole,
};
use crate::config::Config;
use crate::store::{ResourceKey, Verb};

/// Path templates, shared between request construction and the invalidation
/// rules declared in `queries`.
pub mod paths {
  pub const CATEGORIES: &str = "/api/v1/categories";
  pub const CATEGORY: &str = "/api/v1/categories/{id}";
  pub const PRODUCTS: &str = "/api/v1/products";
  pub const PRODUCT: &str = "/api/v1/products/{id}";
  pub const ORDERS: &str = "/api/v1/orders";
  pub const ORDER: &str = "/api/v1/orders/{id}";
  pub const ORDER_CANCEL: &str = "/api/v1/orders/{id}/cancel";
  pub const USERS: &str = "/api/users";
  pub const USER_ROLE: &str = "/api/users/{id}/role";
  pub const USER_TOGGLE_STATUS: &str = "/api/users/{id}/toggle-status";
  pub const ME: &str = "/api/users/me";
  pub const API_KEYS: &str = "/api/api-keys";
  pub const API_KEY: &str = "/api/api-keys/{id}";
  pub const API_KEY_REVOKE: &str = "/api/api-keys/{id}/revoke";
  pub const LOGIN: &str = "/api/auth/login";
  pub const LOGOUT: &str = "/api/auth/logout";
}

/// Resource keys for the list endpoints, used by both the client and the
/// query constructors so the cache and the requests always agree.
pub fn categories_key(page: u32, limit: u32) -> ResourceKey {
  ResourceKey::get(paths::CATEGORIES)
    .query("page", page)
    .query("limit", limit)
}

pub fn products_key(page: u32, limit: u32) -> ResourceKey {
  ResourceKey::get(paths::PRODUCTS)
    .query("page", page)
    .query("limit", limit)
}

pub fn orders_key(page: u32, limit: u32, status: Option<OrderStatus>) -> ResourceKey {
  let key = ResourceKey::get(paths::ORDERS)
    .query("page", page)
    .query("limit", limit);
  match status {
    Some(status) => key.query("status", status.as_str()),
    None => key,
  }
}

pub fn users_key(page: u32, limit: u32) -> ResourceKey {
  ResourceKey::get(paths::USERS)
    .query("page", page)
    .query("limit", limit)
}

pub fn api_keys_key() -> ResourceKey {
  ResourceKey::get(paths::API_KEYS)
}

pub fn category_key(id: u64) -> ResourceKey {
  ResourceKey::get(paths::CATEGORY).path("id", id)
}

pub fn product_key(id: u64) -> ResourceKey {
  ResourceKey::get(paths::PRODUCT).path("id", id)
}

pub fn order_key(id: u64) -> ResourceKey {
  ResourceKey::get(paths::ORDER).path("id", id)
}

/// HTTP client for the backend. Cheap to clone; the session token is shared
/// across clones so a login is visible everywhere at once.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
  token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.server.url)
      .map_err(|e| eyre!("Invalid server url {}: {}", config.server.url, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      token: Arc::new(RwLock::new(Config::get_api_token())),
    })
  }

  pub fn set_token(&self, token: Option<String>) {
    *self.token.write().expect("token lock poisoned") = token;
  }

  pub fn has_token(&self) -> bool {
    self.token.read().expect("token lock poisoned").is_some()
  }

  /// Perform one request described by `key`, expecting a JSON body back.
  ///
  /// No retries and no error recovery at this layer: transport failures,
  /// non-2xx statuses and undecodable bodies each map to their own
  /// [`ApiError`] class and are handed to the caller as-is.
  pub async fn request<T: DeserializeOwned>(
    &self,
    key: &ResourceKey,
    body: Option<Value>,
  ) -> Result<T, ApiError> {
    let response = self.execute(key, body).await?;
    let bytes = response
      .bytes()
      .await
      .map_err(|e| ApiError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
  }

  /// Perform a request whose response body is irrelevant (deletes, logout).
  pub async fn request_no_content(
    &self,
    key: &ResourceKey,
    body: Option<Value>,
  ) -> Result<(), ApiError> {
    self.execute(key, body).await?;
    Ok(())
  }

  async fn execute(
    &self,
    key: &ResourceKey,
    body: Option<Value>,
  ) -> Result<reqwest::Response, ApiError> {
    let path = key.resolved_path()?;
    let mut url = self
      .base
      .join(&path)
      .map_err(|e| ApiError::Transport(e.to_string()))?;
    let query = key.canonical_query();
    if !query.is_empty() {
      url.set_query(Some(&query));
    }

    let method = match key.verb() {
      Verb::Get => Method::GET,
      Verb::Post => Method::POST,
      Verb::Patch => Method::PATCH,
      Verb::Delete => Method::DELETE,
    };

    let mut request = self.http.request(method, url);
    if let Some(token) = self.token.read().expect("token lock poisoned").as_deref() {
      request = request.bearer_auth(token);
    }
    if let Some(body) = body {
      request = request.json(&body);
    }

    let response = request
      .send()
      .await
      .map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(ApiError::Api {
        status: status.as_u16(),
        body,
      });
    }

    Ok(response)
  }

  fn json_body<B: serde::Serialize>(body: &B) -> Result<Option<Value>, ApiError> {
    serde_json::to_value(body)
      .map(Some)
      .map_err(|e| ApiError::Decode(e.to_string()))
  }

  // ==========================================================================
  // Auth
  // ==========================================================================

  pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
    let key = ResourceKey::post(paths::LOGIN);
    self
      .request(&key, Self::json_body(credentials)?)
      .await
  }

  pub async fn logout(&self) -> Result<(), ApiError> {
    let key = ResourceKey::post(paths::LOGOUT);
    self.request_no_content(&key, None).await
  }

  pub async fn current_user(&self) -> Result<User, ApiError> {
    self.request(&ResourceKey::get(paths::ME), None).await
  }

  // ==========================================================================
  // Categories
  // ==========================================================================

  pub async fn list_categories(&self, page: u32, limit: u32) -> Result<Paginated<Category>, ApiError> {
    self.request(&categories_key(page, limit), None).await
  }

  pub async fn get_category(&self, id: u64) -> Result<Category, ApiError> {
    self.request(&category_key(id), None).await
  }

  pub async fn create_category(&self, create: &CreateCategory) -> Result<Category, ApiError> {
    let key = ResourceKey::post(paths::CATEGORIES);
    self.request(&key, Self::json_body(create)?).await
  }

  pub async fn update_category(&self, id: u64, patch: &UpdateCategory) -> Result<Category, ApiError> {
    let key = ResourceKey::patch(paths::CATEGORY).path("id", id);
    self.request(&key, Self::json_body(patch)?).await
  }

  pub async fn delete_category(&self, id: u64) -> Result<(), ApiError> {
    let key = ResourceKey::delete(paths::CATEGORY).path("id", id);
    self.request_no_content(&key, None).await
  }

  // ==========================================================================
  // Products
  // ==========================================================================

  pub async fn list_products(&self, page: u32, limit: u32) -> Result<Paginated<Product>, ApiError> {
    self.request(&products_key(page, limit), None).await
  }

  pub async fn get_product(&self, id: u64) -> Result<Product, ApiError> {
    self.request(&product_key(id), None).await
  }

  pub async fn create_product(&self, create: &CreateProduct) -> Result<Product, ApiError> {
    let key = ResourceKey::post(paths::PRODUCTS);
    self.request(&key, Self::json_body(create)?).await
  }

  pub async fn update_product(&self, id: u64, patch: &UpdateProduct) -> Result<Product, ApiError> {
    let key = ResourceKey::patch(paths::PRODUCT).path("id", id);
    self.request(&key, Self::json_body(patch)?).await
  }

  pub async fn delete_product(&self, id: u64) -> Result<(), ApiError> {
    let key = ResourceKey::delete(paths::PRODUCT).path("id", id);
    self.request_no_content(&key, None).await
  }

  // ==========================================================================
  // Orders
  // ==========================================================================

  pub async fn list_orders(
    &self,
    page: u32,
    limit: u32,
    status: Option<OrderStatus>,
  ) -> Result<Paginated<Order>, ApiError> {
    self.request(&orders_key(page, limit, status), None).await
  }

  pub async fn get_order(&self, id: u64) -> Result<Order, ApiError> {
    self.request(&order_key(id), None).await
  }

  pub async fn cancel_order(&self, id: u64) -> Result<Order, ApiError> {
    let key = ResourceKey::post(paths::ORDER_CANCEL).path("id", id);
    self.request(&key, None).await
  }

  // ==========================================================================
  // Users
  // ==========================================================================

  pub async fn list_users(&self, page: u32, limit: u32) -> Result<Paginated<User>, ApiError> {
    self.request(&users_key(page, limit), None).await
  }

  pub async fn toggle_user_status(&self, id: u64) -> Result<User, ApiError> {
    let key = ResourceKey::post(paths::USER_TOGGLE_STATUS).path("id", id);
    self.request(&key, None).await
  }

  pub async fn change_user_role(&self, id: u64, role: UserRole) -> Result<User, ApiError> {
    let key = ResourceKey::patch(paths::USER_ROLE).path("id", id);
    let body = serde_json::json!({ "role": role });
    self.request(&key, Some(body)).await
  }

  // ==========================================================================
  // API keys
  // ==========================================================================

  pub async fn list_api_keys(&self) -> Result<Paginated<ApiKey>, ApiError> {
    self.request(&api_keys_key(), None).await
  }

  pub async fn create_api_key(&self, create: &CreateApiKey) -> Result<ApiKey, ApiError> {
    let key = ResourceKey::post(paths::API_KEYS);
    self.request(&key, Self::json_body(create)?).await
  }

  pub async fn revoke_api_key(&self, id: u64) -> Result<ApiKey, ApiError> {
    let key = ResourceKey::post(paths::API_KEY_REVOKE).path("id", id);
    self.request(&key, None).await
  }

  pub async fn delete_api_key(&self, id: u64) -> Result<(), ApiError> {
    let key = ResourceKey::delete(paths::API_KEY).path("id", id);
    self.request_no_content(&key, None).await
  }
}
